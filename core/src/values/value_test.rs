use std::rc::Rc;

use num_bigint::BigInt;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use crate::values::{Kvc, RangeValue, Value, datetime};

#[test]
fn test_integer_demotes_when_it_fits() {
    assert!(matches!(Value::integer(BigInt::from(42)), Value::Int(42)));
    let big = BigInt::from(i64::MAX) * 4;
    assert!(matches!(Value::integer(big), Value::BigInt(_)));
}

#[test]
fn test_numbers_compare_across_representations() {
    assert_eq!(Value::Int(3), Value::Number(3.0));
    assert_eq!(Value::Int(7), Value::integer(BigInt::from(7)));
    assert!(Value::Int(3) != Value::string("3"));
}

#[test]
fn test_collections_compare_by_identity() {
    let kvc = Rc::new(Kvc::from_values([("a", Value::Int(1))]));
    let same = Value::Kvc(kvc.clone());
    assert_eq!(Value::Kvc(kvc), same);

    let other = Value::Kvc(Rc::new(Kvc::from_values([("a", Value::Int(1))])));
    assert!(same != other);
}

#[test]
fn test_range_sequence() {
    let range = Value::Range(RangeValue { start: 5, count: 3 });
    let items: Vec<Value> = range.sequence().unwrap().collect();
    assert_eq!(items, vec![Value::Int(5), Value::Int(6), Value::Int(7)]);
    assert_eq!(range.sequence_len(), Some(3));
    assert_eq!(RangeValue { start: 5, count: 3 }.get(3), None);
}

#[test]
fn test_range_stops_at_i64_max() {
    let range = Value::Range(RangeValue {
        start: i64::MAX - 1,
        count: 10,
    });
    assert_eq!(range.sequence().unwrap().count(), 2);
}

#[test]
fn test_display() {
    let list = Value::list(vec![Value::Int(1), Value::string("a"), Value::Nil]);
    assert_eq!(list.to_string(), r#"[1, "a", nil]"#);
    assert_eq!(Value::Number(1.5).to_string(), "1.5");
    assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
    assert_eq!(Value::bytes(vec![1u8, 2, 3]).to_string(), "AQID");
    assert_eq!(Value::Guid(Uuid::nil()).to_string(), "00000000-0000-0000-0000-000000000000");
    assert_eq!(
        Value::DateTime(datetime::UNIX_EPOCH_TICKS).to_string(),
        "1970-01-01T00:00:00Z"
    );
}

#[test]
fn test_kvc_display_keeps_key_spelling() {
    let kvc = Kvc::from_values([("Name", Value::string("x")), ("n", Value::Int(1))]);
    assert_eq!(kvc.to_string(), r#"{Name: "x", n: 1}"#);
    assert!(kvc.contains_key("NAME"));
    assert_eq!(kvc.keys().collect::<Vec<_>>(), vec!["Name", "n"]);
}
