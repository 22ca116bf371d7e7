use pretty_assertions::assert_eq;

use super::*;
use crate::api::Error;
use crate::evaluator::{Evaluator, EvaluatorOptions, codes};
use crate::host::NoHost;
use crate::parser;
use crate::values::Value;

fn issue(table: &mut HandleTable, source: &str) -> Handle {
    let mut evaluator = Evaluator::new(EvaluatorOptions::default(), &NoHost);
    let value = evaluator.eval(&parser::parse(source).unwrap()).unwrap();
    table.allocate(value).unwrap()
}

fn marshaller(table: &mut HandleTable) -> Marshaller<'_, 'static> {
    Marshaller::new(table, Evaluator::new(EvaluatorOptions::default(), &NoHost))
}

#[test]
fn test_type_of() {
    let mut table = HandleTable::new().unwrap();
    let cases = [
        ("nil", Kind::Nil),
        ("true", Kind::Bool),
        ("1", Kind::Int),
        ("1.5", Kind::Number),
        ("9223372036854775807 + 1", Kind::BigInt),
        ("'x'", Kind::String),
        ("[1]", Kind::List),
        ("{a: 1}", Kind::KeyValueCollection),
        ("Range(1, 3)", Kind::Range),
        ("(x) => x", Kind::Function),
        ("ChangeType('AQID', 'ByteArray')", Kind::Bytes),
        ("Date('2020-01-01')", Kind::DateTime),
    ];
    for (source, expected) in cases {
        let h = issue(&mut table, source);
        assert_eq!(marshaller(&mut table).type_of(h).unwrap(), expected, "{source}");
    }
    assert!(matches!(
        marshaller(&mut table).type_of(Handle::INVALID),
        Err(Error::InvalidHandle(0))
    ));
}

#[test]
fn test_len() {
    let mut table = HandleTable::new().unwrap();
    for (source, expected) in [
        ("[1, 2, 3]", 3),
        ("{a: 1, b: 2}", 2),
        ("'héllo'", 5),
        ("ChangeType('AQID', 'ByteArray')", 3),
        ("Range(5, 10)", 10),
    ] {
        let h = issue(&mut table, source);
        assert_eq!(marshaller(&mut table).len(h).unwrap(), expected, "{source}");
    }
    let h = issue(&mut table, "42");
    let err = marshaller(&mut table).len(h).unwrap_err();
    assert_eq!(err.code(), codes::LEN_UNSUPPORTED);
}

#[test]
fn test_index_counts_from_the_end() {
    let mut table = HandleTable::new().unwrap();
    let list = issue(&mut table, "[10, 'b', [1]]");
    let mut m = marshaller(&mut table);

    let last = m.index(list, -1).unwrap();
    let also_last = m.index(list, 2).unwrap();
    assert_eq!(m.to_snapshot(last).unwrap(), "[1]");
    assert_eq!(m.to_snapshot(also_last).unwrap(), "[1]");
    assert!(last != also_last);

    let first = m.index(list, 0).unwrap();
    assert_eq!(m.type_of(first).unwrap(), Kind::Int);

    assert_eq!(
        m.index(list, 3).unwrap_err(),
        Error::IndexOutOfRange { index: 3, len: 3 }
    );
    assert_eq!(m.index(list, -4).unwrap_err().code(), codes::INDEX_OUT_OF_RANGE);
}

#[test]
fn test_index_requires_list() {
    let mut table = HandleTable::new().unwrap();
    let range = issue(&mut table, "Range(1, 3)");
    let err = marshaller(&mut table).index(range, 0).unwrap_err();
    assert_eq!(err.code(), codes::TYPE_MISMATCH);
}

#[test]
fn test_get_key_and_keys() {
    let mut table = HandleTable::new().unwrap();
    let kvc = issue(&mut table, "{Name: 'x', count: 1 + 1}");
    let mut m = marshaller(&mut table);

    assert_eq!(m.keys(kvc).unwrap(), r#"["Name","count"]"#);
    let count = m.get_key(kvc, "COUNT").unwrap();
    assert_eq!(m.to_snapshot(count).unwrap(), "2");
    assert_eq!(
        m.get_key(kvc, "missing").unwrap_err(),
        Error::KeyNotFound("missing".to_string())
    );
}

#[test]
fn test_get_key_reports_entry_errors() {
    let mut table = HandleTable::new().unwrap();
    let kvc = issue(&mut table, "{ok: 1, bad: 1 / 0}");
    let mut m = marshaller(&mut table);
    assert_eq!(m.get_key(kvc, "bad").unwrap_err().code(), codes::DIVISION_BY_ZERO);
    assert!(m.get_key(kvc, "ok").is_ok());
}

#[test]
fn test_range_info() {
    let mut table = HandleTable::new().unwrap();
    let range = issue(&mut table, "Range(-2, 4)");
    let list = issue(&mut table, "[1]");
    let m = marshaller(&mut table);
    assert_eq!(m.range_info(range).unwrap(), (-2, 4));
    assert_eq!(m.range_info(list).unwrap_err().code(), codes::TYPE_MISMATCH);
}

#[test]
fn test_call_leaves_arguments_alive() {
    crate::test_utils::init_test_logging();
    let mut table = HandleTable::new().unwrap();
    let f = issue(&mut table, "(x, y) => x * y");
    let a = issue(&mut table, "3");
    let b = issue(&mut table, "4");
    let mut m = marshaller(&mut table);

    let result = m.call(f, &[a, b]).unwrap();
    assert_eq!(m.to_snapshot(result).unwrap(), "12");
    assert_eq!(m.to_snapshot(a).unwrap(), "3");

    let err = m.call(f, &[a, b, a]).unwrap_err();
    assert_eq!(err.code(), codes::ARITY_MISMATCH);
    assert_eq!(table.live(), 4);
}

#[test]
fn test_call_errors() {
    let mut table = HandleTable::new().unwrap();
    let f = issue(&mut table, "(x) => x / 0");
    let not_f = issue(&mut table, "1");
    let mut m = marshaller(&mut table);

    assert_eq!(m.call(f, &[not_f]).unwrap_err().code(), codes::DIVISION_BY_ZERO);
    assert_eq!(m.call(not_f, &[]).unwrap_err().code(), codes::TYPE_MISMATCH);
    assert!(matches!(
        m.call(f, &[Handle(12345)]),
        Err(Error::InvalidHandle(12345))
    ));
}

#[test]
fn test_builtin_function_handles() {
    let mut table = HandleTable::new().unwrap();
    let range = issue(&mut table, "Range");
    let start = table.allocate(Value::Int(1)).unwrap();
    let count = table.allocate(Value::Int(3)).unwrap();
    let mut m = marshaller(&mut table);
    let result = m.call(range, &[start, count]).unwrap();
    assert_eq!(m.range_info(result).unwrap(), (1, 3));
    assert_eq!(m.to_snapshot(range).unwrap_err().code(), codes::TYPE_MISMATCH);
}
