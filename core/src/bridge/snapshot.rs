//! JSON snapshots of values.
//!
//! Scalars map onto JSON directly. Values JSON cannot express are written as
//! tagged envelopes:
//!
//! ```text
//! {"type":"bytes","base64":"AQID"}
//! {"type":"guid","value":"00000000-0000-0000-0000-000000000000"}
//! {"type":"datetime","ticks":621355968000000000}
//! {"type":"range","start":1,"count":5}
//! {"type":"function","name":"Range","arity":2}
//! ```
//!
//! Big integers are written as exact JSON integers, non-finite floats as
//! `null`, key-value collections as objects in insertion order.

use std::rc::Rc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};

use crate::api::Error;
use crate::evaluator::{EvalError, Evaluator, RuntimeError};
use crate::values::{Kvc, Value};

/// Tagged representation of the values plain JSON cannot carry.
///
/// Snapshots always emit `ticks` for timestamps; decoders also accept `iso`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    Bytes {
        base64: String,
    },
    Guid {
        value: String,
    },
    Datetime {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ticks: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        iso: Option<String>,
    },
    Range {
        start: i64,
        count: u64,
    },
    Function {
        name: String,
        arity: Option<usize>,
    },
}

/// Deep copy of `value` as JSON.
///
/// Lazy collection entries are evaluated on the way, so this may fail with
/// any evaluation error. A function at the top level cannot be copied and is
/// a type mismatch; nested functions become envelopes.
pub fn to_json(evaluator: &mut Evaluator<'_>, value: &Value) -> Result<serde_json::Value, Error> {
    if let Value::Function(_) = value {
        return Err(Error::TypeMismatch(
            "a Function cannot be snapshotted; call it through its handle".to_string(),
        ));
    }
    let mut path = Vec::new();
    write_value(evaluator, value, &mut path)
}

/// `to_json` rendered as compact text.
pub fn to_json_string(evaluator: &mut Evaluator<'_>, value: &Value) -> Result<String, Error> {
    let json = to_json(evaluator, value)?;
    serde_json::to_string(&json).map_err(|e| Error::Internal(e.to_string()))
}

fn envelope(envelope: Envelope) -> Result<serde_json::Value, Error> {
    serde_json::to_value(envelope).map_err(|e| Error::Internal(e.to_string()))
}

fn write_value(
    evaluator: &mut Evaluator<'_>,
    value: &Value,
    path: &mut Vec<Rc<Kvc>>,
) -> Result<serde_json::Value, Error> {
    use serde_json::Value as Json;

    Ok(match value {
        Value::Nil => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number(Number::from(*i)),
        Value::BigInt(b) => {
            let number = b
                .to_string()
                .parse::<Number>()
                .map_err(|e| Error::Internal(e.to_string()))?;
            Json::Number(number)
        }
        Value::Number(x) => Number::from_f64(*x).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s.to_string()),
        Value::Bytes(bytes) => envelope(Envelope::Bytes {
            base64: STANDARD.encode(bytes),
        })?,
        Value::Guid(g) => envelope(Envelope::Guid {
            value: g.hyphenated().to_string(),
        })?,
        Value::DateTime(ticks) => envelope(Envelope::Datetime {
            ticks: Some(*ticks),
            iso: None,
        })?,
        Value::Range(range) => envelope(Envelope::Range {
            start: range.start,
            count: range.count,
        })?,
        Value::Function(f) => envelope(Envelope::Function {
            name: f.name().to_string(),
            arity: f.arity(),
        })?,
        Value::List(items) => Json::Array(
            items
                .iter()
                .map(|item| write_value(evaluator, item, path))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Kvc(kvc) => {
            if path.iter().any(|seen| Rc::ptr_eq(seen, kvc)) {
                return Err(Error::Runtime(EvalError::from(
                    RuntimeError::CircularReference {
                        key: kvc.keys().next().unwrap_or_default().to_string(),
                    },
                )));
            }
            path.push(kvc.clone());
            let mut object = Map::new();
            let names: Vec<String> = kvc.keys().map(str::to_string).collect();
            for name in names {
                let entry = evaluator.kvc_get(kvc, &name)?.unwrap_or(Value::Nil);
                object.insert(name, write_value(evaluator, &entry, path)?);
            }
            path.pop();
            Json::Object(object)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluatorOptions;
    use crate::host::NoHost;
    use crate::parser;
    use pretty_assertions::assert_eq;

    fn snapshot(source: &str) -> Result<String, Error> {
        let mut evaluator = Evaluator::new(EvaluatorOptions::default(), &NoHost);
        let value = evaluator.eval(&parser::parse(source).unwrap())?;
        to_json_string(&mut evaluator, &value)
    }

    #[test]
    fn test_scalars() {
        assert_eq!(snapshot("nil").unwrap(), "null");
        assert_eq!(snapshot("1 = 1").unwrap(), "true");
        assert_eq!(snapshot("42").unwrap(), "42");
        assert_eq!(snapshot("1.5").unwrap(), "1.5");
        assert_eq!(snapshot("'abc'").unwrap(), r#""abc""#);
        assert_eq!(snapshot("Sqrt(-1)").unwrap(), "null");
    }

    #[test]
    fn test_big_integer_is_exact() {
        assert_eq!(
            snapshot("Sum(Range(1, 1000000000))").unwrap(),
            "500000000500000000"
        );
        assert_eq!(
            snapshot("9223372036854775807 * 10").unwrap(),
            "92233720368547758070"
        );
    }

    #[test]
    fn test_envelopes() {
        assert_eq!(
            snapshot("ChangeType('AQID', 'ByteArray')").unwrap(),
            r#"{"type":"bytes","base64":"AQID"}"#
        );
        assert_eq!(
            snapshot("guid('00000000-0000-0000-0000-000000000000')").unwrap(),
            r#"{"type":"guid","value":"00000000-0000-0000-0000-000000000000"}"#
        );
        assert_eq!(
            snapshot("Date('1970-01-01')").unwrap(),
            r#"{"type":"datetime","ticks":621355968000000000}"#
        );
        assert_eq!(
            snapshot("Range(1, 5)").unwrap(),
            r#"{"type":"range","start":1,"count":5}"#
        );
    }

    #[test]
    fn test_collections_keep_insertion_order() {
        assert_eq!(
            snapshot("{Zed: 1, alpha: [1, 'x'], Mid: {n: nil}}").unwrap(),
            r#"{"Zed":1,"alpha":[1,"x"],"Mid":{"n":null}}"#
        );
    }

    #[test]
    fn test_functions() {
        assert!(matches!(snapshot("Range"), Err(Error::TypeMismatch(_))));
        assert_eq!(
            snapshot("[Range, (a, b) => a]").unwrap(),
            r#"[{"type":"function","name":"Range","arity":2},{"type":"function","name":"lambda","arity":2}]"#
        );
    }

    #[test]
    fn test_entry_errors_surface() {
        let err = snapshot("{a: 1 / 0}").unwrap_err();
        assert_eq!(err.code(), crate::evaluator::codes::DIVISION_BY_ZERO);
    }

    #[test]
    fn test_datetime_envelope_accepts_iso() {
        let parsed: Envelope =
            serde_json::from_str(r#"{"type":"datetime","iso":"2020-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(
            parsed,
            Envelope::Datetime {
                ticks: None,
                iso: Some("2020-01-01T00:00:00Z".to_string())
            }
        );
    }
}
