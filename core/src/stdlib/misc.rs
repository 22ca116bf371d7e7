//! Conversions, constructors and diagnostics.
//!
//! `ChangeType`, `guid`, `Date` and `TicksToDate` are the constructors the
//! literal serializer emits for bytes, GUIDs and timestamps, so a snapshot of
//! their results reproduces the original host value.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use num_bigint::BigInt;
use num_traits::FromPrimitive;
use uuid::Uuid;

use crate::{
    evaluator::{EvalError, Evaluator},
    stdlib::{arg, expect_str, invalid, type_error},
    values::{NativeFunction, Value, datetime},
};

pub(super) const FUNCTIONS: &[NativeFunction] = &[
    NativeFunction::new("If", Some(3), misc_if),
    NativeFunction::new("ChangeType", Some(2), misc_change_type),
    NativeFunction::new("guid", Some(1), misc_guid),
    NativeFunction::new("Date", Some(1), misc_date),
    NativeFunction::new("TicksToDate", Some(1), misc_ticks_to_date),
    NativeFunction::new("IsNull", Some(1), misc_is_null),
    NativeFunction::new("log", Some(2), misc_log),
];

/// Function form of `if`; both branches are already evaluated.
fn misc_if(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Bool(true) => Ok(arg(args, 1)),
        Value::Bool(false) | Value::Nil => Ok(arg(args, 2)),
        other => Err(type_error("If", "a Boolean condition", &other)),
    }
}

fn misc_is_null(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(arg(args, 0).is_nil()))
}

fn parse_guid(function: &str, text: &str) -> Result<Value, EvalError> {
    Uuid::parse_str(text.trim())
        .map(Value::Guid)
        .map_err(|e| invalid(function, format!("invalid GUID '{}': {}", text, e)))
}

fn parse_date(function: &str, text: &str) -> Result<Value, EvalError> {
    datetime::parse(text)
        .and_then(|dt| datetime::to_ticks(&dt))
        .map(Value::DateTime)
        .ok_or_else(|| invalid(function, format!("invalid date '{}'", text)))
}

fn ticks_to_date(function: &str, value: &Value) -> Result<Value, EvalError> {
    let ticks = match value {
        Value::Int(t) => *t,
        Value::BigInt(_) => return Err(invalid(function, "ticks out of range")),
        other => return Err(type_error(function, "an Integer tick count", other)),
    };
    if datetime::from_ticks(ticks).is_none() {
        return Err(invalid(function, format!("ticks {} out of range", ticks)));
    }
    Ok(Value::DateTime(ticks))
}

fn misc_guid(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Nil => Ok(Value::Nil),
        value @ Value::Guid(_) => Ok(value),
        other => parse_guid("guid", expect_str("guid", &other)?),
    }
}

fn misc_date(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Nil => Ok(Value::Nil),
        value @ Value::DateTime(_) => Ok(value),
        other => parse_date("Date", expect_str("Date", &other)?),
    }
}

fn misc_ticks_to_date(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Nil => Ok(Value::Nil),
        other => ticks_to_date("TicksToDate", &other),
    }
}

/// `ChangeType(value, "ByteArray" | "Guid" | "DateTime" | "Integer" | "String")`.
fn misc_change_type(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    const NAME: &str = "ChangeType";
    let value = arg(args, 0);
    let target = arg(args, 1);
    let target = expect_str(NAME, &target)?;
    if value.is_nil() {
        return Ok(Value::Nil);
    }

    match target.to_ascii_lowercase().as_str() {
        "bytearray" => match value {
            Value::Bytes(_) => Ok(value),
            Value::String(s) => STANDARD
                .decode(s.trim())
                .map(Value::bytes)
                .map_err(|e| invalid(NAME, format!("invalid base64: {}", e))),
            other => Err(type_error(NAME, "a String", &other)),
        },
        "guid" => match value {
            Value::Guid(_) => Ok(value),
            Value::String(s) => parse_guid(NAME, &s),
            other => Err(type_error(NAME, "a String", &other)),
        },
        "datetime" => match value {
            Value::DateTime(_) => Ok(value),
            Value::String(s) => parse_date(NAME, &s),
            other => ticks_to_date(NAME, &other),
        },
        "integer" => match value {
            Value::Int(_) | Value::BigInt(_) => Ok(value),
            Value::Number(x) if x.is_finite() => BigInt::from_f64(x.trunc())
                .map(Value::integer)
                .ok_or_else(|| invalid(NAME, format!("{x} has no integer value"))),
            Value::DateTime(ticks) => Ok(Value::Int(ticks)),
            Value::Bool(b) => Ok(Value::Int(i64::from(b))),
            Value::String(s) => s
                .trim()
                .parse::<BigInt>()
                .map(Value::integer)
                .map_err(|_| invalid(NAME, format!("'{}' is not an integer", s))),
            other => Err(type_error(NAME, "a convertible value", &other)),
        },
        "string" => Ok(Value::string(ev.render(&value)?)),
        other => Err(invalid(NAME, format!("unknown target type '{}'", other))),
    }
}

/// `log(value)` or `log(value, tag)`: writes one line through the host and
/// returns `value` unchanged.
fn misc_log(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let value = arg(args, 0);
    let text = ev.render(&value)?;
    let line = match arg(args, 1) {
        Value::Nil => text,
        tag => format!("{}: {}", ev.render(&tag)?, text),
    };
    ev.host().log_line(&line);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoHost;
    use crate::{evaluator, parser};
    use pretty_assertions::assert_eq;

    fn eval(source: &str) -> Result<Value, EvalError> {
        let expr = parser::parse(source).unwrap();
        evaluator::eval(&expr, &NoHost, Default::default())
    }

    #[test]
    fn test_if_function() {
        assert_eq!(eval("If(true, 10, 20)").unwrap(), Value::Int(10));
        assert_eq!(eval("If(false, 10, 20)").unwrap(), Value::Int(20));
    }

    #[test]
    fn test_change_type() {
        assert_eq!(eval("ChangeType('AQID', 'ByteArray')").unwrap(), Value::bytes(vec![1u8, 2, 3]));
        assert_eq!(
            eval("ChangeType('00000000-0000-0000-0000-000000000000', 'Guid')").unwrap(),
            Value::Guid(Uuid::nil())
        );
        assert_eq!(
            eval("ChangeType(637134336000000000l, 'DateTime')").unwrap(),
            Value::DateTime(637134336000000000)
        );
        assert_eq!(eval("ChangeType('42', 'Integer')").unwrap(), Value::Int(42));
        assert_eq!(eval("ChangeType(2.9, 'Integer')").unwrap(), Value::Int(2));
        assert_eq!(eval("ChangeType(-2.9, 'Integer')").unwrap(), Value::Int(-2));
        assert_eq!(eval("ChangeType(12, 'String')").unwrap(), Value::string("12"));
    }

    #[test]
    fn test_change_type_keeps_large_floats_exact() {
        assert_eq!(
            eval("ChangeType(1e30, 'Integer')").unwrap().to_string(),
            "1000000000000000019884624838656"
        );
        let beyond_i128 = "ChangeType(1e300, 'Integer') > 170141183460469231731687303715884105727";
        assert_eq!(eval(beyond_i128).unwrap(), Value::Bool(true));
        assert_eq!(
            eval("ChangeType(-1e20, 'Integer')").unwrap().to_string(),
            "-100000000000000000000"
        );
    }

    #[test]
    fn test_change_type_rejects_unknown_target() {
        let err = eval("ChangeType(1, 'Planet')").unwrap_err();
        assert_eq!(err.code(), evaluator::codes::RUNTIME);
    }

    #[test]
    fn test_date_constructors() {
        assert_eq!(
            eval("Date('1970-01-01T00:00:00Z')").unwrap(),
            Value::DateTime(datetime::UNIX_EPOCH_TICKS)
        );
        assert_eq!(
            eval("TicksToDate(621355968000000000)").unwrap(),
            Value::DateTime(datetime::UNIX_EPOCH_TICKS)
        );
        assert!(eval("Date('yesterday')").is_err());
    }

    #[test]
    fn test_is_null() {
        assert_eq!(eval("IsNull(nil)").unwrap(), Value::Bool(true));
        assert_eq!(eval("IsNull(0)").unwrap(), Value::Bool(false));
    }
}
