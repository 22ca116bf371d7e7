//! Plain host-side values and their FuncScript literal spelling.
//!
//! A [`Literal`] owns its data; it is what snapshots decode into and what
//! plain call arguments are written from. Writing is the inverse of
//! evaluation: `eval(literal.to_source()?)` yields an equal value.

use core::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use funcscript_core::values::datetime;
use indexmap::IndexMap;
use num_bigint::BigInt;
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    Guid(Uuid),
    DateTime(DateTime<Utc>),
    Range { start: i64, count: u64 },
    List(Vec<Literal>),
    Map(IndexMap<String, Literal>),
    /// Descriptor of a function seen inside a snapshot. Cannot be written
    /// back as a literal.
    Function { name: String, arity: Option<usize> },
}

const RESERVED_KEYS: &[&str] = &[
    "if", "then", "else", "and", "or", "not", "in", "div", "case", "true", "false", "nil",
    "null", "eval", "return",
];

fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_KEYS.iter().any(|kw| kw.eq_ignore_ascii_case(key))
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

impl Literal {
    /// FuncScript source text that evaluates to this value.
    pub fn to_source(&self) -> Result<String, Error> {
        let mut out = String::new();
        self.write_source(&mut out)?;
        Ok(out)
    }

    fn write_source(&self, out: &mut String) -> Result<(), Error> {
        match self {
            Literal::Nil => out.push_str("nil"),
            Literal::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Literal::Int(i) => {
                let _ = write!(out, "{i}");
            }
            Literal::BigInt(b) => {
                let _ = write!(out, "{b}");
            }
            Literal::Number(x) => {
                if !x.is_finite() {
                    return Err(Error::InvalidLiteral(format!("non-finite number {x}")));
                }
                // `{:?}` keeps a `.0` or an exponent, so the text stays a float.
                let _ = write!(out, "{x:?}");
            }
            Literal::String(s) => write_string(out, s),
            Literal::Bytes(bytes) => {
                out.push_str("ChangeType(");
                write_string(out, &STANDARD.encode(bytes));
                out.push_str(",\"ByteArray\")");
            }
            Literal::Guid(g) => {
                out.push_str("guid(");
                write_string(out, &g.hyphenated().to_string());
                out.push(')');
            }
            Literal::DateTime(dt) => {
                out.push_str("Date(");
                write_string(out, &datetime::to_iso(dt));
                out.push(')');
            }
            Literal::Range { start, count } => {
                let _ = write!(out, "Range({start},{count})");
            }
            Literal::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_source(out)?;
                }
                out.push(']');
            }
            Literal::Map(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if is_bare_key(key) {
                        out.push_str(key);
                    } else {
                        write_string(out, key);
                    }
                    out.push(':');
                    value.write_source(out)?;
                }
                out.push('}');
            }
            Literal::Function { name, .. } => {
                return Err(Error::InvalidLiteral(format!("function '{name}'")));
            }
        }
        Ok(())
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Int(i)
    }
}

impl From<i32> for Literal {
    fn from(i: i32) -> Self {
        Literal::Int(i64::from(i))
    }
}

impl From<f64> for Literal {
    fn from(x: f64) -> Self {
        Literal::Number(x)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<BigInt> for Literal {
    fn from(b: BigInt) -> Self {
        Literal::BigInt(b)
    }
}

impl From<Uuid> for Literal {
    fn from(g: Uuid) -> Self {
        Literal::Guid(g)
    }
}

impl From<DateTime<Utc>> for Literal {
    fn from(dt: DateTime<Utc>) -> Self {
        Literal::DateTime(dt)
    }
}

impl From<IndexMap<String, Literal>> for Literal {
    fn from(map: IndexMap<String, Literal>) -> Self {
        Literal::Map(map)
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(items: Vec<T>) -> Self {
        Literal::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scalars() {
        assert_eq!(Literal::Nil.to_source().unwrap(), "nil");
        assert_eq!(Literal::Bool(false).to_source().unwrap(), "false");
        assert_eq!(Literal::Int(-7).to_source().unwrap(), "-7");
        assert_eq!(Literal::Number(2.0).to_source().unwrap(), "2.0");
        assert_eq!(Literal::Number(0.25).to_source().unwrap(), "0.25");
        assert_eq!(Literal::Number(1e300).to_source().unwrap(), "1e300");
        assert!(matches!(
            Literal::Number(f64::NAN).to_source(),
            Err(Error::InvalidLiteral(_))
        ));
    }

    #[test]
    fn test_string_escapes() {
        let s = Literal::from("a\\b \"q\"\n\r\t{x}");
        assert_eq!(s.to_source().unwrap(), r#""a\\b \"q\"\n\r\t{x}""#);
    }

    #[test]
    fn test_constructor_spellings() {
        assert_eq!(
            Literal::Bytes(vec![1, 2, 3]).to_source().unwrap(),
            r#"ChangeType("AQID","ByteArray")"#
        );
        assert_eq!(
            Literal::Guid(Uuid::nil()).to_source().unwrap(),
            r#"guid("00000000-0000-0000-0000-000000000000")"#
        );
        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(
            Literal::DateTime(epoch).to_source().unwrap(),
            r#"Date("1970-01-01T00:00:00Z")"#
        );
        assert_eq!(
            Literal::Range { start: -1, count: 3 }.to_source().unwrap(),
            "Range(-1,3)"
        );
    }

    #[test]
    fn test_collections() {
        let mut map = IndexMap::new();
        map.insert("plain_key".to_string(), Literal::from(vec![1, 2]));
        map.insert("has space".to_string(), Literal::Nil);
        map.insert("if".to_string(), Literal::Bool(true));
        assert_eq!(
            Literal::Map(map).to_source().unwrap(),
            r#"{plain_key:[1,2],"has space":nil,"if":true}"#
        );
    }

    #[test]
    fn test_functions_have_no_spelling() {
        let f = Literal::Function {
            name: "lambda".to_string(),
            arity: Some(1),
        };
        assert!(matches!(
            Literal::List(vec![f]).to_source(),
            Err(Error::InvalidLiteral(_))
        ));
    }
}
