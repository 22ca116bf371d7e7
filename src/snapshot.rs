//! Decoding JSON snapshots into [`Literal`]s.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use funcscript_core::bridge::Envelope;
use funcscript_core::values::datetime;
use indexmap::IndexMap;
use num_bigint::BigInt;
use serde_json::{Map, Number, Value as Json};
use uuid::Uuid;

use crate::{Error, Literal};

/// Decode a snapshot produced by the engine.
///
/// Objects shaped like an envelope (`{"type": "bytes", "base64": ..}` and
/// friends) decode to the value they describe; every other object becomes a
/// map.
pub fn decode(json: &Json) -> Result<Literal, Error> {
    Ok(match json {
        Json::Null => Literal::Nil,
        Json::Bool(b) => Literal::Bool(*b),
        Json::Number(n) => number(n)?,
        Json::String(s) => Literal::String(s.clone()),
        Json::Array(items) => Literal::List(items.iter().map(decode).collect::<Result<_, _>>()?),
        Json::Object(object) => match envelope(object) {
            Some(envelope) => from_envelope(envelope)?,
            None => {
                let mut map = IndexMap::with_capacity(object.len());
                for (key, value) in object {
                    map.insert(key.clone(), decode(value)?);
                }
                Literal::Map(map)
            }
        },
    })
}

/// Parse snapshot text.
pub fn decode_str(text: &str) -> Result<Literal, Error> {
    let json: Json = serde_json::from_str(text).map_err(|e| Error::Snapshot(e.to_string()))?;
    decode(&json)
}

fn number(n: &Number) -> Result<Literal, Error> {
    if let Some(i) = n.as_i64() {
        return Ok(Literal::Int(i));
    }
    let text = n.to_string();
    if !text.contains(['.', 'e', 'E']) {
        let big = text
            .parse::<BigInt>()
            .map_err(|e| Error::Snapshot(format!("integer {text}: {e}")))?;
        return Ok(Literal::BigInt(big));
    }
    n.as_f64()
        .map(Literal::Number)
        .ok_or_else(|| Error::Snapshot(format!("number {text} out of range")))
}

fn envelope(object: &Map<String, Json>) -> Option<Envelope> {
    if !object.get("type").is_some_and(Json::is_string) || object.len() > 3 {
        return None;
    }
    serde_json::from_value(Json::Object(object.clone())).ok()
}

fn from_envelope(envelope: Envelope) -> Result<Literal, Error> {
    Ok(match envelope {
        Envelope::Bytes { base64 } => Literal::Bytes(
            STANDARD
                .decode(base64.as_bytes())
                .map_err(|e| Error::Snapshot(format!("bytes: {e}")))?,
        ),
        Envelope::Guid { value } => Literal::Guid(
            Uuid::parse_str(&value).map_err(|e| Error::Snapshot(format!("guid: {e}")))?,
        ),
        Envelope::Datetime { ticks, iso } => {
            let parsed = match (ticks, iso) {
                (Some(ticks), _) => datetime::from_ticks(ticks),
                (None, Some(iso)) => datetime::parse(&iso),
                (None, None) => None,
            };
            Literal::DateTime(
                parsed.ok_or_else(|| Error::Snapshot("datetime out of range".to_string()))?,
            )
        }
        Envelope::Range { start, count } => Literal::Range { start, count },
        Envelope::Function { name, arity } => Literal::Function { name, arity },
    })
}
