//! Mapping between [`Value`] and OSC message arguments.
//!
//! Tabs encode to OSC arrays; maps encode to arrays alternating
//! `[key, value, key, value, ...]` with string keys. Decoding reverses
//! this with a heuristic: a non-empty, even-length array whose
//! even-index elements are all strings is read back as a map, anything
//! else as a tab. The heuristic is part of the wire contract — a tab
//! that happens to match it decodes as a map, and the engine side
//! expects exactly that behavior.

use std::fmt;

use antescofo_types::{Map, Tab, Value};
use rosc::{OscArray, OscType};

/// An inbound OSC argument that has no [`Value`] representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    Unsupported(&'static str),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Unsupported(kind) => {
                write!(f, "unsupported OSC argument type: {}", kind)
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Encode one value as an OSC argument.
///
/// Scalars keep the narrow 32-bit OSC types when the value is exactly
/// representable there, and widen to long/double otherwise, so that
/// `from_osc(to_osc(v))` reproduces `v` for every scalar.
pub fn to_osc(value: &Value) -> OscType {
    match value {
        Value::Int(i) => match i32::try_from(*i) {
            Ok(narrow) => OscType::Int(narrow),
            Err(_) => OscType::Long(*i),
        },
        Value::Float(v) => {
            let narrow = *v as f32;
            if narrow as f64 == *v {
                OscType::Float(narrow)
            } else {
                OscType::Double(*v)
            }
        }
        Value::Str(s) => OscType::String(s.clone()),
        Value::Tab(tab) => OscType::Array(OscArray {
            content: tab.iter().map(to_osc).collect(),
        }),
        Value::Map(map) => {
            let mut content = Vec::with_capacity(map.len() * 2);
            for (key, value) in map.iter() {
                content.push(OscType::String(key.clone()));
                content.push(to_osc(value));
            }
            OscType::Array(OscArray { content })
        }
    }
}

/// Encode a value slice as an OSC argument list.
pub fn encode_args(args: &[Value]) -> Vec<OscType> {
    args.iter().map(to_osc).collect()
}

/// Decode one OSC argument into a value.
pub fn from_osc(arg: OscType) -> Result<Value, CodecError> {
    match arg {
        OscType::Int(i) => Ok(Value::Int(i as i64)),
        OscType::Long(i) => Ok(Value::Int(i)),
        OscType::Float(v) => Ok(Value::Float(v as f64)),
        OscType::Double(v) => Ok(Value::Float(v)),
        OscType::String(s) => Ok(Value::Str(s)),
        OscType::Bool(b) => Ok(Value::Int(b as i64)),
        OscType::Char(c) => Ok(Value::Str(c.to_string())),
        OscType::Array(array) => decode_array(array.content),
        OscType::Blob(_) => Err(CodecError::Unsupported("blob")),
        OscType::Time(_) => Err(CodecError::Unsupported("timetag")),
        OscType::Midi(_) => Err(CodecError::Unsupported("midi")),
        OscType::Color(_) => Err(CodecError::Unsupported("color")),
        OscType::Nil => Err(CodecError::Unsupported("nil")),
        OscType::Inf => Err(CodecError::Unsupported("infinitum")),
    }
}

/// Decode a full OSC argument list.
pub fn decode_args(args: Vec<OscType>) -> Result<Vec<Value>, CodecError> {
    args.into_iter().map(from_osc).collect()
}

fn decode_array(content: Vec<OscType>) -> Result<Value, CodecError> {
    if looks_like_flattened_map(&content) {
        let mut map = Map::new();
        let mut args = content.into_iter();
        while let Some(key) = args.next() {
            let value = match args.next() {
                Some(value) => value,
                None => break,
            };
            // Even-index elements are all strings, checked above.
            if let OscType::String(key) = key {
                map.insert(key, from_osc(value)?);
            }
        }
        return Ok(Value::Map(map));
    }

    let mut tab = Tab::new();
    for element in content {
        tab.push(from_osc(element)?);
    }
    Ok(Value::Tab(tab))
}

// Empty arrays never qualify: they decode to an empty tab.
fn looks_like_flattened_map(content: &[OscType]) -> bool {
    !content.is_empty()
        && content.len() % 2 == 0
        && content
            .iter()
            .step_by(2)
            .all(|element| matches!(element, OscType::String(_)))
}
