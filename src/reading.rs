//! # Over/under readings
//! Permissive numeric coercion into a tagged number-or-invalid value.
//!
//! Producers are not trusted to send well-formed numbers, so coercion never
//! fails: anything that cannot be read as a number becomes [`OuReading::Invalid`],
//! which is storable and reportable (it serializes as JSON `null`). Downstream
//! code can distinguish a valid zero/negative reading from a failed coercion
//! without relying on NaN propagation.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A coerced over/under reading: either a finite-ish number or the
/// "not a number" sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OuReading {
    Number(f64),
    Invalid,
}

impl OuReading {
    /// Coerce an arbitrary JSON value to a reading.
    ///
    /// Scalars follow loose numeric conversion: `null` is 0, booleans are
    /// 0/1, strings are trimmed and parsed (empty string is 0). Containers
    /// and unparsable strings yield `Invalid`.
    pub fn coerce(value: &Value) -> OuReading {
        match value {
            Value::Null => OuReading::Number(0.0),
            Value::Bool(b) => OuReading::Number(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => match n.as_f64() {
                Some(f) => OuReading::Number(f),
                None => OuReading::Invalid,
            },
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    OuReading::Number(0.0)
                } else {
                    match trimmed.parse::<f64>() {
                        Ok(f) if f.is_finite() => OuReading::Number(f),
                        _ => OuReading::Invalid,
                    }
                }
            }
            Value::Array(_) | Value::Object(_) => OuReading::Invalid,
        }
    }

}

impl Serialize for OuReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            // Whole values go out as integers so `12` stays `12`, not `12.0`.
            OuReading::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                serializer.serialize_i64(n as i64)
            }
            OuReading::Number(n) => serializer.serialize_f64(n),
            OuReading::Invalid => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for OuReading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(OuReading::coerce(&value))
    }
}
