use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// A stored conversion. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub amount: Option<f64>,
    pub result: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewConversion {
    pub kind: Option<String>,
    pub amount: Option<f64>,
    pub result: Option<f64>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CastError {
    #[error("cannot cast {value} to string for field `{field}`")]
    Text { field: &'static str, value: String },
    #[error("cannot cast {value} to number for field `{field}`")]
    Number { field: &'static str, value: String },
}

/// Field names accepted on the wire, with their legacy aliases.
pub const KIND_FIELD: (&str, &str) = ("type", "tipo");
pub const AMOUNT_FIELD: (&str, &str) = ("amount", "cantidad");
pub const RESULT_FIELD: (&str, &str) = ("result", "resultado");

impl NewConversion {
    /// Builds a conversion from an arbitrary JSON body.
    ///
    /// Absent and null fields stay `None`. Scalars are coerced the way a
    /// loosely typed document schema would: numbers and booleans become
    /// strings for `type`, numeric strings become numbers for `amount` and
    /// `result`. A body that is not an object yields an empty conversion.
    pub fn from_payload(payload: &JsonValue) -> Result<Self, CastError> {
        let Some(obj) = payload.as_object() else {
            return Ok(Self::default());
        };

        Ok(NewConversion {
            kind: cast_text(KIND_FIELD.0, lookup(obj, KIND_FIELD))?,
            amount: cast_number(AMOUNT_FIELD.0, lookup(obj, AMOUNT_FIELD))?,
            result: cast_number(RESULT_FIELD.0, lookup(obj, RESULT_FIELD))?,
        })
    }
}

fn lookup<'a>(obj: &'a Map<String, JsonValue>, (name, alias): (&str, &str)) -> Option<&'a JsonValue> {
    obj.get(name).or_else(|| obj.get(alias))
}

fn cast_text(field: &'static str, value: Option<&JsonValue>) -> Result<Option<String>, CastError> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(JsonValue::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(CastError::Text {
            field,
            value: other.to_string(),
        }),
    }
}

fn cast_number(field: &'static str, value: Option<&JsonValue>) -> Result<Option<f64>, CastError> {
    let fail = |v: &JsonValue| CastError::Number {
        field,
        value: v.to_string(),
    };

    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Bool(b)) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Some(v @ JsonValue::Number(n)) => n.as_f64().map(Some).ok_or_else(|| fail(v)),
        Some(JsonValue::String(s)) if s.is_empty() => Ok(None),
        Some(v @ JsonValue::String(s)) => parse_numeric(s).map(Some).ok_or_else(|| fail(v)),
        Some(other) => Err(fail(other)),
    }
}

/// Parses a numeric literal the way a JavaScript `Number()` call would:
/// surrounding whitespace is ignored, a blank string is zero and unsigned
/// `0x`/`0o`/`0b` prefixes select a radix. Non-finite results are rejected.
fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let radix = match trimmed.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };

    let n = match radix {
        Some(_) if trimmed[2..].starts_with('+') => return None,
        Some(radix) => u64::from_str_radix(&trimmed[2..], radix).ok()? as f64,
        None => trimmed.parse::<f64>().ok()?,
    };

    n.is_finite().then_some(n)
}
