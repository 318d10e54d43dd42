use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};
use std::fmt::{self, Display};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// Dynamically typed column value.
///
/// Typed variants carry an `Option` so that a NULL coming from a known column keeps its type.
/// `Value::Null` is the untyped NULL. Every NULL compares equal to every other NULL and
/// integers compare equal across widths, keys fetched as `int4` match parameters built from
/// `i64` this way.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
    Json(Option<JsonValue>),
    List(Option<Vec<Value>>, /* type: */ Box<Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.is_null() || other.is_null() {
            return self.is_null() && other.is_null();
        }
        if let (Some(l), Some(r)) = (self.as_i64(), other.as_i64()) {
            return l == r;
        }
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Decimal(l), Self::Decimal(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::TimestampWithTimezone(l), Self::TimestampWithTimezone(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            (Self::Json(l), Self::Json(r)) => l == r,
            (Self::List(l, ..), Self::List(r, ..)) => l == r,
            _ => false,
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null
            | Value::Boolean(None)
            | Value::Int16(None)
            | Value::Int32(None)
            | Value::Int64(None)
            | Value::Float32(None)
            | Value::Float64(None)
            | Value::Decimal(None)
            | Value::Varchar(None)
            | Value::Blob(None)
            | Value::Date(None)
            | Value::Time(None)
            | Value::Timestamp(None)
            | Value::TimestampWithTimezone(None)
            | Value::Uuid(None)
            | Value::Json(None)
            | Value::List(None, ..) => true,
            Value::Json(Some(JsonValue::Null)) => true,
            _ => false,
        }
    }

    /// Integer view of the value, for integer variants and integral decimals.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(Some(v)) => Some(*v as i64),
            Value::Int32(Some(v)) => Some(*v as i64),
            Value::Int64(Some(v)) => Some(*v),
            Value::Decimal(Some(v)) if v.fract().is_zero() => v.to_i64(),
            Value::Json(Some(JsonValue::Number(v))) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(Some(v)) => Some(*v as f64),
            Value::Float64(Some(v)) => Some(*v),
            Value::Decimal(Some(v)) => v.to_f64(),
            Value::Json(Some(JsonValue::Number(v))) => v.as_f64(),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(Some(v)) => Some(v),
            Value::Json(Some(JsonValue::String(v))) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(Some(v)) => Some(*v),
            Value::Json(Some(JsonValue::Bool(v))) => Some(*v),
            _ => None,
        }
    }

    /// Plain serializable representation, the shape returned to callers from `to_json`.
    pub fn to_json(&self) -> JsonValue {
        if self.is_null() {
            return JsonValue::Null;
        }
        match self {
            Value::Boolean(Some(v)) => JsonValue::Bool(*v),
            Value::Int16(Some(v)) => JsonValue::Number((*v).into()),
            Value::Int32(Some(v)) => JsonValue::Number((*v).into()),
            Value::Int64(Some(v)) => JsonValue::Number((*v).into()),
            Value::Float32(Some(v)) => Number::from_f64(*v as f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Float64(Some(v)) => Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Decimal(Some(v)) => JsonValue::String(v.to_string()),
            Value::Varchar(Some(v)) => JsonValue::String(v.clone()),
            Value::Blob(Some(v)) => JsonValue::String(format!("\\x{}", hex::encode(v))),
            Value::Date(Some(v)) => JsonValue::String(v.to_string()),
            Value::Time(Some(v)) => JsonValue::String(v.to_string()),
            Value::Timestamp(Some(v)) => JsonValue::String(v.to_string()),
            Value::TimestampWithTimezone(Some(v)) => {
                JsonValue::String(v.format(&Rfc3339).unwrap_or_else(|_| v.to_string()))
            }
            Value::Uuid(Some(v)) => JsonValue::String(v.to_string()),
            Value::Json(Some(v)) => v.clone(),
            Value::List(Some(v), ..) => JsonValue::Array(v.iter().map(Value::to_json).collect()),
            _ => JsonValue::Null,
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(v) => Value::Boolean(Some(v)),
            JsonValue::Number(v) => {
                if let Some(v) = v.as_i64() {
                    Value::Int64(Some(v))
                } else {
                    Value::Float64(v.as_f64())
                }
            }
            JsonValue::String(v) => Value::Varchar(Some(v)),
            v @ (JsonValue::Array(..) | JsonValue::Object(..)) => Value::Json(Some(v)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("NULL");
        }
        match self.to_json() {
            JsonValue::String(v) => f.write_str(&v),
            v => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use serde_json::json;

    #[test]
    fn integers_compare_across_widths() {
        assert_eq!(Value::Int32(Some(7)), Value::Int64(Some(7)));
        assert_ne!(Value::Int16(Some(7)), Value::Int64(Some(8)));
        assert_eq!(Value::Int32(None), Value::Null);
        assert_ne!(Value::Int32(Some(0)), Value::Null);
    }

    #[test]
    fn json_shape() {
        assert_eq!(Value::Int32(Some(3)).to_json(), json!(3));
        assert_eq!(Value::Varchar(None).to_json(), json!(null));
        assert_eq!(
            Value::Blob(Some(vec![0xde, 0xad].into_boxed_slice())).to_json(),
            json!("\\xdead")
        );
        assert_eq!(Value::from(json!({"a": 1})).to_json(), json!({"a": 1}));
    }
}
