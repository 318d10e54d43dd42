use crate::{Error, Result, Value};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde_json::Value as JsonValue;
use std::any;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamic [`Value`].
///
/// `as_value` wraps the native value into its canonical variant. `try_from_value` accepts the
/// canonical variant and, where lossless, neighbouring ones (any integer width for integers,
/// text for uuids).
///
/// ```rust
/// use tessera_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue: Sized {
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert `{:?}` into `{}`",
        value,
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value_integer {
    ($($ty:ty => $variant:path),+ $(,)?) => {
        $(
            impl AsValue for $ty {
                fn as_value(self) -> Value {
                    $variant(Some(self))
                }
                fn try_from_value(value: Value) -> Result<Self> {
                    if let Some(v) = value.as_i64() {
                        return <$ty>::try_from(v).map_err(|_| {
                            Error::msg(format!(
                                "Value `{}` is out of range for `{}`",
                                v,
                                any::type_name::<$ty>()
                            ))
                        });
                    }
                    if let Some(v) = value.as_str() {
                        return v.trim().parse::<$ty>().map_err(|_| mismatch::<$ty>(&value));
                    }
                    Err(mismatch::<$ty>(&value))
                }
            }
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    value.as_value()
                }
            }
        )+
    };
}
impl_as_value_integer!(
    i16 => Value::Int16,
    i32 => Value::Int32,
    i64 => Value::Int64,
);

macro_rules! impl_as_value_float {
    ($($ty:ty => $variant:path),+ $(,)?) => {
        $(
            impl AsValue for $ty {
                fn as_value(self) -> Value {
                    $variant(Some(self))
                }
                fn try_from_value(value: Value) -> Result<Self> {
                    value
                        .as_f64()
                        .map(|v| v as $ty)
                        .ok_or_else(|| mismatch::<$ty>(&value))
                }
            }
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    value.as_value()
                }
            }
        )+
    };
}
impl_as_value_float!(
    f32 => Value::Float32,
    f64 => Value::Float64,
);

macro_rules! impl_as_value_exact {
    ($($ty:ty => $variant:path),+ $(,)?) => {
        $(
            impl AsValue for $ty {
                fn as_value(self) -> Value {
                    $variant(Some(self))
                }
                fn try_from_value(value: Value) -> Result<Self> {
                    match value {
                        $variant(Some(v)) => Ok(v),
                        _ => Err(mismatch::<$ty>(&value)),
                    }
                }
            }
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    value.as_value()
                }
            }
        )+
    };
}
impl_as_value_exact!(
    Date => Value::Date,
    Time => Value::Time,
    PrimitiveDateTime => Value::Timestamp,
    OffsetDateTime => Value::TimestampWithTimezone,
);

impl AsValue for bool {
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch::<bool>(&value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        value.as_value()
    }
}

impl AsValue for String {
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            Value::Json(Some(JsonValue::String(v))) => Ok(v),
            _ => Err(mismatch::<String>(&value)),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.to_owned()))
    }
}

impl AsValue for Decimal {
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Decimal(Some(v)) => Ok(*v),
            Value::Float32(Some(v)) => {
                Decimal::from_f32(*v).ok_or_else(|| mismatch::<Self>(&value))
            }
            Value::Float64(Some(v)) => {
                Decimal::from_f64(*v).ok_or_else(|| mismatch::<Self>(&value))
            }
            Value::Varchar(Some(v)) => v.parse().map_err(|_| mismatch::<Self>(&value)),
            _ => value
                .as_i64()
                .map(Decimal::from)
                .ok_or_else(|| mismatch::<Self>(&value)),
        }
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        value.as_value()
    }
}

impl AsValue for Uuid {
    fn as_value(self) -> Value {
        Value::Uuid(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Uuid(Some(v)) => Ok(*v),
            Value::Varchar(Some(v)) => Uuid::parse_str(v).map_err(|_| mismatch::<Self>(&value)),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        value.as_value()
    }
}

impl AsValue for JsonValue {
    fn as_value(self) -> Value {
        Value::Json(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(match value {
            Value::Json(Some(v)) => v,
            v => v.to_json(),
        })
    }
}

impl AsValue for Vec<u8> {
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v.into_vec()),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for Value {
    fn as_value(self) -> Value {
        self
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(
            Some(value.into_iter().map(Into::into).collect()),
            Box::new(Value::Null),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::AsValue;
    use crate::Value;

    #[test]
    fn integers_accept_other_widths() {
        assert_eq!(i32::try_from_value(Value::Int64(Some(12))).unwrap(), 12);
        assert_eq!(i64::try_from_value(Value::Int16(Some(-3))).unwrap(), -3);
        assert!(i16::try_from_value(Value::Int64(Some(1 << 40))).is_err());
        assert!(i32::try_from_value(Value::Boolean(Some(true))).is_err());
    }

    #[test]
    fn options_map_null() {
        assert_eq!(Option::<i32>::try_from_value(Value::Int32(None)).unwrap(), None);
        assert_eq!(
            Option::<String>::try_from_value(Value::from("steve")).unwrap(),
            Some("steve".to_string())
        );
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }
}
