use bytes::{BufMut, BytesMut};
use postgres_types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde_json::Value as JsonValue;
use std::error::Error;
use tessera_core::{AsValue, Value};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

#[derive(Debug)]
pub(crate) struct ValueHolder(pub(crate) Value);

/// Decodes a present column with `T`, a missing one stays a typed null.
fn decode<'a, T: FromSql<'a>>(
    ty: &Type,
    raw: Option<&'a [u8]>,
    variant: impl FnOnce(Option<T>) -> Value,
) -> Result<Value, BoxError> {
    Ok(variant(raw.map(|v| T::from_sql(ty, v)).transpose()?))
}

impl<'a> FromSql<'a> for ValueHolder {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, Some(raw))
    }
    fn from_sql_null(ty: &Type) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, None)
    }
    fn from_sql_nullable(ty: &Type, raw: Option<&'a [u8]>) -> Result<Self, BoxError> {
        let value = match ty.kind() {
            Kind::Domain(inner) => return Self::from_sql_nullable(inner, raw),
            Kind::Enum(..) => decode(ty, raw, Value::Varchar)?,
            Kind::Array(member) => {
                let items = raw
                    .map(|v| Vec::<ValueHolder>::from_sql(ty, v))
                    .transpose()?
                    .map(|v| v.into_iter().map(|v| v.0).collect());
                Value::List(items, Box::new(Self::from_sql_null(member)?.0))
            }
            _ => match *ty {
                Type::BOOL => decode(ty, raw, Value::Boolean)?,
                Type::CHAR => decode(ty, raw, |v: Option<i8>| Value::Int16(v.map(Into::into)))?,
                Type::INT2 => decode(ty, raw, Value::Int16)?,
                Type::INT4 => decode(ty, raw, Value::Int32)?,
                Type::INT8 => decode(ty, raw, Value::Int64)?,
                Type::OID => decode(ty, raw, |v: Option<u32>| Value::Int64(v.map(Into::into)))?,
                Type::FLOAT4 => decode(ty, raw, Value::Float32)?,
                Type::FLOAT8 => decode(ty, raw, Value::Float64)?,
                Type::NUMERIC => decode(ty, raw, Value::Decimal)?,
                Type::VARCHAR
                | Type::TEXT
                | Type::NAME
                | Type::BPCHAR
                | Type::XML
                | Type::UNKNOWN => {
                    decode(ty, raw, Value::Varchar)?
                }
                Type::JSON | Type::JSONB => decode(ty, raw, Value::Json)?,
                Type::BYTEA => {
                    decode(ty, raw, |v: Option<Vec<u8>>| Value::Blob(v.map(Into::into)))?
                }
                Type::DATE => decode(ty, raw, Value::Date)?,
                Type::TIME => decode(ty, raw, Value::Time)?,
                Type::TIMESTAMP => decode(ty, raw, Value::Timestamp)?,
                Type::TIMESTAMPTZ => decode(ty, raw, Value::TimestampWithTimezone)?,
                Type::UUID => decode(ty, raw, Value::Uuid)?,
                _ => match raw {
                    Some(raw) => {
                        return Err(format!(
                            "Cannot decode a `{}` column, value: `{}`",
                            ty,
                            String::from_utf8_lossy(raw)
                        )
                        .into());
                    }
                    None => Value::Null,
                },
            },
        };
        Ok(ValueHolder(value))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Coerces `value` into the type the server expects for the parameter.
fn coerce<T: AsValue>(value: &Value) -> Result<T, BoxError> {
    T::try_from_value(value.clone()).map_err(Into::into)
}

fn json(value: &Value) -> Result<JsonValue, BoxError> {
    Ok(match value {
        Value::Json(Some(v)) => v.clone(),
        Value::Varchar(Some(v)) => serde_json::from_str(v)?,
        v => v.to_json(),
    })
}

impl ToSql for ValueHolder {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError>
    where
        Self: Sized,
    {
        if self.0.is_null() {
            return Ok(IsNull::Yes);
        }
        if let Kind::Domain(inner) = ty.kind() {
            return self.to_sql(inner, out);
        }
        if let (Kind::Enum(..), Some(v)) = (ty.kind(), self.0.as_str()) {
            out.put_slice(v.as_bytes());
            return Ok(IsNull::No);
        }
        match *ty {
            Type::INT2 => return coerce::<i16>(&self.0)?.to_sql(ty, out),
            Type::INT4 => return coerce::<i32>(&self.0)?.to_sql(ty, out),
            Type::INT8 => return coerce::<i64>(&self.0)?.to_sql(ty, out),
            Type::FLOAT4 if self.0.as_f64().is_some() => {
                return self.0.as_f64().map(|v| v as f32).to_sql(ty, out);
            }
            Type::FLOAT8 if self.0.as_f64().is_some() => return self.0.as_f64().to_sql(ty, out),
            Type::NUMERIC => {
                let decimal = match &self.0 {
                    Value::Decimal(v) => *v,
                    Value::Float32(v) => v.and_then(Decimal::from_f32),
                    Value::Float64(v) => v.and_then(Decimal::from_f64),
                    Value::Varchar(Some(v)) => Some(v.parse::<Decimal>()?),
                    v => v.as_i64().map(Decimal::from),
                };
                return decimal.to_sql(ty, out);
            }
            Type::JSON | Type::JSONB => return json(&self.0)?.to_sql(ty, out),
            Type::UUID => return coerce::<Uuid>(&self.0)?.to_sql(ty, out),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                if let Value::Json(Some(v)) = &self.0 {
                    return v.to_string().to_sql(ty, out);
                }
            }
            _ => {}
        }
        match &self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Boolean(v) => v.to_sql(ty, out),
            Value::Int16(v) => v.to_sql(ty, out),
            Value::Int32(v) => v.to_sql(ty, out),
            Value::Int64(v) => v.to_sql(ty, out),
            Value::Float32(v) => v.to_sql(ty, out),
            Value::Float64(v) => v.to_sql(ty, out),
            Value::Decimal(v) => v.to_sql(ty, out),
            Value::Varchar(v) => v.to_sql(ty, out),
            Value::Blob(v) => v.as_deref().to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Time(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::TimestampWithTimezone(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
            Value::List(v, ..) => v
                .as_ref()
                .map(|v| v.iter().cloned().map(ValueHolder).collect::<Vec<_>>())
                .to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool
    where
        Self: Sized,
    {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::ValueHolder;
    use bytes::BytesMut;
    use postgres_types::{FromSql, IsNull, ToSql, Type};
    use tessera_core::Value;

    #[test]
    fn integers_follow_the_parameter_type() {
        let mut out = BytesMut::new();
        let holder = ValueHolder(Value::Int64(Some(7)));
        assert!(matches!(holder.to_sql(&Type::INT4, &mut out), Ok(IsNull::No)));
        assert_eq!(out.as_ref(), 7i32.to_be_bytes());
        let mut out = BytesMut::new();
        let holder = ValueHolder(Value::Int64(Some(1 << 40)));
        assert!(holder.to_sql(&Type::INT2, &mut out).is_err());
    }

    #[test]
    fn nulls() {
        let mut out = BytesMut::new();
        let holder = ValueHolder(Value::Varchar(None));
        assert!(matches!(holder.to_sql(&Type::INT8, &mut out), Ok(IsNull::Yes)));
        let value = ValueHolder::from_sql_null(&Type::INT4).unwrap();
        assert_eq!(value.0, Value::Null);
        assert!(matches!(value.0, Value::Int32(None)));
    }

    #[test]
    fn decode_text() {
        let value = ValueHolder::from_sql(&Type::TEXT, b"tony@stark.com").unwrap();
        assert_eq!(value.0, Value::from("tony@stark.com"));
    }
}
