use crate::{Error, MappingError, Result, Value, truncate_long};
use atoi::FromRadix10SignedChecked;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::{any, str::FromStr};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, format_description::well_known::Rfc3339,
    macros::format_description,
};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// # Coercion order
/// `try_from_value` applies a fixed precedence:
/// 1. the canonical variant of the type is taken as is;
/// 2. textual values are parsed according to the target kind ([`AsValue::parse`]);
/// 3. other values go through a generic conversion (numeric widening or narrowing with
///    range checks, booleans from integers, dates from timestamps, ...).
///
/// Anything left is a [`MappingError::DataShape`] naming both the source variant and the
/// target type.
///
/// ```rust
/// use quarry_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(Value::Varchar(Some("42".into()))).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// The typed null of this type, also used as the type prototype of members.
    fn as_empty_value() -> Value;
    /// Convert into the owned [`Value`] representation.
    fn as_value(self) -> Value;
    /// Convert a dynamic value into `Self` following the coercion order.
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    /// Parse the whole input as `Self`.
    fn parse(input: impl AsRef<str>) -> Result<Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot parse `{}` as {}",
            truncate_long!(input.as_ref()),
            any::type_name::<Self>()
        )))
    }
}

/// Builds the data shape error for a failed conversion of `value` into `T`.
pub fn conversion_error<T>(value: &Value, message: impl Into<String>) -> Error {
    MappingError::DataShape {
        member: String::new(),
        source_type: value.type_name().into(),
        target: any::type_name::<T>().into(),
        message: message.into(),
    }
    .into()
}

fn parse_error<T>(input: &str) -> Error {
    conversion_error::<T>(
        &Value::Varchar(None),
        format!("`{}` is not a valid literal", truncate_long!(input)),
    )
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                let wide: i128 = match &value {
                    $destination(Some(v)) => return Ok(*v),
                    Value::Varchar(Some(v)) => return Self::parse(v),
                    Value::Char(Some(v)) => return Self::parse(v.encode_utf8(&mut [0; 4])),
                    Value::Boolean(Some(v)) => *v as i128,
                    #[allow(unreachable_patterns)]
                    Value::Int8(Some(v)) => *v as i128,
                    #[allow(unreachable_patterns)]
                    Value::Int16(Some(v)) => *v as i128,
                    #[allow(unreachable_patterns)]
                    Value::Int32(Some(v)) => *v as i128,
                    #[allow(unreachable_patterns)]
                    Value::Int64(Some(v)) => *v as i128,
                    #[allow(unreachable_patterns)]
                    Value::UInt8(Some(v)) => *v as i128,
                    #[allow(unreachable_patterns)]
                    Value::UInt16(Some(v)) => *v as i128,
                    #[allow(unreachable_patterns)]
                    Value::UInt32(Some(v)) => *v as i128,
                    #[allow(unreachable_patterns)]
                    Value::UInt64(Some(v)) => *v as i128,
                    Value::Float32(Some(v)) if v.fract() == 0.0 => *v as i128,
                    Value::Float64(Some(v)) if v.fract() == 0.0 => *v as i128,
                    Value::Decimal(Some(v)) if v.fract().is_zero() => match v.to_i128() {
                        Some(v) => v,
                        None => return Err(conversion_error::<Self>(&value, "out of range")),
                    },
                    v if v.is_null() => {
                        return Err(conversion_error::<Self>(&value, "the value is null"));
                    }
                    _ => {
                        return Err(conversion_error::<Self>(&value, "unsupported conversion"));
                    }
                };
                <$source>::try_from(wide).map_err(|_| {
                    conversion_error::<Self>(&value, format!("{wide} is out of range"))
                })
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                let input = input.as_ref().trim();
                match <$source>::from_radix_10_signed_checked(input.as_bytes()) {
                    (Some(v), len) if len > 0 && len == input.len() => Ok(v),
                    _ => Err(parse_error::<Self>(input)),
                }
            }
        }
    };
}

impl_as_value_integer!(i8, Value::Int8);
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);
impl_as_value_integer!(u8, Value::UInt8);
impl_as_value_integer!(u16, Value::UInt16);
impl_as_value_integer!(u32, Value::UInt32);
impl_as_value_integer!(u64, Value::UInt64);

macro_rules! impl_as_value_float {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match &value {
                    $destination(Some(v)) => Ok(*v),
                    Value::Varchar(Some(v)) => Self::parse(v),
                    #[allow(unreachable_patterns)]
                    Value::Float32(Some(v)) => Ok(*v as _),
                    #[allow(unreachable_patterns)]
                    Value::Float64(Some(v)) => Ok(*v as _),
                    Value::Int8(Some(v)) => Ok(*v as _),
                    Value::Int16(Some(v)) => Ok(*v as _),
                    Value::Int32(Some(v)) => Ok(*v as _),
                    Value::Int64(Some(v)) => Ok(*v as _),
                    Value::UInt8(Some(v)) => Ok(*v as _),
                    Value::UInt16(Some(v)) => Ok(*v as _),
                    Value::UInt32(Some(v)) => Ok(*v as _),
                    Value::UInt64(Some(v)) => Ok(*v as _),
                    Value::Decimal(Some(v)) => v
                        .to_f64()
                        .map(|v| v as _)
                        .ok_or_else(|| conversion_error::<Self>(&value, "out of range")),
                    v if v.is_null() => Err(conversion_error::<Self>(&value, "the value is null")),
                    _ => Err(conversion_error::<Self>(&value, "unsupported conversion")),
                }
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                let input = input.as_ref().trim();
                fast_float::parse::<$source, _>(input).map_err(|_| parse_error::<Self>(input))
            }
        }
    };
}

impl_as_value_float!(f32, Value::Float32);
impl_as_value_float!(f64, Value::Float64);

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Boolean(Some(v)) => Ok(*v),
            Value::Varchar(Some(v)) => Self::parse(v),
            Value::Char(Some(v)) => Self::parse(v.encode_utf8(&mut [0; 4])),
            Value::Int8(Some(v)) => Ok(*v != 0),
            Value::Int16(Some(v)) => Ok(*v != 0),
            Value::Int32(Some(v)) => Ok(*v != 0),
            Value::Int64(Some(v)) => Ok(*v != 0),
            Value::UInt8(Some(v)) => Ok(*v != 0),
            Value::UInt16(Some(v)) => Ok(*v != 0),
            Value::UInt32(Some(v)) => Ok(*v != 0),
            Value::UInt64(Some(v)) => Ok(*v != 0),
            v if v.is_null() => Err(conversion_error::<Self>(&value, "the value is null")),
            _ => Err(conversion_error::<Self>(&value, "unsupported conversion")),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        const TRUE: [&str; 5] = ["true", "t", "yes", "y", "1"];
        const FALSE: [&str; 5] = ["false", "f", "no", "n", "0"];
        if TRUE.iter().any(|v| v.eq_ignore_ascii_case(input)) {
            Ok(true)
        } else if FALSE.iter().any(|v| v.eq_ignore_ascii_case(input)) {
            Ok(false)
        } else {
            Err(parse_error::<Self>(input))
        }
    }
}

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None)
    }
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        let result = match &value {
            Value::Decimal(Some(v)) => return Ok(*v),
            Value::Varchar(Some(v)) => return Self::parse(v),
            Value::Int8(Some(v)) => Some(Decimal::from(*v)),
            Value::Int16(Some(v)) => Some(Decimal::from(*v)),
            Value::Int32(Some(v)) => Some(Decimal::from(*v)),
            Value::Int64(Some(v)) => Some(Decimal::from(*v)),
            Value::UInt8(Some(v)) => Some(Decimal::from(*v)),
            Value::UInt16(Some(v)) => Some(Decimal::from(*v)),
            Value::UInt32(Some(v)) => Some(Decimal::from(*v)),
            Value::UInt64(Some(v)) => Some(Decimal::from(*v)),
            Value::Float32(Some(v)) => Decimal::from_f32(*v),
            Value::Float64(Some(v)) => Decimal::from_f64(*v),
            v if v.is_null() => {
                return Err(conversion_error::<Self>(&value, "the value is null"));
            }
            _ => return Err(conversion_error::<Self>(&value, "unsupported conversion")),
        };
        result.ok_or_else(|| conversion_error::<Self>(&value, "out of range"))
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        Decimal::from_str(input)
            .or_else(|_| Decimal::from_scientific(input))
            .map_err(|_| parse_error::<Self>(input))
    }
}

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            Value::Char(Some(v)) => Ok(v.into()),
            Value::Blob(..) => Err(conversion_error::<Self>(&value, "unsupported conversion")),
            ref v if v.is_null() => Err(conversion_error::<Self>(&value, "the value is null")),
            v => Ok(v.to_string()),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        Ok(input.as_ref().into())
    }
}

impl AsValue for char {
    fn as_empty_value() -> Value {
        Value::Char(None)
    }
    fn as_value(self) -> Value {
        Value::Char(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Char(Some(v)) => Ok(*v),
            Value::Varchar(Some(v)) => Self::parse(v),
            v if v.is_null() => Err(conversion_error::<Self>(&value, "the value is null")),
            _ => Err(conversion_error::<Self>(&value, "unsupported conversion")),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref();
        let mut chars = input.chars();
        match (chars.next(), chars.next()) {
            (Some(v), None) => Ok(v),
            _ => Err(parse_error::<Self>(input)),
        }
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v.into_vec()),
            Value::Varchar(Some(v)) => Ok(v.into_bytes()),
            Value::Uuid(Some(v)) => Ok(v.as_bytes().to_vec()),
            ref v if v.is_null() => Err(conversion_error::<Self>(&value, "the value is null")),
            _ => Err(conversion_error::<Self>(&value, "unsupported conversion")),
        }
    }
}

impl AsValue for Date {
    fn as_empty_value() -> Value {
        Value::Date(None)
    }
    fn as_value(self) -> Value {
        Value::Date(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Date(Some(v)) => Ok(*v),
            Value::Varchar(Some(v)) => <Self as AsValue>::parse(v),
            Value::Timestamp(Some(v)) => Ok(v.date()),
            Value::TimestampWithTimezone(Some(v)) => Ok(v.date()),
            v if v.is_null() => Err(conversion_error::<Self>(&value, "the value is null")),
            _ => Err(conversion_error::<Self>(&value, "unsupported conversion")),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        Date::parse(input, format_description!("[year]-[month]-[day]"))
            .map_err(|_| parse_error::<Self>(input))
    }
}

impl AsValue for Time {
    fn as_empty_value() -> Value {
        Value::Time(None)
    }
    fn as_value(self) -> Value {
        Value::Time(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Time(Some(v)) => Ok(*v),
            Value::Varchar(Some(v)) => <Self as AsValue>::parse(v),
            Value::Timestamp(Some(v)) => Ok(v.time()),
            v if v.is_null() => Err(conversion_error::<Self>(&value, "the value is null")),
            _ => Err(conversion_error::<Self>(&value, "unsupported conversion")),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        Time::parse(input, format_description!("[hour]:[minute]:[second].[subsecond]"))
            .or_else(|_| Time::parse(input, format_description!("[hour]:[minute]:[second]")))
            .or_else(|_| Time::parse(input, format_description!("[hour]:[minute]")))
            .map_err(|_| parse_error::<Self>(input))
    }
}

impl AsValue for PrimitiveDateTime {
    fn as_empty_value() -> Value {
        Value::Timestamp(None)
    }
    fn as_value(self) -> Value {
        Value::Timestamp(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Timestamp(Some(v)) => Ok(*v),
            Value::Varchar(Some(v)) => <Self as AsValue>::parse(v),
            Value::Date(Some(v)) => Ok(v.midnight()),
            Value::TimestampWithTimezone(Some(v)) => {
                let utc = v.to_offset(time::UtcOffset::UTC);
                Ok(PrimitiveDateTime::new(utc.date(), utc.time()))
            }
            v if v.is_null() => Err(conversion_error::<Self>(&value, "the value is null")),
            _ => Err(conversion_error::<Self>(&value, "unsupported conversion")),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        let formats = [
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        ];
        formats
            .iter()
            .find_map(|format| PrimitiveDateTime::parse(input, format).ok())
            .or_else(|| Date::parse(input, format_description!("[year]-[month]-[day]")).ok().map(Date::midnight))
            .ok_or_else(|| parse_error::<Self>(input))
    }
}

impl AsValue for OffsetDateTime {
    fn as_empty_value() -> Value {
        Value::TimestampWithTimezone(None)
    }
    fn as_value(self) -> Value {
        Value::TimestampWithTimezone(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::TimestampWithTimezone(Some(v)) => Ok(*v),
            Value::Varchar(Some(v)) => <Self as AsValue>::parse(v),
            Value::Timestamp(Some(v)) => Ok(v.assume_utc()),
            v if v.is_null() => Err(conversion_error::<Self>(&value, "the value is null")),
            _ => Err(conversion_error::<Self>(&value, "unsupported conversion")),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        OffsetDateTime::parse(input, &Rfc3339).map_err(|_| parse_error::<Self>(input))
    }
}

impl AsValue for Uuid {
    fn as_empty_value() -> Value {
        Value::Uuid(None)
    }
    fn as_value(self) -> Value {
        Value::Uuid(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Uuid(Some(v)) => Ok(*v),
            Value::Varchar(Some(v)) => Self::parse(v),
            Value::Blob(Some(v)) => {
                Uuid::from_slice(v).map_err(|e| conversion_error::<Self>(&value, e.to_string()))
            }
            v if v.is_null() => Err(conversion_error::<Self>(&value, "the value is null")),
            _ => Err(conversion_error::<Self>(&value, "unsupported conversion")),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        Uuid::parse_str(input).map_err(|_| parse_error::<Self>(input))
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::try_from_value(value).map(Some)
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        T::parse(input).map(Some)
    }
}

impl<T: AsValue> AsValue for Box<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        (*self).as_value()
    }
    fn try_from_value(value: Value) -> Result<Self> {
        T::try_from_value(value).map(Box::new)
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        T::parse(input).map(Box::new)
    }
}

/// Implements [`AsValue`] for a fieldless enum.
///
/// The enum is stored as its `Int32` discriminant. Textual values are matched against the
/// variant names (case-insensitive) and then against the integer text.
///
/// ```rust
/// use quarry_core::{AsValue, Value, impl_as_value_enum};
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Status { Active = 1, Suspended = 2 }
/// impl_as_value_enum!(Status { Active, Suspended });
/// let parsed = Status::try_from_value(Value::Varchar(Some("suspended".into()))).unwrap();
/// assert_eq!(parsed, Status::Suspended);
/// ```
#[macro_export]
macro_rules! impl_as_value_enum {
    ($enum:ty { $($variant:ident),+ $(,)? }) => {
        impl $crate::AsValue for $enum {
            fn as_empty_value() -> $crate::Value {
                $crate::Value::Int32(None)
            }
            fn as_value(self) -> $crate::Value {
                $crate::Value::Int32(Some(self as i32))
            }
            fn try_from_value(value: $crate::Value) -> $crate::Result<Self> {
                if let Some(text) = value.as_text() {
                    return <Self as $crate::AsValue>::parse(text);
                }
                let source = value.clone();
                let discriminant = <i32 as $crate::AsValue>::try_from_value(value)?;
                $(
                    if discriminant == <$enum>::$variant as i32 {
                        return Ok(<$enum>::$variant);
                    }
                )+
                Err($crate::conversion_error::<Self>(
                    &source,
                    format!("{} is not a valid discriminant", discriminant),
                ))
            }
            fn parse(input: impl AsRef<str>) -> $crate::Result<Self> {
                let input = input.as_ref().trim();
                $(
                    if input.eq_ignore_ascii_case(stringify!($variant)) {
                        return Ok(<$enum>::$variant);
                    }
                )+
                let text = $crate::Value::Varchar(Some(input.to_owned()));
                match <i32 as $crate::AsValue>::parse(input) {
                    $(
                        Ok(v) if v == <$enum>::$variant as i32 => Ok(<$enum>::$variant),
                    )+
                    _ => Err($crate::conversion_error::<Self>(
                        &text,
                        format!("`{}` does not name a variant", input),
                    )),
                }
            }
        }
    };
}
