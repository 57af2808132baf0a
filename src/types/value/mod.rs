mod conversion;
mod json;
mod text;

pub use {
    conversion::FromValue,
    text::{IdentifierEscape, Text},
};

/// A single column value.
///
/// # Formatting
/// Values of type `Date`, `Time` and `DateTime` will be put in quotation marks.
/// Values of type `Bytes` will be converted to hex.
/// Use [`Text`] for the plain textual form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Tiny(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    UTiny(u8),
    UShort(u16),
    UInt(u32),
    ULong(u64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    /// year, month, day
    Date(u16, u8, u8),
    /// is negative, days, hours, minutes, seconds, micro seconds
    Time(bool, u32, u8, u8, u8, u32),
    /// year, month, day, hour, minute, second, micro second
    Datetime(u16, u8, u8, u8, u8, u8, u32),
    /// Structured value produced by JSON/list hooks and has-many relations.
    Json(serde_json::Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Number,
    Tiny,
    Short,
    Int,
    Long,
    UTiny,
    UShort,
    UInt,
    ULong,
    Float,
    Double,
    Bytes,
    Date,
    Time,
    Datetime,
    Json,
}

impl Value {
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            Self::UTiny(_) | Self::UShort(_) | Self::UInt(_) | Self::ULong(_)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `true` for `NULL`, numeric zero, empty text and all-zero temporal values.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Tiny(x) => *x == 0,
            Self::Short(x) => *x == 0,
            Self::Int(x) => *x == 0,
            Self::Long(x) => *x == 0,
            Self::UTiny(x) => *x == 0,
            Self::UShort(x) => *x == 0,
            Self::UInt(x) => *x == 0,
            Self::ULong(x) => *x == 0,
            Self::Float(x) => *x == 0.0,
            Self::Double(x) => *x == 0.0,
            Self::Bytes(x) => x.is_empty(),
            Self::Date(y, m, d) => *y == 0 && *m == 0 && *d == 0,
            Self::Time(_, d, h, m, s, us) => *d == 0 && *h == 0 && *m == 0 && *s == 0 && *us == 0,
            Self::Datetime(y, mo, d, h, mi, s, us) => {
                *y == 0 && *mo == 0 && *d == 0 && *h == 0 && *mi == 0 && *s == 0 && *us == 0
            }
            Self::Json(json) => match json {
                serde_json::Value::Null => true,
                serde_json::Value::Bool(x) => !x,
                serde_json::Value::Number(x) => x.as_f64() == Some(0.0),
                serde_json::Value::String(x) => x.is_empty(),
                serde_json::Value::Array(x) => x.is_empty(),
                serde_json::Value::Object(x) => x.is_empty(),
            },
        }
    }

    /// Textual form used to match join keys: `1`, `1u64` and `"1"` all yield `"1"`.
    pub fn to_key_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Json(serde_json::Value::String(x)) => x.clone(),
            x => Text(x).to_string(),
        }
    }

    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::Null)
    }

    pub fn parse<T: FromValue>(self) -> Result<T, crate::error::ParseError> {
        T::from_value(self)
    }
}
