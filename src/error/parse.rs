use {
    crate::types::{Value, ValueType},
    std::{error, fmt, string::FromUtf8Error},
};

pub struct WrongValue(pub ValueType, pub Value);

impl fmt::Debug for WrongValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrongValue")
            .field("expected", &self.0)
            .field("got", &self.1)
            .finish()
    }
}

/// Converting a [`Value`] or a [`Row`](crate::types::Row) into a Rust type failed.
#[derive(Debug)]
pub enum ParseError {
    MissingField(String),
    WrongValue(WrongValue),
    InvalidValue(ValueType, String),
    ValueOutOfBounds(Value),
    FromUtf8(FromUtf8Error),
    Json(serde_json::Error),
}

impl ParseError {
    pub fn wrong_value(expected: ValueType, got: Value) -> Self {
        Self::WrongValue(WrongValue(expected, got))
    }

    pub fn invalid_value(expected: ValueType, text: &[u8]) -> Self {
        Self::InvalidValue(expected, String::from_utf8_lossy(text).into_owned())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing field `{field}`"),
            Self::WrongValue(WrongValue(expected, got)) => {
                write!(f, "expected {expected:?}, got {got:?}")
            }
            Self::InvalidValue(expected, text) => write!(f, "{text:?} is not a valid {expected:?}"),
            Self::ValueOutOfBounds(value) => write!(f, "value {value:?} is out of bounds"),
            Self::FromUtf8(err) => fmt::Display::fmt(err, f),
            Self::Json(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl error::Error for ParseError {}

impl From<FromUtf8Error> for ParseError {
    fn from(value: FromUtf8Error) -> Self {
        ParseError::FromUtf8(value)
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(value: serde_json::Error) -> Self {
        ParseError::Json(value)
    }
}
