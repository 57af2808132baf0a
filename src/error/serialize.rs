use {
    crate::types::ValueType,
    std::{convert::Infallible, error, fmt},
};

/// Converting a Rust value into a [`Value`](crate::types::Value) failed.
#[derive(Debug)]
pub enum SerializeError {
    Infallible,
    InvalidValue(ValueType, Box<dyn fmt::Debug + Send + Sync>),
    Json(serde_json::Error),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infallible => f.write_str("infallible"),
            Self::InvalidValue(target, value) => {
                write!(f, "{value:?} cannot be stored as {target:?}")
            }
            Self::Json(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl error::Error for SerializeError {}

impl From<Infallible> for SerializeError {
    fn from(_value: Infallible) -> Self {
        Self::Infallible
    }
}

impl From<serde_json::Error> for SerializeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
