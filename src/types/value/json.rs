use {
    super::{FromValue, Text, Value},
    crate::error::ParseError,
};

/// Key of the single-entry object that carries non UTF-8 bytes in JSON.
const BYTES_TAG: &str = "$bytes";

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(x) => x.into(),
            serde_json::Value::Number(x) => {
                if let Some(x) = x.as_i64() {
                    Value::Long(x)
                } else if let Some(x) = x.as_u64() {
                    Value::ULong(x)
                } else {
                    Value::Double(x.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(x) => Value::Bytes(x.into_bytes()),
            x => Value::Json(x),
        }
    }
}

impl Value {
    /// JSON form used for cached rows and has-many collections.
    ///
    /// Text becomes a string, bytes that aren't UTF-8 become `{"$bytes": "<hex>"}`,
    /// temporal values become their textual form and non-finite floats become `null`.
    /// [`from_stored_json`](Self::from_stored_json) reads it back.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Tiny(x) => (*x).into(),
            Value::Short(x) => (*x).into(),
            Value::Int(x) => (*x).into(),
            Value::Long(x) => (*x).into(),
            Value::UTiny(x) => (*x).into(),
            Value::UShort(x) => (*x).into(),
            Value::UInt(x) => (*x).into(),
            Value::ULong(x) => (*x).into(),
            Value::Float(x) => serde_json::Number::from_f64(*x as f64)
                .map(serde_json::Value::Number)
                .unwrap_or_default(),
            Value::Double(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or_default(),
            Value::Bytes(x) => match std::str::from_utf8(x) {
                Ok(text) => text.into(),
                Err(_) => {
                    let mut tagged = serde_json::Map::new();
                    tagged.insert(BYTES_TAG.to_owned(), hex::encode(x).into());
                    serde_json::Value::Object(tagged)
                }
            },
            Value::Date(..) | Value::Time(..) | Value::Datetime(..) => {
                Text(self).to_string().into()
            }
            Value::Json(x) => x.clone(),
        }
    }

    /// Inverse of [`to_json`](Self::to_json) for one column of a stored row.
    pub fn from_stored_json(json: serde_json::Value) -> Self {
        if let serde_json::Value::Object(object) = &json {
            if let (1, Some(serde_json::Value::String(text))) = (object.len(), object.get(BYTES_TAG))
            {
                if let Ok(bytes) = hex::decode(text) {
                    return Value::Bytes(bytes);
                }
            }
        }
        Value::from(json)
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Json(x) => Ok(x),
            x => Ok(x.to_json()),
        }
    }
}
