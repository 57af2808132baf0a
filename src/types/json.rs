use {
    super::{FromValue, Value, ValueType},
    crate::error::{ParseError, SerializeError},
    serde::{de::DeserializeOwned, Serialize},
    std::ops,
};

/// Stores `T` as a JSON document.
///
/// Pair it with [`JsonHook`](crate::model::JsonHook) to persist the document as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> ops::DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: Serialize> TryFrom<Json<T>> for Value {
    type Error = SerializeError;

    fn try_from(value: Json<T>) -> Result<Self, Self::Error> {
        serde_json::to_value(&value.0)
            .map(Value::Json)
            .map_err(Into::into)
    }
}

impl<T: DeserializeOwned> FromValue for Json<T> {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Json(x) => serde_json::from_value(x).map(Json).map_err(Into::into),
            Value::Bytes(x) => serde_json::from_slice(&x).map(Json).map_err(Into::into),
            Value::Null => serde_json::from_value(serde_json::Value::Null)
                .map(Json)
                .map_err(Into::into),
            x => Err(ParseError::wrong_value(ValueType::Json, x)),
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::Json,
        crate::types::{FromValue, Value},
        serde::{Deserialize, Serialize},
        serde_json::json,
    };

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        hobby: String,
    }

    #[test]
    fn convert() {
        let value = Value::try_from(Json(Profile {
            hobby: "x".into(),
        }))
        .unwrap();
        assert_eq!(value, Value::Json(json!({"hobby": "x"})));
        assert_eq!(Json::<Profile>::from_value(value).unwrap().hobby, "x");
        assert_eq!(
            Json::<Profile>::from_value(Value::from(r#"{"hobby":"y"}"#))
                .unwrap()
                .into_inner(),
            Profile { hobby: "y".into() }
        );
        assert_eq!(
            Json::<Option<Profile>>::from_value(Value::Null).unwrap().0,
            None
        );
    }
}
