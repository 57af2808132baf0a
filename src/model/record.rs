use crate::{
    error::{ParseError, SerializeError},
    schema::{Schema, DEFAULT_CONNECTION},
    types::{Row, Value},
};

pub trait FromRow: Sized {
    fn from_row(row: Row) -> Result<Self, ParseError>;
}

/// Persisted columns only; relation fields are never written.
pub trait IntoRow {
    fn to_row(&self) -> Result<Row, SerializeError>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self, ParseError> {
        Ok(row)
    }
}

impl IntoRow for Row {
    fn to_row(&self) -> Result<Row, SerializeError> {
        Ok(self.clone())
    }
}

/// A struct bound to one table, usually through `#[derive(Record)]`.
pub trait Record: Schema + FromRow + IntoRow + Send + Sync + 'static {
    const TABLE: &'static str;
    const CONNECTION: &'static str = DEFAULT_CONNECTION;
    const DATABASE: Option<&'static str> = None;
    /// Flag column; deletes set it to 1 and selects only return rows where it is 0.
    const SOFT_DELETE: Option<&'static str> = None;
}

/// Decodes the list a has-many relation stored in a row.
pub fn many_from_value<T: FromRow>(value: Value) -> Result<Vec<T>, ParseError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Json(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| T::from_row(Row::from_json(item)?))
            .collect(),
        Value::Bytes(bytes) if bytes.is_empty() => Ok(Vec::new()),
        Value::Bytes(bytes) => {
            many_from_value(Value::Json(serde_json::from_slice(&bytes)?))
        }
        x => Err(ParseError::wrong_value(crate::types::ValueType::Json, x)),
    }
}

#[cfg(test)]
mod test {
    use {
        super::{many_from_value, FromRow},
        crate::{
            error::ParseError,
            types::{Row, Value},
        },
    };

    #[derive(Debug, PartialEq)]
    struct Log {
        msg: String,
    }

    impl FromRow for Log {
        fn from_row(mut row: Row) -> Result<Self, ParseError> {
            Ok(Self {
                msg: row.take_field("msg")?,
            })
        }
    }

    #[test]
    fn many() {
        let value = Value::Json(serde_json::json!([{"msg": "a"}, {"msg": "b"}]));
        assert_eq!(
            many_from_value::<Log>(value).unwrap(),
            [Log { msg: "a".into() }, Log { msg: "b".into() }]
        );
        assert!(many_from_value::<Log>(Value::Null).unwrap().is_empty());
        assert_eq!(
            many_from_value::<Log>(Value::from(r#"[{"msg":"c"}]"#)).unwrap(),
            [Log { msg: "c".into() }]
        );
        assert!(matches!(
            many_from_value::<Log>(Value::Json(serde_json::json!([{}]))),
            Err(ParseError::MissingField(x)) if x == "msg"
        ));
        assert!(many_from_value::<Log>(Value::Int(3)).is_err());
    }
}
