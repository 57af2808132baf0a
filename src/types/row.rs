use {
    super::{FromValue, Value},
    crate::error::ParseError,
    indexmap::{map, IndexMap},
};

/// Column name to value mapping, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(IndexMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut Value> {
        self.0.get_mut(column)
    }

    /// Sets a column, keeping its position if it already exists.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(column.into(), value.into())
    }

    /// Removes a column, preserving the order of the others.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.shift_remove(column)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.0.retain(|column, value| keep(column, value))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Converts a copy of the column.
    pub fn try_get<T: FromValue>(&self, column: &str) -> Result<T, ParseError> {
        match self.0.get(column) {
            Some(value) => T::from_value(value.clone()),
            None => Err(ParseError::MissingField(column.to_owned())),
        }
    }

    /// Moves the column out and converts it. Fails if the column is absent.
    pub fn take_field<T: FromValue>(&mut self, column: &str) -> Result<T, ParseError> {
        match self.0.get_mut(column) {
            Some(value) => T::from_value(value.take()),
            None => Err(ParseError::MissingField(column.to_owned())),
        }
    }

    /// Like [`take_field`](Self::take_field), but absent and `NULL` columns yield `T::default()`.
    pub fn take_or_default<T: FromValue + Default>(
        &mut self,
        column: &str,
    ) -> Result<T, ParseError> {
        match self.0.get_mut(column).map(Value::take) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => T::from_value(value),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(column, value)| (column.clone(), value.to_json()))
                .collect(),
        )
    }

    pub fn from_json(json: serde_json::Value) -> Result<Self, ParseError> {
        match json {
            serde_json::Value::Object(object) => Ok(object
                .into_iter()
                .map(|(column, value)| (column, Value::from_stored_json(value)))
                .collect()),
            x => Err(ParseError::wrong_value(
                super::ValueType::Json,
                Value::Json(x),
            )),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Row {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.0.extend(
            iter.into_iter()
                .map(|(column, value)| (column.into(), value.into())),
        )
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = (&'a String, &'a Value);
    type IntoIter = map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
