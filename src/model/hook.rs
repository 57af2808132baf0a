//! Column hooks: value transforms applied on write ([`input`](ColumnHook::input))
//! and after fetch ([`output`](ColumnHook::output)).

use {
    crate::{
        error::HookError,
        types::{Row, Text, Value},
    },
    chrono::{DateTime, NaiveDateTime},
};

pub trait ColumnHook: Send + Sync {
    /// Applied before the value is persisted. `row` is the whole record being written.
    fn input(&self, row: &Row, value: Value) -> Result<Value, HookError>;

    /// Applied to every fetched row. `row` is the row as read, before any hook ran.
    fn output(&self, row: &Row, value: Value) -> Result<Value, HookError>;
}

/// Removes `//` and `/* */` comments that sit outside string literals.
pub fn strip_json_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => out.extend(chars.next()),
                '"' => in_string = false,
                _ => (),
            }
            continue;
        }
        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut last = '\0';
                for c in chars.by_ref() {
                    if last == '*' && c == '/' {
                        break;
                    }
                    last = c;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Json(serde_json::Value::String(x)) => Some(x.clone()),
        x => Some(Text(x).to_string()),
    }
}

fn to_json_text(value: Value, empty: &str) -> Result<Value, HookError> {
    match value {
        Value::Json(json) => match json {
            serde_json::Value::Null => Ok(Value::from(empty)),
            json => serde_json::to_string(&json)
                .map(Value::from)
                .map_err(HookError::new),
        },
        Value::Null => Ok(Value::from(empty)),
        Value::Bytes(x) if x.is_empty() => Ok(Value::from(empty)),
        x => Ok(x),
    }
}

fn from_json_text(value: Value, empty: &str) -> Result<Value, HookError> {
    let text = match value {
        Value::Json(_) => return Ok(value),
        x => text(&x).unwrap_or_default(),
    };
    let text = strip_json_comments(&text);
    let text = match text.trim() {
        "" => empty,
        x => x,
    };
    serde_json::from_str(text)
        .map(Value::Json)
        .map_err(HookError::new)
}

/// Stores JSON as text. Reading tolerates comments; an empty column reads as `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHook;

impl ColumnHook for JsonHook {
    fn input(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        to_json_text(value, "null")
    }

    fn output(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        from_json_text(value, "null")
    }
}

/// [`JsonHook`] defaulting to `[]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayHook;

impl ColumnHook for ArrayHook {
    fn input(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        to_json_text(value, "[]")
    }

    fn output(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        from_json_text(value, "[]")
    }
}

/// [`JsonHook`] defaulting to `{}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectHook;

impl ColumnHook for ObjectHook {
    fn input(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        to_json_text(value, "{}")
    }

    fn output(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        from_json_text(value, "{}")
    }
}

fn items(value: &Value) -> Result<Vec<String>, HookError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Json(serde_json::Value::Array(items)) => Ok(items
            .iter()
            .map(|x| match x {
                serde_json::Value::String(x) => x.clone(),
                x => x.to_string(),
            })
            .collect()),
        Value::Json(serde_json::Value::Null) => Ok(Vec::new()),
        Value::Json(x) => Err(HookError::msg(format!("expected a list, got {x}"))),
        x => Ok(Text(x)
            .to_string()
            .split(',')
            .map(str::trim)
            .filter(|x| !x.is_empty())
            .map(str::to_owned)
            .collect()),
    }
}

fn parse_int(item: &str) -> Result<i64, HookError> {
    btoi::btoi::<i64>(item.as_bytes())
        .map_err(|_| HookError::msg(format!("{item:?} is not an integer")))
}

/// Integer list stored as sorted `1,2,3` text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaIntHook;

impl ColumnHook for CommaIntHook {
    fn input(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        let mut ints = items(&value)?
            .iter()
            .map(|x| parse_int(x))
            .collect::<Result<Vec<_>, _>>()?;
        ints.sort_unstable();
        Ok(Value::from(
            ints.iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(","),
        ))
    }

    fn output(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        let ints = items(&value)?
            .iter()
            .map(|x| parse_int(x))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::from(ints))
    }
}

/// String list stored as `a,b,c` text, in the given order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaStringHook;

impl ColumnHook for CommaStringHook {
    fn input(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        Ok(Value::from(items(&value)?.join(",")))
    }

    fn output(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        Ok(Value::from(items(&value)?))
    }
}

/// Unix seconds in the record, `DATETIME` (UTC) in the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampHook;

impl ColumnHook for TimestampHook {
    fn input(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        if value.is_null() {
            return Ok(value);
        }
        let seconds = value
            .clone()
            .parse::<i64>()
            .map_err(HookError::new)?;
        let datetime = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| HookError::msg(format!("timestamp {seconds} out of range")))?;
        Value::try_from(datetime.naive_utc()).map_err(HookError::new)
    }

    fn output(&self, _row: &Row, value: Value) -> Result<Value, HookError> {
        match value {
            Value::Null => Ok(value),
            value if value.is_zero() => Ok(Value::Long(0)),
            value => {
                let datetime = value.parse::<NaiveDateTime>().map_err(HookError::new)?;
                Ok(Value::Long(datetime.and_utc().timestamp()))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{row, types::Value},
        serde_json::json,
    };

    #[test]
    fn comments() {
        assert_eq!(
            strip_json_comments("{\"a\": 1, // one\n\"b\": \"//x\" /* two */}"),
            "{\"a\": 1, \n\"b\": \"//x\" }"
        );
        assert_eq!(strip_json_comments(r#"["a\"//b"]"#), r#"["a\"//b"]"#);
    }

    #[test]
    fn json() {
        let row = row!();
        let stored = JsonHook
            .input(&row, Value::Json(json!({"hobby": "x"})))
            .unwrap();
        assert_eq!(stored, Value::from(r#"{"hobby":"x"}"#));
        assert_eq!(
            JsonHook.output(&row, stored).unwrap(),
            Value::Json(json!({"hobby": "x"}))
        );
        assert_eq!(
            JsonHook
                .output(&row, Value::from("{\"a\": 1 /* note */}"))
                .unwrap(),
            Value::Json(json!({"a": 1}))
        );
        assert_eq!(
            JsonHook.output(&row, Value::Null).unwrap(),
            Value::Json(json!(null))
        );
        assert!(JsonHook.output(&row, Value::from("{")).is_err());
    }

    #[test]
    fn empty_defaults() {
        let row = row!();
        assert_eq!(ArrayHook.input(&row, Value::Null).unwrap(), Value::from("[]"));
        assert_eq!(
            ArrayHook.output(&row, Value::from("")).unwrap(),
            Value::Json(json!([]))
        );
        assert_eq!(
            ObjectHook.output(&row, Value::Null).unwrap(),
            Value::Json(json!({}))
        );
    }

    #[test]
    fn comma_int() {
        let row = row!();
        let stored = CommaIntHook
            .input(&row, Value::Json(json!([3, 1, 2])))
            .unwrap();
        assert_eq!(stored, Value::from("1,2,3"));
        assert_eq!(
            CommaIntHook.output(&row, stored).unwrap(),
            Value::Json(json!([1, 2, 3]))
        );
        assert_eq!(
            CommaIntHook.output(&row, Value::from("")).unwrap(),
            Value::Json(json!([]))
        );
        assert!(CommaIntHook.input(&row, Value::from("1,x")).is_err());
    }

    #[test]
    fn comma_string() {
        let row = row!();
        let stored = CommaStringHook
            .input(&row, Value::Json(json!(["b", "a"])))
            .unwrap();
        assert_eq!(stored, Value::from("b,a"));
        assert_eq!(
            CommaStringHook.output(&row, stored).unwrap(),
            Value::Json(json!(["b", "a"]))
        );
    }

    #[test]
    fn timestamp() {
        let row = row!();
        let stored = TimestampHook.input(&row, Value::Long(86_461)).unwrap();
        assert_eq!(stored, Value::Datetime(1970, 1, 2, 0, 1, 1, 0));
        assert_eq!(TimestampHook.output(&row, stored).unwrap(), Value::Long(86_461));
        assert_eq!(
            TimestampHook
                .output(&row, Value::from("1970-01-01 00:00:10"))
                .unwrap(),
            Value::Long(10)
        );
        assert_eq!(TimestampHook.input(&row, Value::Null).unwrap(), Value::Null);
    }
}
