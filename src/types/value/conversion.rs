use {
    super::{Value, ValueType},
    crate::error::{ParseError, SerializeError},
    chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike},
};

/// Lenient conversion out of a [`Value`].
///
/// Numbers convert between widths when they fit, text columns are parsed,
/// and JSON scalars are accepted wherever the matching plain value would be.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ParseError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        Ok(value)
    }
}

fn trimmed(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|x| !x.is_ascii_whitespace());
    let end = bytes.iter().rposition(|x| !x.is_ascii_whitespace());
    match (start, end) {
        (Some(start), Some(end)) => &bytes[start..=end],
        _ => &[],
    }
}

fn integer(value: &Value) -> Option<i128> {
    match value {
        Value::Tiny(x) => Some(*x as i128),
        Value::Short(x) => Some(*x as i128),
        Value::Int(x) => Some(*x as i128),
        Value::Long(x) => Some(*x as i128),
        Value::UTiny(x) => Some(*x as i128),
        Value::UShort(x) => Some(*x as i128),
        Value::UInt(x) => Some(*x as i128),
        Value::ULong(x) => Some(*x as i128),
        Value::Float(x) if x.fract() == 0.0 => Some(*x as i128),
        Value::Double(x) if x.fract() == 0.0 => Some(*x as i128),
        Value::Bytes(x) => btoi::btoi::<i128>(trimmed(x)).ok(),
        Value::Json(serde_json::Value::Number(x)) => x
            .as_i64()
            .map(i128::from)
            .or_else(|| x.as_u64().map(i128::from)),
        Value::Json(serde_json::Value::String(x)) => btoi::btoi::<i128>(x.trim().as_bytes()).ok(),
        Value::Json(serde_json::Value::Bool(x)) => Some(*x as i128),
        _ => None,
    }
}

fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(x) => Some(*x as f64),
        Value::Double(x) => Some(*x),
        Value::Bytes(x) => std::str::from_utf8(x).ok()?.trim().parse().ok(),
        Value::Json(serde_json::Value::Number(x)) => x.as_f64(),
        Value::Json(serde_json::Value::String(x)) => x.trim().parse().ok(),
        x => integer(x).map(|x| x as f64),
    }
}

macro_rules! impl_conversion {
    ($t:ty, $name:ident) => {
        impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::$name(value)
            }
        }

        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self, ParseError> {
                match integer(&value) {
                    Some(x) => <$t>::try_from(x).map_err(|_| ParseError::ValueOutOfBounds(value)),
                    None => Err(ParseError::wrong_value(ValueType::$name, value)),
                }
            }
        }
    };
}

impl_conversion!(i8, Tiny);
impl_conversion!(i16, Short);
impl_conversion!(i32, Int);
impl_conversion!(i64, Long);

impl_conversion!(u8, UTiny);
impl_conversion!(u16, UShort);
impl_conversion!(u32, UInt);
impl_conversion!(u64, ULong);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        float(&value)
            .map(|x| x as f32)
            .ok_or_else(|| ParseError::wrong_value(ValueType::Float, value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        float(&value).ok_or_else(|| ParseError::wrong_value(ValueType::Double, value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Tiny(if value { 1 } else { 0 })
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        if let Value::Bytes(x) = &value {
            match trimmed(x) {
                b"true" => return Ok(true),
                b"false" => return Ok(false),
                _ => (),
            }
        }
        integer(&value)
            .map(|x| x != 0)
            .ok_or_else(|| ParseError::wrong_value(ValueType::Number, value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Bytes(value.into_bytes())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Bytes(value.as_bytes().to_vec())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Bytes(x) => String::from_utf8(x).map_err(Into::into),
            Value::Json(serde_json::Value::String(x)) => Ok(x),
            Value::Null => Err(ParseError::wrong_value(ValueType::Bytes, value)),
            x => Ok(super::Text(&x).to_string()),
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Bytes(x) => Ok(x),
            Value::Json(serde_json::Value::String(x)) => Ok(x.into_bytes()),
            _ => Err(ParseError::wrong_value(ValueType::Bytes, value)),
        }
    }
}

impl TryFrom<NaiveDate> for Value {
    type Error = SerializeError;

    fn try_from(value: NaiveDate) -> Result<Self, Self::Error> {
        Ok(Value::Date(
            value
                .year()
                .try_into()
                .map_err(|_| SerializeError::InvalidValue(ValueType::Date, Box::new(value)))?,
            value.month() as u8,
            value.day() as u8,
        ))
    }
}

impl TryFrom<NaiveDateTime> for Value {
    type Error = SerializeError;

    fn try_from(value: NaiveDateTime) -> Result<Self, Self::Error> {
        Ok(Value::Datetime(
            value
                .year()
                .try_into()
                .map_err(|_| SerializeError::InvalidValue(ValueType::Datetime, Box::new(value)))?,
            value.month() as u8,
            value.day() as u8,
            value.hour() as u8,
            value.minute() as u8,
            value.second() as u8,
            value.nanosecond() / 1_000,
        ))
    }
}

/// Turns a text value into its temporal form, leaving everything else untouched.
fn temporal(value: Value, parse: fn(&[u8]) -> Result<Value, ParseError>) -> Result<Value, ParseError> {
    match value {
        Value::Bytes(x) => parse(trimmed(&x)),
        Value::Json(serde_json::Value::String(x)) => parse(x.trim().as_bytes()),
        x => Ok(x),
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        let parse: fn(&[u8]) -> Result<Value, ParseError> = match &value {
            Value::Bytes(x) if trimmed(x).len() > 10 => Value::parse_datetime_text,
            _ => Value::parse_date_text,
        };
        let value = temporal(value, parse)?;
        match value {
            Value::Date(year, month, day) | Value::Datetime(year, month, day, _, _, _, _) => {
                NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                    .ok_or(ParseError::ValueOutOfBounds(value))
            }
            _ => Err(ParseError::wrong_value(ValueType::Date, value)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        match temporal(value, Value::parse_datetime_text)? {
            value @ Value::Datetime(year, month, day, hour, minute, second, micro) => {
                let date = match NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32) {
                    Some(x) => x,
                    None => return Err(ParseError::ValueOutOfBounds(value)),
                };
                let time =
                    NaiveTime::from_hms_micro_opt(hour as u32, minute as u32, second as u32, micro)
                        .ok_or(ParseError::ValueOutOfBounds(value))?;
                Ok(NaiveDateTime::new(date, time))
            }
            value @ Value::Date(..) => {
                NaiveDate::from_value(value).map(|date| date.and_time(NaiveTime::MIN))
            }
            value => Err(ParseError::wrong_value(ValueType::Datetime, value)),
        }
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        let seconds = value.num_seconds().abs();
        let minutes = seconds / 60;
        let hours = minutes / 60;
        let days = hours / 24;

        Value::Time(
            value.num_seconds() < 0,
            days as u32,
            (hours % 24) as u8,
            (minutes % 60) as u8,
            (seconds % 60) as u8,
            value.subsec_nanos().unsigned_abs() / 1_000,
        )
    }
}

impl FromValue for Duration {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        match temporal(value, Value::parse_time_text)? {
            value @ Value::Time(negative, days, hours, minutes, seconds, micros) => {
                const MICROS_PER_SEC: u32 = 1_000_000;
                if micros >= MICROS_PER_SEC {
                    return Err(ParseError::ValueOutOfBounds(value));
                }
                let mut x = days as i64;
                x *= 24;
                x += hours as i64;
                x *= 60;
                x += minutes as i64;
                x *= 60;
                x += seconds as i64;

                // Duration is saved as seconds plus positive shift in nanoseconds.
                // This means, -5.2 seconds becomes -6 seconds plus 800_000_000 nanoseconds.
                let nanos = if negative {
                    x *= -1;

                    if micros != 0 {
                        x -= 1;
                        (MICROS_PER_SEC - micros) * 1_000
                    } else {
                        0
                    }
                } else {
                    micros * 1_000
                };

                Duration::new(x, nanos).ok_or(ParseError::ValueOutOfBounds(value))
            }
            value => Err(ParseError::wrong_value(ValueType::Time, value)),
        }
    }
}

impl<T> TryFrom<Option<T>> for Value
where
    T: TryInto<Value>,
{
    type Error = <T as TryInto<Value>>::Error;

    fn try_from(value: Option<T>) -> Result<Self, Self::Error> {
        match value {
            Some(value) => value.try_into(),
            None => Ok(Self::Null),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Null | Value::Json(serde_json::Value::Null) => Ok(None),
            x => T::from_value(x).map(Some),
        }
    }
}

macro_rules! impl_json_list {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<Vec<$t>> for Value {
                fn from(value: Vec<$t>) -> Self {
                    Value::Json(value.into_iter().map(serde_json::Value::from).collect())
                }
            }

            impl FromValue for Vec<$t> {
                fn from_value(value: Value) -> Result<Self, ParseError> {
                    match value {
                        Value::Null => Ok(Vec::new()),
                        Value::Bytes(x) if trimmed(&x).is_empty() => Ok(Vec::new()),
                        Value::Bytes(x) => serde_json::from_slice(&x).map_err(Into::into),
                        Value::Json(x) => serde_json::from_value(x).map_err(Into::into),
                        _ => Err(ParseError::wrong_value(ValueType::Json, value)),
                    }
                }
            }
        )*
    };
}

impl_json_list!(i32, i64, u32, u64, String);

#[cfg(test)]
mod test {
    use {
        super::FromValue,
        crate::types::Value,
        chrono::{Duration, NaiveDate, NaiveDateTime},
        serde_json::json,
    };

    #[test]
    fn lenient_integers() {
        assert_eq!(i64::from_value(Value::UInt(7)).unwrap(), 7);
        assert_eq!(u8::from_value(Value::from(" 42 ")).unwrap(), 42);
        assert_eq!(i32::from_value(Value::Double(3.0)).unwrap(), 3);
        assert_eq!(u64::from_value(Value::Json(json!(9))).unwrap(), 9);
        assert!(u8::from_value(Value::Long(300)).is_err());
        assert!(i32::from_value(Value::Double(3.5)).is_err());
        assert!(i32::from_value(Value::Null).is_err());
    }

    #[test]
    fn lenient_scalars() {
        assert!(bool::from_value(Value::from("true")).unwrap());
        assert!(!bool::from_value(Value::UTiny(0)).unwrap());
        assert_eq!(f64::from_value(Value::from("2.5")).unwrap(), 2.5);
        assert_eq!(String::from_value(Value::Long(12)).unwrap(), "12");
        assert_eq!(Option::<i32>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i32>::from_value(Value::Int(1)).unwrap(), Some(1));
    }

    #[test]
    fn temporal() {
        assert_eq!(
            NaiveDate::from_value(Value::from("2024-02-29")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            NaiveDate::from_value(Value::from("2024-02-29 10:00:00")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        let datetime = NaiveDateTime::from_value(Value::from("2024-02-29 10:11:12")).unwrap();
        assert_eq!(Value::try_from(datetime).unwrap(), Value::Datetime(2024, 2, 29, 10, 11, 12, 0));
        assert_eq!(
            NaiveDateTime::from_value(Value::Date(2024, 1, 1)).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        let duration = Duration::milliseconds(-5200);
        assert_eq!(Duration::from_value(Value::from(duration)).unwrap(), duration);
    }

    #[test]
    fn lists() {
        assert_eq!(Value::from(vec![1i64, 2]), Value::Json(json!([1, 2])));
        assert_eq!(
            Vec::<i64>::from_value(Value::from("[3,4]")).unwrap(),
            vec![3, 4]
        );
        assert_eq!(
            Vec::<String>::from_value(Value::Json(json!(["a"]))).unwrap(),
            vec!["a".to_owned()]
        );
        assert!(Vec::<i64>::from_value(Value::Null).unwrap().is_empty());
    }
}
