use {
    super::{Value, ValueType},
    crate::error::ParseError,
    std::fmt::{self, Write},
};

/// Escapes and quotes identifier.
/// Trailing spaces are removed, as this is required for database, table, and column names.
/// Only the characters `\u{0001}` - `\u{FFFF}` are allowed, everything else is removed.
pub struct IdentifierEscape<'a>(pub &'a str);

impl fmt::Display for IdentifierEscape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // See https://dev.mysql.com/doc/refman/8.0/en/identifiers.html for identifier rules
        f.write_char('`')?;

        fn char_valid(char: char) -> bool {
            ('\u{0001}'..='\u{FFFF}').contains(&char)
        }

        let mut last_char = 0;
        for (i, char) in self.0.chars().enumerate() {
            if !char.is_whitespace() && char_valid(char) {
                last_char = i;
            }
        }

        for (i, char) in self.0.chars().enumerate() {
            if i <= last_char && char_valid(char) {
                if char == '`' {
                    f.write_char('`')?;
                }
                f.write_char(char)?;
            }
        }
        f.write_char('`')
    }
}

fn format_date(f: &mut fmt::Formatter<'_>, year: &u16, month: &u8, day: &u8) -> fmt::Result {
    write!(f, "{year:0>4}-{month:0>2}-{day:0>2}")
}

fn format_time(
    f: &mut fmt::Formatter<'_>,
    hours: &u32,
    minutes: &u8,
    seconds: &u8,
    microseconds: &u32,
) -> fmt::Result {
    write!(f, "{hours:0>2}:{minutes:0>2}:{seconds:0>2}")?;
    if *microseconds != 0 {
        write!(f, ".{microseconds:0>6}")?;
    }
    Ok(())
}

/// Plain textual form of a value: bytes as (lossy) UTF-8, temporal values unquoted.
pub struct Text<'a>(pub &'a Value);

impl fmt::Display for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Bytes(x) => f.write_str(&String::from_utf8_lossy(x)),
            Value::Date(year, month, day) => format_date(f, year, month, day),
            Value::Time(negative, days, hours, minutes, seconds, microseconds) => {
                if *negative {
                    f.write_char('-')?;
                }
                format_time(
                    f,
                    &(*days * 24 + *hours as u32),
                    minutes,
                    seconds,
                    microseconds,
                )
            }
            Value::Datetime(year, month, day, hour, minute, second, microsecond) => {
                format_date(f, year, month, day)?;
                f.write_char(' ')?;
                format_time(f, &(*hour as u32), minute, second, microsecond)
            }
            x => fmt::Display::fmt(x, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Tiny(x) => fmt::Display::fmt(x, f),
            Value::Short(x) => fmt::Display::fmt(x, f),
            Value::Int(x) => fmt::Display::fmt(x, f),
            Value::Long(x) => fmt::Display::fmt(x, f),
            Value::UTiny(x) => fmt::Display::fmt(x, f),
            Value::UShort(x) => fmt::Display::fmt(x, f),
            Value::UInt(x) => fmt::Display::fmt(x, f),
            Value::ULong(x) => fmt::Display::fmt(x, f),
            Value::Float(x) => fmt::Display::fmt(x, f),
            Value::Double(x) => fmt::Display::fmt(x, f),
            Value::Bytes(x) => {
                f.write_str("0x")?;
                f.write_str(&hex::encode(x))
            }
            Value::Date(..) | Value::Time(..) | Value::Datetime(..) => {
                write!(f, "\"{}\"", Text(self))
            }
            Value::Json(x) => fmt::Display::fmt(x, f),
        }
    }
}

impl Value {
    fn parse_time_text_inner(value: &[u8]) -> Result<(u32, u8, u8, u8, u32), ParseError> {
        let invalid_value = || ParseError::invalid_value(ValueType::Time, value);
        let first_colon = value
            .iter()
            .position(|x| *x == b':')
            .ok_or_else(invalid_value)?;
        if value.len() < first_colon + 6 || value[first_colon + 3] != b':' {
            return Err(invalid_value());
        }
        let hours: u32 = btoi::btou(&value[0..first_colon]).map_err(|_| invalid_value())?;
        let minutes: u8 =
            btoi::btou(&value[first_colon + 1..first_colon + 3]).map_err(|_| invalid_value())?;
        let seconds: u8 =
            btoi::btou(&value[first_colon + 4..first_colon + 6]).map_err(|_| invalid_value())?;
        let mut microseconds: u32 = 0;
        if value.len() > first_colon + 6 + 1 {
            if value[first_colon + 6] != b'.' {
                return Err(invalid_value());
            }
            let buf = &value[first_colon + 6 + 1..];
            if buf.len() > 6 {
                return Err(invalid_value());
            }
            microseconds = btoi::btou(buf).map_err(|_| invalid_value())?;
            microseconds *= 10u32.pow(6 - buf.len() as u32);
        }
        Ok((
            hours / 24,
            (hours % 24) as u8,
            minutes,
            seconds,
            microseconds,
        ))
    }

    fn parse_date_text_inner(value: &[u8]) -> Result<(u16, u8, u8), ParseError> {
        let invalid_value = || ParseError::invalid_value(ValueType::Date, value);

        if value.len() != 10 || value[4] != b'-' || value[7] != b'-' {
            return Err(invalid_value());
        }

        let year: u16 = btoi::btou(&value[0..4]).map_err(|_| invalid_value())?;
        let month: u8 = btoi::btou(&value[5..7]).map_err(|_| invalid_value())?;
        let day: u8 = btoi::btou(&value[8..10]).map_err(|_| invalid_value())?;
        Ok((year, month, day))
    }

    /// Parses `[-]HHH:MM:SS[.ffffff]`.
    pub fn parse_time_text(value: &[u8]) -> Result<Self, ParseError> {
        if value.is_empty() {
            return Err(ParseError::invalid_value(ValueType::Time, value));
        }
        let negative = if value[0] == b'-' { 1 } else { 0 };
        let (days, hours, minutes, seconds, microseconds) =
            Self::parse_time_text_inner(&value[negative..])?;
        Ok(Self::Time(
            negative == 1,
            days,
            hours,
            minutes,
            seconds,
            microseconds,
        ))
    }

    /// Parses `YYYY-MM-DD`.
    pub fn parse_date_text(value: &[u8]) -> Result<Self, ParseError> {
        Self::parse_date_text_inner(value).map(|(year, month, day)| Self::Date(year, month, day))
    }

    /// Parses `YYYY-MM-DD HH:MM:SS[.ffffff]`, the separator may also be `T`.
    pub fn parse_datetime_text(value: &[u8]) -> Result<Self, ParseError> {
        if value.len() < 19 || !matches!(value[10], b' ' | b'T') {
            return Err(ParseError::invalid_value(ValueType::Datetime, value));
        }
        let (year, month, day) = Self::parse_date_text_inner(&value[0..10])?;
        let (_, hour, minute, second, microsecond) = Self::parse_time_text_inner(&value[11..])?;
        Ok(Self::Datetime(
            year,
            month,
            day,
            hour,
            minute,
            second,
            microsecond,
        ))
    }
}
