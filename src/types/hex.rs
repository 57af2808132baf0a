use {
    super::{FromValue, Value, ValueType},
    crate::error::ParseError,
    std::{fmt, ops},
};

/// Binary column rendered as `0x…` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hex(pub Vec<u8>);

impl Hex {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl std::str::FromStr for Hex {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        hex::decode(s).map(Self)
    }
}

impl ops::Deref for Hex {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Hex> for Vec<u8> {
    fn from(value: Hex) -> Self {
        value.0
    }
}

impl serde::Serialize for Hex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Hex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex = <String as serde::Deserialize>::deserialize(deserializer)?;
        <Hex as std::str::FromStr>::from_str(&hex)
            .map_err(|err| <D::Error as serde::de::Error>::custom(err))
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        f.write_str(&hex::encode(&self.0))
    }
}

impl From<Hex> for Value {
    fn from(value: Hex) -> Self {
        Value::Bytes(value.0)
    }
}

impl FromValue for Hex {
    fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Bytes(bytes) => Ok(Hex(bytes)),
            // `0x…` text inside a JSON document
            Value::Json(serde_json::Value::String(text)) => text
                .parse()
                .map_err(|_| ParseError::invalid_value(ValueType::Bytes, text.as_bytes())),
            _ => Err(ParseError::wrong_value(ValueType::Bytes, value)),
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::Hex,
        crate::types::{FromValue, Value},
        std::str::FromStr,
    };

    #[test]
    fn to_string_and_from_str() {
        let hex = Hex::new("hello hex".as_bytes().to_vec());
        assert_eq!(hex.to_string().as_str(), "0x68656c6c6f20686578");
        assert_eq!(Hex::from_str(&hex.to_string()).unwrap(), hex);
        assert_eq!(Hex::from_str("68656c6c6f20686578").unwrap(), hex);
    }

    #[test]
    fn from_json_text() {
        let json = serde_json::to_value(Hex(vec![0xde, 0xad])).unwrap();
        assert_eq!(json, serde_json::json!("0xdead"));
        assert_eq!(
            Hex::from_value(Value::Json(json)).unwrap(),
            Hex(vec![0xde, 0xad])
        );
    }
}
