//! Serde helpers for Plex payloads, which are inconsistent about whether
//! identifiers arrive as strings or numbers.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

pub fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient_string")]
        key: String,
        #[serde(default, deserialize_with = "lenient_i64")]
        offset: i64,
    }

    #[test]
    fn accepts_strings_and_numbers() {
        let a: Probe = serde_json::from_str(r#"{"key":"12","offset":"3400"}"#).unwrap();
        let b: Probe = serde_json::from_str(r#"{"key":12,"offset":3400}"#).unwrap();
        assert_eq!((a.key.as_str(), a.offset), ("12", 3400));
        assert_eq!((b.key.as_str(), b.offset), ("12", 3400));
    }

    #[test]
    fn missing_and_null_fall_back_to_defaults() {
        let p: Probe = serde_json::from_str(r#"{"key":null}"#).unwrap();
        assert_eq!(p.key, "");
        assert_eq!(p.offset, 0);
    }
}
