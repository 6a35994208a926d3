//! Input validation shared by API handlers and admin forms

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{Error, Result};

/// Reject missing or empty strings with `message`
pub fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::InvalidInput(message.to_string())),
    }
}

/// Enforce an inclusive length range (in characters)
pub fn length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let n = value.chars().count();
    if n < min || n > max {
        return Err(Error::InvalidInput(format!(
            "{} must be between {} and {} characters long",
            field, min, max
        )));
    }
    Ok(())
}

/// `^[A-Za-z][A-Za-z0-9_.]*$`, used for usernames and school names
pub fn identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Loose email check: one `@`, non-empty local part, dotted domain
pub fn email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

/// Deserialize an optional integer that clients may send as a JSON number
/// or as a numeric string (`"17"`)
pub fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i64>, D::Error> {
    let raw = Option::<Value>::deserialize(d)?;
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("integer out of range")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not an integer", s))),
        Some(other) => Err(serde::de::Error::custom(format!("expected integer, got {}", other))),
    }
}

/// Deserialize an optional boolean sent as `true`, `1` or `"true"`
pub fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<bool>, D::Error> {
    let raw = Option::<Value>::deserialize(d)?;
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(n)) => Ok(Some(n.as_i64().unwrap_or(0) != 0)),
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" | "" => Ok(Some(false)),
            _ => Err(serde::de::Error::custom(format!("'{}' is not a boolean", s))),
        },
        Some(other) => Err(serde::de::Error::custom(format!("expected boolean, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert!(identifier("john"));
        assert!(identifier("j0hn_doe.2"));
        assert!(!identifier("2john"));
        assert!(!identifier("john doe"));
        assert!(!identifier(""));
    }

    #[test]
    fn test_email() {
        assert!(email("john@example.com"));
        assert!(!email("john"));
        assert!(!email("john@localhost"));
        assert!(!email("@example.com"));
        assert!(!email("jo hn@example.com"));
    }

    #[test]
    fn test_required() {
        assert!(required(Some("x"), "m").is_ok());
        let err = required(Some(""), "school does not have a name").unwrap_err();
        assert_eq!(err.to_string(), "school does not have a name");
        assert!(required(None, "m").is_err());
    }

    #[test]
    fn test_lenient_numbers() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default, deserialize_with = "lenient_i64")]
            score: Option<i64>,
            #[serde(default, deserialize_with = "lenient_bool")]
            is_exam: Option<bool>,
        }
        let b: Body = serde_json::from_str(r#"{"score": "17", "is_exam": true}"#).unwrap();
        assert_eq!(b.score, Some(17));
        assert_eq!(b.is_exam, Some(true));
        let b: Body = serde_json::from_str(r#"{"score": 21}"#).unwrap();
        assert_eq!(b.score, Some(21));
        assert_eq!(b.is_exam, None);
        assert!(serde_json::from_str::<Body>(r#"{"score": "abc"}"#).is_err());
    }
}
