//! `key=value` pair parsing for seeding pipeline contexts from the
//! command line.

use anyhow::{Result, anyhow};
use serde_json::Value;

/// Split a `key=value` argument into a key and a JSON value.
///
/// The value side is parsed as JSON when possible, so `retries=3` seeds a
/// number and `tags=["a","b"]` seeds an array; anything that does not parse
/// is kept as a plain string.
///
/// # Errors
///
/// Fails when the argument has no `=` separator or an empty key.
pub fn parse_key_value(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(anyhow!("empty key in '{raw}'"));
    }
    let parsed = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_values_when_possible() {
        assert_eq!(parse_key_value("retries=3").unwrap(), ("retries".into(), json!(3)));
        assert_eq!(parse_key_value("flag=true").unwrap(), ("flag".into(), json!(true)));
        assert_eq!(parse_key_value("tags=[\"a\",\"b\"]").unwrap(), ("tags".into(), json!(["a", "b"])));
    }

    #[test]
    fn falls_back_to_plain_strings() {
        assert_eq!(parse_key_value("name=my app").unwrap(), ("name".into(), json!("my app")));
        assert_eq!(parse_key_value("empty=").unwrap(), ("empty".into(), json!("")));
    }

    #[test]
    fn rejects_malformed_arguments() {
        assert!(parse_key_value("no-separator").is_err());
        assert!(parse_key_value("=value").is_err());
    }
}
