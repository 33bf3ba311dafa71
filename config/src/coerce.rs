//! Conversion of raw config and environment strings into option values.

use pipkit_core::{Multiplicity, OptionSpec, OptionValue, ValueKind};

use crate::error::{ConfigError, Result};

const TRUTHY: [&str; 6] = ["y", "yes", "t", "true", "on", "1"];
const FALSY: [&str; 6] = ["n", "no", "f", "false", "off", "0"];

/// Strict truthy/falsy parsing, case-insensitive.
///
/// # Examples
///
/// ```
/// use pipkit_config::str_to_bool;
///
/// assert_eq!(str_to_bool("Yes"), Some(true));
/// assert_eq!(str_to_bool("off"), Some(false));
/// assert_eq!(str_to_bool("maybe"), None);
/// ```
pub fn str_to_bool(raw: &str) -> Option<bool> {
    let value = raw.trim().to_ascii_lowercase();
    if TRUTHY.contains(&value.as_str()) {
        Some(true)
    } else if FALSY.contains(&value.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn invalid(key: &str, raw: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: reason.into(),
    }
}

/// Coerces `raw`, found under `key`, to the value `spec` stores.
///
/// Switches parse strictly as booleans and counters seed at 0 or 1 the
/// same way. Append options split on whitespace. Numbers are parsed from
/// the trimmed text.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when the text does not parse.
///
/// # Examples
///
/// ```
/// use pipkit_config::coerce;
/// use pipkit_core::{OptionSpec, OptionValue};
///
/// let links = OptionSpec::append("--find-links", "find_links");
/// assert_eq!(
///     coerce(&links, "--find-links", "a  b\nc").unwrap(),
///     OptionValue::List(vec!["a".into(), "b".into(), "c".into()])
/// );
///
/// let timeout = OptionSpec::float("--timeout", "timeout");
/// assert!(coerce(&timeout, "--timeout", "soon").is_err());
/// ```
pub fn coerce(spec: &OptionSpec, key: &str, raw: &str) -> Result<OptionValue> {
    if spec.multiplicity == Multiplicity::Append {
        return Ok(OptionValue::List(
            raw.split_whitespace().map(String::from).collect(),
        ));
    }

    match spec.kind {
        ValueKind::Switch => str_to_bool(raw)
            .map(OptionValue::Bool)
            .ok_or_else(|| invalid(key, raw, "invalid truth value")),
        ValueKind::Count => str_to_bool(raw)
            .map(|b| OptionValue::Count(u32::from(b)))
            .ok_or_else(|| invalid(key, raw, "invalid truth value")),
        ValueKind::Float => raw
            .trim()
            .parse::<f64>()
            .map(OptionValue::Float)
            .map_err(|e| invalid(key, raw, e.to_string())),
        ValueKind::Text => Ok(OptionValue::Text(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_to_bool_accepts_all_spellings() {
        for raw in ["y", "YES", "t", "True", "on", "1", " yes "] {
            assert_eq!(str_to_bool(raw), Some(true), "{raw}");
        }
        for raw in ["n", "No", "f", "FALSE", "off", "0"] {
            assert_eq!(str_to_bool(raw), Some(false), "{raw}");
        }
        for raw in ["", "2", "yep", "nope"] {
            assert_eq!(str_to_bool(raw), None, "{raw}");
        }
    }

    #[test]
    fn test_switch_rejects_ambiguous_value() {
        let spec = OptionSpec::switch("--no-input", "no_input");
        let err = coerce(&spec, "--no-input", "sometimes").unwrap_err();
        assert_eq!(
            err.to_string(),
            "--no-input: invalid truth value (sometimes)"
        );
    }

    #[test]
    fn test_count_seeds_zero_or_one() {
        let spec = OptionSpec::count("--verbose", "verbose");
        assert_eq!(coerce(&spec, "--verbose", "yes").unwrap(), OptionValue::Count(1));
        assert_eq!(coerce(&spec, "--verbose", "0").unwrap(), OptionValue::Count(0));
        assert!(coerce(&spec, "--verbose", "3").is_err());
    }

    #[test]
    fn test_numbers_are_trimmed() {
        let float = OptionSpec::float("--timeout", "timeout");
        assert_eq!(coerce(&float, "--timeout", " 2.5 ").unwrap(), OptionValue::Float(2.5));
        assert_eq!(coerce(&float, "--timeout", "7\n").unwrap(), OptionValue::Float(7.0));
        assert!(coerce(&float, "--timeout", "seven").is_err());
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        let spec = OptionSpec::text("--proxy", "proxy");
        assert_eq!(
            coerce(&spec, "--proxy", "user:pw@host:8080").unwrap(),
            OptionValue::Text("user:pw@host:8080".into())
        );
    }
}
