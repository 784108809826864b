//! Literal parsing and `${name}` substitution

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::value::Value;
use crate::variables::VariableStore;

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("variable pattern is valid"))
}

/// Parse literal text into a typed value
///
/// In order: `true`/`false` (any case) become booleans, text wrapped in matching
/// quotes becomes a string with the quotes removed, then integer and float parses
/// are attempted, then `[a, b, ...]` is split on commas and each element parsed
/// recursively. Anything else is returned unchanged as a string.
pub fn parse_value(text: &str) -> Value {
    let trimmed = text.trim();

    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if let Some(inner) = strip_quotes(trimmed) {
        return Value::String(inner.to_string());
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int(i);
    }

    // f64 parsing also accepts "inf" and "nan"; those stay text
    if trimmed.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = trimmed.parse::<f64>() {
            return Value::Float(f);
        }
    }

    if let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        if inner.trim().is_empty() {
            return Value::List(Vec::new());
        }
        return Value::List(
            inner
                .split(',')
                .map(|item| parse_value(item.trim()))
                .collect(),
        );
    }

    Value::String(text.to_string())
}

fn strip_quotes(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let first = bytes[0];
    if (first == b'\'' || first == b'"') && bytes[bytes.len() - 1] == first {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

/// Replace every `${name}` whose name is bound with the value's text
///
/// Unbound references are left verbatim.
pub fn substitute(text: &str, variables: &VariableStore) -> String {
    if !text.contains("${") {
        return text.to_string();
    }

    variable_pattern()
        .replace_all(text, |caps: &Captures| match variables.get(caps[1].trim()) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
