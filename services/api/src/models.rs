//! Backend entities and response payloads
//!
//! Every type decodes leniently: absent, `null` or mistyped fields fall back
//! to their defaults so that a response with an unexpected shape still
//! reaches the caller. Scalars sent as another scalar type (a numeric id, a
//! `0`/`1` flag) are converted instead of dropped.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub mod history;
pub mod user;

pub use history::{HistoryQuery, ScanHistory, SigninHistory, SigninResponse};
pub use user::{User, UserAddResponse, UserWithCookie};

/// Decode `T`, or its default when the value has another shape
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Decode a list element by element; unreadable elements become defaults
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let list = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| T::deserialize(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    };
    Ok(list)
}

/// Decode a text field, stringifying numbers and booleans
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Optional text field; `None` for `null` and non-scalar values
pub(crate) fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

/// Flag field accepting booleans, `0`/`1` and their string forms
///
/// Anything else yields `fallback`.
pub(crate) fn flag_or(value: Value, fallback: bool) -> bool {
    match value {
        Value::Bool(flag) => flag,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(fallback),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => fallback,
        },
        _ => fallback,
    }
}

/// Optional status code, accepting numbers and numeric strings
pub(crate) fn lenient_code<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let code = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(code)
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
