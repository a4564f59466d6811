//! User models

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{flag_or, lenient_opt_string, lenient_string};

/// User registered for sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Backend-assigned, immutable
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    /// Whether the user takes part in automatic sign-in
    #[serde(deserialize_with = "auto_flag")]
    pub is_auto: bool,
    /// Unified identity account, when configured
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_opt_string"
    )]
    pub identity_account: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_opt_string"
    )]
    pub identity_password: Option<String>,
}

/// Unreadable flags keep the default: users sign in automatically
fn auto_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(flag_or(Value::deserialize(deserializer)?, true))
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            is_auto: true,
            identity_account: None,
            identity_password: None,
        }
    }
}

/// User together with its most recent credential
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserWithCookie {
    #[serde(flatten)]
    pub user: User,
    /// Latest cookie value, empty when none was uploaded yet
    #[serde(deserialize_with = "lenient_string")]
    pub latest_cookie: String,
    /// Cookie expiry as reported by the backend
    #[serde(deserialize_with = "lenient_string")]
    pub expires: String,
}

impl UserWithCookie {
    pub fn has_cookie(&self) -> bool {
        !self.latest_cookie.is_empty()
    }
}

/// Response of `POST /user/add`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAddResponse {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
}
