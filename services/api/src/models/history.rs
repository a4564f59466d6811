//! Scan and sign-in history models

use serde::{Deserialize, Serialize};

use super::{lenient, lenient_code, lenient_list, lenient_opt_string, lenient_string};

/// One decoded QR payload submitted by a user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanHistory {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    /// Raw decoded scan payload
    #[serde(deserialize_with = "lenient_string")]
    pub result: String,
    /// User who scanned
    #[serde(deserialize_with = "lenient_string")]
    pub user_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
}

/// Audit record of one sign-in attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigninHistory {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    /// User signed in by this attempt
    #[serde(deserialize_with = "lenient_string")]
    pub user_id: String,
    /// Cookie carried by the attempt
    #[serde(deserialize_with = "lenient_string")]
    pub cookie: String,
    /// Scan that triggered the attempt; `None` for digital sign-in
    #[serde(deserialize_with = "lenient_opt_string")]
    pub scan_history_id: Option<String>,
    pub request_data: serde_json::Value,
    #[serde(deserialize_with = "lenient_code")]
    pub response_code: Option<u16>,
    pub response_data: serde_json::Value,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
}

impl SigninHistory {
    /// Whether the upstream sign-in answered with a 2xx status
    pub fn succeeded(&self) -> bool {
        matches!(self.response_code, Some(code) if (200..300).contains(&code))
    }
}

/// Response of `POST /signin`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigninResponse {
    #[serde(deserialize_with = "lenient")]
    pub scan_result: ScanHistory,
    #[serde(deserialize_with = "lenient_list")]
    pub signin_results: Vec<SigninHistory>,
}

/// Filters of the history endpoints
///
/// `count` and `index` are sent whenever they are `Some`, zero included.
/// `user_id` is sent only when non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub count: Option<u32>,
    pub user_id: Option<String>,
    pub index: Option<u32>,
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// Query-string pairs, in `count`, `user_id`, `index` order
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(count) = self.count {
            pairs.push(("count", count.to_string()));
        }
        if let Some(user_id) = self.user_id.as_deref().filter(|id| !id.is_empty()) {
            pairs.push(("user_id", user_id.to_string()));
        }
        if let Some(index) = self.index {
            pairs.push(("index", index.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs_omit_absent_values() {
        assert!(HistoryQuery::new().to_pairs().is_empty());

        let pairs = HistoryQuery::new().index(0).to_pairs();
        assert_eq!(pairs, vec![("index", "0".to_string())]);

        let pairs = HistoryQuery::new().count(0).user_id("").to_pairs();
        assert_eq!(pairs, vec![("count", "0".to_string())]);

        let pairs = HistoryQuery::new().index(2).user_id("u1").count(20).to_pairs();
        assert_eq!(
            pairs,
            vec![
                ("count", "20".to_string()),
                ("user_id", "u1".to_string()),
                ("index", "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_signin_response_decoding() {
        let response: SigninResponse = serde_json::from_value(json!({
            "scan_result": {
                "id": "s1",
                "result": "checkin://course/42",
                "user_id": "u1",
                "created_at": "2025-03-01 08:00:00",
            },
            "signin_results": [
                {
                    "id": "h1",
                    "user_id": "u1",
                    "cookie": "session=abc",
                    "scan_history_id": "s1",
                    "request_data": { "code": "42" },
                    "response_code": 200,
                    "response_data": { "ok": true },
                    "created_at": "2025-03-01 08:00:01",
                },
                {
                    "id": "h2",
                    "user_id": "u2",
                    "cookie": "session=def",
                    "scan_history_id": null,
                    "request_data": null,
                    "response_code": null,
                    "response_data": "timeout",
                    "created_at": "2025-03-01 08:00:02",
                },
            ],
        }))
        .expect("decode signin response");

        assert_eq!(response.scan_result.result, "checkin://course/42");
        assert_eq!(response.signin_results.len(), 2);
        assert!(response.signin_results[0].succeeded());
        assert_eq!(response.signin_results[0].request_data, json!({ "code": "42" }));
        assert!(!response.signin_results[1].succeeded());
        assert_eq!(response.signin_results[1].scan_history_id, None);
        assert_eq!(response.signin_results[1].response_data, json!("timeout"));
    }

    #[test]
    fn test_mistyped_history_fields() {
        let response: SigninResponse = serde_json::from_value(json!({
            "scan_result": "not an object",
            "signin_results": [
                { "id": 9, "response_code": "201", "scan_history_id": 5 },
                42,
                { "id": "h3", "response_code": 70000 },
            ],
        }))
        .expect("decode signin response");

        assert_eq!(response.scan_result, ScanHistory::default());
        assert_eq!(response.signin_results.len(), 3);
        assert_eq!(response.signin_results[0].id, "9");
        assert!(response.signin_results[0].succeeded());
        assert_eq!(response.signin_results[0].scan_history_id.as_deref(), Some("5"));
        assert_eq!(response.signin_results[1], SigninHistory::default());
        assert_eq!(response.signin_results[2].response_code, None);
    }
}
