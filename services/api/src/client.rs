//! HTTP client for the sign-in backend
//!
//! [`ApiClient`] resolves the base URL from the shared [`Session`] on every
//! call, so an endpoint change applies to the next request without any
//! reconnect step. Mutating calls attach the device fingerprint under the
//! `ua_info` field of their JSON body.

use common::Session;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::device::{DeviceInfoSource, describe_device};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    HistoryQuery, ScanHistory, SigninHistory, SigninResponse, UserAddResponse, UserWithCookie,
};

/// Request body for user creation
#[derive(Serialize)]
struct AddUserRequest<'a> {
    ua_info: &'a str,
    name: &'a str,
}

/// Request body carrying only the fingerprint
#[derive(Serialize)]
struct FingerprintOnly<'a> {
    ua_info: &'a str,
}

/// Request body for user renaming
#[derive(Serialize)]
struct RenameUserRequest<'a> {
    ua_info: &'a str,
    new_name: &'a str,
}

/// Request body for cookie refresh
#[derive(Serialize)]
struct RefreshCookieRequest<'a> {
    ua_info: &'a str,
    cookie: &'a str,
}

/// Request body for the auto sign-in flag
#[derive(Serialize)]
struct UpdateAutoRequest<'a> {
    ua_info: &'a str,
    is_auto: bool,
}

/// Request body for scan submission
#[derive(Serialize)]
struct SigninRequest<'a> {
    ua_info: &'a str,
    scan_result: &'a str,
    user_id: &'a str,
}

/// Sign-in backend client
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    session: Session,
    device: Arc<dyn DeviceInfoSource>,
}

impl ApiClient {
    /// Create a new client without request timeout
    pub fn new(session: Session, device: Arc<dyn DeviceInfoSource>) -> Self {
        Self::with_http_client(Client::new(), session, device)
    }

    /// Create a new client whose requests fail after `timeout`
    pub fn with_timeout(
        session: Session,
        device: Arc<dyn DeviceInfoSource>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self::with_http_client(http, session, device))
    }

    /// Create a client around an existing `reqwest` client
    pub fn with_http_client(
        http: Client,
        session: Session,
        device: Arc<dyn DeviceInfoSource>,
    ) -> Self {
        Self {
            http,
            session,
            device,
        }
    }

    /// Session the client reads its endpoint from
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// List all users that need to be signed in
    ///
    /// `GET /user/list`
    pub async fn get_user_list(&self) -> ApiResult<Vec<UserWithCookie>> {
        let url = self.url(&["user", "list"], &[])?;
        self.get_list(url).await
    }

    /// Add a new user; the session is left untouched
    ///
    /// `POST /user/add`
    pub async fn add_user(&self, name: &str) -> ApiResult<UserAddResponse> {
        let ua_info = self.fingerprint().await;
        let url = self.url(&["user", "add"], &[])?;
        let created: UserAddResponse = self
            .post_json(
                url,
                &AddUserRequest {
                    ua_info: &ua_info,
                    name,
                },
            )
            .await?;
        info!("Added user {} with id {}", name, created.id);
        Ok(created)
    }

    /// Remove a user
    ///
    /// `POST /user/remove/<id>`
    pub async fn remove_user(&self, id: &str) -> ApiResult<()> {
        let ua_info = self.fingerprint().await;
        let url = self.url(&["user", "remove", id], &[])?;
        self.post_unit(url, &FingerprintOnly { ua_info: &ua_info })
            .await
    }

    /// Rename a user
    ///
    /// `POST /user/rename/<id>`
    pub async fn rename_user(&self, id: &str, new_name: &str) -> ApiResult<()> {
        let ua_info = self.fingerprint().await;
        let url = self.url(&["user", "rename", id], &[])?;
        self.post_unit(
            url,
            &RenameUserRequest {
                ua_info: &ua_info,
                new_name,
            },
        )
        .await
    }

    /// Upload a new cookie for a user
    ///
    /// `POST /user/refresh/<id>`
    pub async fn refresh_user_cookie(&self, id: &str, cookie: &str) -> ApiResult<()> {
        let ua_info = self.fingerprint().await;
        let url = self.url(&["user", "refresh", id], &[])?;
        self.post_unit(
            url,
            &RefreshCookieRequest {
                ua_info: &ua_info,
                cookie,
            },
        )
        .await
    }

    /// Toggle automatic sign-in for a user
    ///
    /// `POST /user/auto/<id>`
    pub async fn update_user_auto(&self, id: &str, is_auto: bool) -> ApiResult<()> {
        let ua_info = self.fingerprint().await;
        let url = self.url(&["user", "auto", id], &[])?;
        self.post_unit(
            url,
            &UpdateAutoRequest {
                ua_info: &ua_info,
                is_auto,
            },
        )
        .await
    }

    /// Submit a decoded QR payload and sign in every participating user
    ///
    /// `POST /signin`
    pub async fn signin(&self, scan_result: &str, user_id: &str) -> ApiResult<SigninResponse> {
        let ua_info = self.fingerprint().await;
        let url = self.url(&["signin"], &[])?;
        let response: SigninResponse = self
            .post_json(
                url,
                &SigninRequest {
                    ua_info: &ua_info,
                    scan_result,
                    user_id,
                },
            )
            .await?;
        info!(
            "Sign-in submitted by {}: {} result(s)",
            user_id,
            response.signin_results.len()
        );
        Ok(response)
    }

    /// Sign-in history
    ///
    /// `GET /history/signin?count=<count>&user_id=<id>&index=<index>`
    pub async fn get_signin_history(&self, query: &HistoryQuery) -> ApiResult<Vec<SigninHistory>> {
        let url = self.url(&["history", "signin"], &query.to_pairs())?;
        self.get_list(url).await
    }

    /// Scan history
    ///
    /// `GET /history/scan?count=<count>&user_id=<id>&index=<index>`
    pub async fn get_scan_history(&self, query: &HistoryQuery) -> ApiResult<Vec<ScanHistory>> {
        let url = self.url(&["history", "scan"], &query.to_pairs())?;
        self.get_list(url).await
    }

    /// Build a request URL from the current session endpoint
    ///
    /// Segments are percent-encoded; the query string is only added when
    /// `query` is not empty.
    pub fn url(&self, segments: &[&str], query: &[(&str, String)]) -> ApiResult<Url> {
        let base = self.session.base_url();
        if base.trim().is_empty() {
            return Err(ApiError::Validation(
                "API endpoint is not configured".to_string(),
            ));
        }

        let mut url = Url::parse(&base)
            .map_err(|e| ApiError::Validation(format!("invalid API endpoint `{}`: {}", base, e)))?;

        url.path_segments_mut()
            .map_err(|_| {
                ApiError::Validation(format!("API endpoint `{}` cannot be a base URL", base))
            })?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    async fn fingerprint(&self) -> String {
        describe_device(self.device.as_ref()).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let response = self.execute(Method::GET, url, |req| req).await?;
        decode(response).await
    }

    /// GET a JSON array; entries of an unexpected shape decode to defaults
    async fn get_list<T: Default + DeserializeOwned>(&self, url: Url) -> ApiResult<Vec<T>> {
        match self.get_json::<Value>(url).await? {
            Value::Array(items) => Ok(items
                .into_iter()
                .map(|item| T::deserialize(item).unwrap_or_default())
                .collect()),
            Value::Null => Ok(Vec::new()),
            other => {
                error!("Expected a JSON array from the API, got {}", other);
                Err(ApiError::Decode(serde::de::Error::custom(
                    "expected a JSON array",
                )))
            }
        }
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: Url, body: &B) -> ApiResult<T> {
        let response = self
            .execute(Method::POST, url, |req| req.json(body))
            .await?;
        decode(response).await
    }

    /// POST whose response body is ignored
    async fn post_unit<B: Serialize>(&self, url: Url, body: &B) -> ApiResult<()> {
        self.execute(Method::POST, url, |req| req.json(body))
            .await?;
        Ok(())
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> ApiResult<Response> {
        debug!("fetching {} {}", method, url);

        let request = self
            .http
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json");

        let response = build(request).send().await.map_err(|e| {
            error!("API request failed: {} {}: {}", method, url.path(), e);
            ApiError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("API request failed: {} {}: status {}", method, url.path(), status);
            return Err(ApiError::Status(status));
        }

        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = response.bytes().await.map_err(ApiError::Transport)?;
    serde_json::from_slice(&body).map_err(|e| {
        error!("Failed to decode API response: {}", e);
        ApiError::Decode(e)
    })
}
