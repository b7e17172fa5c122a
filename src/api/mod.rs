//! Authorized JSON calls against the companion backend.

pub mod profile;

pub use profile::{ProfileApi, ProfileUpdate};

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::{AuthError, AuthService};
use crate::error::{Error, Result};
use crate::util::retry::{retry_after_ms, RetryPolicy};
use crate::util::timeout::with_timeout;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_PATH: &str = "/health";

/// HTTP client that attaches the session's bearer token to every request.
///
/// A 401 from the backend ends the session.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    service: Arc<AuthService>,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, service: Arc<AuthService>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service,
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn service(&self) -> &Arc<AuthService> {
        &self.service
    }

    /// Send a JSON request to `{base_url}{endpoint}` and decode the response.
    ///
    /// Only GET requests are retried.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        if method == Method::GET {
            self.retry
                .execute(|| self.send_once(method.clone(), endpoint, body))
                .await
        } else {
            self.send_once(method, endpoint, body).await
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.call(Method::GET, endpoint, None).await
    }

    /// `GET /health`; no token needed but one is sent when present.
    pub async fn health(&self) -> Result<Value> {
        self.get(HEALTH_PATH).await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let url = format!("{}{endpoint}", self.base_url);
        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("Content-Type", "application/json");
        if let Some(token) = self.service.access_token().await? {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        tracing::debug!(%method, %url, "api request");
        let resp = with_timeout(self.request_timeout, async {
            req.send().await.map_err(Error::from)
        })
        .await?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            self.service.expire_session().await;
            return Err(AuthError::SessionExpired.into());
        }
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown status");
            let retry_after_ms = retry_after_ms(resp.headers());
            tracing::debug!(%status, %url, ?retry_after_ms, "api request failed");
            return Err(Error::Api {
                status: status.as_u16(),
                message: reason.to_string(),
                retry_after_ms,
            });
        }
        Ok(resp.json::<T>().await?)
    }
}
