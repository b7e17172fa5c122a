use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::flow::{AuthFlow, Authorized, AuthorizationRequest, FlowKind};
use super::token::Token;
use crate::profile::{BackendUser, UserProfile};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

const AUTH_URL_PATH: &str = "/api/auth/discord/url";
const CALLBACK_PATH: &str = "/api/auth/discord/callback";
pub(crate) const PROFILE_PATH: &str = "/api/user/profile";

/// Discord login brokered by the companion backend.
///
/// The backend builds the authorize URL, holds the client secret, exchanges
/// the code and hands back its own opaque session token.
///
/// # Example
/// ```no_run
/// use discord_auth::auth::backend::BackendFlow;
///
/// let flow = BackendFlow::new("http://192.168.1.52:3000");
/// assert_eq!(flow.base_url(), "http://192.168.1.52:3000");
/// ```
#[derive(Debug, Clone)]
pub struct BackendFlow {
    client: reqwest::Client,
    base_url: String,
}

impl BackendFlow {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Ask the backend for a Discord authorize URL bound to `redirect_uri`.
    pub async fn auth_url(&self, redirect_uri: Option<&str>) -> Result<String, AuthError> {
        let mut req = self.client.get(self.url(AUTH_URL_PATH));
        if let Some(redirect_uri) = redirect_uri {
            req = req.query(&[("redirect_uri", redirect_uri)]);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::InvalidResponse(format!(
                "Failed to get auth URL: {} - {body}",
                status.as_u16()
            )));
        }
        let payload: AuthUrlResponse = resp.json().await?;
        Ok(payload.auth_url)
    }

    /// Hand the authorization code to the backend and receive its session.
    pub async fn exchange_code(&self, code: &str) -> Result<Authorized, AuthError> {
        let resp = self
            .client
            .post(self.url(CALLBACK_PATH))
            .json(&CallbackRequest { code })
            .send()
            .await?;
        let status = resp.status();
        tracing::debug!(%status, "backend token exchange responded");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .unwrap_or_else(|_| serde_json::json!({}));
            return Err(AuthError::TokenExchange(format!(
                "Failed to exchange code for token: {detail}"
            )));
        }
        let payload: CallbackResponse = resp.json().await?;
        Ok(Authorized {
            token: Token::bearer(payload.token),
            user: payload.user.into(),
        })
    }
}

#[async_trait]
impl AuthFlow for BackendFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Backend
    }

    async fn begin(&self, redirect_uri: &str) -> Result<AuthorizationRequest, AuthError> {
        let authorize_url = self.auth_url(Some(redirect_uri)).await?;
        tracing::debug!(%authorize_url, "backend issued authorize url");
        Ok(AuthorizationRequest {
            authorize_url,
            redirect_uri: redirect_uri.to_string(),
            state: None,
            code_verifier: None,
        })
    }

    async fn complete(
        &self,
        _request: &AuthorizationRequest,
        code: &str,
    ) -> Result<Authorized, AuthError> {
        self.exchange_code(code).await
    }

    async fn fetch_profile(&self, token: &Token) -> Result<Option<UserProfile>, AuthError> {
        let resp = self
            .client
            .get(self.url(PROFILE_PATH))
            .bearer_auth(&token.access_token)
            .header("Content-Type", "application/json")
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "Failed to fetch user profile (status {status})"
            )));
        }
        let payload: UserEnvelope = resp.json().await?;
        Ok(Some(payload.user.into()))
    }
}

/// `{ "user": ... }` wrapper the backend puts around user records.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: BackendUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthUrlResponse {
    auth_url: String,
}

#[derive(Debug, Serialize)]
struct CallbackRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct CallbackResponse {
    token: String,
    user: BackendUser,
}
