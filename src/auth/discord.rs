use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::error::AuthError;
use super::flow::{AuthFlow, Authorized, AuthorizationRequest, FlowKind};
use super::pkce::{random_state, PkcePair};
use super::token::{OAuthTokenResponse, Token};
use crate::profile::{DiscordUser, UserProfile};
use crate::util::retry::retry_after_ms;

pub const DEFAULT_AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
pub const DEFAULT_API_BASE: &str = "https://discord.com/api";
pub const DEFAULT_SCOPES: &[&str] = &["identify", "email"];

/// Discord OAuth2 client talking to Discord directly.
///
/// Runs as a public client with PKCE; a client secret is only sent when one
/// is configured.
///
/// # Example
/// ```no_run
/// use discord_auth::auth::discord::DiscordFlow;
///
/// let flow = DiscordFlow::new("1390146554366529648")
///     .with_scopes(["identify", "email", "guilds"]);
/// ```
#[derive(Debug, Clone)]
pub struct DiscordFlow {
    client: reqwest::Client,
    client_id: String,
    client_secret: Option<String>,
    scopes: Vec<String>,
    authorize_url: String,
    api_base: String,
    prompt: Option<String>,
}

impl DiscordFlow {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret: None,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            prompt: None,
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    /// `consent` forces the consent screen; `none` skips it for returning users.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.api_base)
    }

    fn revoke_url(&self) -> String {
        format!("{}/oauth2/token/revoke", self.api_base)
    }

    fn current_user_url(&self) -> String {
        format!("{}/users/@me", self.api_base)
    }

    fn client_form<'a>(&'a self, mut form: Vec<(&'a str, &'a str)>) -> Vec<(&'a str, &'a str)> {
        form.push(("client_id", self.client_id.as_str()));
        if let Some(secret) = self.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
        form
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<Token, AuthError> {
        let resp = self
            .client
            .post(self.token_url())
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AuthError::RateLimited {
                retry_after_ms: retry_after_ms(resp.headers()),
            });
        }
        if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            tracing::debug!(%status, "discord token endpoint unavailable");
            return Err(AuthError::Server {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let error: Option<DiscordErrorResponse> = serde_json::from_str(&body).ok();
            tracing::debug!(%status, body = %body, "discord token endpoint rejected request");
            if let Some(error) = error {
                if error.error.as_deref() == Some("invalid_grant") {
                    return Err(AuthError::ExpiredOrInvalidGrant);
                }
                if let Some(message) = error.error_description.or(error.error) {
                    return Err(AuthError::TokenExchange(message));
                }
            }
            return Err(AuthError::TokenExchange("Token exchange failed".to_string()));
        }
        let payload: OAuthTokenResponse = resp.json().await?;
        Ok(Token::from_oauth_response(payload))
    }
}

#[async_trait]
impl AuthFlow for DiscordFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Discord
    }

    async fn begin(&self, redirect_uri: &str) -> Result<AuthorizationRequest, AuthError> {
        let state = random_state();
        let pkce = PkcePair::generate();
        let scope = self.scopes.join(" ");

        let mut url = Url::parse(&self.authorize_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", &scope)
                .append_pair("state", &state)
                .append_pair("code_challenge", &pkce.code_challenge)
                .append_pair("code_challenge_method", PkcePair::METHOD);
            if let Some(prompt) = self.prompt.as_deref() {
                query.append_pair("prompt", prompt);
            }
        }

        Ok(AuthorizationRequest {
            authorize_url: url.into(),
            redirect_uri: redirect_uri.to_string(),
            state: Some(state),
            code_verifier: Some(pkce.code_verifier),
        })
    }

    async fn complete(
        &self,
        request: &AuthorizationRequest,
        code: &str,
    ) -> Result<Authorized, AuthError> {
        tracing::debug!("exchanging authorization code with discord");
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", request.redirect_uri.as_str()),
        ];
        if let Some(verifier) = request.code_verifier.as_deref() {
            form.push(("code_verifier", verifier));
        }
        let token = self.post_token_form(&self.client_form(form)).await?;
        let user = self
            .fetch_profile(&token)
            .await?
            .ok_or_else(|| AuthError::InvalidResponse("Failed to get user info".to_string()))?;
        Ok(Authorized { token, user })
    }

    async fn fetch_profile(&self, token: &Token) -> Result<Option<UserProfile>, AuthError> {
        let resp = self
            .client
            .get(self.current_user_url())
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AuthError::RateLimited {
                retry_after_ms: retry_after_ms(resp.headers()),
            });
        }
        if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            return Err(AuthError::Server {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "Failed to get user info (status {status})"
            )));
        }
        let user: DiscordUser = resp.json().await?;
        Ok(Some(user.into()))
    }

    async fn refresh(&self, token: &Token) -> Result<Token, AuthError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(AuthError::ExpiredOrInvalidGrant)?;
        let form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let mut refreshed = self.post_token_form(&self.client_form(form)).await?;
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = token.refresh_token.clone();
        }
        if refreshed.scopes.is_none() {
            refreshed.scopes = token.scopes.clone();
        }
        Ok(refreshed)
    }

    async fn revoke(&self, token: &Token) -> Result<(), AuthError> {
        let form = vec![
            ("token", token.access_token.as_str()),
            ("token_type_hint", "access_token"),
        ];
        let resp = self
            .client
            .post(self.revoke_url())
            .form(&self.client_form(form))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "Token revocation failed with status {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DiscordErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn authorize_url_carries_pkce_and_scopes() {
        let flow = DiscordFlow::new("client-1").with_prompt("consent");
        let request = flow
            .begin("http://127.0.0.1:53682/auth/callback")
            .await
            .unwrap();

        let url = Url::parse(&request.authorize_url).unwrap();
        assert_eq!(url.host_str(), Some("discord.com"));
        assert_eq!(url.path(), "/oauth2/authorize");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "client-1");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:53682/auth/callback");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["scope"], "identify email");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["prompt"], "consent");
        assert_eq!(Some(pairs["state"].as_str()), request.state.as_deref());
        let verifier = request.code_verifier.unwrap();
        assert_eq!(
            pairs["code_challenge"],
            super::super::pkce::compute_code_challenge(&verifier)
        );
    }

    #[tokio::test]
    async fn every_request_gets_a_fresh_state() {
        let flow = DiscordFlow::new("client-1");
        let a = flow.begin("akademi-crypto://").await.unwrap();
        let b = flow.begin("akademi-crypto://").await.unwrap();
        assert_ne!(a.state, b.state);
        assert_ne!(a.code_verifier, b.code_verifier);
    }

    #[test]
    fn client_form_includes_secret_only_when_configured() {
        let public = DiscordFlow::new("id");
        let form = public.client_form(vec![("grant_type", "x")]);
        assert!(!form.iter().any(|(k, _)| *k == "client_secret"));

        let confidential = DiscordFlow::new("id").with_client_secret("shh");
        let form = confidential.client_form(vec![]);
        assert!(form.contains(&("client_secret", "shh")));
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let flow = DiscordFlow::new("id").with_api_base("http://localhost:9000/api/");
        assert_eq!(flow.token_url(), "http://localhost:9000/api/oauth2/token");
        assert_eq!(flow.current_user_url(), "http://localhost:9000/api/users/@me");
    }
}
