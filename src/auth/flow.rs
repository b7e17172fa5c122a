use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::error::AuthError;
use super::token::Token;
use crate::profile::UserProfile;

/// Which authorization-code flow a session came from. Also the store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FlowKind {
    /// Straight against Discord's OAuth endpoints.
    Discord,
    /// Through the companion backend, which holds the client secret.
    Backend,
}

impl FlowKind {
    pub fn store_key(self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Backend => "backend",
        }
    }
}

/// An authorize URL plus whatever must be remembered until the redirect.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub authorize_url: String,
    pub redirect_uri: String,
    pub state: Option<String>,
    pub code_verifier: Option<String>,
}

/// Result of a successful code exchange.
#[derive(Debug, Clone)]
pub struct Authorized {
    pub token: Token,
    pub user: UserProfile,
}

/// One way of running the OAuth authorization-code grant.
#[async_trait]
pub trait AuthFlow: Send + Sync {
    fn kind(&self) -> FlowKind;

    /// Build the URL the user must visit.
    async fn begin(&self, redirect_uri: &str) -> Result<AuthorizationRequest, AuthError>;

    /// Exchange the authorization code and fetch the user it belongs to.
    async fn complete(
        &self,
        request: &AuthorizationRequest,
        code: &str,
    ) -> Result<Authorized, AuthError>;

    /// Fetch the profile for `token`. `Ok(None)` means the token was rejected.
    async fn fetch_profile(&self, token: &Token) -> Result<Option<UserProfile>, AuthError>;

    async fn refresh(&self, _token: &Token) -> Result<Token, AuthError> {
        Err(AuthError::Unsupported(format!(
            "token refresh is not available for the {} flow",
            self.kind()
        )))
    }

    async fn revoke(&self, _token: &Token) -> Result<(), AuthError> {
        Ok(())
    }
}
