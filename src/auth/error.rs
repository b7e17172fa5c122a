use thiserror::Error;

use crate::error::ErrorCategory;

/// Normalized authentication errors across both login flows.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Authentication cancelled")]
    Cancelled,
    #[error("Authentication expired")]
    SessionExpired,
    #[error("Discord OAuth error: {error}")]
    Provider {
        error: String,
        description: Option<String>,
    },
    #[error("No authorization code received")]
    MissingCode,
    #[error("OAuth state mismatch: expected {expected}, got {received}")]
    StateMismatch { expected: String, received: String },
    #[error("Expired or invalid grant")]
    ExpiredOrInvalidGrant,
    #[error("{0}")]
    TokenExchange(String),
    #[error("Rate limited")]
    RateLimited { retry_after_ms: Option<u64> },
    /// 5xx or 408 from Discord; the grant itself was not judged.
    #[error("Discord is unavailable (HTTP {status})")]
    Server { status: u16 },
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotLoggedIn
            | Self::SessionExpired
            | Self::Provider { .. }
            | Self::MissingCode
            | Self::StateMismatch { .. }
            | Self::ExpiredOrInvalidGrant => ErrorCategory::Authentication,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Server { status } => ErrorCategory::from_status(*status),
            Self::Network(_) => ErrorCategory::Network,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::TokenExchange(_) | Self::InvalidResponse(_) => ErrorCategory::Api,
            Self::Unsupported(_) => ErrorCategory::Unknown,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<url::ParseError> for AuthError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidResponse(format!("invalid URL: {error}"))
    }
}
