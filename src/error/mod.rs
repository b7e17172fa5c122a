//! Crate-level error type.
//!
//! Flow, store and callback failures are [`AuthError`]s; this type adds
//! configuration, backend API and transport failures around them.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-success response from the backend API. `retry_after_ms` comes
    /// from a `Retry-After` header.
    #[error("HTTP {status}: {message}")]
    Api {
        status: u16,
        message: String,
        retry_after_ms: Option<u64>,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            retry_after_ms: None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Api { status, .. } => ErrorCategory::from_status(*status),
            Self::Auth(auth) => auth.category(),
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::InvalidArgument(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether [`RetryPolicy`](crate::util::retry::RetryPolicy) should try again.
    pub fn is_retryable(&self) -> bool {
        self.category().is_transient()
    }

    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        self.category().recovery()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
