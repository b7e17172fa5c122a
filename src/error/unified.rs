//! Error classification and recovery hints.

/// Broad error category, used to decide whether to retry, re-login or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Cancelled,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Storage,
    Unknown,
}

impl ErrorCategory {
    /// Classify a non-success HTTP status from the backend or Discord.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            408 => Self::Timeout,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Api,
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Timeout | Self::Server
        )
    }

    pub fn recovery(self) -> RecoverySuggestion {
        match self {
            Self::Authentication => RecoverySuggestion::LoginAgain,
            Self::Cancelled => RecoverySuggestion::None,
            Self::RateLimit | Self::Network | Self::Server => RecoverySuggestion::RetryWithBackoff,
            Self::Timeout => RecoverySuggestion::IncreaseTimeout,
            Self::Configuration => RecoverySuggestion::CheckConfiguration,
            Self::Storage => RecoverySuggestion::CheckStoragePermissions,
            Self::Api | Self::Serialization | Self::Unknown => RecoverySuggestion::ContactSupport,
        }
    }
}

/// What the user (or caller) can do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    LoginAgain,
    CheckConfiguration,
    CheckStoragePermissions,
    IncreaseTimeout,
    None,
    ContactSupport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_categories() {
        assert_eq!(ErrorCategory::from_status(401), ErrorCategory::Authentication);
        assert_eq!(ErrorCategory::from_status(403), ErrorCategory::Authentication);
        assert_eq!(ErrorCategory::from_status(408), ErrorCategory::Timeout);
        assert_eq!(ErrorCategory::from_status(429), ErrorCategory::RateLimit);
        assert_eq!(ErrorCategory::from_status(502), ErrorCategory::Server);
        assert_eq!(ErrorCategory::from_status(404), ErrorCategory::Api);
    }

    #[test]
    fn only_transport_and_server_categories_are_transient() {
        assert!(ErrorCategory::Server.is_transient());
        assert!(ErrorCategory::RateLimit.is_transient());
        assert!(!ErrorCategory::Authentication.is_transient());
        assert!(!ErrorCategory::Api.is_transient());
    }
}
