//! CLI-specific error formatting for user-facing messages.

use crate::auth::AuthError;
use crate::error::{Error, RecoverySuggestion};

/// Map a handler error to a user-facing help string with actionable guidance.
pub fn format_error_help(err: &(dyn std::error::Error + 'static)) -> String {
    if let Some(err) = err.downcast_ref::<Error>() {
        return format_crate_error(err);
    }
    if let Some(err) = err.downcast_ref::<AuthError>() {
        return format_auth_error(err);
    }
    err.to_string()
}

fn format_crate_error(err: &Error) -> String {
    match err {
        Error::Auth(auth) => format_auth_error(auth),
        Error::Configuration(msg) => format!(
            "Configuration error: {msg}. Check your .env or ~/.discord-auth/config.toml"
        ),
        other => match other.recovery_suggestion() {
            RecoverySuggestion::RetryWithBackoff => {
                format!("{other}. The server may be unavailable; try again shortly.")
            }
            RecoverySuggestion::LoginAgain => {
                format!("{other}. Run: discord-auth login")
            }
            _ => other.to_string(),
        },
    }
}

fn format_auth_error(err: &AuthError) -> String {
    match err {
        AuthError::NotLoggedIn => "Not logged in. Run: discord-auth login".to_string(),
        AuthError::SessionExpired => {
            "Authentication expired. Run: discord-auth login".to_string()
        }
        AuthError::StateMismatch { .. } => {
            format!("{err}. The redirect did not come from this login attempt; try again.")
        }
        AuthError::ExpiredOrInvalidGrant => {
            "The authorization code expired or was already used. Run: discord-auth login"
                .to_string()
        }
        AuthError::Server { .. } | AuthError::RateLimited { .. } => {
            format!("{err}. Your session was kept; try again shortly.")
        }
        other => other.to_string(),
    }
}
