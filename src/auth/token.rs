use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth token payload stored in a session store.
///
/// # Example
/// ```no_run
/// use discord_auth::auth::Token;
/// use chrono::Utc;
///
/// let token = Token {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     token_type: Some("Bearer".to_string()),
///     expires_at: None,
///     last_refresh: Some(Utc::now()),
///     scopes: Some(vec!["identify".to_string(), "email".to_string()]),
/// };
/// assert!(!token.is_expired());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub scopes: Option<Vec<String>>,
}

impl Token {
    /// Opaque bearer token with no expiry, as issued by the companion backend.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: Some("Bearer".to_string()),
            expires_at: None,
            last_refresh: Some(Utc::now()),
            scopes: None,
        }
    }

    /// Build a token from an OAuth token endpoint response.
    pub(crate) fn from_oauth_response(response: OAuthTokenResponse) -> Self {
        let now = Utc::now();
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type,
            expires_at: response.expires_in.and_then(|secs| expiry_after(now, secs)),
            last_refresh: Some(now),
            scopes: response.scope.map(|scope| {
                scope
                    .split_whitespace()
                    .map(str::to_string)
                    .collect()
            }),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires| expires <= Utc::now())
    }

    /// Whether the token expires within `grace`. Tokens without expiry never do.
    pub fn needs_refresh(&self, grace: Duration) -> bool {
        self.expires_at
            .and_then(|expires| expires.checked_sub_signed(grace))
            .is_some_and(|deadline| Utc::now() >= deadline)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// `now + secs`, or `None` when the lifetime does not fit a timestamp.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    let expiry = Duration::try_seconds(secs).and_then(|lifetime| now.checked_add_signed(lifetime));
    if expiry.is_none() {
        tracing::warn!(expires_in = secs, "token lifetime out of range, treating expiry as unknown");
    }
    expiry
}

/// Standard OAuth 2.0 token endpoint response body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OAuthTokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_expiring_in(delta: Duration) -> Token {
        Token {
            access_token: "a".to_string(),
            refresh_token: None,
            token_type: None,
            expires_at: Some(Utc::now() + delta),
            last_refresh: None,
            scopes: None,
        }
    }

    #[test]
    fn oauth_response_sets_absolute_expiry_and_scopes() {
        let token = Token::from_oauth_response(OAuthTokenResponse {
            access_token: "access".to_string(),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(604_800),
            refresh_token: Some("refresh".to_string()),
            scope: Some("identify email".to_string()),
        });

        assert_eq!(
            token.scopes,
            Some(vec!["identify".to_string(), "email".to_string()])
        );
        let expires = token.expires_at.expect("expiry");
        assert!(expires > Utc::now() + Duration::days(6));
        assert!(token.can_refresh());
    }

    #[test]
    fn out_of_range_lifetime_leaves_expiry_unknown() {
        for secs in [i64::MAX, i64::MIN] {
            let token = Token::from_oauth_response(OAuthTokenResponse {
                access_token: "access".to_string(),
                token_type: None,
                expires_in: Some(secs),
                refresh_token: None,
                scope: None,
            });
            assert!(token.expires_at.is_none());
            assert!(!token.is_expired());
        }
    }

    #[test]
    fn bearer_token_never_expires() {
        let token = Token::bearer("opaque");
        assert!(!token.is_expired());
        assert!(!token.needs_refresh(Duration::minutes(5)));
        assert!(!token.can_refresh());
    }

    #[test]
    fn expired_token_is_detected() {
        assert!(token_expiring_in(Duration::seconds(-1)).is_expired());
        assert!(!token_expiring_in(Duration::hours(1)).is_expired());
    }

    #[test]
    fn token_within_grace_needs_refresh() {
        let token = token_expiring_in(Duration::minutes(2));
        assert!(token.needs_refresh(Duration::minutes(5)));
        assert!(!token.needs_refresh(Duration::minutes(1)));
    }
}
