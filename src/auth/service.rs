use std::sync::{Arc, PoisonError, RwLock};

use chrono::Duration;

use super::browser::{AuthBrowser, BrowserOutcome};
use super::error::AuthError;
use super::flow::{AuthFlow, FlowKind};
use super::redirect::{code_preview, CallbackParams};
use super::store::{SessionStore, StoredSession};
use super::token::Token;
use crate::profile::UserProfile;

/// Tokens expiring within this window are refreshed before use.
const REFRESH_GRACE_MINUTES: i64 = 5;

/// Where the login session currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Idle,
    Loading,
    Authenticated { user: UserProfile, token: Token },
    Failed { message: String },
}

impl AuthState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Authenticated { .. } => "authenticated",
            Self::Failed { .. } => "error",
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            Self::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// How an interactive login ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated(UserProfile),
    Cancelled,
}

/// Session lifecycle on top of one [`AuthFlow`] and a [`SessionStore`].
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use discord_auth::auth::{AuthService, FileSessionStore};
/// use discord_auth::auth::backend::BackendFlow;
///
/// # async fn example() {
/// let service = AuthService::new(
///     Arc::new(BackendFlow::new("http://localhost:3000")),
///     Arc::new(FileSessionStore::new_default()),
/// );
/// let state = service.initialize().await;
/// println!("session is {}", state.label());
/// # }
/// ```
pub struct AuthService {
    flow: Arc<dyn AuthFlow>,
    store: Arc<dyn SessionStore>,
    profile: String,
    state: RwLock<AuthState>,
}

impl AuthService {
    pub fn new(flow: Arc<dyn AuthFlow>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            flow,
            store,
            profile: "default".to_string(),
            state: RwLock::new(AuthState::Idle),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn flow_kind(&self) -> FlowKind {
        self.flow.kind()
    }

    pub fn state(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// The persisted session, without contacting the server.
    pub fn stored_session(&self) -> Result<Option<StoredSession>, AuthError> {
        self.store.load(self.store_key(), &self.profile)
    }

    /// Restore the persisted session and verify it against the server.
    pub async fn initialize(&self) -> AuthState {
        self.set_state(AuthState::Loading);
        let next = match self.restore().await {
            Ok(state) => state,
            Err(err) => {
                tracing::error!(error = %err, "auth initialization failed");
                AuthState::Failed {
                    message: err.to_string(),
                }
            }
        };
        self.set_state(next.clone());
        next
    }

    async fn restore(&self) -> Result<AuthState, AuthError> {
        let Some(mut session) = self.stored_session()? else {
            return Ok(AuthState::Idle);
        };

        if session.token.is_expired() {
            if !session.token.can_refresh() {
                tracing::info!("stored token expired, clearing session");
                self.clear_store()?;
                return Ok(AuthState::Idle);
            }
            match self.flow.refresh(&session.token).await {
                Ok(token) => session.token = token,
                Err(err) if is_transient(&err) => return Err(err),
                Err(err) => {
                    tracing::info!(error = %err, "stored token could not be refreshed");
                    self.clear_store()?;
                    return Ok(AuthState::Idle);
                }
            }
        }

        match self.flow.fetch_profile(&session.token).await? {
            Some(user) => {
                session.user = Some(user.clone());
                self.persist(&session);
                Ok(AuthState::Authenticated {
                    user,
                    token: session.token,
                })
            }
            None => {
                tracing::info!("stored token rejected, clearing session");
                self.clear_store()?;
                Ok(AuthState::Idle)
            }
        }
    }

    /// Run the authorization-code handshake through `browser`.
    pub async fn login(
        &self,
        browser: &dyn AuthBrowser,
        redirect_uri: &str,
    ) -> Result<LoginOutcome, AuthError> {
        self.set_state(AuthState::Loading);
        match self.run_login(browser, redirect_uri).await {
            Ok(LoginOutcome::Authenticated(user)) => Ok(LoginOutcome::Authenticated(user)),
            Ok(LoginOutcome::Cancelled) => {
                tracing::info!("user cancelled authentication");
                self.set_state(AuthState::Idle);
                Ok(LoginOutcome::Cancelled)
            }
            Err(err) => {
                tracing::error!(error = %err, "login failed");
                self.set_state(AuthState::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_login(
        &self,
        browser: &dyn AuthBrowser,
        redirect_uri: &str,
    ) -> Result<LoginOutcome, AuthError> {
        tracing::info!(flow = %self.flow.kind(), %redirect_uri, "starting login");
        let request = self.flow.begin(redirect_uri).await?;

        let url = match browser
            .open_auth_session(&request.authorize_url, &request.redirect_uri)
            .await?
        {
            BrowserOutcome::Success { url } => url,
            BrowserOutcome::Cancel | BrowserOutcome::Dismiss => {
                return Ok(LoginOutcome::Cancelled);
            }
        };

        let code = CallbackParams::parse(&url).into_code(request.state.as_deref())?;
        tracing::debug!(code = %code_preview(&code), "authorization code received");

        let authorized = self.flow.complete(&request, &code).await?;
        let session = StoredSession::new(authorized.token.clone(), Some(authorized.user.clone()));
        self.store.save(self.store_key(), &self.profile, &session)?;

        tracing::info!(user = %authorized.user.username, "login successful");
        self.set_state(AuthState::Authenticated {
            user: authorized.user.clone(),
            token: authorized.token,
        });
        Ok(LoginOutcome::Authenticated(authorized.user))
    }

    /// Revoke (best effort) and forget the session.
    pub async fn logout(&self) -> Result<(), AuthError> {
        match self.stored_session() {
            Ok(Some(session)) => {
                if let Err(err) = self.flow.revoke(&session.token).await {
                    tracing::warn!(error = %err, "token revocation failed");
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "could not read session before logout"),
        }
        let cleared = self.clear_store();
        self.set_state(AuthState::Idle);
        cleared?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Re-verify the stored session. Logs out when it is no longer valid.
    pub async fn refresh(&self) -> bool {
        match self.try_refresh().await {
            Ok(true) => true,
            Ok(false) => false,
            Err(err) => {
                tracing::warn!(error = %err, "session refresh failed");
                self.logout_quietly().await;
                false
            }
        }
    }

    async fn try_refresh(&self) -> Result<bool, AuthError> {
        let Some(mut session) = self.stored_session()? else {
            return Ok(false);
        };
        if session.token.is_expired() {
            session.token = self.flow.refresh(&session.token).await?;
        }
        let Some(user) = self.flow.fetch_profile(&session.token).await? else {
            self.logout_quietly().await;
            return Ok(false);
        };
        session.user = Some(user.clone());
        self.persist(&session);
        self.set_state(AuthState::Authenticated {
            user,
            token: session.token,
        });
        Ok(true)
    }

    /// Bearer token for API calls, refreshed when close to expiry.
    ///
    /// `Ok(None)` when nobody is logged in. An expired token that cannot be
    /// refreshed ends the session with [`AuthError::SessionExpired`]. A token
    /// that has not expired yet is handed out when the refresh call fails for
    /// any reason but a rejected grant; transient failures on an expired
    /// token are returned without touching the session.
    pub async fn access_token(&self) -> Result<Option<String>, AuthError> {
        let Some(mut session) = self.stored_session()? else {
            return Ok(None);
        };
        let grace = Duration::minutes(REFRESH_GRACE_MINUTES);
        if !session.token.needs_refresh(grace) {
            return Ok(Some(session.token.access_token));
        }
        if session.token.can_refresh() {
            match self.flow.refresh(&session.token).await {
                Ok(token) => {
                    tracing::debug!("access token refreshed");
                    session.token = token;
                    self.persist(&session);
                    if let Some(user) = session.user.clone() {
                        self.set_state(AuthState::Authenticated {
                            user,
                            token: session.token.clone(),
                        });
                    }
                    return Ok(Some(session.token.access_token));
                }
                Err(AuthError::ExpiredOrInvalidGrant) => {
                    tracing::info!("refresh grant rejected");
                }
                Err(err) if !session.token.is_expired() => {
                    tracing::warn!(error = %err, "refresh failed, using current token");
                    return Ok(Some(session.token.access_token));
                }
                Err(err) if is_transient(&err) => return Err(err),
                Err(err) => tracing::info!(error = %err, "refresh rejected"),
            }
        } else if !session.token.is_expired() {
            return Ok(Some(session.token.access_token));
        }
        self.expire_session().await;
        Err(AuthError::SessionExpired)
    }

    /// The server rejected our token; drop the session.
    pub async fn expire_session(&self) {
        tracing::info!("session expired, logging out");
        self.logout_quietly().await;
    }

    /// Replace the cached profile, e.g. after a profile update.
    pub fn update_cached_user(&self, user: UserProfile) -> Result<(), AuthError> {
        let Some(mut session) = self.stored_session()? else {
            return Err(AuthError::NotLoggedIn);
        };
        session.user = Some(user.clone());
        self.store.save(self.store_key(), &self.profile, &session)?;
        self.set_state(AuthState::Authenticated {
            user,
            token: session.token,
        });
        Ok(())
    }

    async fn logout_quietly(&self) {
        if let Err(err) = self.logout().await {
            tracing::error!(error = %err, "logout failed");
        }
    }

    fn persist(&self, session: &StoredSession) {
        if let Err(err) = self.store.save(self.store_key(), &self.profile, session) {
            tracing::warn!(error = %err, "failed to persist session");
        }
    }

    fn clear_store(&self) -> Result<(), AuthError> {
        self.store.clear(self.store_key(), &self.profile)
    }

    fn store_key(&self) -> &'static str {
        self.flow.kind().store_key()
    }

    fn set_state(&self, next: AuthState) {
        tracing::debug!(state = next.label(), "auth state changed");
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

fn is_transient(err: &AuthError) -> bool {
    err.category().is_transient()
}
