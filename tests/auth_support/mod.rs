#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use discord_auth::auth::{AuthBrowser, AuthError, BrowserOutcome, SessionStore, StoredSession, Token};
use discord_auth::profile::UserProfile;
use serde_json::{json, Value};
use url::Url;

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<(String, String), StoredSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, flow: &str, profile: &str, session: StoredSession) {
        self.sessions
            .lock()
            .expect("store lock poisoned")
            .insert((flow.to_string(), profile.to_string()), session);
    }

    pub fn get(&self, flow: &str, profile: &str) -> Option<StoredSession> {
        self.sessions
            .lock()
            .expect("store lock poisoned")
            .get(&(flow.to_string(), profile.to_string()))
            .cloned()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, flow: &str, profile: &str) -> Result<Option<StoredSession>, AuthError> {
        Ok(self.get(flow, profile))
    }

    fn save(&self, flow: &str, profile: &str, session: &StoredSession) -> Result<(), AuthError> {
        self.seed(flow, profile, session.clone());
        Ok(())
    }

    fn clear(&self, flow: &str, profile: &str) -> Result<(), AuthError> {
        self.sessions
            .lock()
            .expect("store lock poisoned")
            .remove(&(flow.to_string(), profile.to_string()));
        Ok(())
    }
}

/// What the scripted browser does once it is handed the authorize URL.
#[derive(Debug, Clone)]
pub enum Script {
    /// Redirect back with `code` and whatever `state` the authorize URL carried.
    Approve { code: String },
    /// Redirect back with `code` and a forged state.
    ForgedState { code: String },
    /// Redirect back with an OAuth error.
    Deny { error: String },
    /// Return a fixed outcome.
    Outcome(BrowserOutcome),
}

/// Stands in for the system browser and records what it was asked to open.
pub struct ScriptedBrowser {
    script: Script,
    opened: Mutex<Vec<String>>,
}

impl ScriptedBrowser {
    pub fn approve(code: &str) -> Self {
        Self::new(Script::Approve {
            code: code.to_string(),
        })
    }

    pub fn new(script: Script) -> Self {
        Self {
            script,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("browser lock poisoned").clone()
    }
}

#[async_trait]
impl AuthBrowser for ScriptedBrowser {
    async fn open_auth_session(
        &self,
        authorize_url: &str,
        redirect_uri: &str,
    ) -> Result<BrowserOutcome, AuthError> {
        self.opened
            .lock()
            .expect("browser lock poisoned")
            .push(authorize_url.to_string());

        let state = Url::parse(authorize_url)
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "state")
                    .map(|(_, value)| value.into_owned())
            });

        let outcome = match &self.script {
            Script::Approve { code } => {
                let mut url = format!("{redirect_uri}?code={code}");
                if let Some(state) = state {
                    url.push_str(&format!("&state={state}"));
                }
                BrowserOutcome::Success { url }
            }
            Script::ForgedState { code } => BrowserOutcome::Success {
                url: format!("{redirect_uri}?code={code}&state=forged"),
            },
            Script::Deny { error } => BrowserOutcome::Success {
                url: format!("{redirect_uri}?error={error}&error_description=The+user+denied"),
            },
            Script::Outcome(outcome) => outcome.clone(),
        };
        Ok(outcome)
    }
}

pub const REDIRECT_URI: &str = "http://127.0.0.1:53682/auth/callback";

pub fn discord_user_json() -> Value {
    json!({
        "id": "80351110224678912",
        "username": "nelly",
        "discriminator": "0",
        "global_name": "Nelly",
        "avatar": "8342729096ea3675442027381ff50dfe",
        "email": "nelly@discord.com",
        "verified": true,
        "mfa_enabled": false,
        "locale": "en-US"
    })
}

pub fn backend_user_json(username: &str) -> Value {
    json!({
        "id": "6650a1f2c3",
        "discordId": "80351110224678912",
        "username": username,
        "email": "nelly@discord.com",
        "avatar": "8342729096ea3675442027381ff50dfe",
        "createdAt": "2024-05-24T10:00:00Z",
        "updatedAt": "2024-05-24T10:00:00Z"
    })
}

pub fn user(username: &str) -> UserProfile {
    UserProfile {
        id: "80351110224678912".to_string(),
        discord_id: "80351110224678912".to_string(),
        username: username.to_string(),
        display_name: None,
        discriminator: None,
        email: None,
        avatar: None,
        verified: None,
        mfa_enabled: None,
        created_at: None,
        updated_at: None,
    }
}

/// A token that expires in `minutes` (negative for already expired).
pub fn discord_token(access_token: &str, refresh_token: Option<&str>, minutes: i64) -> Token {
    Token {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        token_type: Some("Bearer".to_string()),
        expires_at: Some(Utc::now() + Duration::minutes(minutes)),
        last_refresh: Some(Utc::now()),
        scopes: Some(vec!["identify".to_string(), "email".to_string()]),
    }
}

pub fn session(token: Token, username: &str) -> StoredSession {
    StoredSession::new(token, Some(user(username)))
}
