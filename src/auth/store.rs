use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::token::Token;
use crate::profile::UserProfile;

/// A persisted login: the token plus the last profile fetched with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: Token,
    pub user: Option<UserProfile>,
}

impl StoredSession {
    pub fn new(token: Token, user: Option<UserProfile>) -> Self {
        Self { token, user }
    }
}

/// Storage abstraction for persisted sessions, keyed by flow and profile.
pub trait SessionStore: Send + Sync {
    fn load(&self, flow: &str, profile: &str) -> Result<Option<StoredSession>, AuthError>;
    fn save(&self, flow: &str, profile: &str, session: &StoredSession) -> Result<(), AuthError>;
    fn clear(&self, flow: &str, profile: &str) -> Result<(), AuthError>;
}

/// Configuration for file-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub base_dir: PathBuf,
}

impl SessionStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_home_dir()
    }
}

/// File-backed session store using one TOML file per flow and profile.
///
/// # Example
/// ```no_run
/// use discord_auth::auth::{FileSessionStore, SessionStore, StoredSession, Token};
///
/// let store = FileSessionStore::new_default();
/// let session = StoredSession::new(Token::bearer("opaque-token"), None);
/// store.save("backend", "default", &session)?;
/// # Ok::<(), discord_auth::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_home_dir(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn session_path(&self, flow: &str, profile: &str) -> PathBuf {
        let flow = normalize_label(flow);
        let profile = normalize_label(profile);
        let name = if profile == "default" {
            format!("{flow}.toml")
        } else {
            format!("{flow}.{profile}.toml")
        };
        self.base_dir.join("sessions").join(name)
    }

    fn ensure_parent(path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, flow: &str, profile: &str) -> Result<Option<StoredSession>, AuthError> {
        let path = self.session_path(flow, profile);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let file: SessionFile = toml::from_str(&raw)?;
        if file.version != SESSION_FILE_VERSION {
            tracing::warn!(
                path = %path.display(),
                version = file.version,
                "ignoring session file with unknown version"
            );
            return Ok(None);
        }
        Ok(Some(StoredSession {
            token: file.token,
            user: file.user,
        }))
    }

    fn save(&self, flow: &str, profile: &str, session: &StoredSession) -> Result<(), AuthError> {
        let path = self.session_path(flow, profile);
        Self::ensure_parent(&path)?;
        let file = SessionFile {
            version: SESSION_FILE_VERSION,
            flow: flow.to_string(),
            profile: profile.to_string(),
            saved_at: Utc::now(),
            token: session.token.clone(),
            user: session.user.clone(),
        };
        let serialized = toml::to_string(&file)?;
        fs::write(&path, serialized)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        tracing::debug!(path = %path.display(), "session saved");
        Ok(())
    }

    fn clear(&self, flow: &str, profile: &str) -> Result<(), AuthError> {
        let path = self.session_path(flow, profile);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}

const SESSION_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    flow: String,
    profile: String,
    saved_at: DateTime<Utc>,
    token: Token,
    user: Option<UserProfile>,
}

/// `~/.discord-auth`, or `./.discord-auth` when no home directory is known.
pub(crate) fn default_home_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".discord-auth"))
        .unwrap_or_else(|| PathBuf::from(".discord-auth"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() || lower == '-' {
            out.push(lower);
        } else {
            out.push('-');
        }
    }
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
