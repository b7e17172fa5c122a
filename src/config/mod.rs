//! Configuration (layered: defaults < config file < environment < explicit overrides).

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::auth::backend::{BackendFlow, DEFAULT_BACKEND_URL};
use crate::auth::discord::{DiscordFlow, DEFAULT_API_BASE, DEFAULT_SCOPES};
use crate::auth::redirect::{RedirectTarget, DEFAULT_LOOPBACK_PORT};
use crate::auth::store::default_home_dir;
use crate::auth::{AuthFlow, AuthService, FileSessionStore, FlowKind, SessionStore, SessionStoreConfig};
use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variables read by [`AuthConfig::apply_env`].
pub const ENV_VARS: [&str; 8] = [
    "DISCORD_CLIENT_ID",
    "DISCORD_CLIENT_SECRET",
    "DISCORD_AUTH_SCOPES",
    "DISCORD_AUTH_BACKEND_URL",
    "DISCORD_API_BASE",
    "DISCORD_AUTH_REDIRECT_PORT",
    "DISCORD_AUTH_FLOW",
    "DISCORD_AUTH_HOME",
];

/// Resolved settings for a login client.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    pub flow: FlowKind,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scopes: Vec<String>,
    pub discord_api_base: String,
    pub backend_url: String,
    pub redirect_port: u16,
    /// Directory holding `config.toml` and the session files.
    pub home_dir: PathBuf,
    /// Session profile name, for keeping several logins side by side.
    pub profile: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            flow: FlowKind::Discord,
            client_id: None,
            client_secret: None,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            discord_api_base: DEFAULT_API_BASE.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            redirect_port: DEFAULT_LOOPBACK_PORT,
            home_dir: default_home_dir(),
            profile: "default".to_string(),
        }
    }
}

impl AuthConfig {
    /// Defaults, then the config file, then the environment (`.env` included).
    ///
    /// An explicit `path` must exist; the default `~/.discord-auth/config.toml`
    /// is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let lookup = |key: &str| std::env::var(key).ok();

        let mut config = Self::default();
        if let Some(home) = lookup("DISCORD_AUTH_HOME") {
            config.home_dir = PathBuf::from(home);
        }
        match path {
            Some(path) => config.apply_file(&ConfigFile::read(path)?)?,
            None => {
                let default_path = config.config_path();
                if default_path.exists() {
                    config.apply_file(&ConfigFile::read(&default_path)?)?;
                }
            }
        }
        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Environment only, on top of defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn config_path(&self) -> PathBuf {
        self.home_dir.join(CONFIG_FILE_NAME)
    }

    pub fn apply_file(&mut self, file: &ConfigFile) -> Result<()> {
        if let Some(flow) = file.flow.as_deref() {
            self.flow = parse_flow(flow)?;
        }
        if let Some(profile) = &file.profile {
            self.profile = profile.clone();
        }
        if let Some(discord) = &file.discord {
            if let Some(id) = &discord.client_id {
                self.client_id = Some(id.clone());
            }
            if let Some(secret) = &discord.client_secret {
                self.client_secret = Some(secret.clone());
            }
            if let Some(scopes) = &discord.scopes {
                self.scopes = scopes.clone();
            }
            if let Some(base) = &discord.api_base {
                self.discord_api_base = base.clone();
            }
        }
        if let Some(url) = file.backend.as_ref().and_then(|b| b.url.as_ref()) {
            self.backend_url = url.clone();
        }
        if let Some(port) = file.redirect.as_ref().and_then(|r| r.port) {
            self.redirect_port = port;
        }
        Ok(())
    }

    /// Overlay values from `lookup`, normally `std::env::var`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(id) = non_empty("DISCORD_CLIENT_ID") {
            self.client_id = Some(id);
        }
        if let Some(secret) = non_empty("DISCORD_CLIENT_SECRET") {
            self.client_secret = Some(secret);
        }
        if let Some(scopes) = non_empty("DISCORD_AUTH_SCOPES") {
            self.scopes = scopes
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(url) = non_empty("DISCORD_AUTH_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(base) = non_empty("DISCORD_API_BASE") {
            self.discord_api_base = base;
        }
        if let Some(port) = non_empty("DISCORD_AUTH_REDIRECT_PORT") {
            self.redirect_port = port.trim().parse().map_err(|_| {
                Error::Configuration(format!("DISCORD_AUTH_REDIRECT_PORT is not a port: {port}"))
            })?;
        }
        if let Some(flow) = non_empty("DISCORD_AUTH_FLOW") {
            self.flow = parse_flow(&flow)?;
        }
        if let Some(home) = non_empty("DISCORD_AUTH_HOME") {
            self.home_dir = PathBuf::from(home);
        }
        Ok(())
    }

    pub fn redirect_target(&self) -> RedirectTarget {
        RedirectTarget::loopback(self.redirect_port)
    }

    /// Construct the configured [`AuthFlow`].
    pub fn build_flow(&self) -> Result<Arc<dyn AuthFlow>> {
        match self.flow {
            FlowKind::Discord => {
                let client_id = self.client_id.as_deref().ok_or_else(|| {
                    Error::Configuration(
                        "Discord client id missing; set DISCORD_CLIENT_ID or discord.client_id"
                            .to_string(),
                    )
                })?;
                let mut flow = DiscordFlow::new(client_id)
                    .with_scopes(self.scopes.clone())
                    .with_api_base(self.discord_api_base.clone());
                if let Some(secret) = &self.client_secret {
                    flow = flow.with_client_secret(secret.clone());
                }
                Ok(Arc::new(flow))
            }
            FlowKind::Backend => Ok(Arc::new(BackendFlow::new(self.backend_url.clone()))),
        }
    }

    pub fn build_store(&self) -> Arc<dyn SessionStore> {
        Arc::new(FileSessionStore::new(SessionStoreConfig::new(
            self.home_dir.clone(),
        )))
    }

    pub fn build_service(&self) -> Result<AuthService> {
        Ok(AuthService::new(self.build_flow()?, self.build_store()).with_profile(self.profile.clone()))
    }
}

fn parse_flow(value: &str) -> Result<FlowKind> {
    FlowKind::from_str(value.trim()).map_err(|_| {
        Error::Configuration(format!("unknown flow '{value}' (expected discord or backend)"))
    })
}

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub flow: Option<String>,
    pub profile: Option<String>,
    pub discord: Option<DiscordSection>,
    pub backend: Option<BackendSection>,
    pub redirect: Option<RedirectSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordSection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedirectSection {
    pub port: Option<u16>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            Error::Configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::parse(&raw)
            .map_err(|err| Error::Configuration(format!("{}: {err}", path.display())))
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}
