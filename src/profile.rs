//! User profile records mirrored from Discord and the companion backend.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const DISCORD_CDN: &str = "https://cdn.discordapp.com";
/// First second of 2015, the Discord snowflake epoch, in milliseconds.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Response body of Discord's `GET /users/@me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub mfa_enabled: Option<bool>,
    #[serde(default)]
    pub locale: Option<String>,
}

/// User record returned by the companion backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendUser {
    pub id: String,
    pub discord_id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Unified profile shown after login, whichever flow produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Account id in the system that issued the session.
    pub id: String,
    pub discord_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub discriminator: Option<String>,
    pub email: Option<String>,
    /// Discord avatar hash.
    pub avatar: Option<String>,
    pub verified: Option<bool>,
    pub mfa_enabled: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<DiscordUser> for UserProfile {
    fn from(user: DiscordUser) -> Self {
        Self {
            discord_id: user.id.clone(),
            id: user.id,
            username: user.username,
            display_name: user.global_name,
            discriminator: user.discriminator,
            email: user.email,
            avatar: user.avatar,
            verified: user.verified,
            mfa_enabled: user.mfa_enabled,
            created_at: None,
            updated_at: None,
        }
    }
}

impl From<BackendUser> for UserProfile {
    fn from(user: BackendUser) -> Self {
        Self {
            id: user.id,
            discord_id: user.discord_id,
            username: user.username,
            display_name: None,
            discriminator: None,
            email: user.email,
            avatar: user.avatar,
            verified: None,
            mfa_enabled: None,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl UserProfile {
    /// `username#1234` for legacy accounts, `@username` for migrated ones.
    pub fn tag(&self) -> String {
        match self.legacy_discriminator() {
            Some(disc) => format!("{}#{disc}", self.username),
            None => format!("@{}", self.username),
        }
    }

    /// CDN URL of the user's avatar, falling back to Discord's default avatar.
    pub fn avatar_url(&self) -> String {
        match self.avatar.as_deref().filter(|hash| !hash.is_empty()) {
            Some(hash) => {
                let ext = if hash.starts_with("a_") { "gif" } else { "png" };
                format!("{DISCORD_CDN}/avatars/{}/{hash}.{ext}", self.discord_id)
            }
            None => format!(
                "{DISCORD_CDN}/embed/avatars/{}.png",
                self.default_avatar_index()
            ),
        }
    }

    /// Account creation time encoded in the Discord snowflake id.
    pub fn account_created_at(&self) -> Option<DateTime<Utc>> {
        let snowflake: u64 = self.discord_id.parse().ok()?;
        let millis = i64::try_from(snowflake >> 22).ok()? + DISCORD_EPOCH_MS;
        Utc.timestamp_millis_opt(millis).single()
    }

    fn legacy_discriminator(&self) -> Option<&str> {
        self.discriminator
            .as_deref()
            .filter(|disc| !disc.is_empty() && *disc != "0")
    }

    fn default_avatar_index(&self) -> u64 {
        if let Some(disc) = self.legacy_discriminator() {
            return disc.parse::<u64>().map(|n| n % 5).unwrap_or(0);
        }
        self.discord_id
            .parse::<u64>()
            .map(|id| (id >> 22) % 6)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn discord_user() -> DiscordUser {
        serde_json::from_value(json!({
            "id": "80351110224678912",
            "username": "nelly",
            "discriminator": "1337",
            "global_name": "Nelly",
            "avatar": "8342729096ea3675442027381ff50dfe",
            "email": "nelly@discord.com",
            "verified": true,
            "mfa_enabled": false
        }))
        .unwrap()
    }

    #[test]
    fn discord_user_converts_to_profile() {
        let profile = UserProfile::from(discord_user());
        assert_eq!(profile.id, "80351110224678912");
        assert_eq!(profile.discord_id, "80351110224678912");
        assert_eq!(profile.display_name.as_deref(), Some("Nelly"));
        assert_eq!(profile.verified, Some(true));
    }

    #[test]
    fn backend_user_deserializes_camel_case() {
        let user: BackendUser = serde_json::from_value(json!({
            "id": "u_1",
            "discordId": "80351110224678912",
            "username": "nelly",
            "createdAt": "2025-07-01T10:00:00Z",
            "updatedAt": "2025-07-02T10:00:00Z"
        }))
        .unwrap();
        let profile = UserProfile::from(user);
        assert_eq!(profile.id, "u_1");
        assert_eq!(profile.discord_id, "80351110224678912");
        assert!(profile.email.is_none());
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn tag_uses_legacy_discriminator_only_when_meaningful() {
        let mut profile = UserProfile::from(discord_user());
        assert_eq!(profile.tag(), "nelly#1337");
        profile.discriminator = Some("0".to_string());
        assert_eq!(profile.tag(), "@nelly");
    }

    #[test]
    fn avatar_url_picks_extension_from_hash() {
        let mut profile = UserProfile::from(discord_user());
        assert_eq!(
            profile.avatar_url(),
            "https://cdn.discordapp.com/avatars/80351110224678912/8342729096ea3675442027381ff50dfe.png"
        );
        profile.avatar = Some("a_abc".to_string());
        assert!(profile.avatar_url().ends_with("/a_abc.gif"));
    }

    #[test]
    fn missing_avatar_falls_back_to_default_avatar() {
        let mut profile = UserProfile::from(discord_user());
        profile.avatar = None;
        assert_eq!(
            profile.avatar_url(),
            "https://cdn.discordapp.com/embed/avatars/2.png"
        );
    }

    #[test]
    fn account_creation_time_comes_from_snowflake() {
        let profile = UserProfile::from(discord_user());
        let created = profile.account_created_at().expect("valid snowflake");
        assert_eq!(created.format("%Y-%m-%d").to_string(), "2015-08-10");
    }

    #[test]
    fn non_numeric_id_has_no_creation_time() {
        let mut profile = UserProfile::from(discord_user());
        profile.discord_id = "not-a-snowflake".to_string();
        assert!(profile.account_created_at().is_none());
    }
}
