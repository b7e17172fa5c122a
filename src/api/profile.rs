use reqwest::Method;
use serde::Serialize;

use super::ApiClient;
use crate::auth::backend::{UserEnvelope, PROFILE_PATH};
use crate::error::{Error, Result};
use crate::profile::UserProfile;

/// Fields a user may change on their backend profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub username: String,
}

impl ProfileUpdate {
    pub fn username(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// Read and edit the signed-in user's backend profile.
pub struct ProfileApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ProfileApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn fetch(&self) -> Result<UserProfile> {
        let envelope: UserEnvelope = self.client.get(PROFILE_PATH).await?;
        Ok(envelope.user.into())
    }

    /// Rename the user. The stored session's cached profile follows.
    pub async fn update(&self, update: ProfileUpdate) -> Result<UserProfile> {
        let username = update.username.trim();
        if username.is_empty() {
            return Err(Error::InvalidArgument("Username cannot be empty".to_string()));
        }
        let body = serde_json::to_value(ProfileUpdate::username(username))?;
        let envelope: UserEnvelope = self
            .client
            .call(Method::PUT, PROFILE_PATH, Some(&body))
            .await?;
        let user: UserProfile = envelope.user.into();
        self.client.service().update_cached_user(user.clone())?;
        tracing::info!(username = %user.username, "profile updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_body_serializes_username_only() {
        let body = serde_json::to_value(ProfileUpdate::username("neo")).unwrap();
        assert_eq!(body, serde_json::json!({ "username": "neo" }));
    }
}
