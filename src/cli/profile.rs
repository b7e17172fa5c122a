//! CLI profile command handlers.

use std::sync::Arc;

use crate::api::{ApiClient, ProfileApi, ProfileUpdate};
use crate::auth::{AuthError, AuthState, FlowKind};
use crate::config::AuthConfig;
use crate::error::Error;
use crate::profile::UserProfile;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Handle `discord-auth profile show`.
pub async fn handle_show(config: AuthConfig) -> CliResult {
    let service = config.build_service()?;
    match service.initialize().await {
        AuthState::Authenticated { user, .. } => {
            print_profile(&user);
            Ok(())
        }
        AuthState::Failed { message } => Err(message.into()),
        AuthState::Idle | AuthState::Loading => Err(AuthError::NotLoggedIn.into()),
    }
}

/// Handle `discord-auth profile update --username NAME`.
pub async fn handle_update(config: AuthConfig, username: &str) -> CliResult {
    if config.flow != FlowKind::Backend {
        return Err(Error::Configuration(
            "profile updates go through the backend; use --flow backend or DISCORD_AUTH_FLOW=backend"
                .to_string(),
        )
        .into());
    }
    let service = Arc::new(config.build_service()?);
    let client = ApiClient::new(config.backend_url.clone(), service);
    let user = ProfileApi::new(&client)
        .update(ProfileUpdate::username(username))
        .await?;
    println!("✅ Username updated to {}", user.username);
    Ok(())
}

fn print_profile(user: &UserProfile) {
    println!("{}", user.tag());
    if let Some(display_name) = &user.display_name {
        println!("  Display name: {display_name}");
    }
    println!("  Discord ID:   {}", user.discord_id);
    if user.id != user.discord_id {
        println!("  Account ID:   {}", user.id);
    }
    println!("  Email:        {}", user.email.as_deref().unwrap_or("Not provided"));
    if let Some(verified) = user.verified {
        println!("  Verified:     {}", if verified { "yes" } else { "no" });
    }
    if let Some(mfa) = user.mfa_enabled {
        println!("  2FA:          {}", if mfa { "enabled" } else { "disabled" });
    }
    println!("  Avatar:       {}", user.avatar_url());
    if let Some(created) = user.created_at.or_else(|| user.account_created_at()) {
        println!("  Member since: {}", created.format("%B %-d, %Y"));
    }
}
