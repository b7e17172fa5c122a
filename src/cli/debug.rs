//! CLI debug handlers: run the backend handshake one step at a time.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::backend::BackendFlow;
use crate::auth::AuthService;
use crate::config::AuthConfig;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Handle `discord-auth debug health`.
pub async fn handle_health(config: AuthConfig) -> CliResult {
    let service = AuthService::new(
        Arc::new(BackendFlow::new(config.backend_url.clone())),
        config.build_store(),
    )
    .with_profile(config.profile.clone());
    let client = ApiClient::new(config.backend_url.clone(), Arc::new(service));
    println!("Backend: {}", client.base_url());
    let body = client.health().await?;
    println!("✅ {}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Handle `discord-auth debug auth-url`.
pub async fn handle_auth_url(config: AuthConfig, redirect_uri: Option<&str>) -> CliResult {
    let flow = BackendFlow::new(config.backend_url.clone());
    let redirect_uri = redirect_uri
        .map(str::to_string)
        .unwrap_or_else(|| config.redirect_target().uri());
    println!("Redirect URI: {redirect_uri}");
    let url = flow.auth_url(Some(&redirect_uri)).await?;
    println!("✅ {url}");
    Ok(())
}

/// Handle `discord-auth debug exchange --code CODE`. Nothing is stored.
pub async fn handle_exchange(config: AuthConfig, code: &str) -> CliResult {
    let flow = BackendFlow::new(config.backend_url.clone());
    let authorized = flow.exchange_code(code.trim()).await?;
    println!("✅ Exchange succeeded");
    println!("   Token: {}", token_preview(&authorized.token.access_token));
    println!("   User:  {}", authorized.user.tag());
    Ok(())
}

fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}… ({} chars)", token.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_preview_hides_the_tail() {
        assert_eq!(token_preview("abcdefghijklmnop"), "abcdefgh… (16 chars)");
        assert_eq!(token_preview("abc"), "abc… (3 chars)");
    }
}
