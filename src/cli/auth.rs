//! CLI auth command handlers for login, status, and logout.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{apply_overrides, LoginArgs, LogoutArgs};
use crate::auth::{AuthBrowser, AuthError, AuthState, BrowserOutcome, LoginOutcome, LoopbackBrowser};
use crate::config::AuthConfig;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Handle `discord-auth login`.
pub async fn handle_login(mut config: AuthConfig, args: &LoginArgs) -> CliResult {
    apply_overrides(&mut config, args.flow, args.port);
    let service = config.build_service()?;

    if let AuthState::Authenticated { user, .. } = service.initialize().await {
        println!("✅ Already logged in as {} ({})", user.tag(), service.flow_kind());
        println!("   Run `discord-auth logout` to switch accounts.");
        return Ok(());
    }

    let outcome = if args.paste {
        let redirect_uri = config.redirect_target().uri();
        service.login(&PasteBrowser, &redirect_uri).await?
    } else {
        let listener = LoopbackBrowser::bind(&config.redirect_target())
            .await?
            .with_browser(!args.no_browser);
        let redirect_uri = listener.redirect_uri();
        let browser = AnnouncingBrowser {
            inner: &listener,
            opens_browser: !args.no_browser,
        };
        service.login(&browser, &redirect_uri).await?
    };

    match outcome {
        LoginOutcome::Authenticated(user) => {
            println!("✅ Logged in as {}", user.tag());
            if let Some(email) = &user.email {
                println!("   Email: {email}");
            }
        }
        LoginOutcome::Cancelled => println!("Login cancelled."),
    }
    Ok(())
}

/// Handle `discord-auth status`.
pub async fn handle_status(config: AuthConfig) -> CliResult {
    let service = config.build_service()?;
    let state = service.initialize().await;
    println!("Flow:  {}", service.flow_kind());
    println!("State: {}", state.label());

    match state {
        AuthState::Authenticated { user, token } => {
            println!("User:  {}", user.tag());
            match token.expires_at {
                Some(expires_at) => println!("Token expires: {}", expires_at.to_rfc3339()),
                None => println!("Token expires: never (server session)"),
            }
            if let Some(scopes) = token.scopes.filter(|s| !s.is_empty()) {
                println!("Scopes: {}", scopes.join(" "));
            }
        }
        AuthState::Failed { message } => println!("Error: {message}"),
        AuthState::Idle | AuthState::Loading => println!("Not logged in."),
    }
    Ok(())
}

/// Handle `discord-auth logout`.
pub async fn handle_logout(mut config: AuthConfig, args: &LogoutArgs) -> CliResult {
    apply_overrides(&mut config, args.flow, None);
    let service = config.build_service()?;
    let had_session = service.stored_session()?.is_some();
    service.logout().await?;
    if had_session {
        println!("✅ Logged out ({})", service.flow_kind());
    } else {
        println!("No stored session for {}.", service.flow_kind());
    }
    Ok(())
}

/// Prints the authorize URL before handing off to the loopback listener.
struct AnnouncingBrowser<'a> {
    inner: &'a LoopbackBrowser,
    opens_browser: bool,
}

#[async_trait]
impl AuthBrowser for AnnouncingBrowser<'_> {
    async fn open_auth_session(
        &self,
        authorize_url: &str,
        redirect_uri: &str,
    ) -> Result<BrowserOutcome, AuthError> {
        if self.opens_browser {
            println!("🔗 Opening your browser. If it does not open, visit:");
        } else {
            println!("🔗 Visit:");
        }
        println!("   {authorize_url}");
        println!("⏳ Waiting for Discord to redirect to {redirect_uri} ...");
        self.inner.open_auth_session(authorize_url, redirect_uri).await
    }
}

/// Shows the URL and reads the redirect URL (or bare code) from stdin.
struct PasteBrowser;

#[async_trait]
impl AuthBrowser for PasteBrowser {
    async fn open_auth_session(
        &self,
        authorize_url: &str,
        _redirect_uri: &str,
    ) -> Result<BrowserOutcome, AuthError> {
        println!("🔗 Visit: {authorize_url}");
        println!("📋 Paste the URL you were redirected to (or just the code), empty to cancel:");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        Ok(pasted_outcome(&line))
    }
}

fn pasted_outcome(input: &str) -> BrowserOutcome {
    let input = input.trim();
    if input.is_empty() {
        BrowserOutcome::Cancel
    } else {
        BrowserOutcome::Success {
            url: input.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_paste_cancels() {
        assert_eq!(pasted_outcome("  \n"), BrowserOutcome::Cancel);
    }

    #[test]
    fn pasted_input_is_trimmed() {
        assert_eq!(
            pasted_outcome("http://127.0.0.1:53682/auth/callback?code=abc\n"),
            BrowserOutcome::Success {
                url: "http://127.0.0.1:53682/auth/callback?code=abc".to_string()
            }
        );
    }
}
