//! discord-auth: Discord OAuth login for native clients.
//!
//! Two authorization-code flows share one session lifecycle:
//! a direct PKCE flow against Discord, and a flow brokered by a companion
//! backend that holds the client secret and issues its own session token.
//! Sessions persist locally and expired ones trigger re-authentication.
//!
//! # Quick Start
//!
//! ```no_run
//! use discord_auth::auth::{LoginOutcome, LoopbackBrowser};
//! use discord_auth::config::AuthConfig;
//!
//! # async fn example() -> discord_auth::error::Result<()> {
//! let config = AuthConfig::load(None)?;
//! let service = config.build_service()?;
//! let browser = LoopbackBrowser::bind(&config.redirect_target()).await?;
//! if let LoginOutcome::Authenticated(user) =
//!     service.login(&browser, &browser.redirect_uri()).await?
//! {
//!     println!("signed in as {}", user.tag());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod profile;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
