//! CLI entry point for discord-auth.

pub mod auth;
pub mod debug;
pub mod errors;
pub mod profile;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::auth::FlowKind;
use crate::config::AuthConfig;

/// Discord login client
#[derive(Parser, Debug)]
#[command(
    name = "discord-auth",
    version,
    about = "Sign in with Discord and manage the local session"
)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ~/.discord-auth/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with Discord
    Login(LoginArgs),
    /// Show the current session
    Status,
    /// Sign out and forget the stored session
    Logout(LogoutArgs),
    /// Show or edit the signed-in profile
    Profile(ProfileArgs),
    /// Step through the backend handshake by hand
    Debug(DebugArgs),
}

/// Arguments for `discord-auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Flow to use (discord, backend)
    #[arg(long)]
    pub flow: Option<FlowKind>,

    /// Loopback port for the redirect listener (0 picks a free port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Print the URL and paste the redirect URL or code instead of listening
    #[arg(long)]
    pub paste: bool,

    /// Do not open the system browser
    #[arg(long)]
    pub no_browser: bool,
}

/// Arguments for `discord-auth logout`.
#[derive(Parser, Debug)]
pub struct LogoutArgs {
    /// Flow whose session to drop (discord, backend)
    #[arg(long)]
    pub flow: Option<FlowKind>,
}

/// Arguments for the `profile` subcommand group.
#[derive(Parser, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommands,
}

/// Profile subcommands.
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Print the signed-in user
    Show,
    /// Change the username (backend flow)
    Update(ProfileUpdateArgs),
}

#[derive(Parser, Debug)]
pub struct ProfileUpdateArgs {
    #[arg(long)]
    pub username: String,
}

/// Arguments for the `debug` subcommand group.
#[derive(Parser, Debug)]
pub struct DebugArgs {
    #[command(subcommand)]
    pub command: DebugCommands,
}

/// Debug subcommands, one per handshake step.
#[derive(Subcommand, Debug)]
pub enum DebugCommands {
    /// Check that the backend is reachable
    Health,
    /// Ask the backend for an authorize URL
    AuthUrl {
        /// Redirect URI to bind the URL to (default: the loopback URI)
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// Exchange an authorization code through the backend
    Exchange {
        #[arg(long)]
        code: String,
    },
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Fold per-command flags into the loaded configuration.
pub fn apply_overrides(config: &mut AuthConfig, flow: Option<FlowKind>, port: Option<u16>) {
    if let Some(flow) = flow {
        config.flow = flow;
    }
    if let Some(port) = port {
        config.redirect_port = port;
    }
}
