//! discord-auth binary entry point.

use discord_auth::cli::{self, Cli, Commands, DebugCommands, ProfileCommands};
use discord_auth::config::AuthConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let opts = Cli::parse_args();
    init_tracing(opts.verbose);

    let config = match AuthConfig::load(opts.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", cli::errors::format_error_help(&e));
            std::process::exit(1);
        }
    };

    let result = match opts.command {
        Commands::Login(args) => cli::auth::handle_login(config, &args).await,
        Commands::Status => cli::auth::handle_status(config).await,
        Commands::Logout(args) => cli::auth::handle_logout(config, &args).await,
        Commands::Profile(profile) => match profile.command {
            ProfileCommands::Show => cli::profile::handle_show(config).await,
            ProfileCommands::Update(args) => {
                cli::profile::handle_update(config, &args.username).await
            }
        },
        Commands::Debug(debug) => match debug.command {
            DebugCommands::Health => cli::debug::handle_health(config).await,
            DebugCommands::AuthUrl { redirect_uri } => {
                cli::debug::handle_auth_url(config, redirect_uri.as_deref()).await
            }
            DebugCommands::Exchange { code } => cli::debug::handle_exchange(config, &code).await,
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", cli::errors::format_error_help(e.as_ref()));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("discord_auth=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("discord_auth=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
