use tracing::debug;
use tracing_subscriber::EnvFilter;

use wagerline::{ClientConfig, Error, Result};

mod app_config;
mod app_state;
mod commands;

use app_config::{AdminCommands, Cli, CoinCommands, Commands};
use app_state::WagerlineApp;
use commands::commands as cmd;

#[tokio::main]
async fn main() {
    use clap::Parser;

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("❌ {}", e.user_message());
        if e.requires_login() {
            eprintln!("🔑 Run 'wagerline login <username>' to sign in again.");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut builder = ClientConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        builder = builder.base_url(url);
    }
    if let Some(path) = cli.credentials {
        builder = builder.credentials_path(path);
    }
    let config = builder.build()?;

    debug!(command = cli.command.name(), "Dispatching");
    let app = WagerlineApp::new(config).await?;
    if cli.command.requires_login() && !app.is_signed_in() {
        return Err(Error::SessionExpired);
    }

    match cli.command {
        Commands::Register {
            username,
            email,
            password,
        } => cmd::register_command(&app, &username, &email, password).await?,

        Commands::Login { username, password } => {
            cmd::login_command(&app, &username, password).await?
        }

        Commands::Logout => cmd::logout_command(&app)?,

        Commands::Profile => cmd::profile_command(&app).await?,

        Commands::History { limit } => cmd::history_command(&app, limit).await?,

        Commands::Learn => cmd::learn_command(&app).await?,

        Commands::Roulette {
            bet_type,
            bet_value,
            bet,
        } => cmd::roulette_command(&app, &bet_type, &bet_value, bet).await?,

        Commands::Dice {
            bet_type,
            bet_value,
            bet,
        } => cmd::dice_command(&app, &bet_type, &bet_value, bet).await?,

        Commands::Blackjack { bet } => cmd::blackjack_command(&app, bet).await?,

        Commands::Poker { bet } => cmd::poker_command(&app, bet).await?,

        Commands::Mines { bet, grid, mines } => cmd::mines_command(&app, bet, grid, mines).await?,

        Commands::Coins(command) => match command {
            CoinCommands::Request { amount, reason } => {
                cmd::coin_request_command(&app, amount, &reason).await?
            }
            CoinCommands::List => cmd::coin_list_command(&app).await?,
            CoinCommands::Recover => cmd::coin_recover_command(&app).await?,
        },

        Commands::Admin(command) => match command {
            AdminCommands::Pending => cmd::admin_pending_command(&app).await?,
            AdminCommands::Approve { id } => cmd::admin_approve_command(&app, id).await?,
            AdminCommands::Deny { id } => cmd::admin_deny_command(&app, id).await?,
        },
    }

    Ok(())
}
