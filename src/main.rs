use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{
    AccountCommand, ConfigCommand, LoginCommand, LogoutCommand, SyncCommand, WordCommand,
};
use config::Config;
use mydictionary_core::AppContext;

#[derive(Parser)]
#[command(name = "mydict")]
#[command(version)]
#[command(about = "A vocabulary-learning CLI for MyDictionary", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session locally
    Login(LoginCommand),

    /// Remove the stored session
    Logout(LogoutCommand),

    /// Pull languages, courses and words from the server
    Sync(SyncCommand),

    /// Inspect and edit stored words
    Word(WordCommand),

    /// Manage the remote account
    Account(AccountCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mydictionary=info,mydictionary_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    match cli.command {
        None => {
            println!("Use --help to see available commands");
        }
        // Needs no database
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        Some(command) => {
            let context =
                AppContext::open(&config.database_path.value, &config.api_url.value).await?;
            execute_command(command, &config, &context).await?;
        }
    }

    Ok(())
}

async fn execute_command(
    command: Commands,
    config: &Config,
    context: &AppContext,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Login(cmd) => cmd.run(context).await?,
        Commands::Logout(cmd) => cmd.run(context).await?,
        Commands::Sync(cmd) => cmd.run(context).await?,
        Commands::Word(cmd) => cmd.run(context).await?,
        Commands::Account(cmd) => cmd.run(context).await?,
        Commands::Config(cmd) => cmd.run(config)?,
    }

    Ok(())
}
