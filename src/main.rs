use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tacticiq::{api, cli, config::AppConfig};

#[derive(Parser)]
#[command(name = "tacticiq")]
#[command(about = "Prediction scoring engine for football fans")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Score a match bundle (JSON) without saving it
    Score {
        #[arg(short, long)]
        file: PathBuf,
        /// Override the streak in the bundle
        #[arg(short, long)]
        streak: Option<u32>,
    },
    /// Score a match bundle and record it in a user's history
    Record {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Show a user's scoring profile
    Profile {
        #[arg(short, long)]
        user: String,
    },
    /// Export a user's match history as CSV
    Export {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the active scoring tables
    Tables,
    /// Initialize the database
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.port = port;
            }
            tracing::info!("Starting TacticIQ scoring API on port {}", config.port);
            api::serve(config).await?;
        }
        Some(Commands::Score { file, streak }) => {
            cli::score_file(&file, streak, config.tables)?;
        }
        Some(Commands::Record { user, file }) => {
            tracing::info!("Recording match for {}", user);
            cli::record(config, &user, &file).await?;
        }
        Some(Commands::Profile { user }) => {
            cli::show_profile(config, &user).await?;
        }
        Some(Commands::Export { user, output }) => {
            cli::export_history(config, &user, &output).await?;
        }
        Some(Commands::Tables) => {
            cli::show_tables(&config.tables)?;
        }
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            cli::init_db(config).await?;
        }
        None => {
            // Default to serving
            tracing::info!("Starting TacticIQ scoring API on port {}", config.port);
            api::serve(config).await?;
        }
    }

    Ok(())
}
