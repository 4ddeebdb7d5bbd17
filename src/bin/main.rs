use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use userhub::{AppConfig, UserStore};

#[derive(Parser)]
#[command(name = "userhub")]
#[command(about = "Token-authenticated user record API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Bind address for the HTTP listener
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: String,
        /// Path of the JSON store file
        #[arg(long, default_value = "db.json")]
        db_path: PathBuf,
        /// Token signing secret; required, held for the process lifetime
        #[arg(long, env = "USERHUB_SECRET_KEY", hide_env_values = true)]
        secret: String,
        /// Allowed CORS origin (repeatable)
        #[arg(long = "allow-origin")]
        allow_origin: Vec<String>,
    },
    /// Create an empty store file
    Init {
        #[arg(long, default_value = "db.json")]
        db_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("userhub=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            db_path,
            secret,
            mut allow_origin,
        } => {
            if allow_origin.is_empty() {
                allow_origin = vec![
                    "http://localhost:5500".to_string(),
                    "http://127.0.0.1:5500".to_string(),
                ];
            }

            let config = AppConfig::new(bind, db_path, secret, allow_origin)?;
            info!("starting userhub on {}", config.bind);
            info!("using store file {}", config.db_path.display());

            userhub::serve(&config).await?;
        }
        Commands::Init { db_path } => {
            if UserStore::init_file(&db_path).await? {
                println!("Created empty store file at {}", db_path.display());
            } else {
                println!("Store file {} already exists", db_path.display());
            }
        }
    }

    Ok(())
}
