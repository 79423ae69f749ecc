//! R-Droid Gradle command line tool
//!
//! Reads and edits single properties of Gradle build scripts from the shell.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use r_droid_gradle::commands::{AddCommand, DeleteCommand, DumpCommand, GetCommand, RemoveCommand, SetCommand};
use r_droid_gradle::core::{DslConfig, APP_NAME, VERSION};

#[derive(Parser)]
#[command(name = "r-droid-gradle", version, about = "Read and edit Gradle build scripts")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a property as JSON
    Get { file: PathBuf, path: String },
    /// Set a scalar property
    Set {
        file: PathBuf,
        path: String,
        /// `true`, `false` and integers are written bare; anything else, `1.0` included, is quoted
        value: String,
        /// Write the value as a bare reference instead of a literal
        #[arg(long)]
        reference: bool,
    },
    /// Delete a property
    Delete { file: PathBuf, path: String },
    /// Append a value to a list property
    Add { file: PathBuf, path: String, value: String },
    /// Remove a value from a list property
    Remove { file: PathBuf, path: String, value: String },
    /// Print every property as JSON
    Dump { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DslConfig::load_from(path).await,
        None => DslConfig::load().await,
    }
    .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let level = if cli.verbose { Level::DEBUG } else { config.log_level.parse().unwrap_or(Level::INFO) };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    debug!("{} v{}", APP_NAME, VERSION);

    match cli.command {
        Command::Get { file, path } => {
            println!("{}", GetCommand { file, path }.execute(&config).await?);
        }
        Command::Set { file, path, value, reference } => {
            SetCommand { file, path, value, reference }.execute(&config).await?;
        }
        Command::Delete { file, path } => {
            if !(DeleteCommand { file, path: path.clone() }).execute(&config).await? {
                println!("{} is not set", path);
            }
        }
        Command::Add { file, path, value } => {
            AddCommand { file, path, value }.execute(&config).await?;
        }
        Command::Remove { file, path, value } => {
            if !(RemoveCommand { file, path: path.clone(), value: value.clone() }).execute(&config).await? {
                println!("{} does not contain {}", path, value);
            }
        }
        Command::Dump { file } => {
            println!("{}", DumpCommand { file }.execute(&config).await?);
        }
    }

    Ok(())
}
