use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use undestroy::cli::{handle_record_command, open_context, RecordCommands};
use undestroy::config::{paths::DATA_DIR_ENV, Settings, UndestroyPaths};

/// Environment variable holding the log filter
const LOG_ENV: &str = "UNDESTROY_LOG";

#[derive(Parser)]
#[command(
    name = "undestroy",
    author = "Kaylee Beyene",
    version,
    about = "Archive rows on delete and restore them later",
    long_about = "undestroy copies a row into an archive table before it is deleted, \
                  so that it can be restored later. Models with archival enabled \
                  are listed in undestroy.json inside the data directory."
)]
struct Cli {
    /// Data directory (defaults to ~/.config/undestroy)
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Records(RecordCommands),

    /// Create the data directory and a default settings file
    Init,

    /// Show paths and resolved archival settings
    Config,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(dir) => UndestroyPaths::with_base_dir(dir),
        None => UndestroyPaths::new()?,
    };

    match cli.command {
        Some(Commands::Records(cmd)) => {
            let undestroy = open_context(&paths)?;
            handle_record_command(&undestroy, cmd)?;
        }
        Some(Commands::Init) => {
            println!("Initializing undestroy at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            if paths.settings_file().exists() {
                println!("Settings already exist: {}", paths.settings_file().display());
            } else {
                Settings::default().save(&paths)?;
                println!("Wrote {}", paths.settings_file().display());
            }
            if paths.is_initialized() {
                println!("Schema found: {}", paths.schema_file().display());
            } else {
                println!("No schema yet: define tables and models in {}", paths.schema_file().display());
            }
            println!();
            println!("Add models to the \"models\" section of undestroy.json to enable archival.");
        }
        Some(Commands::Config) => {
            let undestroy = open_context(&paths)?;

            println!("undestroy Configuration");
            println!("=======================");
            println!("Base directory: {}", paths.base_dir().display());
            println!("Data directory: {}", paths.data_dir().display());
            println!("Schema file:    {}", paths.schema_file().display());
            println!("Settings file:  {}", paths.settings_file().display());
            println!();

            let models = undestroy.attached_models()?;
            if models.is_empty() {
                println!("No models have archival enabled.");
            }
            for model in models {
                let binding = undestroy.binding(&model)?;
                println!("{}:", model);
                println!("  Archive model: {}", binding.target_class().name);
                println!("  Archive table: {}", binding.table_name());
                println!("  Executor:      {}", binding.config().executor().name());
                println!("  Settings:      {}", serde_json::to_string(binding.config())?);
            }
        }
        None => {
            println!("undestroy - archive rows on delete, restore them later");
            println!();
            println!("Run 'undestroy --help' for usage information.");
        }
    }

    Ok(())
}
