//! Row CLI commands
//!
//! Destroy, purge, restore and inspect rows of archived models.

use clap::Subcommand;
use serde_json::Value;

use crate::display::{render, OutputFormat};
use crate::error::UndestroyResult;
use crate::models::display_key;
use crate::registry::Undestroy;

/// Row subcommands
#[derive(Subcommand)]
pub enum RecordCommands {
    /// Archive a row, then delete it
    Destroy {
        /// Model name (e.g., "Widget")
        model: String,
        /// Primary-key value; parsed as JSON when possible
        key: String,
    },
    /// Delete a row without archiving it
    Purge {
        /// Model name
        model: String,
        /// Primary-key value
        key: String,
    },
    /// Move archived rows back into their source table
    Restore {
        /// Model name
        model: String,
        /// Primary-key values of the archived rows
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// List live rows of a model
    List {
        /// Model name
        model: String,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// List archived rows of a model
    Archived {
        /// Model name
        model: String,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Parse a key argument: JSON when it parses (`5`, `"5"`, `true`), else a string
pub fn parse_key(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Handle a row command
pub fn handle_record_command(undestroy: &Undestroy, cmd: RecordCommands) -> UndestroyResult<()> {
    let engine = undestroy.engine();

    match cmd {
        RecordCommands::Destroy { model, key } => {
            undestroy.binding(&model)?;
            let key = parse_key(&key);
            let record = engine.find(&model, &key)?;
            undestroy.destroy(&model, &record)?;

            let archive = undestroy.archived(&model)?;
            println!(
                "Destroyed {} {} (archived to '{}')",
                model,
                display_key(&key),
                archive.table_name.unwrap_or_default()
            );
        }

        RecordCommands::Purge { model, key } => {
            let key = parse_key(&key);
            let record = engine.find(&model, &key)?;
            undestroy.destroy_permanently(&model, &record)?;
            println!("Permanently deleted {} {}", model, display_key(&key));
        }

        RecordCommands::Restore { model, keys } => {
            let keys: Vec<Value> = keys.iter().map(|k| parse_key(k)).collect();
            let restored = undestroy.restore(&model, &keys)?;
            for key in &keys {
                println!("Restored {} {}", model, display_key(key));
            }
            if restored.len() > 1 {
                println!("{} rows restored", restored.len());
            }
        }

        RecordCommands::List { model, format } => {
            let rows = engine.all(&model)?;
            let columns = engine.columns(&model)?;
            println!("{}", render(&rows, &columns, format)?.trim_end());
        }

        RecordCommands::Archived { model, format } => {
            let archive = undestroy.archived(&model)?;
            let rows = undestroy.archived_rows(&model)?;
            let columns = engine.columns(&archive.name)?;
            println!("{}", render(&rows, &columns, format)?.trim_end());
        }
    }

    Ok(())
}
