//! The `formscribe records` command for managing stored results.

use anyhow::Context;
use clap::{Args, Subcommand};
use formscribe_core::{Config, FormService, StructuredResult};
use std::path::{Path, PathBuf};

/// Arguments for the `records` command.
#[derive(Args, Debug)]
pub struct RecordsArgs {
    #[command(subcommand)]
    pub command: RecordsCommand,
}

/// Subcommands for record management.
#[derive(Subcommand, Debug)]
pub enum RecordsCommand {
    /// List all records, newest first
    List,

    /// Show one record by id
    Get { id: i64 },

    /// Show the record produced by an upload
    Task { task_id: String },

    /// Replace a record's data with the contents of a JSON file
    Update {
        id: i64,

        /// JSON object to store
        json_file: PathBuf,
    },

    /// Delete a record
    Delete { id: i64 },

    /// Check that the record store is reachable
    Health,
}

/// Execute the records command.
pub async fn execute(args: RecordsArgs, config: &Config) -> anyhow::Result<()> {
    let service = FormService::records(config)?;

    match args.command {
        RecordsCommand::List => super::print_json(&service.list_records().await?)?,

        RecordsCommand::Get { id } => super::print_json(&service.record(id).await?)?,

        RecordsCommand::Task { task_id } => {
            super::print_json(&service.result_by_task(&task_id).await?)?
        }

        RecordsCommand::Update { id, json_file } => {
            let data = read_record_data(&json_file)?;
            let record = service.update_record(id, data).await?;
            super::print_json(&record)?;
        }

        RecordsCommand::Delete { id } => {
            service.delete_record(id).await?;
            println!("Record deleted successfully");
        }

        RecordsCommand::Health => {
            service.health().await?;
            println!("healthy");
        }
    }

    Ok(())
}

/// Load replacement data for a record. Only JSON objects are accepted.
fn read_record_data(path: &Path) -> anyhow::Result<StructuredResult> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    if !value.is_object() {
        anyhow::bail!("Record data must be a JSON object: {}", path.display());
    }
    Ok(StructuredResult::from_value(value))
}
