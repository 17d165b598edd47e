//! Formscribe CLI - handwritten form extraction with vision-language models.
//!
//! Reads photographed or scanned handwritten forms (PNG, JPEG or PDF) and
//! prints the extracted fields as JSON. Uploaded documents are kept in a
//! local record store that can be listed, edited and deleted.
//!
//! # Usage
//!
//! ```bash
//! # Extract a form without storing it
//! formscribe extract form.jpg --language Hindi
//!
//! # Extract and store
//! formscribe upload scan.pdf
//!
//! # Manage stored records
//! formscribe records list
//! formscribe records update 3 corrected.json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Formscribe - extract handwritten form fields from images and PDFs.
#[derive(Parser, Debug)]
#[command(name = "formscribe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the platform default
    #[arg(long, global = true, env = "FORMSCRIBE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract handwriting from a form without storing the result
    Extract(cli::extract::ExtractArgs),

    /// Extract a form and store the result as a record
    Upload(cli::upload::UploadArgs),

    /// List, show, edit or delete stored records
    Records(cli::records::RecordsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go straight to stderr.
    let config = match cli::config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `formscribe config path`."
            );
            formscribe_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Formscribe v{}", formscribe_core::VERSION);

    match cli.command {
        Commands::Extract(args) => cli::extract::execute(args, &config).await,
        Commands::Upload(args) => cli::upload::execute(args, &config).await,
        Commands::Records(args) => cli::records::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config.as_deref()).await,
    }
}
