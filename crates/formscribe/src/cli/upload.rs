//! The `formscribe upload` command: extract a document and store the result.

use anyhow::Context;
use clap::Args;
use formscribe_core::{Config, FormService, DEFAULT_LANGUAGE};
use std::path::PathBuf;

/// Arguments for the `upload` command.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Image (PNG, JPEG) or PDF to upload
    #[arg(required = true)]
    pub file: PathBuf,

    /// Language the form is written in
    #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Also print the stored record
    #[arg(long)]
    pub show: bool,
}

/// Execute the upload command.
pub async fn execute(args: UploadArgs, config: &Config) -> anyhow::Result<()> {
    let filename = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let service = FormService::from_config(config)?;

    let pb = super::spinner(format!("Processing {filename}"));
    let outcome = service.upload(&filename, &bytes, &args.language).await;
    pb.finish_and_clear();
    let receipt = outcome?;

    super::print_json(&receipt)?;
    if args.show {
        let record = service.record(receipt.record_id).await?;
        super::print_json(&record)?;
    }
    Ok(())
}
