//! The `formscribe extract` command: read one document without storing it.

use clap::Args;
use formscribe_core::types::{FormField, StructuredResult};
use formscribe_core::{Config, Orchestrator, DEFAULT_LANGUAGE};
use std::path::PathBuf;

/// Arguments for the `extract` command.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Image (PNG, JPEG) or PDF to read
    #[arg(required = true)]
    pub file: PathBuf,

    /// Language the form is written in
    #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Print flattened label/value pairs instead of JSON
    #[arg(long)]
    pub fields: bool,

    /// Write the JSON result to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the extract command.
pub async fn execute(args: ExtractArgs, config: &Config) -> anyhow::Result<()> {
    if !args.file.is_file() {
        anyhow::bail!(
            "Input file does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.file
        );
    }

    let orchestrator = Orchestrator::from_config(config)?;

    let pb = super::spinner(format!(
        "Reading {} with {}",
        args.file.display(),
        orchestrator.provider_labels().join(", ")
    ));
    let result = orchestrator
        .extract_document(&args.file, None, &args.language)
        .await;
    pb.finish_and_clear();

    if args.fields {
        print!("{}", render_fields(&result.to_fields()));
        return Ok(());
    }

    match args.output {
        Some(path) => {
            std::fs::write(&path, serde_json::to_string_pretty(&result)?)?;
            tracing::info!("Result written to {}", path.display());
        }
        None => super::print_json(&result)?,
    }

    if let Some(note) = failure_note(&result) {
        tracing::warn!("{note}");
    }
    Ok(())
}

/// One `label: value` line per field.
fn render_fields(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}\n", f.label, f.value))
        .collect()
}

/// Message worth surfacing when extraction produced an error result.
fn failure_note(result: &StructuredResult) -> Option<String> {
    let fields = result.fields()?;
    fields
        .iter()
        .find(|f| f.label.ends_with("Error"))
        .map(|f| format!("{}: {}", f.label, f.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_fields() {
        let fields = vec![FormField::new("Name", "Asha"), FormField::new("Age", "31")];
        assert_eq!(render_fields(&fields), "Name: Asha\nAge: 31\n");
        assert_eq!(render_fields(&[]), "");
    }

    #[test]
    fn test_failure_note() {
        let failed = StructuredResult::from_fields(vec![
            FormField::new("PDF Error", "No pages found in PDF"),
        ]);
        assert_eq!(
            failure_note(&failed).as_deref(),
            Some("PDF Error: No pages found in PDF")
        );

        let ok = StructuredResult::from_value(json!({"name": "Asha"}));
        assert!(failure_note(&ok).is_none());
    }
}
