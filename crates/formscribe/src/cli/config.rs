//! The `formscribe config` command for configuration management.

use clap::{Args, Subcommand};
use formscribe_core::llm::resolve_env_var;
use formscribe_core::{Config, ConfigError};
use std::path::{Path, PathBuf};

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,

    /// Show config file path
    Path,

    /// Show which providers and integrations are usable
    Providers,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Load `path` when given (plus environment overrides), else the default location.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env();
            Ok(config)
        }
        None => Config::load(),
    }
}

fn config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(Config::default_path)
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs, path: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = load(path)?;
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", config_path(path).display());
        }

        ConfigCommand::Providers => {
            let config = load(path)?;
            for (name, ready) in provider_status(&config) {
                println!("{name:<12} {}", if ready { "configured" } else { "not configured" });
            }
        }

        ConfigCommand::Init { force } => {
            let path = config_path(path);

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, Config::default().to_toml()?)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

/// Whether each provider and integration has what it needs to run.
fn provider_status(config: &Config) -> Vec<(&'static str, bool)> {
    let providers = &config.providers;
    vec![
        ("huggingface", resolve_env_var(&providers.hosted.api_key).is_some()),
        ("groq", resolve_env_var(&providers.secondary.api_key).is_some()),
        ("ollama", providers.local.enabled),
        ("translation", resolve_env_var(&config.translation.api_key).is_some()),
        ("langfuse", config.tracing_enabled()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pdf]\ndpi = 150\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.pdf.dpi, 150);
        assert_eq!(config_path(Some(&path)), path);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_provider_status() {
        let mut config = Config::default();
        config.providers.hosted.api_key = "hf_literal".to_string();
        config.providers.secondary.api_key = String::new();
        config.translation.api_key = String::new();
        config.tracing.public_key = String::new();

        let status = provider_status(&config);
        assert_eq!(
            status,
            vec![
                ("huggingface", true),
                ("groq", false),
                ("ollama", true),
                ("translation", false),
                ("langfuse", false),
            ]
        );
    }
}
