//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use imager_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str =
    "data_dir, storage_backend, ocr_timeout_secs, tesseract_path, ocr_language, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "storage_backend": config.storage_backend.to_string(),
                    "ocr_timeout_secs": config.ocr_timeout_secs,
                    "tesseract_path": config.tesseract_path,
                    "ocr_language": config.ocr_language,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:         {}", config.data_dir.display());
            println!("  storage_backend:  {}", config.storage_backend);
            println!("  ocr_timeout_secs: {}", config.ocr_timeout_secs);
            println!(
                "  tesseract_path:   {}",
                config
                    .tesseract_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(tesseract on PATH)".to_string())
            );
            println!("  ocr_language:     {}", config.ocr_language);
            println!(
                "  log_file:         {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply_setting(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Update one field of `config` from its string form
fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "storage_backend" => {
            config.storage_backend = value.parse()?;
        }
        "ocr_timeout_secs" => {
            let secs: u64 = value
                .parse()
                .context("Invalid value for ocr_timeout_secs. Use a whole number of seconds.")?;
            if secs == 0 {
                bail!("ocr_timeout_secs must be at least 1");
            }
            config.ocr_timeout_secs = secs;
        }
        "tesseract_path" => {
            config.tesseract_path = optional(value).map(PathBuf::from);
        }
        "ocr_language" => {
            if value.is_empty() {
                bail!("ocr_language cannot be empty");
            }
            config.ocr_language = value.to_string();
        }
        "log_file" => {
            config.log_file = optional(value).map(PathBuf::from);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}

/// Empty or "none" clears an optional setting
fn optional(value: &str) -> Option<&str> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value)
    }
}
