//! Status command handler

use anyhow::Result;

use imager_core::{Config, HistorySession, TesseractRecognizer};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(
    session: &HistorySession,
    config: &Config,
    engine: &TesseractRecognizer,
    output: &Output,
) -> Result<()> {
    let engine_version = engine.version().ok();
    let favorites = session.favorites().len();
    let edited = session.all().iter().filter(|r| r.is_edited()).count();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "storage": {
                        "backend": session.backend_name(),
                        "data_dir": config.data_dir,
                        "unsaved_changes": session.is_dirty()
                    },
                    "ocr": {
                        "engine": "tesseract",
                        "version": engine_version,
                        "language": engine.language(),
                        "timeout_secs": config.ocr_timeout().as_secs()
                    },
                    "counts": {
                        "records": session.len(),
                        "favorites": favorites,
                        "edited": edited
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", session.len());
        }
        OutputFormat::Human => {
            println!("Imager Status");
            println!("=============");
            println!();
            println!("Storage:");
            println!("  Backend:  {}", session.backend_name());
            println!("  Location: {}", config.data_dir.display());
            println!();
            println!("OCR:");
            println!(
                "  Engine:   {}",
                engine_version
                    .as_deref()
                    .map(|v| format!("tesseract {}", v))
                    .unwrap_or_else(|| "tesseract (not found)".to_string())
            );
            println!("  Language: {}", engine.language());
            println!("  Timeout:  {}s", config.ocr_timeout().as_secs());
            println!();
            println!("History:");
            println!("  Records:   {}", session.len());
            println!("  Favorites: {}", favorites);
            println!("  Edited:    {}", edited);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::session_with;

    #[test]
    fn test_status_without_engine_installed() {
        let (session, _) = session_with(&["a\n", "b\n"]);
        let config = Config::default();
        let engine = TesseractRecognizer::new("/nonexistent/tesseract", "eng");

        show(&session, &config, &engine, &Output::new(OutputFormat::Json)).unwrap();
    }
}
