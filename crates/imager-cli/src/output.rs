//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::path::Path;

use imager_core::HistoryRecord;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single record in full
    pub fn print_record(&self, record: &HistoryRecord) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", record.id);
                println!(
                    "Created:   {}",
                    record.created_at.format("%Y-%m-%d %H:%M")
                );
                println!("Favorite:  {}", if record.is_favorite { "yes" } else { "no" });
                if record.is_edited() {
                    println!("Edited:    yes");
                }
                println!();
                if record.is_blank() {
                    println!("(no text)");
                } else {
                    print!("{}", record.edited_text);
                    if !record.edited_text.ends_with('\n') {
                        println!();
                    }
                }
            }
            OutputFormat::Json => print_json(record),
            OutputFormat::Quiet => {
                println!("{}", record.id);
            }
        }
    }

    /// Print a list of records, one line each
    pub fn print_records(&self, records: &[&HistoryRecord]) {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No history found.");
                    return;
                }
                for record in records {
                    let star = if record.is_favorite { "★" } else { " " };
                    let preview = if record.is_blank() {
                        "(no text)".to_string()
                    } else {
                        record.preview(50)
                    };
                    println!(
                        "{} {} | {} | {}",
                        star,
                        &record.id.to_string()[..8],
                        record.created_at.format("%Y-%m-%d %H:%M"),
                        preview
                    );
                }
                println!("\n{} record(s)", records.len());
            }
            OutputFormat::Json => print_json(&records),
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.id);
                }
            }
        }
    }

    /// Report where an export was written
    pub fn print_export_path(&self, path: &Path) {
        match self.format {
            OutputFormat::Human => println!("✓ Exported to {}", path.display()),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"status": "success", "path": path}));
            }
            OutputFormat::Quiet => println!("{}", path.display()),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning on stderr (suppressed in quiet mode)
    pub fn warning(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON output: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_prompt_only_for_humans() {
        assert!(Output::new(OutputFormat::Human).should_prompt());
        assert!(!Output::new(OutputFormat::Json).should_prompt());
        assert!(!Output::new(OutputFormat::Quiet).should_prompt());
    }

    #[test]
    fn test_mode_predicates() {
        let json = Output::new(OutputFormat::Json);
        assert!(json.is_json());
        assert!(!json.is_quiet());
        assert!(Output::new(OutputFormat::Quiet).is_quiet());
    }
}
