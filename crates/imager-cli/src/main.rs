//! Imager CLI
//!
//! Command-line interface for Imager - scan images to text and keep a
//! history of the results.

use std::fs::File;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use imager_core::{storage, Config, ExtractionService, HistorySession, HistoryStore, TesseractRecognizer};

mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "imager")]
#[command(about = "Imager - Extract text from images and keep an editable history")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize text in an image and add it to the history
    Scan {
        /// Image file to scan
        image: PathBuf,
        /// Replace the most recent record instead of adding a new one
        #[arg(long)]
        replace_latest: bool,
    },
    /// Browse and manage past scans
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show status (storage, OCR engine, history counts)
    Status,
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List all records, oldest first
    #[command(alias = "ls")]
    List {
        /// Only show favorites
        #[arg(short, long)]
        favorites: bool,
    },
    /// Show a record in full
    Show {
        /// Record ID (full UUID or prefix)
        id: String,
    },
    /// Search record text
    Search {
        /// Search query (case-insensitive)
        query: String,
    },
    /// Correct the text of a record
    Edit {
        /// Record ID (full UUID or prefix)
        id: String,
        /// New text (opens editor if not provided)
        #[arg(short, long)]
        text: Option<String>,
    },
    /// Toggle the favorite flag
    #[command(alias = "star")]
    Favorite {
        /// Record ID (full UUID or prefix)
        id: String,
    },
    /// Delete a record
    #[command(alias = "rm")]
    Delete {
        /// Record ID (full UUID or prefix)
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Write a record's text to detected_text.txt
    Export {
        /// Record ID (full UUID or prefix)
        id: String,
        /// Target directory (defaults to the current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Print a record's text exactly, for piping to a clipboard tool
    Copy {
        /// Record ID (full UUID or prefix)
        id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, storage_backend, ocr_timeout_secs,
        /// tesseract_path, ocr_language, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    block_on_detached(run(cli))?
}

/// Drive `future` on a fresh runtime, then shut it down without waiting
///
/// A timed-out OCR call can still occupy a blocking-pool thread; waiting for
/// it on shutdown would keep the process alive until the engine gives up.
fn block_on_detached<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the history
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let backend = storage::open_backend(&config).with_context(|| {
        format!(
            "Failed to open {} storage in {}",
            config.storage_backend,
            config.data_dir.display()
        )
    })?;
    let mut session = HistorySession::open(HistoryStore::from_boxed(backend));
    let engine = TesseractRecognizer::from_config(&config);

    match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Scan {
            image,
            replace_latest,
        } => {
            let service = ExtractionService::with_config(Arc::new(engine), &config);
            commands::scan::scan(&mut session, &service, &image, replace_latest, &output).await
        }
        Commands::History { command } => handle_history_command(command, &mut session, &output),
        Commands::Status => commands::status::show(&session, &config, &engine, &output),
    }
}

fn handle_history_command(
    command: HistoryCommands,
    session: &mut HistorySession,
    output: &Output,
) -> Result<()> {
    match command {
        HistoryCommands::List { favorites } => commands::history::list(session, favorites, output),
        HistoryCommands::Show { id } => commands::history::show(session, id, output),
        HistoryCommands::Search { query } => commands::history::search(session, query, output),
        HistoryCommands::Edit { id, text } => commands::history::edit(session, id, text, output),
        HistoryCommands::Favorite { id } => commands::history::favorite(session, id, output),
        HistoryCommands::Delete { id, yes } => commands::history::delete(session, id, yes, output),
        HistoryCommands::Export { id, dir } => commands::history::export(session, id, dir, output),
        HistoryCommands::Copy { id } => commands::history::copy(session, id, output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// File-based logging, only when IMAGER_LOG is set
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("IMAGER_LOG") else {
        return;
    };

    let log_path = config.log_path();

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "imager_core={},imager_cli={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("logging initialized to {:?}", log_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_flags() {
        let cli = Cli::parse_from(["imager", "--json", "scan", "page.png", "--replace-latest"]);
        assert!(cli.json);
        match cli.command {
            Commands::Scan {
                image,
                replace_latest,
            } => {
                assert_eq!(image, PathBuf::from("page.png"));
                assert!(replace_latest);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_parse_history_aliases() {
        let cli = Cli::parse_from(["imager", "history", "rm", "abcd", "--yes"]);
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommands::Delete { yes: true, .. }
            }
        ));

        let cli = Cli::parse_from(["imager", "history", "star", "abcd"]);
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommands::Favorite { .. }
            }
        ));
    }

    struct HungRecognizer;

    impl imager_core::Recognizer for HungRecognizer {
        fn name(&self) -> &'static str {
            "hung"
        }

        fn recognize(
            &self,
            _image: &imager_core::ImageData,
        ) -> Result<Vec<imager_core::TextRegion>, imager_core::RecognizeError> {
            std::thread::sleep(std::time::Duration::from_secs(4));
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_timed_out_scan_exits_promptly() {
        use std::time::{Duration, Instant};

        let dir = tempfile::TempDir::new().unwrap();
        let image = dir.path().join("page.png");
        std::fs::write(&image, [0x89, b'P', b'N', b'G']).unwrap();
        let (mut session, _) = commands::test_support::session_with(&[]);
        let service = ExtractionService::new(Arc::new(HungRecognizer), Duration::from_millis(50));
        let output = Output::new(OutputFormat::Quiet);

        let start = Instant::now();
        let result = block_on_detached(commands::scan::scan(
            &mut session,
            &service,
            &image,
            false,
            &output,
        ))
        .unwrap();

        assert!(result.is_err());
        assert!(session.is_empty());
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["imager", "status", "--config", "/tmp/imager.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/imager.toml")));
    }
}
