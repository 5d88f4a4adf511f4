//! Imager Core Library
//!
//! This crate provides the core of Imager: run OCR on an image, keep the
//! result as an editable history record, and manage a local history of past
//! extractions with favorites and deletion.
//!
//! # Architecture
//!
//! - **ExtractionService**: runs the OCR engine and builds a new record
//! - **HistorySession**: owns the in-memory history and enforces the
//!   edit/favorite/delete protocol
//! - **HistoryStore**: persists the whole history as one blob in a
//!   key-value medium (files or SQLite)
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = HistoryStore::from_boxed(storage::open_backend(&config)?);
//! let mut session = HistorySession::open(store);
//!
//! let engine = Arc::new(TesseractRecognizer::from_config(&config));
//! let service = ExtractionService::with_config(engine, &config);
//!
//! let record = service.extract(ImageData::open("receipt.png")?).await?;
//! let id = record.id;
//! session.append(record)?;
//! session.commit_edit(id, "corrected text\n")?;
//! ```
//!
//! # Modules
//!
//! - `extraction`: OCR output to history record
//! - `session`: in-memory history coordinator
//! - `models`: history record and export types
//! - `ocr`: recognizer trait and the Tesseract engine
//! - `storage`: history persistence and key-value backends
//! - `config`: application configuration

pub mod config;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod session;
pub mod storage;

pub use config::{Config, StorageBackend};
pub use extraction::{ExtractionError, ExtractionService};
pub use models::{Export, HistoryRecord, EXPORT_FILENAME};
pub use ocr::{Candidate, ImageData, RecognizeError, Recognizer, TesseractRecognizer, TextRegion};
pub use session::{HistoryEvent, HistorySession, SessionError, SessionResult};
pub use storage::{HistoryStore, KeyValueStore, StorageError};
