//! Text extraction
//!
//! `ExtractionService` runs the recognizer once per call, keeps the top
//! candidate of every region in the recognizer's order, and joins them into
//! one blob with a newline after each line. The result is a new, unsaved
//! `HistoryRecord`; persisting it is up to the session.
//!
//! The async entry point runs the engine on the blocking pool and gives up
//! after the configured timeout. The service cannot cancel the worker; an
//! engine that can be stopped (the Tesseract process) enforces the same
//! deadline itself, and anything still running is dropped with its result.
//! Callers that own the runtime should shut it down with
//! `shutdown_background` so a stuck worker can't keep the process alive.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::HistoryRecord;
use crate::ocr::{ImageData, RecognizeError, Recognizer, TextRegion};

/// Errors from an extraction attempt. No record is created on error.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The recognition call itself failed (invalid image, engine fault)
    #[error("Text recognition failed: {0}")]
    EngineFailure(String),

    /// The engine did not answer in time
    #[error("Text recognition timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<RecognizeError> for ExtractionError {
    fn from(e: RecognizeError) -> Self {
        match e {
            RecognizeError::TimedOut(limit) => ExtractionError::TimedOut(limit),
            other => ExtractionError::EngineFailure(other.to_string()),
        }
    }
}

/// Turns images into history records
#[derive(Clone)]
pub struct ExtractionService {
    recognizer: Arc<dyn Recognizer>,
    timeout: Duration,
}

impl ExtractionService {
    pub fn new(recognizer: Arc<dyn Recognizer>, timeout: Duration) -> Self {
        Self {
            recognizer,
            timeout,
        }
    }

    /// Service using the configured OCR timeout
    pub fn with_config(recognizer: Arc<dyn Recognizer>, config: &Config) -> Self {
        Self::new(recognizer, config.ocr_timeout())
    }

    pub fn engine_name(&self) -> &'static str {
        self.recognizer.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Extract text from `image` off the calling task
    ///
    /// Must be called inside a Tokio runtime. The returned record is meant to
    /// be handed to the session by the caller that awaited it.
    pub async fn extract(&self, image: ImageData) -> Result<HistoryRecord, ExtractionError> {
        let recognizer = Arc::clone(&self.recognizer);
        let start = Instant::now();

        let task = tokio::task::spawn_blocking(move || recognizer.recognize(&image));

        let regions = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => {
                return Err(ExtractionError::EngineFailure(format!(
                    "recognition worker failed: {}",
                    join_err
                )))
            }
            Err(_) => {
                warn!(
                    "{} did not finish within {:?}",
                    self.recognizer.name(),
                    self.timeout
                );
                return Err(ExtractionError::TimedOut(self.timeout));
            }
        };

        Ok(self.finish(&regions, start))
    }

    /// Extract text on the current thread, without a timeout
    pub fn extract_blocking(&self, image: &ImageData) -> Result<HistoryRecord, ExtractionError> {
        let start = Instant::now();
        let regions = self.recognizer.recognize(image)?;
        Ok(self.finish(&regions, start))
    }

    fn finish(&self, regions: &[TextRegion], start: Instant) -> HistoryRecord {
        let text = join_regions(regions);
        let record = HistoryRecord::new(text);

        if record.extracted_text.is_empty() {
            warn!(
                "{} found no text; recording an empty extraction {}",
                self.recognizer.name(),
                record.id
            );
        } else {
            info!(
                "extracted {} regions ({} chars) in {} ms",
                regions.len(),
                record.extracted_text.chars().count(),
                start.elapsed().as_millis()
            );
        }
        debug!("new record {}", record.id);

        record
    }
}

/// Top candidate of each region, newline after each. Regions without
/// candidates contribute nothing.
pub fn join_regions(regions: &[TextRegion]) -> String {
    let mut text = String::new();
    for candidate in regions.iter().filter_map(TextRegion::top_candidate) {
        text.push_str(&candidate.text);
        text.push('\n');
    }
    text
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::ocr::{ImageData, RecognizeError, Recognizer, TextRegion};

    /// What the scripted recognizer does on each call
    pub enum Script {
        Regions(Vec<TextRegion>),
        Fail(String),
        Sleep(Duration),
        Panic,
    }

    /// Recognizer that replays a fixed behavior
    pub struct ScriptedRecognizer {
        script: Mutex<Script>,
        pub calls: AtomicUsize,
    }

    impl ScriptedRecognizer {
        pub fn new(script: Script) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn lines(lines: &[&str]) -> Self {
            Self::new(Script::Regions(
                lines.iter().map(|l| TextRegion::single(*l, 0.9)).collect(),
            ))
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Recognizer for ScriptedRecognizer {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn recognize(&self, _image: &ImageData) -> Result<Vec<TextRegion>, RecognizeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let script = self.script.lock().unwrap();
            match &*script {
                Script::Regions(regions) => Ok(regions.clone()),
                Script::Fail(msg) => Err(RecognizeError::Engine(msg.clone())),
                Script::Sleep(d) => {
                    std::thread::sleep(*d);
                    Ok(Vec::new())
                }
                Script::Panic => panic!("engine crashed"),
            }
        }
    }
}
