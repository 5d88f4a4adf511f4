//! Tesseract OCR engine (CLI wrapper)
//!
//! Runs `tesseract stdin stdout -l <lang> tsv` with the image piped on stdin
//! and folds the word-level TSV rows into one region per text line.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{ImageData, RecognizeError, Recognizer, TextRegion};
use crate::config::Config;

const DEFAULT_BINARY: &str = "tesseract";

/// TSV `level` value for word rows
const WORD_LEVEL: i32 = 5;

/// How often a running engine is checked against its deadline
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Tesseract command-line engine
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    language: String,
    /// The child process is killed once this much time has passed
    deadline: Option<Duration>,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            deadline: None,
        }
    }

    /// Engine configured from `tesseract_path`, `ocr_language` and
    /// `ocr_timeout_secs`
    pub fn from_config(config: &Config) -> Self {
        let binary = config
            .tesseract_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY));
        Self::new(binary, config.ocr_language.clone()).with_deadline(config.ocr_timeout())
    }

    /// Kill the engine process if it runs longer than `deadline`
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Wait for the child, killing it when the deadline passes
    fn wait_for_exit(&self, child: &mut Child) -> Result<ExitStatus, RecognizeError> {
        let Some(limit) = self.deadline else {
            return Ok(child.wait()?);
        };

        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!("killing {:?} after {:?}", self.binary, limit);
                if let Err(e) = child.kill() {
                    debug!("kill failed: {}", e);
                }
                // Reap it; pipe reader threads are left to finish on their own
                let _ = child.wait();
                return Err(RecognizeError::TimedOut(limit));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Probe `tesseract --version`
    pub fn version(&self) -> Result<String, RecognizeError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .map_err(|e| {
                RecognizeError::Unavailable(format!("cannot run {:?}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            return Err(RecognizeError::Unavailable(format!(
                "{:?} --version exited with {}",
                self.binary, output.status
            )));
        }

        // Older releases print the banner on stderr
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(parse_version(&combined).unwrap_or_else(|| "unknown".to_string()))
    }
}

impl Recognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &ImageData) -> Result<Vec<TextRegion>, RecognizeError> {
        if image.is_empty() {
            return Err(RecognizeError::InvalidImage("image has no data".to_string()));
        }

        let start = Instant::now();
        debug!(
            "running {:?} stdin stdout -l {} tsv ({} bytes)",
            self.binary,
            self.language,
            image.bytes().len()
        );

        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RecognizeError::Unavailable(format!("cannot run {:?}: {}", self.binary, e))
            })?;

        // Feed stdin and drain both pipes on their own threads so a full pipe
        // can't stall the engine while we poll it
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RecognizeError::Engine("stdin was not captured".to_string()))?;
        let bytes = image.bytes().to_vec();
        let writer = thread::spawn(move || stdin.write_all(&bytes));
        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        let status = self.wait_for_exit(&mut child)?;

        match writer.join() {
            Ok(Ok(())) => {}
            // The engine may close stdin early on a bad image; its exit status says more
            Ok(Err(e)) => debug!("writing image to tesseract failed: {}", e),
            Err(_) => return Err(RecognizeError::Engine("stdin writer panicked".to_string())),
        }
        let stdout = collect(stdout_reader)?;
        let stderr = collect(stderr_reader)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(RecognizeError::Engine(format!(
                "tesseract exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8(stdout)
            .map_err(|e| RecognizeError::Engine(format!("output is not UTF-8: {}", e)))?;
        let regions = parse_tsv(&tsv);

        info!(
            "tesseract recognized {} lines in {} ms",
            regions.len(),
            start.elapsed().as_millis()
        );

        Ok(regions)
    }
}

type PipeReader = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

/// Read a child pipe to the end on a background thread
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> PipeReader {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(reader: PipeReader) -> Result<Vec<u8>, RecognizeError> {
    match reader {
        None => Ok(Vec::new()),
        Some(handle) => handle
            .join()
            .map_err(|_| RecognizeError::Engine("output reader panicked".to_string()))?
            .map_err(RecognizeError::from),
    }
}

/// Fold Tesseract TSV into one region per line
///
/// Columns:
/// level page_num block_num par_num line_num word_num left top width height conf text
fn parse_tsv(tsv: &str) -> Vec<TextRegion> {
    let mut regions = Vec::new();
    let mut current: Option<LineAccumulator> = None;

    // Skip header
    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }

        let level: i32 = cols[0].parse().unwrap_or(-1);
        let text = cols[11].trim();
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        if level != WORD_LEVEL || text.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (
            cols[1].to_string(),
            cols[2].to_string(),
            cols[3].to_string(),
            cols[4].to_string(),
        );

        match current.as_mut() {
            Some(line) if line.key == key => line.push(text, conf),
            _ => {
                if let Some(done) = current.take() {
                    regions.push(done.finish());
                }
                let mut line = LineAccumulator::new(key);
                line.push(text, conf);
                current = Some(line);
            }
        }
    }

    if let Some(done) = current {
        regions.push(done.finish());
    }

    regions
}

struct LineAccumulator {
    key: (String, String, String, String),
    words: Vec<String>,
    conf_sum: f32,
}

impl LineAccumulator {
    fn new(key: (String, String, String, String)) -> Self {
        Self {
            key,
            words: Vec::new(),
            conf_sum: 0.0,
        }
    }

    fn push(&mut self, word: &str, conf: f32) {
        self.words.push(word.to_string());
        self.conf_sum += conf;
    }

    fn finish(self) -> TextRegion {
        // Tesseract reports 0-100
        let confidence = (self.conf_sum / self.words.len() as f32 / 100.0).clamp(0.0, 1.0);
        TextRegion::single(self.words.join(" "), confidence)
    }
}

/// Pull "5.3.0" out of "tesseract 5.3.0" or "tesseract v5.3.0"
fn parse_version(banner: &str) -> Option<String> {
    banner
        .lines()
        .find(|line| line.starts_with("tesseract"))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|v| v.trim_start_matches('v').to_string())
}
