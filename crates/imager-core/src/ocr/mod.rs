//! OCR capability
//!
//! The recognizer is an opaque collaborator: image bytes in, text regions out
//! in the detector's own scan order. Any engine with that shape can be
//! plugged into `ExtractionService`.

mod tesseract;

pub use tesseract::TesseractRecognizer;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Errors reported by a recognizer
#[derive(Error, Debug)]
pub enum RecognizeError {
    /// The image could not be read or decoded
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The engine could not be started
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    /// The engine ran and reported a failure
    #[error("OCR engine failed: {0}")]
    Engine(String),

    /// The engine was stopped after running past its deadline
    #[error("OCR engine stopped after {0:?}")]
    TimedOut(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An image handed to the recognizer
///
/// Decoding is the engine's job; this only carries the encoded bytes and,
/// when known, where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    bytes: Vec<u8>,
    source: Option<PathBuf>,
}

impl ImageData {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            source: None,
        }
    }

    /// Read an image file from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecognizeError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            RecognizeError::InvalidImage(format!("cannot read {:?}: {}", path, e))
        })?;
        Ok(Self {
            bytes,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One recognition hypothesis for a region
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    /// 0.0 ..= 1.0
    pub confidence: f32,
}

impl Candidate {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A detected text region with its candidates, best first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextRegion {
    pub candidates: Vec<Candidate>,
}

impl TextRegion {
    /// Region with a single candidate
    pub fn single(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            candidates: vec![Candidate::new(text, confidence)],
        }
    }

    /// The best candidate, if the engine produced any
    pub fn top_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

/// Text recognition engine
pub trait Recognizer: Send + Sync {
    /// Engine identifier (e.g. "tesseract")
    fn name(&self) -> &'static str;

    /// Recognize text regions in scan order
    fn recognize(&self, image: &ImageData) -> Result<Vec<TextRegion>, RecognizeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_top_candidate() {
        let region = TextRegion {
            candidates: vec![Candidate::new("best", 0.9), Candidate::new("next", 0.4)],
        };
        assert_eq!(region.top_candidate().unwrap().text, "best");
        assert!(TextRegion::default().top_candidate().is_none());
    }

    #[test]
    fn test_image_open_keeps_source() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scan.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let image = ImageData::open(&path).unwrap();

        assert_eq!(image.bytes(), &[0x89, b'P', b'N', b'G']);
        assert_eq!(image.source(), Some(path.as_path()));
        assert!(!image.is_empty());
    }

    #[test]
    fn test_image_open_missing_file() {
        let err = ImageData::open("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, RecognizeError::InvalidImage(_)));
    }
}
