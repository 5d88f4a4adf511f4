//! Scan command handler

use std::path::Path;

use anyhow::{Context, Result};

use imager_core::{ExtractionService, HistorySession, ImageData};

use super::ensure_saved;
use crate::output::Output;

/// Recognize the text in an image and record it in the history
pub async fn scan(
    session: &mut HistorySession,
    service: &ExtractionService,
    image_path: &Path,
    replace_latest: bool,
    output: &Output,
) -> Result<()> {
    let image = ImageData::open(image_path)
        .with_context(|| format!("Failed to read image {}", image_path.display()))?;

    let record = service
        .extract(image)
        .await
        .with_context(|| format!("Failed to scan {}", image_path.display()))?;
    let id = record.id;

    if record.is_blank() {
        output.warning("No text was recognized; an empty entry was recorded.");
    }

    let result = if replace_latest {
        session.replace_latest(record)
    } else {
        session.append(record)
    };
    ensure_saved(session, result, output)?;

    let record = session
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("Record disappeared after saving: {}", id))?;
    output.success(&format!("Scanned {}", image_path.display()));
    output.print_record(record);

    Ok(())
}
