//! History command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use imager_core::HistorySession;

use super::{ensure_saved, parse_record_id};
use crate::editor::{confirm, edit_text};
use crate::output::{Output, OutputFormat};

/// List records in creation order, optionally favorites only
pub fn list(session: &HistorySession, favorites: bool, output: &Output) -> Result<()> {
    let records = if favorites {
        session.favorites()
    } else {
        session.all().iter().collect()
    };

    output.print_records(&records);
    Ok(())
}

/// Show a single record
pub fn show(session: &HistorySession, id: String, output: &Output) -> Result<()> {
    let uuid = parse_record_id(session, &id)?;
    let record = session
        .get(uuid)
        .ok_or_else(|| anyhow::anyhow!("Record not found: {}", id))?;

    output.print_record(record);
    if output.format == OutputFormat::Human && record.is_edited() {
        println!();
        println!("Originally recognized:");
        print!("{}", record.extracted_text);
        if !record.extracted_text.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}

/// Search records by text
pub fn search(session: &HistorySession, query: String, output: &Output) -> Result<()> {
    let records = session.search(&query);
    output.print_records(&records);
    Ok(())
}

/// Replace a record's text, from `--text` or the user's editor
pub fn edit(
    session: &mut HistorySession,
    id: String,
    text: Option<String>,
    output: &Output,
) -> Result<()> {
    let uuid = parse_record_id(session, &id)?;
    let current = session
        .get(uuid)
        .map(|r| r.edited_text.clone())
        .ok_or_else(|| anyhow::anyhow!("Record not found: {}", id))?;

    let new_text = match text {
        Some(text) => Some(text).filter(|t| *t != current),
        None => edit_text(&current)?,
    };

    let Some(new_text) = new_text else {
        output.message("No changes made.");
        return Ok(());
    };

    let result = session.commit_edit(uuid, new_text);
    ensure_saved(session, result, output)?;

    output.success(&format!("Updated record: {}", uuid));
    Ok(())
}

/// Flip the favorite flag of a record
pub fn favorite(session: &mut HistorySession, id: String, output: &Output) -> Result<()> {
    let uuid = parse_record_id(session, &id)?;

    let result = session.toggle_favorite(uuid);
    ensure_saved(session, result, output)?;

    let is_favorite = session.get(uuid).map(|r| r.is_favorite).unwrap_or(false);
    if is_favorite {
        output.success(&format!("Marked as favorite: {}", uuid));
    } else {
        output.success(&format!("Removed from favorites: {}", uuid));
    }
    Ok(())
}

/// Delete a record, asking first unless `yes` is set
pub fn delete(session: &mut HistorySession, id: String, yes: bool, output: &Output) -> Result<()> {
    let uuid = parse_record_id(session, &id)?;
    let record = session
        .get(uuid)
        .ok_or_else(|| anyhow::anyhow!("Record not found: {}", id))?;

    if !yes && output.should_prompt() {
        println!(
            "Delete record: {} - {}",
            &record.id.to_string()[..8],
            record.preview(50)
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let result = session.delete(uuid);
    ensure_saved(session, result, output)?;

    output.success(&format!("Deleted record: {}", uuid));
    Ok(())
}

/// Write a record's current text to `detected_text.txt`
pub fn export(
    session: &HistorySession,
    id: String,
    dir: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let uuid = parse_record_id(session, &id)?;
    let export = session.export(uuid)?;

    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let path = export
        .write_to(&dir)
        .with_context(|| format!("Failed to export to {}", dir.display()))?;

    output.print_export_path(&path);
    Ok(())
}

/// Print a record's current text exactly, for piping into a clipboard tool
pub fn copy(session: &HistorySession, id: String, output: &Output) -> Result<()> {
    let uuid = parse_record_id(session, &id)?;
    let text = session.clipboard_text(uuid)?;

    if output.is_json() {
        println!("{}", serde_json::json!({"id": uuid, "text": text}));
    } else {
        print!("{}", text);
    }
    Ok(())
}
