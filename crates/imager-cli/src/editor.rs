//! Interactive editing support
//!
//! Runs the user's editor on a record's text and asks yes/no questions.

use std::env;
use std::io::{self, Write};
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Editors tried, in order, when neither $EDITOR nor $VISUAL is set
const FALLBACK_EDITORS: [&str; 4] = ["nano", "vim", "vi", "notepad"];

/// Let the user correct `current` in their editor
///
/// Returns `None` when the text comes back unchanged.
pub fn edit_text(current: &str) -> Result<Option<String>> {
    let argv = find_editor()?;

    let mut file = tempfile::Builder::new()
        .prefix("imager_edit_")
        .suffix(".txt")
        .tempfile()
        .context("Failed to create temp file for editing")?;
    file.write_all(current.as_bytes())
        .and_then(|_| file.flush())
        .context("Failed to write temp file for editing")?;

    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .arg(file.path())
        .status()
        .with_context(|| format!("Failed to run editor: {}", argv.join(" ")))?;

    if !status.success() {
        bail!(
            "Editor '{}' exited with {}. The record was not changed.",
            argv.join(" "),
            status
        );
    }

    let edited = std::fs::read_to_string(file.path())
        .with_context(|| format!("Failed to read edited file: {:?}", file.path()))?;

    Ok((edited != current).then_some(edited))
}

/// Editor command line, split so values like `code --wait` work
fn find_editor() -> Result<Vec<String>> {
    let configured = ["EDITOR", "VISUAL"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find_map(|value| split_command(&value));
    if let Some(argv) = configured {
        return Ok(argv);
    }

    FALLBACK_EDITORS
        .iter()
        .find(|cmd| command_exists(cmd))
        .map(|cmd| vec![cmd.to_string()])
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No editor found. Set $EDITOR, or pass the new text with --text.\n\
                 Example: export EDITOR=nano"
            )
        })
}

fn split_command(value: &str) -> Option<Vec<String>> {
    let argv: Vec<String> = value.split_whitespace().map(str::to_string).collect();
    (!argv.is_empty()).then_some(argv)
}

/// Check if a command exists in PATH
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Ask a yes/no question on the terminal
///
/// Anything but "y"/"yes" is a no. Without a TTY on stdin the answer is
/// always no.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
