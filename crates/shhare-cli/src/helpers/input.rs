use std::io::{self, IsTerminal, Read};
use std::path::Path;

use crate::errors::CliError;

/// Resolve command text from the argument or, failing that, piped stdin.
///
/// Piped input has its trailing newline removed.
pub fn read_text(text: Option<String>) -> anyhow::Result<String> {
    if let Some(value) = text {
        if value.is_empty() {
            return Err(CliError::invalid_input("TEXT cannot be empty").into());
        }
        return Ok(value);
    }

    if io::stdin().is_terminal() {
        return Err(
            CliError::invalid_input("Provide TEXT as an argument or pipe it via stdin").into(),
        );
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to read stdin: {}", e))?;
    let trimmed = buffer.trim_end_matches(['\n', '\r']).to_string();
    if trimmed.is_empty() {
        return Err(CliError::invalid_input("No input provided on stdin").into());
    }
    Ok(trimmed)
}

/// Make sure writing to `path` is allowed.
///
/// Existing files are only replaced with `--force` or after an interactive
/// confirmation.
pub fn confirm_overwrite(path: &Path, force: bool, quiet: bool) -> anyhow::Result<()> {
    if force || !path.exists() {
        return Ok(());
    }

    if io::stdin().is_terminal() && !quiet {
        let proceed = dialoguer::Confirm::new()
            .with_prompt(format!("{} exists. Overwrite?", path.display()))
            .default(false)
            .interact()?;
        if proceed {
            return Ok(());
        }
        return Err(anyhow::anyhow!("Cancelled"));
    }

    Err(CliError::invalid_input(format!(
        "{} already exists; use --force to overwrite",
        path.display()
    ))
    .into())
}
