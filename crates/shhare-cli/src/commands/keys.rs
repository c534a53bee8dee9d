//! Key generation, derivation and key file checks.

use std::path::Path;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};

use shhare_core::derived::obfuscate;
use shhare_core::ShhareError;

use crate::app::AppContext;
use crate::cli::{DeriveArgs, GenerateArgs};
use crate::constants::{MIN_KEYS, SHARE_BYTES};
use crate::errors::CliError;
use crate::helpers::{check_key_lines, confirm_overwrite, write_key_file, KeyLineStatus};

pub async fn handle_generate(ctx: &AppContext<'_>, args: &GenerateArgs) -> anyhow::Result<()> {
    let defaults = &ctx.config()?.generate;
    let count = args.count.unwrap_or(defaults.count);
    let threshold = args.threshold.unwrap_or(defaults.threshold);

    if let Some(out) = &args.out {
        confirm_overwrite(out, args.force, ctx.quiet())?;
    }

    let session = ctx.session()?;
    let keys = session
        .generate_fragments(count, threshold, SHARE_BYTES)
        .await
        .map_err(|err| match err {
            ShhareError::Generation(message) => anyhow::Error::new(CliError::invalid_input(message)),
            other => other.into(),
        })?;
    session.shutdown().await?;

    match &args.out {
        Some(out) => {
            write_key_file(out, &keys)?;
            if ctx.json() {
                println!(
                    "{}",
                    serde_json::json!({
                        "path": out.display().to_string(),
                        "count": keys.len(),
                        "threshold": threshold,
                    })
                );
            } else if !ctx.quiet() {
                println!(
                    "Wrote {} keys to {} (any {} reconstruct the key)",
                    keys.len(),
                    out.display(),
                    threshold
                );
            }
        }
        None => {
            if ctx.json() {
                println!(
                    "{}",
                    serde_json::json!({ "keys": keys, "threshold": threshold })
                );
            } else {
                for key in &keys {
                    println!("{}", key);
                }
            }
        }
    }
    Ok(())
}

pub async fn handle_derive(ctx: &AppContext<'_>, args: &DeriveArgs) -> anyhow::Result<()> {
    let session = ctx.session_with_keys(&args.keys.keys).await?;
    let key = session
        .preview_key()
        .await
        .map_err(|err| anyhow::Error::new(CliError::crypto_failed(err.to_string())))?;
    session.shutdown().await?;

    let shown = if args.obfuscate { obfuscate(&key) } else { key };
    if ctx.json() {
        println!("{}", serde_json::json!({ "key": shown }));
    } else {
        println!("{}", shown);
    }
    Ok(())
}

pub fn handle_keys_check(ctx: &AppContext<'_>, file: &Path) -> anyhow::Result<()> {
    if !file.exists() {
        return Err(CliError::not_found(
            format!("Key file not found: {}", file.display()),
            "Hint: Check the path, or run `shhare generate --out <FILE>`.",
        )
        .into());
    }

    let contents = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read key file {}: {}", file.display(), e))?;
    let statuses = check_key_lines(&contents);
    let valid = statuses.iter().filter(|status| status.is_valid()).count();
    let invalid = statuses.len() - valid;

    if ctx.json() {
        println!(
            "{}",
            serde_json::json!({
                "file": file.display().to_string(),
                "valid": valid,
                "invalid": invalid,
                "lines": statuses,
            })
        );
    } else if !ctx.quiet() {
        println!("{}", render_statuses(&statuses));
        println!("{} valid, {} invalid", valid, invalid);
        if invalid == 0 && valid < MIN_KEYS {
            println!("At least {} keys are needed to derive a key.", MIN_KEYS);
        }
    }

    if invalid > 0 {
        return Err(CliError::invalid_input(format!(
            "{} of {} key line(s) in {} are invalid",
            invalid,
            statuses.len(),
            file.display()
        ))
        .into());
    }
    Ok(())
}

fn render_statuses(statuses: &[KeyLineStatus]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Line", "Key", "Status"]);

    for status in statuses {
        table.add_row(vec![
            Cell::new(status.line),
            Cell::new(status.preview.as_deref().unwrap_or("-")),
            Cell::new(status.error.as_deref().unwrap_or("ok")),
        ]);
    }
    table.to_string()
}
