//! Encrypt, decrypt, open and save, all driven through a sync session.

use tokio::sync::broadcast;

use shhare_core::{Diagnostic, Field, SessionHandle};

use crate::app::AppContext;
use crate::cli::{OpenArgs, SaveArgs, TransformArgs};
use crate::errors::CliError;
use crate::helpers::{confirm_overwrite, read_text};

pub async fn handle_encrypt(ctx: &AppContext<'_>, args: &TransformArgs) -> anyhow::Result<()> {
    let text = read_text(args.text.clone())?;
    let session = ctx.session_with_keys(&args.keys.keys).await?;
    let ciphertext = reconcile(&session, Field::Plaintext, text).await?;
    session.shutdown().await?;

    print_output(ctx, "ciphertext", &ciphertext);
    Ok(())
}

pub async fn handle_decrypt(ctx: &AppContext<'_>, args: &TransformArgs) -> anyhow::Result<()> {
    let text = read_text(args.text.clone())?;
    let session = ctx.session_with_keys(&args.keys.keys).await?;
    let plaintext = reconcile(&session, Field::Ciphertext, text.trim().to_string()).await?;
    session.shutdown().await?;

    print_output(ctx, "plaintext", &plaintext);
    Ok(())
}

pub async fn handle_open(ctx: &AppContext<'_>, args: &OpenArgs) -> anyhow::Result<()> {
    if !args.note.exists() {
        return Err(CliError::not_found(
            format!("Note not found: {}", args.note.display()),
            "Hint: Check the path.",
        )
        .into());
    }
    let content = std::fs::read_to_string(&args.note)
        .map_err(|e| anyhow::anyhow!("Failed to read note {}: {}", args.note.display(), e))?;

    let session = ctx.session_with_keys(&args.keys.keys).await?;
    let mut diagnostics = session.subscribe_diagnostics();
    let field = session.load_note(content).await?;
    session.settled().await?;
    let output = collect_output(&session, field.other(), &mut diagnostics)?;
    let snapshot = session.snapshot();
    session.shutdown().await?;

    tracing::debug!(detected = %field, "Opened note");
    if ctx.json() {
        println!(
            "{}",
            serde_json::json!({
                "detected": field,
                "plaintext": snapshot.plaintext,
                "ciphertext": snapshot.ciphertext,
            })
        );
    } else {
        println!("{}", output);
    }
    Ok(())
}

pub async fn handle_save(ctx: &AppContext<'_>, args: &SaveArgs) -> anyhow::Result<()> {
    let text = read_text(args.text.clone())?;
    confirm_overwrite(&args.out, args.force, ctx.quiet())?;

    let session = ctx.session_with_keys(&args.keys.keys).await?;
    let ciphertext = reconcile(&session, Field::Plaintext, text).await?;
    session.shutdown().await?;

    if ciphertext.is_empty() {
        return Err(CliError::invalid_input("No encrypted text to save").into());
    }

    shhare_core::fs::write_atomic(&args.out, ciphertext.as_bytes())
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", args.out.display(), e))?;

    if ctx.json() {
        println!(
            "{}",
            serde_json::json!({ "path": args.out.display().to_string(), "bytes": ciphertext.len() })
        );
    } else if !ctx.quiet() {
        println!("Saved encrypted note to {}", args.out.display());
    }
    Ok(())
}

/// Edit `source` in the session and return the reconciled other buffer.
async fn reconcile(session: &SessionHandle, source: Field, input: String) -> anyhow::Result<String> {
    let mut diagnostics = session.subscribe_diagnostics();
    match source {
        Field::Plaintext => session.edit_plaintext(input).await?,
        Field::Ciphertext => session.edit_ciphertext(input).await?,
    }
    session.settled().await?;
    collect_output(session, source.other(), &mut diagnostics)
}

fn collect_output(
    session: &SessionHandle,
    target: Field,
    diagnostics: &mut broadcast::Receiver<Diagnostic>,
) -> anyhow::Result<String> {
    if let Ok(diagnostic) = diagnostics.try_recv() {
        return Err(CliError::crypto_failed(diagnostic.message()).into());
    }
    Ok(session.snapshot().buffer(target).to_string())
}

fn print_output(ctx: &AppContext<'_>, name: &str, value: &str) {
    if ctx.json() {
        println!("{}", serde_json::json!({ name: value }));
    } else {
        println!("{}", value);
    }
}
