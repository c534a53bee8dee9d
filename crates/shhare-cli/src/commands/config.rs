//! `config init` and `config show`.

use crate::app::AppContext;
use crate::config::{write_config, ShhareConfig};
use crate::errors::CliError;

pub fn handle_init(ctx: &AppContext<'_>, force: bool) -> anyhow::Result<()> {
    let path = ctx.config_path()?;
    if path.exists() && !force {
        return Err(CliError::invalid_input(format!(
            "Config already exists at {}; use --force to overwrite it",
            path.display()
        ))
        .into());
    }

    write_config(&path, &ShhareConfig::default())?;
    tracing::info!(path = %path.display(), "Wrote default config");

    if ctx.json() {
        println!("{}", serde_json::json!({ "path": path.display().to_string() }));
    } else if !ctx.quiet() {
        println!("Wrote config to {}", path.display());
    }
    Ok(())
}

pub fn handle_show(ctx: &AppContext<'_>) -> anyhow::Result<()> {
    let path = ctx.config_path()?;
    let config = ctx.config()?;

    if ctx.json() {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string(),
                "exists": path.exists(),
                "config": config,
            })
        );
        return Ok(());
    }

    let rendered =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    if !ctx.quiet() {
        let origin = if path.exists() { "" } else { " (not found, defaults)" };
        println!("# {}{}", path.display(), origin);
    }
    print!("{}", rendered);
    Ok(())
}
