//! Application context for the Shhare CLI.
//!
//! Combines CLI arguments with the lazily-loaded config file and knows how
//! to start a session loaded with a key file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::unsync::OnceCell;

use shhare_core::{ShamirBackend, Session, SessionHandle};

use crate::cli::Cli;
use crate::config::{default_config_path, load_config, ShhareConfig};
use crate::constants::MIN_KEYS;
use crate::errors::CliError;
use crate::helpers::read_key_lines;

/// Application context that bundles CLI args with configuration.
pub struct AppContext<'a> {
    cli: &'a Cli,
    config: OnceCell<ShhareConfig>,
}

impl<'a> AppContext<'a> {
    /// Create a new application context from CLI arguments.
    pub fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            config: OnceCell::new(),
        }
    }

    /// Check if quiet mode is enabled.
    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    /// Check if JSON output is requested.
    pub fn json(&self) -> bool {
        self.cli.json
    }

    /// The config file location: `--config`/`SHHARE_CONFIG`, else the XDG
    /// default.
    pub fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.cli.config {
            Some(path) => Ok(path.clone()),
            None => default_config_path(),
        }
    }

    /// Get the configuration, loading it lazily if needed.
    pub fn config(&self) -> anyhow::Result<&ShhareConfig> {
        self.config
            .get_or_try_init(|| load_config(&self.config_path()?))
    }

    /// Start an empty session with the production backend.
    pub fn session(&self) -> anyhow::Result<SessionHandle> {
        let config = self.config()?.session_config();
        Ok(Session::spawn(Arc::new(ShamirBackend::new()), config))
    }

    /// Start a session and import the keys in `key_file`.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or holds fewer than two usable keys.
    pub async fn session_with_keys(&self, key_file: &Path) -> anyhow::Result<SessionHandle> {
        if !key_file.exists() {
            return Err(CliError::not_found(
                format!("Key file not found: {}", key_file.display()),
                "Hint: Run `shhare generate --out <FILE>` to create one.",
            )
            .into());
        }

        let lines = read_key_lines(key_file)?;
        let session = self.session()?;
        let report = session.import_fragments(lines).await?;
        if report.skipped > 0 {
            tracing::warn!(
                skipped = report.skipped,
                file = %key_file.display(),
                "Skipped invalid keys"
            );
        }
        if report.added < MIN_KEYS {
            return Err(CliError::invalid_input(format!(
                "{} holds {} usable key(s); at least {} are needed. Run `shhare keys check {}` for details.",
                key_file.display(),
                report.added,
                MIN_KEYS,
                key_file.display()
            ))
            .into());
        }

        session.settled().await?;
        Ok(session)
    }
}
