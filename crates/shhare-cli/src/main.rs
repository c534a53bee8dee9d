//! Shhare CLI - keep a note readable and encrypted at once, under
//! Shamir-shared keys
//!
//! This is the command-line interface for Shhare. Every command runs through
//! a `shhare_core::Session`, so the CLI sees the same key validation,
//! derivation and note sync as any other front end.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod helpers;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::AppContext;
use crate::cli::{Cli, Commands, ConfigSubcommand, KeysSubcommand};
use crate::commands::{config as config_cmd, keys, misc, notes};
use crate::errors::exit_code_for;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);
    let ctx = AppContext::new(&cli);

    if let Err(e) = run(&ctx, &cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code_for(&e));
    }
}

/// Log to stderr. `SHHARE_LOG` takes precedence over `--log-level`.
fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_env("SHHARE_LOG")
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(ctx: &AppContext<'_>, cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Generate(args) => {
            keys::handle_generate(ctx, args).await?;
        }
        Commands::Derive(args) => {
            keys::handle_derive(ctx, args).await?;
        }
        Commands::Encrypt(args) => {
            notes::handle_encrypt(ctx, args).await?;
        }
        Commands::Decrypt(args) => {
            notes::handle_decrypt(ctx, args).await?;
        }
        Commands::Open(args) => {
            notes::handle_open(ctx, args).await?;
        }
        Commands::Save(args) => {
            notes::handle_save(ctx, args).await?;
        }
        Commands::Keys { command } => match command {
            KeysSubcommand::Check { file } => {
                keys::handle_keys_check(ctx, file)?;
            }
        },
        Commands::Config { command } => match command {
            ConfigSubcommand::Init { force } => {
                config_cmd::handle_init(ctx, *force)?;
            }
            ConfigSubcommand::Show => {
                config_cmd::handle_show(ctx)?;
            }
        },
        Commands::Completions { shell } => {
            misc::handle_completions(*shell)?;
        }
    }

    Ok(())
}
