use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use shhare_core::VERSION;

/// Shhare - keep a note readable and encrypted at once, under Shamir-shared keys
#[derive(Parser)]
#[command(name = "shhare")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file
    #[arg(long, global = true, env = "SHHARE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level used when SHHARE_LOG is not set
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    pub log_level: String,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new set of key shares
    Generate(GenerateArgs),

    /// Reconstruct and print the key derived from a key file
    Derive(DeriveArgs),

    /// Encrypt text with the keys in a key file
    Encrypt(TransformArgs),

    /// Decrypt text with the keys in a key file
    Decrypt(TransformArgs),

    /// Open a note file, printing its other form
    Open(OpenArgs),

    /// Encrypt text and save the ciphertext to a file
    Save(SaveArgs),

    /// Key file utilities
    Keys {
        #[command(subcommand)]
        command: KeysSubcommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigSubcommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Key file selection shared by commands that need keys
#[derive(Args)]
pub struct KeyFileArg {
    /// Key file, one hex key per line
    #[arg(short, long = "keys", value_name = "FILE", env = "SHHARE_KEYS")]
    pub keys: PathBuf,
}

/// Arguments for the `generate` command
#[derive(Args)]
pub struct GenerateArgs {
    /// Number of shares to create (default from config)
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Shares needed to reconstruct the key (default from config)
    #[arg(long, short = 't')]
    pub threshold: Option<usize>,

    /// Write shares to this file instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Overwrite an existing file without asking
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `derive` command
#[derive(Args)]
pub struct DeriveArgs {
    #[command(flatten)]
    pub keys: KeyFileArg,

    /// Print the key masked
    #[arg(long)]
    pub obfuscate: bool,
}

/// Arguments for the `encrypt` and `decrypt` commands
#[derive(Args)]
pub struct TransformArgs {
    #[command(flatten)]
    pub keys: KeyFileArg,

    /// Input text (read from stdin when omitted)
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,
}

/// Arguments for the `open` command
#[derive(Args)]
pub struct OpenArgs {
    #[command(flatten)]
    pub keys: KeyFileArg,

    /// Note file, plaintext or ciphertext
    #[arg(value_name = "NOTE")]
    pub note: PathBuf,
}

/// Arguments for the `save` command
#[derive(Args)]
pub struct SaveArgs {
    #[command(flatten)]
    pub keys: KeyFileArg,

    /// Destination file for the ciphertext
    #[arg(long, short, value_name = "FILE")]
    pub out: PathBuf,

    /// Note text (read from stdin when omitted)
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    /// Overwrite an existing file without asking
    #[arg(long)]
    pub force: bool,
}

#[derive(Subcommand)]
pub enum KeysSubcommand {
    /// Validate a key file line by line
    Check {
        /// Key file to check
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write a config file with default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}
