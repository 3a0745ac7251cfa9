//! securekv CLI
//!
//! Command-line access to a file-backed secure store.
//!
//! # Commands
//!
//! - `write` - Encrypt and store a value
//! - `read` - Decrypt and print a value
//! - `read-all` - Print every value of the logical store
//! - `contains` - Test whether a key has a value
//! - `delete` - Remove a value
//! - `delete-all` - Remove every value of the logical store
//! - `migrate` - Initialize the store and report the legacy migration

mod commands;

use clap::{Parser, Subcommand};
use commands::{Format, StoreOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// securekv command-line tools.
#[derive(Parser)]
#[command(name = "securekv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the store files
    #[arg(global = true, short, long, env = "SECUREKV_DIR", default_value = ".")]
    dir: PathBuf,

    /// Physical store name
    #[arg(global = true, long)]
    store_name: Option<String>,

    /// Physical store holding v1 entries
    #[arg(global = true, long)]
    legacy_store_name: Option<String>,

    /// Namespacing prefix of the logical store
    #[arg(global = true, long)]
    key_prefix: Option<String>,

    /// Wipe the logical store instead of failing an operation
    #[arg(global = true, long)]
    reset_on_error: bool,

    /// Device secret the master keys are derived from
    #[arg(global = true, long, env = "SECUREKV_DEVICE_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt and store a value
    Write {
        /// Logical key
        key: String,
        /// Value to store
        value: String,
    },

    /// Decrypt and print a value
    Read {
        /// Logical key
        key: String,
    },

    /// Print every readable value
    ReadAll {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: Format,
    },

    /// Test whether a key has a value
    Contains {
        /// Logical key
        key: String,
    },

    /// Remove a value
    Delete {
        /// Logical key
        key: String,
    },

    /// Remove every value of the logical store
    DeleteAll,

    /// Initialize the store and report the legacy migration
    Migrate {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: Format,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("securekv CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let options = StoreOptions {
        dir: cli.dir,
        store_name: cli.store_name,
        legacy_store_name: cli.legacy_store_name,
        key_prefix: cli.key_prefix,
        reset_on_error: cli.reset_on_error,
        secret: cli.secret,
    };
    let store = options.open()?;

    match cli.command {
        Commands::Write { key, value } => commands::store::write(&store, &key, &value)?,
        Commands::Read { key } => commands::store::read(&store, &key)?,
        Commands::ReadAll { format } => commands::store::read_all(&store, format)?,
        Commands::Contains { key } => commands::store::contains(&store, &key)?,
        Commands::Delete { key } => commands::store::delete(&store, &key)?,
        Commands::DeleteAll => commands::store::delete_all(&store)?,
        Commands::Migrate { format } => commands::migrate::run(&store, format)?,
        Commands::Version => {}
    }

    Ok(())
}
