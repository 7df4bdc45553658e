//! CLI argument definitions for the Tessera binary.

use std::path::PathBuf;

use clap::Parser;

/// Tessera conflict service
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(about = "Tessera: optimistic conflict resolution for collaborative page editing")]
#[command(version)]
pub struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "TESSERA_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "TESSERA_HOST")]
    pub host: String,

    /// File the record store is loaded from on startup and saved to on shutdown
    #[arg(short, long, default_value = "tessera.json", env = "TESSERA_DB_FILE")]
    pub db_file: PathBuf,
}
