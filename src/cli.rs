use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "panel TLS certificate manager")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Override the certs directory from the configuration
    #[arg(long, global = true)]
    pub certs_dir: Option<PathBuf>,

    /// Sub‑commands (ensure, generate, inspect)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Reuse or create the server certificate (default if no sub‑command)
    Ensure,
    /// Generate a fresh pair, replacing any existing one
    Generate,
    /// Print a summary of a certificate
    Inspect {
        /// Certificate to inspect (defaults to <certs_dir>/server.crt)
        cert: Option<PathBuf>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
