//! CLI definitions using clap.
//!
//! Only the host's own arguments live here. The tunable and capability
//! flags are added at runtime by `tunable::cli::Integration`.

use std::path::PathBuf;

use clap::Parser;

/// Tunable - hash files with a configurable digest pipeline
#[derive(Parser, Debug)]
#[command(name = "tunable")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the configuration fingerprint instead of hashing
    #[arg(long)]
    pub fingerprint: bool,

    /// Include tunables excluded from hashing in the fingerprint
    #[arg(long, requires = "fingerprint")]
    pub everything: bool,

    /// Files to hash (standard input if none)
    pub inputs: Vec<PathBuf>,
}
