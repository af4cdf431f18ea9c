use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed Gantt-style scheduler CLI.
/// Storage defaults to plans under ~/.gpm or a path passed via --db.
#[derive(Parser)]
#[command(name = "gpm", version, about = "Gantt-style project scheduling CLI")]
pub struct Cli {
    /// Path to the JSON plan file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
