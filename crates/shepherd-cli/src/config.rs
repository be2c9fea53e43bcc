use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "shepherd", version, about = "Procfile-driven process supervisor")]
pub struct Cli {
    /// Path to the service manifest
    #[arg(short = 'f', long = "file", default_value = "Procfile")]
    pub file: PathBuf,

    /// Print INFO status lines for service lifecycle events
    #[arg(short, long)]
    pub verbose: bool,
}
