//! Command-line interface for perkforge
//!
//! Prints the effective ability table by default, or runs a scripted
//! scenario in headless mode.

use clap::Parser;
use std::path::PathBuf;

/// Per-player ability engine with perk modifiers
#[derive(Parser, Debug)]
#[command(name = "perkforge")]
#[command(about = "Per-player ability engine with perk modifiers")]
#[command(version)]
pub struct Args {
    /// Run in headless mode with the specified JSON scenario file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub headless: Option<PathBuf>,

    /// Output path for the ability log (headless mode only)
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Override the scenario duration in seconds (headless mode only)
    #[arg(long)]
    pub duration: Option<f64>,

    /// Override the random press seed (headless mode only)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Ability definitions file
    #[arg(long, value_name = "RON_FILE", default_value = "assets/config/abilities.ron")]
    pub definitions: PathBuf,
}

pub fn parse_args() -> Args {
    Args::parse()
}
