//! Command-line argument definitions for the Tachie CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the scene, the output file and its
//! resolution, the catalog and configuration files, and logging verbosity.

use clap::Parser;

use tachie::export::ExportScale;

/// Command-line arguments for the Tachie scene exporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the saved scene file
    #[arg(help = "Path to the scene JSON file")]
    pub input: String,

    /// Output image; png, jpg, jpeg or svg
    #[arg(short, long, default_value = "out.png")]
    pub output: String,

    /// Resolution multiplier (1, 2, 3 or 4)
    #[arg(short, long, default_value = "1")]
    pub scale: ExportScale,

    /// Layer catalog, overriding the configured one
    #[arg(long)]
    pub catalog: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
