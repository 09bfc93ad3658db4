//! Command-line interface definitions using clap
//!
//! Without a subcommand the binary runs the HTTP server.

use clap::{Parser, Subcommand};

/// Tinylinker - A tiny-code URL shortener
#[derive(Parser, Debug)]
#[command(name = "tinylinker")]
#[command(version)]
#[command(about = "A tiny-code URL shortener", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Shorten a long URL and print its code
    Shorten {
        /// The long URL
        url: String,
    },

    /// Resolve a code back to its long URL
    Resolve {
        /// The tiny code
        code: String,
    },

    /// Run one expiry sweep and exit
    Sweep,

    /// Write a sample configuration file
    GenerateConfig {
        /// Output path (prints to stdout when omitted)
        path: Option<String>,
    },
}
