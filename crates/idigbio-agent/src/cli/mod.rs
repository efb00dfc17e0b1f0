//! Command-line interface for the iDigBio agent.
//!
//! This module provides the CLI structure for the `idigbio-agent` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, EntrypointArg, RunCommand, ServeCommand, TranslateCommand};

/// idigbio-agent - Search iDigBio in plain language
///
/// Serves an agent that turns natural-language requests into searches of the
/// iDigBio biodiversity portal, or runs single requests from the terminal.
#[derive(Debug, Parser)]
#[command(name = "idigbio-agent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP agent server
    Serve(ServeCommand),

    /// Print the agent card
    Card,

    /// Run one request through an entrypoint
    Run(RunCommand),

    /// Show the search parameters generated for a request
    Translate(TranslateCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
