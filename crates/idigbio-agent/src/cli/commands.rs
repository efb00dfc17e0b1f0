//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::entrypoints::Entrypoint;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Entrypoint to call
    #[arg(value_enum)]
    pub entrypoint: EntrypointArg,

    /// Natural-language request
    pub request: String,

    /// Print messages as JSON lines
    #[arg(short, long)]
    pub json: bool,
}

/// Translate command arguments.
#[derive(Debug, Args)]
pub struct TranslateCommand {
    /// Entrypoint whose search parameters to generate
    #[arg(value_enum)]
    pub entrypoint: EntrypointArg,

    /// Natural-language request
    pub request: String,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Entrypoint argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntrypointArg {
    /// Search occurrence records
    #[value(name = "find_occurrence_records", alias = "records")]
    FindOccurrenceRecords,
    /// Search media records
    #[value(name = "find_media_records", alias = "media")]
    FindMediaRecords,
    /// Count occurrence records
    #[value(name = "count_occurrence_records", alias = "count")]
    CountOccurrenceRecords,
}

impl From<EntrypointArg> for Entrypoint {
    fn from(arg: EntrypointArg) -> Self {
        match arg {
            EntrypointArg::FindOccurrenceRecords => Self::FindOccurrenceRecords,
            EntrypointArg::FindMediaRecords => Self::FindMediaRecords,
            EntrypointArg::CountOccurrenceRecords => Self::CountOccurrenceRecords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entrypoint_arg_conversion() {
        assert_eq!(
            Entrypoint::from(EntrypointArg::FindOccurrenceRecords),
            Entrypoint::FindOccurrenceRecords
        );
        assert_eq!(
            Entrypoint::from(EntrypointArg::FindMediaRecords),
            Entrypoint::FindMediaRecords
        );
        assert_eq!(
            Entrypoint::from(EntrypointArg::CountOccurrenceRecords),
            Entrypoint::CountOccurrenceRecords
        );
    }

    #[test]
    fn test_entrypoint_arg_names_match_ids() {
        for arg in EntrypointArg::value_variants() {
            let name = arg.to_possible_value().unwrap();
            assert_eq!(name.get_name(), Entrypoint::from(*arg).id());
        }
    }

    #[test]
    fn test_entrypoint_arg_aliases() {
        assert_eq!(
            EntrypointArg::from_str("media", false).unwrap(),
            EntrypointArg::FindMediaRecords
        );
        assert_eq!(
            EntrypointArg::from_str("count", false).unwrap(),
            EntrypointArg::CountOccurrenceRecords
        );
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
