//! `idigbio_agent` - An agent that searches iDigBio in plain language
//!
//! This library translates natural-language requests into iDigBio search API
//! parameters, runs the searches, and streams progress, replies and artifacts
//! back to the caller.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod agent;
pub mod cli;
pub mod config;
pub mod entrypoints;
pub mod error;
pub mod idigbio;
pub mod llm;
pub mod logging;
pub mod prompt;
pub mod query;
pub mod response;
pub mod server;
pub mod translate;
pub mod urls;

pub use agent::{AgentCard, IDigBioAgent};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use response::{AgentMessage, ResponseContext};
pub use translate::Translator;
