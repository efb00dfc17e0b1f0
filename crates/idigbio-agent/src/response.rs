//! Streaming agent responses.
//!
//! An entrypoint reports progress through a [`ResponseContext`]: plain
//! replies for the user, and processes that carry log lines and artifacts.
//! Every message is pushed onto a bounded channel as soon as it is produced,
//! so the HTTP layer can forward it while the entrypoint keeps running.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// A single message in an agent response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    /// Text addressed to the user.
    Reply {
        /// Reply text.
        text: String,
    },

    /// A unit of work has started.
    ProcessStart {
        /// Short description of the work.
        summary: String,
    },

    /// Progress within the current process.
    ProcessLog {
        /// Log line.
        text: String,
        /// Structured data attached to the line.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },

    /// Data produced by the current process.
    Artifact {
        /// MIME type of the artifact content.
        mimetype: String,
        /// Human-readable description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Where the artifact content can be fetched.
        uris: Vec<String>,
        /// Extra facts about the artifact.
        #[serde(default)]
        metadata: Value,
    },
}

impl AgentMessage {
    /// Name of the SSE event carrying this message.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Reply { .. } => "reply",
            Self::ProcessStart { .. } => "process_start",
            Self::ProcessLog { .. } => "process_log",
            Self::Artifact { .. } => "artifact",
        }
    }
}

/// Sending half of an agent response.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    tx: mpsc::Sender<AgentMessage>,
}

impl ResponseContext {
    /// Create a context and the receiver its messages arrive on.
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<AgentMessage>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    async fn send(&self, message: AgentMessage) -> Result<()> {
        self.tx.send(message).await.map_err(|_| Error::ResponseClosed)
    }

    /// Send a reply to the user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseClosed`] if the receiver was dropped.
    pub async fn reply(&self, text: impl Into<String>) -> Result<()> {
        self.send(AgentMessage::Reply { text: text.into() }).await
    }

    /// Announce a process and return a handle for logging within it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseClosed`] if the receiver was dropped.
    pub async fn begin_process(&self, summary: impl Into<String>) -> Result<Process<'_>> {
        self.send(AgentMessage::ProcessStart {
            summary: summary.into(),
        })
        .await?;
        Ok(Process { context: self })
    }
}

/// A running process within a response.
#[derive(Debug)]
pub struct Process<'a> {
    context: &'a ResponseContext,
}

impl Process<'_> {
    /// Log a line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseClosed`] if the receiver was dropped.
    pub async fn log(&self, text: impl Into<String>) -> Result<()> {
        self.context
            .send(AgentMessage::ProcessLog {
                text: text.into(),
                data: None,
            })
            .await
    }

    /// Log a line with structured data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseClosed`] if the receiver was dropped.
    pub async fn log_data(&self, text: impl Into<String>, data: Value) -> Result<()> {
        self.context
            .send(AgentMessage::ProcessLog {
                text: text.into(),
                data: Some(data),
            })
            .await
    }

    /// Publish an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseClosed`] if the receiver was dropped.
    pub async fn create_artifact(
        &self,
        mimetype: impl Into<String>,
        description: Option<String>,
        uris: Vec<String>,
        metadata: Value,
    ) -> Result<()> {
        self.context
            .send(AgentMessage::Artifact {
                mimetype: mimetype.into(),
                description,
                uris,
                metadata,
            })
            .await
    }
}
