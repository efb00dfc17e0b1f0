//! Agent entrypoints.
//!
//! Each entrypoint opens one process on the response, asks the translator for
//! search parameters, calls the iDigBio API and reports what it found.
//! Failures to generate parameters or to reach iDigBio are logged to the
//! process and end the run without an artifact; only a closed response
//! stream is returned as an error.

pub mod count_occurrence_records;
pub mod find_media_records;
pub mod find_occurrence_records;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};
use crate::idigbio::IDigBioApi;
use crate::response::Process;
use crate::translate::Translator;
use crate::urls::{sanitize_json, IDigBioUrls};

/// Everything an entrypoint needs besides the request.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    /// Turns requests into search parameters.
    pub translator: &'a dyn Translator,
    /// The iDigBio API.
    pub api: &'a dyn IDigBioApi,
    /// Link builder for the API and portal.
    pub urls: &'a IDigBioUrls,
}

impl fmt::Debug for Services<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("translator", &self.translator.name())
            .field("urls", self.urls)
            .finish_non_exhaustive()
    }
}

/// The operations this agent offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entrypoint {
    /// Search occurrence records.
    FindOccurrenceRecords,
    /// Search media records.
    FindMediaRecords,
    /// Count occurrence records, broken down by a field.
    CountOccurrenceRecords,
}

impl Entrypoint {
    /// All entrypoints, in agent card order.
    pub const ALL: [Self; 3] = [
        Self::FindOccurrenceRecords,
        Self::FindMediaRecords,
        Self::CountOccurrenceRecords,
    ];

    /// Identifier used in requests and the agent card.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::FindOccurrenceRecords => find_occurrence_records::ID,
            Self::FindMediaRecords => find_media_records::ID,
            Self::CountOccurrenceRecords => count_occurrence_records::ID,
        }
    }

    /// Description shown to the calling assistant.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::FindOccurrenceRecords => find_occurrence_records::DESCRIPTION,
            Self::FindMediaRecords => find_media_records::DESCRIPTION,
            Self::CountOccurrenceRecords => count_occurrence_records::DESCRIPTION,
        }
    }
}

impl fmt::Display for Entrypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Entrypoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|entrypoint| entrypoint.id() == s)
            .ok_or_else(|| Error::unknown_entrypoint(s))
    }
}

/// Serialize parameters the way they are sent: without empty values.
fn params_json<T: Serialize>(params: &T) -> Result<Value> {
    let value = serde_json::to_value(params)?;
    Ok(sanitize_json(&value).unwrap_or_else(|| Value::Object(Map::new())))
}

/// Log why a run stopped early. A closed response is passed on.
async fn log_failure(process: &Process<'_>, err: Error) -> Result<()> {
    if matches!(err, Error::ResponseClosed) {
        return Err(err);
    }
    warn!(error = %err, "entrypoint stopped");
    process.log(err.user_message()).await
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned API responses for entrypoint tests.

    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::error::Result;
    use crate::idigbio::{ApiResponse, IDigBioApi};
    use crate::response::{AgentMessage, ResponseContext};

    /// Returns the same response for every call and records what was asked.
    #[derive(Debug)]
    pub struct FakeIDigBio {
        response: ApiResponse,
        pub calls: Mutex<Vec<(String, Value)>>,
    }

    impl FakeIDigBio {
        pub fn new(response: ApiResponse) -> Self {
            Self {
                response,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl IDigBioApi for FakeIDigBio {
        async fn search(&self, endpoint: &str, params: &Value) -> Result<ApiResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), params.clone()));
            Ok(self.response.clone())
        }

        async fn summary(&self, url: &str) -> Result<ApiResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), Value::Null));
            Ok(self.response.clone())
        }
    }

    /// Collect everything sent on a context after the sender is dropped.
    pub async fn drain(
        context: ResponseContext,
        mut rx: tokio::sync::mpsc::Receiver<AgentMessage>,
    ) -> Vec<AgentMessage> {
        drop(context);
        let mut messages = Vec::new();
        while let Some(message) = rx.recv().await {
            messages.push(message);
        }
        messages
    }

    /// Text of every log and reply message, in order.
    pub fn texts(messages: &[AgentMessage]) -> Vec<String> {
        messages
            .iter()
            .filter_map(|message| match message {
                AgentMessage::Reply { text } | AgentMessage::ProcessLog { text, .. } => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn artifacts(messages: &[AgentMessage]) -> Vec<&AgentMessage> {
        messages
            .iter()
            .filter(|message| matches!(message, AgentMessage::Artifact { .. }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entrypoint_ids_round_trip() {
        for entrypoint in Entrypoint::ALL {
            assert_eq!(entrypoint.id().parse::<Entrypoint>().unwrap(), entrypoint);
            assert_eq!(entrypoint.to_string(), entrypoint.id());
        }
    }

    #[test]
    fn test_unknown_entrypoint() {
        let err = "find_fossils".parse::<Entrypoint>().unwrap_err();
        assert!(matches!(err, Error::UnknownEntrypoint(id) if id == "find_fossils"));
    }

    #[test]
    fn test_params_json_drops_empty_values() {
        let value = params_json(&serde_json::json!({"rq": {"genus": "Homo", "family": []}, "mq": {}}))
            .unwrap();
        assert_eq!(value, serde_json::json!({"rq": {"genus": "Homo"}}));
    }
}
