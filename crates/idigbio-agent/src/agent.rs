//! The iDigBio search agent.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::config::{Config, TranslatorBackend};
use crate::entrypoints::{
    count_occurrence_records, find_media_records, find_occurrence_records, Entrypoint, Services,
};
use crate::error::Result;
use crate::idigbio::{HttpIDigBio, IDigBioApi};
use crate::llm::LlmClient;
use crate::response::ResponseContext;
use crate::translate::{LlmTranslator, RuleTranslator, Translator};
use crate::urls::IDigBioUrls;

/// Name advertised in the agent card.
pub const AGENT_NAME: &str = "iDigBio Search";

/// Description advertised in the agent card.
pub const AGENT_DESCRIPTION: &str =
    "Searches for information in the iDigBio portal (https://idigbio.org).";

/// Public description of the agent, served at `/.well-known/agent.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCard {
    /// Display name.
    pub name: String,
    /// What the agent does.
    pub description: String,
    /// Icon URL.
    pub icon: Option<String>,
    /// Operations the agent offers.
    pub entrypoints: Vec<EntrypointCard>,
}

/// One entrypoint in the agent card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrypointCard {
    /// Identifier used in requests.
    pub id: String,
    /// When to call this entrypoint.
    pub description: String,
    /// JSON schema of structured parameters. No entrypoint takes any.
    pub parameters: Option<Value>,
}

impl From<Entrypoint> for EntrypointCard {
    fn from(entrypoint: Entrypoint) -> Self {
        Self {
            id: entrypoint.id().to_string(),
            description: entrypoint.description().to_string(),
            parameters: None,
        }
    }
}

/// Dispatches requests to entrypoints.
#[derive(Clone)]
pub struct IDigBioAgent {
    translator: Arc<dyn Translator>,
    api: Arc<dyn IDigBioApi>,
    urls: IDigBioUrls,
}

impl fmt::Debug for IDigBioAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IDigBioAgent")
            .field("translator", &self.translator.name())
            .field("urls", &self.urls)
            .finish_non_exhaustive()
    }
}

impl IDigBioAgent {
    /// Create an agent from its parts.
    pub fn new(translator: Arc<dyn Translator>, api: Arc<dyn IDigBioApi>, urls: IDigBioUrls) -> Self {
        Self {
            translator,
            api,
            urls,
        }
    }

    /// Create an agent with the translator backend and endpoints from
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let translator = Self::translator_from_config(config)?;
        let urls = config.urls();
        let api = HttpIDigBio::new(urls.clone(), config.idigbio_timeout())?;
        info!(translator = translator.name(), "agent configured");
        Ok(Self::new(translator, Arc::new(api), urls))
    }

    /// Build the configured translator backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the language model client cannot be built.
    pub fn translator_from_config(config: &Config) -> Result<Arc<dyn Translator>> {
        let translator: Arc<dyn Translator> = match config.translator.backend {
            TranslatorBackend::Llm => {
                let client = LlmClient::new(&config.llm)?;
                Arc::new(LlmTranslator::new(Arc::new(client), config.llm.max_attempts))
            }
            TranslatorBackend::Rules => Arc::new(RuleTranslator::new()),
        };
        Ok(translator)
    }

    /// The agent card.
    #[must_use]
    pub fn card(&self) -> AgentCard {
        AgentCard {
            name: AGENT_NAME.to_string(),
            description: AGENT_DESCRIPTION.to_string(),
            icon: None,
            entrypoints: Entrypoint::ALL.into_iter().map(EntrypointCard::from).collect(),
        }
    }

    /// The translator in use.
    #[must_use]
    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    /// Handle `request` with the entrypoint named `entrypoint`.
    ///
    /// Structured `params` are accepted for compatibility but no entrypoint
    /// uses them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntrypoint`](crate::Error::UnknownEntrypoint)
    /// for an unrecognized id, or
    /// [`Error::ResponseClosed`](crate::Error::ResponseClosed) if the
    /// response receiver went away.
    #[instrument(skip(self, context, params), fields(translator = self.translator.name()))]
    pub async fn run(
        &self,
        context: &ResponseContext,
        request: &str,
        entrypoint: &str,
        params: Option<&Value>,
    ) -> Result<()> {
        let entrypoint: Entrypoint = entrypoint.parse()?;
        if params.is_some_and(|params| !params.is_null()) {
            debug!(%entrypoint, "ignoring structured parameters");
        }

        let services = Services {
            translator: self.translator.as_ref(),
            api: self.api.as_ref(),
            urls: &self.urls,
        };
        match entrypoint {
            Entrypoint::FindOccurrenceRecords => {
                find_occurrence_records::run(services, context, request).await
            }
            Entrypoint::FindMediaRecords => find_media_records::run(services, context, request).await,
            Entrypoint::CountOccurrenceRecords => {
                count_occurrence_records::run(services, context, request).await
            }
        }
    }
}
