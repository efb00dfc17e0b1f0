//! Translation of natural-language requests into iDigBio search plans.
//!
//! A [`Translator`] turns a request such as "Audio of homo sapiens" into a
//! plan: a short explanation plus the search parameters that fulfill it, or no
//! parameters and a reason when the request cannot be expressed as an iDigBio
//! query. Two backends exist:
//!
//! - [`LlmTranslator`] asks a language model for structured output and
//!   validates it, retrying on recoverable mistakes.
//! - [`RuleTranslator`] parses requests with a fixed vocabulary. It needs no
//!   network access and backs the test suite.
//!
//! Both backends normalize their output before returning it.

mod llm;
mod rules;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::{
    MediaSearchParams, RecordsSearchParams, SummaryParams, Validate, ValidationError,
};

pub use llm::LlmTranslator;
pub use rules::RuleTranslator;

/// Outcome of translating a search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchPlan<P> {
    /// A brief explanation of what API parameters you plan to use. Or, if you
    /// are unable to fulfill the request using the available API parameters,
    /// a brief explanation of why the records cannot be retrieved.
    pub plan: String,
    /// The search parameters to use. If the request cannot be fulfilled using
    /// the available API parameters, leave this unset to abort.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_parameters: Option<P>,
    /// A concise characterization of the retrieved data, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_description: Option<String>,
    /// Whether the chosen search parameters completely fulfill the request.
    /// Parameters that only partially match the request are unacceptable.
    pub search_parameters_fully_match_the_request: bool,
}

/// Plan for the occurrence records search.
pub type RecordsPlan = SearchPlan<RecordsSearchParams>;

/// Plan for the media records search.
pub type MediaPlan = SearchPlan<MediaSearchParams>;

impl<P> SearchPlan<P> {
    /// A plan that searches with `params`.
    pub fn search(plan: impl Into<String>, params: P, description: impl Into<String>) -> Self {
        Self {
            plan: plan.into(),
            search_parameters: Some(params),
            artifact_description: Some(description.into()),
            search_parameters_fully_match_the_request: true,
        }
    }

    /// A plan that gives up, explaining why.
    pub fn abort(reason: impl Into<String>) -> Self {
        Self {
            plan: reason.into(),
            search_parameters: None,
            artifact_description: None,
            search_parameters_fully_match_the_request: false,
        }
    }

    /// Check whether the plan gave up.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        self.search_parameters.is_none()
    }

    fn map_parameters(self, f: impl FnOnce(P) -> P) -> Self {
        Self {
            search_parameters: self.search_parameters.map(f),
            ..self
        }
    }
}

impl RecordsPlan {
    /// Apply casing rules to the generated query.
    #[must_use]
    pub fn normalized(self) -> Self {
        self.map_parameters(RecordsSearchParams::normalized)
    }
}

impl MediaPlan {
    /// Apply casing rules and drop empty query objects.
    #[must_use]
    pub fn normalized(self) -> Self {
        self.map_parameters(MediaSearchParams::normalized)
    }
}

impl<P: Validate> Validate for SearchPlan<P> {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.search_parameters.is_some() && !self.search_parameters_fully_match_the_request {
            return Err(ValidationError::retryable(
                "The selected search parameters do not fully match the request. Either try again or abort.",
            ));
        }
        self.search_parameters.validate()
    }
}

/// Outcome of translating a counting request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummaryPlan {
    /// A brief explanation of what API parameters you plan to use.
    pub plan: String,
    /// Parameters for the records summary API.
    pub search_parameters: SummaryParams,
    /// A concise characterization of the retrieved record statistics, e.g.
    /// "Per-country record counts for species Rattus rattus".
    pub artifact_description: String,
}

impl SummaryPlan {
    /// Point text fields at their keyword index and apply casing rules.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            search_parameters: self.search_parameters.normalized(),
            ..self
        }
    }
}

impl Validate for SummaryPlan {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.search_parameters.validate()
    }
}

/// Turns requests into plans for each entrypoint.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Backend name, for logging.
    fn name(&self) -> &'static str;

    /// Plan an occurrence records search.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GenerationFailed`](crate::Error::GenerationFailed)
    /// when no valid plan could be produced, or a transport error from the
    /// backend.
    async fn records(&self, request: &str) -> Result<RecordsPlan>;

    /// Plan a media records search.
    ///
    /// # Errors
    ///
    /// Same as [`Translator::records`].
    async fn media(&self, request: &str) -> Result<MediaPlan>;

    /// Plan a records summary.
    ///
    /// # Errors
    ///
    /// Same as [`Translator::records`].
    async fn summary(&self, request: &str) -> Result<SummaryPlan>;
}
