//! Language model backed translation.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::{MediaPlan, RecordsPlan, SummaryPlan, Translator};
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, ChatModel};
use crate::prompt;
use crate::query::{Validate, ValidationError};

/// Asks a language model for plans and validates its answers.
///
/// Invalid answers are sent back to the model together with the validation
/// error, up to `max_attempts` times. Terminal validation errors end
/// generation immediately.
pub struct LlmTranslator {
    model: Arc<dyn ChatModel>,
    max_attempts: u32,
    records_prompt: String,
    media_prompt: String,
    summary_prompt: String,
}

impl std::fmt::Debug for LlmTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmTranslator")
            .field("model", &self.model.model_name())
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl LlmTranslator {
    /// Create a translator over `model`, allowing at least one attempt.
    pub fn new(model: Arc<dyn ChatModel>, max_attempts: u32) -> Self {
        Self {
            model,
            max_attempts: max_attempts.max(1),
            records_prompt: prompt::records_prompt(),
            media_prompt: prompt::media_prompt(),
            summary_prompt: prompt::summary_prompt(),
        }
    }

    async fn generate<T>(&self, system_prompt: &str, request: &str) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema + Validate,
    {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(T))?;
        let mut messages = vec![
            ChatMessage::system(format!(
                "{system_prompt}\n\n# Response format\n\n\
                 Respond with a single JSON object that conforms to this JSON schema:\n\n{schema}"
            )),
            ChatMessage::user(request),
        ];

        for attempt in 1..=self.max_attempts {
            let content = self.model.complete(&messages).await?;
            debug!(attempt, %content, "model response");

            match parse_response::<T>(&content) {
                Ok(value) => {
                    info!(attempt, model = self.model.model_name(), "generated search parameters");
                    return Ok(value);
                }
                Err(err) if err.terminal => {
                    warn!(attempt, error = %err, "terminal validation error");
                    return Err(Error::generation_terminal(attempt, err.message));
                }
                Err(err) => {
                    warn!(attempt, error = %err, "invalid model response");
                    messages.push(ChatMessage::assistant(content));
                    messages.push(ChatMessage::user(format!(
                        "Your response was invalid: {err}\n\nCorrect the problem and respond again with a \
                         single JSON object that conforms to the schema."
                    )));
                }
            }
        }

        Err(Error::generation_exhausted(self.max_attempts))
    }
}

fn parse_response<T>(content: &str) -> std::result::Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let value: T = serde_json::from_str(content.trim())
        .map_err(|e| ValidationError::retryable(format!("the response does not match the schema: {e}")))?;
    value.validate()?;
    Ok(value)
}

#[async_trait]
impl Translator for LlmTranslator {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn records(&self, request: &str) -> Result<RecordsPlan> {
        let plan: RecordsPlan = self.generate(&self.records_prompt, request).await?;
        Ok(plan.normalized())
    }

    async fn media(&self, request: &str) -> Result<MediaPlan> {
        let plan: MediaPlan = self.generate(&self.media_prompt, request).await?;
        Ok(plan.normalized())
    }

    async fn summary(&self, request: &str) -> Result<SummaryPlan> {
        let plan: SummaryPlan = self.generate(&self.summary_prompt, request).await?;
        Ok(plan.normalized())
    }
}
