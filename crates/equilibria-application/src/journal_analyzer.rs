//! Summary and mood rating for a written journal entry.

use equilibria_core::ApiError;
use equilibria_core::chat::TextGenerator;
use minijinja::{Environment, context};
use std::sync::Arc;
use thiserror::Error;

const ANALYSIS_PROMPT: &str = "Summarize the following text and give a mood rating \
(e.g., Happy, Sad, Neutral, etc.):\n\n{{ text }}";

/// Shown when the model answers without any text.
pub const EMPTY_ANALYSIS: &str = "No response";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Write something before analyzing")]
    EmptyEntry,
    #[error("Failed to build analysis prompt: {0}")]
    Prompt(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAnalysis {
    pub text: String,
}

pub struct JournalAnalyzer {
    generator: Arc<dyn TextGenerator>,
    env: Environment<'static>,
}

impl JournalAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            env: Environment::new(),
        }
    }

    pub fn prompt_for(&self, content: &str) -> Result<String, AnalysisError> {
        self.env
            .render_str(ANALYSIS_PROMPT, context! { text => content })
            .map_err(|err| AnalysisError::Prompt(err.to_string()))
    }

    pub async fn analyze(&self, content: &str) -> Result<EntryAnalysis, AnalysisError> {
        if content.trim().is_empty() {
            return Err(AnalysisError::EmptyEntry);
        }

        let prompt = self.prompt_for(content)?;
        tracing::debug!(chars = content.len(), "analyzing journal entry");

        let text = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(ApiError::EmptyResponse) => EMPTY_ANALYSIS.to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "journal analysis failed");
                return Err(err.into());
            }
        };
        Ok(EntryAnalysis { text })
    }
}
