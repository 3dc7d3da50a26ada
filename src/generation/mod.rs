//! Dialogue generation.
//!
//! A [`TurnGenerator`] turns one piece of source text into a tagged dialogue
//! fragment. The [`ContextualLinker`] drives it chunk by chunk, carrying a
//! bounded running summary between calls so the fragments read as one
//! continuous conversation.

mod cleanup;
mod fragment;
mod linker;
mod openai;
mod prompt;
mod summary;

pub use cleanup::clean_fragment;
pub use fragment::DialogueFragment;
pub use linker::{ContextualLinker, LinkerState};
pub use openai::OpenAIGenerator;
pub use prompt::{DialoguePrompt, PromptBuilder};
pub use summary::RunningSummary;

use crate::config::{ConversationSettings, Prompts, Settings};
use crate::error::{PodweaveError, Result};
use crate::transcript::Speaker;
use async_trait::async_trait;
use std::sync::Arc;

/// Everything a generator needs to know about where a chunk sits in the
/// conversation.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    /// Bounded description of the conversation so far. Empty for the first chunk.
    pub running_summary: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Speaker of the last turn of the previous fragment.
    pub last_speaker: Option<Speaker>,
    /// Whether the long-form instructions apply.
    pub longform: bool,
    pub conversation: Arc<ConversationSettings>,
}

impl GenerationContext {
    pub fn is_first_chunk(&self) -> bool {
        self.chunk_index == 0
    }

    pub fn is_last_chunk(&self) -> bool {
        self.chunk_index + 1 >= self.total_chunks
    }

    /// Speaker who should open this fragment.
    pub fn next_speaker(&self) -> Speaker {
        self.last_speaker.map(Speaker::other).unwrap_or(Speaker::Person1)
    }
}

/// Trait for dialogue generation backends.
#[async_trait]
pub trait TurnGenerator: Send + Sync {
    /// Produce raw tagged dialogue for one chunk of source text.
    async fn generate(&self, chunk_text: &str, context: &GenerationContext) -> Result<String>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// Create a turn generator from settings.
pub fn create_generator(settings: &Settings, prompts: Prompts) -> Result<Arc<dyn TurnGenerator>> {
    match settings.llm.provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAIGenerator::from_settings(settings, prompts)?)),
        other => Err(PodweaveError::Config(format!(
            "Unknown llm.provider: {}. Supported: openai",
            other
        ))),
    }
}
