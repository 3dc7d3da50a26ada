//! Validated dialogue fragments.

use super::GenerationContext;
use crate::error::{PodweaveError, Result};
use crate::transcript::{parse, Speaker, Utterance};
use regex::Regex;
use std::sync::LazyLock;

/// Phrases that close the show. Only the last part may contain them.
static SIGN_OFF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:good-?bye|bye[- ]bye|thank(?:s| you) for (?:listening|tuning in)|see you next time|until next time|signing off)\b",
    )
    .expect("Invalid regex")
});

/// The dialogue produced for one content chunk, already cleaned and parsed.
#[derive(Debug, Clone)]
pub struct DialogueFragment {
    pub chunk_index: usize,
    /// Cleaned tagged text.
    pub text: String,
    pub utterances: Vec<Utterance>,
}

impl DialogueFragment {
    /// Check cleaned model output and build a fragment from it.
    ///
    /// Rejections are [`PodweaveError::InvalidFragment`], which the linker
    /// treats as retryable.
    pub fn validate(text: String, context: &GenerationContext) -> Result<Self> {
        let utterances = parse(&text)
            .map_err(|e| PodweaveError::InvalidFragment(format!("unparseable dialogue: {}", e)))?;

        if utterances.is_empty() {
            return Err(PodweaveError::InvalidFragment(
                "no tagged dialogue in output".to_string(),
            ));
        }

        for speaker in Speaker::ALL {
            if !utterances.iter().any(|u| u.speaker == speaker) {
                return Err(PodweaveError::InvalidFragment(format!(
                    "{} never speaks",
                    speaker
                )));
            }
        }

        if !context.is_first_chunk() {
            let greeting = format!("welcome to {}", context.conversation.podcast_name.to_lowercase());
            if utterances
                .iter()
                .any(|u| u.text.to_lowercase().contains(&greeting))
            {
                return Err(PodweaveError::InvalidFragment(format!(
                    "part {} repeats the opening greeting",
                    context.chunk_index + 1
                )));
            }
        }

        if !context.is_last_chunk() {
            if let Some(found) = utterances.iter().find_map(|u| SIGN_OFF.find(&u.text)) {
                return Err(PodweaveError::InvalidFragment(format!(
                    "part {} of {} signs off early ({:?})",
                    context.chunk_index + 1,
                    context.total_chunks,
                    found.as_str()
                )));
            }
        }

        Ok(Self {
            chunk_index: context.chunk_index,
            text,
            utterances,
        })
    }

    pub fn first_speaker(&self) -> Option<Speaker> {
        self.utterances.first().map(|u| u.speaker)
    }

    pub fn last_speaker(&self) -> Option<Speaker> {
        self.utterances.last().map(|u| u.speaker)
    }
}
