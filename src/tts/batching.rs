//! Grouping utterances into backend-sized batches.

use super::BackendLimits;
use crate::transcript::{Speaker, Utterance};
use tracing::warn;

/// Consecutive utterances synthesized in one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub utterances: Vec<Utterance>,
}

impl Batch {
    pub fn new(utterances: Vec<Utterance>) -> Self {
        Self { utterances }
    }

    pub fn first_index(&self) -> usize {
        self.utterances.first().map(|u| u.sequence_index).unwrap_or(0)
    }

    pub fn last_index(&self) -> usize {
        self.utterances.last().map(|u| u.sequence_index).unwrap_or(0)
    }

    /// Distinct speakers in order of first appearance.
    pub fn speakers(&self) -> Vec<Speaker> {
        let mut speakers = Vec::new();
        for utterance in &self.utterances {
            if !speakers.contains(&utterance.speaker) {
                speakers.push(utterance.speaker);
            }
        }
        speakers
    }

    /// Text bytes as sent to the backend (turns joined by one separator).
    pub fn byte_len(&self) -> usize {
        let text: usize = self.utterances.iter().map(|u| u.text.len()).sum();
        text + self.utterances.len().saturating_sub(1)
    }

    fn accepts(&self, utterance: &Utterance, limits: &BackendLimits) -> bool {
        if self.utterances.is_empty() {
            return true;
        }
        let bytes = self.byte_len() + 1 + utterance.text.len();
        let mut speakers = self.speakers();
        if !speakers.contains(&utterance.speaker) {
            speakers.push(utterance.speaker);
        }
        let speaker_change = self
            .utterances
            .last()
            .is_some_and(|last| last.speaker != utterance.speaker);

        bytes <= limits.max_bytes_per_call
            && self.utterances.len() < limits.max_turns_per_call
            && speakers.len() <= limits.max_speakers_per_call
            && !(limits.max_speakers_per_call == 1 && speaker_change)
    }
}

/// Group consecutive utterances into batches that fit the backend limits.
///
/// Utterances are never split. One that is larger than the byte limit on its
/// own becomes a single-utterance batch.
pub fn plan_batches(utterances: &[Utterance], limits: &BackendLimits) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current = Batch::new(Vec::new());

    for utterance in utterances {
        if utterance.text.len() > limits.max_bytes_per_call {
            warn!(
                "Utterance {} is {} bytes, over the backend limit of {}; sending it alone",
                utterance.sequence_index,
                utterance.text.len(),
                limits.max_bytes_per_call
            );
            if !current.utterances.is_empty() {
                batches.push(std::mem::replace(&mut current, Batch::new(Vec::new())));
            }
            batches.push(Batch::new(vec![utterance.clone()]));
            continue;
        }

        if !current.accepts(utterance, limits) {
            batches.push(std::mem::replace(&mut current, Batch::new(Vec::new())));
        }
        current.utterances.push(utterance.clone());
    }

    if !current.utterances.is_empty() {
        batches.push(current);
    }
    batches
}
