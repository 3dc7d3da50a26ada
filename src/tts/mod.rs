//! Speech synthesis.
//!
//! Utterances are grouped into batches sized for the backend, synthesized
//! concurrently, and returned as ordered [`AudioSegment`](crate::audio::AudioSegment)s.

mod batching;
mod command;
mod openai;
mod synthesizer;

pub use batching::{plan_batches, Batch};
pub use command::CommandBackend;
pub use openai::OpenAISpeechBackend;
pub use synthesizer::Synthesizer;

use crate::config::{Settings, VoiceSettings};
use crate::error::{PodweaveError, Result};
use crate::transcript::Speaker;
use async_trait::async_trait;
use std::sync::Arc;

/// Voice used for each speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceAssignment {
    pub person1: String,
    pub person2: String,
}

impl VoiceAssignment {
    pub fn voice_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Person1 => &self.person1,
            Speaker::Person2 => &self.person2,
        }
    }
}

impl From<&VoiceSettings> for VoiceAssignment {
    fn from(voices: &VoiceSettings) -> Self {
        Self {
            person1: voices.person1.clone(),
            person2: voices.person2.clone(),
        }
    }
}

/// What a backend accepts in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendLimits {
    /// Maximum UTF-8 bytes of text per call.
    pub max_bytes_per_call: usize,
    /// 1 for single-voice backends.
    pub max_speakers_per_call: usize,
    pub max_turns_per_call: usize,
}

impl BackendLimits {
    pub fn single_speaker(max_bytes_per_call: usize) -> Self {
        Self {
            max_bytes_per_call,
            max_speakers_per_call: 1,
            max_turns_per_call: usize::MAX,
        }
    }
}

/// One turn of a synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechTurn {
    pub speaker: Speaker,
    pub voice: String,
    pub text: String,
}

/// Text for one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub turns: Vec<SpeechTurn>,
}

impl SpeechRequest {
    pub fn from_batch(batch: &Batch, voices: &VoiceAssignment) -> Self {
        Self {
            turns: batch
                .utterances
                .iter()
                .map(|u| SpeechTurn {
                    speaker: u.speaker,
                    voice: voices.voice_for(u.speaker).to_string(),
                    text: u.text.clone(),
                })
                .collect(),
        }
    }

    /// A single phrase spoken by one speaker.
    pub fn phrase(speaker: Speaker, voice: &str, text: &str) -> Self {
        Self {
            turns: vec![SpeechTurn {
                speaker,
                voice: voice.to_string(),
                text: text.to_string(),
            }],
        }
    }

    /// Voice of the first turn, used by single-voice backends.
    pub fn voice(&self) -> Option<&str> {
        self.turns.first().map(|t| t.voice.as_str())
    }

    /// Turn texts joined with spaces.
    pub fn text(&self) -> String {
        self.turns
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Trait for speech synthesis backends.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    fn limits(&self) -> BackendLimits;

    /// Synthesize the request into one encoded audio buffer.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>>;
}

/// Create a speech backend from settings.
pub fn create_backend(settings: &Settings) -> Result<Arc<dyn SpeechBackend>> {
    match settings.tts.provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAISpeechBackend::from_settings(&settings.tts)?)),
        "command" => Ok(Arc::new(CommandBackend::from_settings(
            &settings.tts,
            settings.temp_dir(),
        ))),
        other => Err(PodweaveError::Config(format!(
            "Unknown tts.provider: {}. Supported: openai, command",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Utterance;

    fn voices() -> VoiceAssignment {
        VoiceAssignment::from(&VoiceSettings::default())
    }

    #[test]
    fn test_voice_assignment() {
        let voices = voices();
        assert_eq!(voices.voice_for(Speaker::Person1), "echo");
        assert_eq!(voices.voice_for(Speaker::Person2), "shimmer");
    }

    #[test]
    fn test_request_maps_turns_to_voices() {
        let batch = Batch::new(vec![
            Utterance::new(Speaker::Person1, "Hi.", 0),
            Utterance::new(Speaker::Person2, "Hello.", 1),
        ]);
        let request = SpeechRequest::from_batch(&batch, &voices());
        assert_eq!(request.turns[0].voice, "echo");
        assert_eq!(request.turns[1].voice, "shimmer");
        assert_eq!(request.text(), "Hi. Hello.");
        assert_eq!(request.voice(), Some("echo"));
    }

    #[test]
    fn test_create_backend_by_name() {
        let mut settings = Settings::default();
        settings.tts.provider = "command".to_string();
        let backend = create_backend(&settings).unwrap();
        assert_eq!(backend.name(), "command");
        assert_eq!(backend.limits().max_speakers_per_call, 1);

        settings.tts.provider = "morse".to_string();
        assert!(create_backend(&settings).is_err());
    }
}
