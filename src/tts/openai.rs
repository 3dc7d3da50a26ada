//! OpenAI speech backend.

use super::{BackendLimits, SpeechBackend, SpeechRequest};
use crate::config::TtsSettings;
use crate::error::{PodweaveError, Result};
use crate::openai::create_client_with_config;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Input limit of the speech endpoint.
const MAX_INPUT_BYTES: usize = 4096;

/// Single-voice synthesis with OpenAI's speech endpoint.
pub struct OpenAISpeechBackend {
    client: Client<OpenAIConfig>,
    model: SpeechModel,
    format: SpeechResponseFormat,
}

impl OpenAISpeechBackend {
    pub fn new(client: Client<OpenAIConfig>, model: &str, audio_format: &str) -> Result<Self> {
        Ok(Self {
            client,
            model: parse_model(model),
            format: parse_format(audio_format)?,
        })
    }

    pub fn from_settings(settings: &TtsSettings) -> Result<Self> {
        let client = create_client_with_config(
            OpenAIConfig::default(),
            Duration::from_secs(settings.request_timeout_secs),
        )?;
        Self::new(client, &settings.model, &settings.audio_format)
    }
}

fn parse_model(model: &str) -> SpeechModel {
    match model {
        "tts-1" => SpeechModel::Tts1,
        "tts-1-hd" => SpeechModel::Tts1Hd,
        other => SpeechModel::Other(other.to_string()),
    }
}

fn parse_format(format: &str) -> Result<SpeechResponseFormat> {
    match format.to_lowercase().as_str() {
        "mp3" => Ok(SpeechResponseFormat::Mp3),
        "wav" => Ok(SpeechResponseFormat::Wav),
        other => Err(PodweaveError::Config(format!(
            "OpenAI speech cannot produce {} for assembly. Use mp3 or wav.",
            other
        ))),
    }
}

/// Map a configured voice name to the API voice.
pub(crate) fn parse_voice(voice: &str) -> Result<Voice> {
    match voice.to_lowercase().as_str() {
        "alloy" => Ok(Voice::Alloy),
        "echo" => Ok(Voice::Echo),
        "fable" => Ok(Voice::Fable),
        "onyx" => Ok(Voice::Onyx),
        "nova" => Ok(Voice::Nova),
        "shimmer" => Ok(Voice::Shimmer),
        other => Err(PodweaveError::Config(format!(
            "Unknown OpenAI voice: {}. Use alloy, echo, fable, onyx, nova or shimmer.",
            other
        ))),
    }
}

#[async_trait]
impl SpeechBackend for OpenAISpeechBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn limits(&self) -> BackendLimits {
        BackendLimits::single_speaker(MAX_INPUT_BYTES)
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
        let voice = request
            .voice()
            .ok_or_else(|| PodweaveError::InvalidInput("empty speech request".to_string()))?;

        let args = CreateSpeechRequestArgs::default()
            .input(request.text())
            .voice(parse_voice(voice)?)
            .model(self.model.clone())
            .response_format(self.format.clone())
            .build()
            .map_err(|e| PodweaveError::OpenAI(e.to_string()))?;

        let response = self
            .client
            .audio()
            .speech(args)
            .await
            .map_err(|e| PodweaveError::OpenAI(format!("Speech request failed: {}", e)))?;

        debug!("Received {} bytes of audio for voice {}", response.bytes.len(), voice);
        Ok(response.bytes.to_vec())
    }
}
