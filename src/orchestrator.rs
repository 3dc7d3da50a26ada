//! Pipeline orchestrator for Podweave.
//!
//! Coordinates the whole run: content extraction, transcript generation,
//! speech synthesis and audio assembly.

use crate::audio::{assemble, AudioSegment, Container};
use crate::chunking::segment;
use crate::config::{ConversationSettings, Prompts, Settings};
use crate::error::{PodweaveError, Result};
use crate::extract::extract_all;
use crate::generation::{create_generator, ContextualLinker, TurnGenerator};
use crate::transcript::{Speaker, Transcript};
use crate::tts::{create_backend, SpeechBackend, Synthesizer, VoiceAssignment};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Options for a full podcast run.
#[derive(Debug, Clone, Default)]
pub struct ProduceOptions {
    /// Chunk the content and generate a multi-part conversation.
    pub longform: bool,
    /// Stop after saving the transcript.
    pub transcript_only: bool,
    /// Audio output path. Defaults to the audio directory.
    pub output: Option<PathBuf>,
}

/// Result of a podcast run.
#[derive(Debug, Clone)]
pub struct ProduceResult {
    pub id: String,
    pub transcript_path: PathBuf,
    /// `None` when only the transcript was requested.
    pub audio_path: Option<PathBuf>,
    pub utterance_count: usize,
}

/// The main orchestrator for the Podweave pipeline.
pub struct Orchestrator {
    settings: Settings,
    conversation: Arc<ConversationSettings>,
    generator: Arc<dyn TurnGenerator>,
    backend: Arc<dyn SpeechBackend>,
    cancel: CancellationToken,
    show_progress: bool,
}

impl Orchestrator {
    /// Create an orchestrator with the backends named in the settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let generator = create_generator(&settings, prompts)?;
        let backend = create_backend(&settings)?;
        Self::with_components(settings, generator, backend)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        generator: Arc<dyn TurnGenerator>,
        backend: Arc<dyn SpeechBackend>,
    ) -> Result<Self> {
        settings.validate()?;
        info!(
            "Using {} for dialogue and {} for speech",
            generator.name(),
            backend.name()
        );

        Ok(Self {
            conversation: Arc::new(settings.conversation.clone()),
            settings,
            generator,
            backend,
            cancel: CancellationToken::new(),
            show_progress: false,
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Draw progress bars on stderr.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn linker(&self) -> ContextualLinker {
        ContextualLinker::new(
            Arc::clone(&self.generator),
            Arc::clone(&self.conversation),
            &self.settings.longform,
        )
        .with_cancellation(self.cancel.clone())
        .with_progress(self.show_progress)
    }

    fn synthesizer(&self) -> Synthesizer {
        Synthesizer::new(Arc::clone(&self.backend), &self.settings.tts)
            .with_cancellation(self.cancel.clone())
            .with_progress(self.show_progress)
    }

    fn container(&self) -> Result<Container> {
        self.settings.tts.audio_format.parse()
    }

    /// Segment `text` and generate one linked multi-part conversation.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn generate_long_form_transcript(&self, text: &str) -> Result<Transcript> {
        let chunks = segment(
            text,
            self.settings.longform.min_chunk_size,
            self.settings.longform.max_num_chunks,
        )?;
        info!("Split content into {} chunks", chunks.len());
        self.linker().link(&chunks).await
    }

    /// Generate a conversation in a single call.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn generate_short_form_transcript(&self, text: &str) -> Result<Transcript> {
        if text.trim().is_empty() {
            return Err(PodweaveError::InvalidInput("no content to generate from".to_string()));
        }
        self.linker().generate_short_form(text.trim()).await
    }

    /// Generate a transcript, falling back to short form when the content is
    /// too short to chunk.
    pub async fn generate_transcript(&self, text: &str, longform: bool) -> Result<Transcript> {
        if !longform {
            return self.generate_short_form_transcript(text).await;
        }
        match self.generate_long_form_transcript(text).await {
            Err(PodweaveError::ContentTooShort { length, min_chunk_size }) => {
                warn!(
                    "Content has {} chars, under the {} needed for long form; generating a short conversation",
                    length, min_chunk_size
                );
                self.generate_short_form_transcript(text).await
            }
            other => other,
        }
    }

    /// Synthesize every utterance and assemble one audio file.
    ///
    /// The closing cue file, or else the spoken ending message, is appended
    /// after the last utterance.
    #[instrument(skip(self, transcript))]
    pub async fn synthesize_transcript_to_audio(&self, transcript: &Transcript) -> Result<Vec<u8>> {
        let container = self.container()?;
        let utterances = transcript.utterances()?;
        let next_index = utterances.last().map(|u| u.sequence_index + 1).unwrap_or(0);

        let synthesizer = self.synthesizer();
        let voices = VoiceAssignment::from(&self.settings.tts.voices);
        let limits = self.backend.limits();

        let segments = synthesizer.synthesize(&utterances, &voices, &limits).await?;
        let closing = self.closing_segment(&synthesizer, &voices, next_index).await?;

        let audio = assemble(&segments, container, closing.as_ref())?;
        info!(
            "Assembled {} segments into {} bytes of {}",
            segments.len() + usize::from(closing.is_some()),
            audio.len(),
            container
        );
        Ok(audio)
    }

    async fn closing_segment(
        &self,
        synthesizer: &Synthesizer,
        voices: &VoiceAssignment,
        sequence_index: usize,
    ) -> Result<Option<AudioSegment>> {
        if let Some(path) = &self.settings.tts.closing_cue_path {
            let path = Settings::expand_path(path);
            return AudioSegment::from_file(&path, sequence_index).map(Some);
        }

        let message = self.settings.tts.ending_message.trim();
        if message.is_empty() {
            return Ok(None);
        }
        synthesizer
            .synthesize_phrase(Speaker::Person2, message, voices, sequence_index)
            .await
            .map(Some)
    }

    /// Save a transcript under the transcripts directory.
    pub fn save_transcript(&self, transcript: &Transcript, id: &str) -> Result<PathBuf> {
        let path = self
            .settings
            .transcripts_dir()
            .join(format!("transcript_{}.txt", id));
        transcript.save(&path)?;
        info!("Saved transcript to {}", path.display());
        Ok(path)
    }

    /// Write audio to `output`, or the audio directory when not given.
    pub fn save_audio(&self, audio: &[u8], id: &str, output: Option<&Path>) -> Result<PathBuf> {
        let path = match output {
            Some(path) => path.to_path_buf(),
            None => self
                .settings
                .audio_dir()
                .join(format!("podcast_{}.{}", id, self.container()?.extension())),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, audio)?;
        info!("Saved audio to {}", path.display());
        Ok(path)
    }

    /// Run the whole pipeline for one or more inputs.
    #[instrument(skip(self, inputs), fields(inputs = inputs.len()))]
    pub async fn produce(&self, inputs: &[String], options: &ProduceOptions) -> Result<ProduceResult> {
        let text = extract_all(inputs).await?;
        let transcript = self.generate_transcript(&text, options.longform).await?;
        let utterance_count = transcript.utterances()?.len();

        let id = Uuid::new_v4().to_string();
        let transcript_path = self.save_transcript(&transcript, &id)?;

        let audio_path = if options.transcript_only {
            None
        } else {
            let audio = self.synthesize_transcript_to_audio(&transcript).await?;
            Some(self.save_audio(&audio, &id, options.output.as_deref())?)
        };

        Ok(ProduceResult {
            id,
            transcript_path,
            audio_path,
            utterance_count,
        })
    }

    /// Render a saved transcript file to audio.
    #[instrument(skip(self))]
    pub async fn synthesize_file(&self, transcript_path: &Path, output: Option<&Path>) -> Result<PathBuf> {
        let transcript = Transcript::load(transcript_path)?;
        let audio = self.synthesize_transcript_to_audio(&transcript).await?;
        let id = transcript_path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.trim_start_matches("transcript_").to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.save_audio(&audio, &id, output)
    }
}
