//! Configuration settings for Podweave.

use crate::error::{PodweaveError, Result};
use crate::transcript::Speaker;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub conversation: ConversationSettings,
    pub longform: LongFormSettings,
    pub llm: LlmSettings,
    pub tts: TtsSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for transcripts and rendered audio.
    pub data_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.podweave".to_string(),
            temp_dir: "/tmp/podweave".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// How the two hosts talk. Immutable for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    pub podcast_name: String,
    pub podcast_tagline: String,
    /// Role of the first speaker (`<Person1>`).
    pub roles_person1: String,
    /// Role of the second speaker (`<Person2>`).
    pub roles_person2: String,
    pub conversation_style: Vec<String>,
    pub dialogue_structure: Vec<String>,
    pub engagement_techniques: Vec<String>,
    pub output_language: String,
    /// Free-form instructions that override the prompt template on conflict.
    pub user_instructions: String,
    /// Sampling temperature for dialogue generation.
    pub creativity: f32,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            podcast_name: "PODWEAVE".to_string(),
            podcast_tagline: "Your Personal Generative AI Podcast".to_string(),
            roles_person1: "main summarizer".to_string(),
            roles_person2: "questioner/clarifier".to_string(),
            conversation_style: vec![
                "engaging".to_string(),
                "fast-paced".to_string(),
                "enthusiastic".to_string(),
            ],
            dialogue_structure: vec![
                "Introduction".to_string(),
                "Main Content Summary".to_string(),
                "Conclusion".to_string(),
            ],
            engagement_techniques: vec![
                "rhetorical questions".to_string(),
                "anecdotes".to_string(),
                "analogies".to_string(),
                "humor".to_string(),
            ],
            output_language: "English".to_string(),
            user_instructions: String::new(),
            creativity: 1.0,
        }
    }
}

impl ConversationSettings {
    /// Role description for a speaker.
    pub fn role(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Person1 => &self.roles_person1,
            Speaker::Person2 => &self.roles_person2,
        }
    }

    /// Reject role names that would be ambiguous with speaker tag syntax.
    pub fn validate(&self) -> Result<()> {
        for (key, role) in [
            ("roles_person1", &self.roles_person1),
            ("roles_person2", &self.roles_person2),
        ] {
            if role.trim().is_empty() {
                return Err(PodweaveError::Config(format!("conversation.{} must not be empty", key)));
            }
            if role.contains('<') || role.contains('>') {
                return Err(PodweaveError::Config(format!(
                    "conversation.{} ({:?}) must not contain '<' or '>'",
                    key, role
                )));
            }
            if Speaker::ALL.iter().any(|s| role.contains(s.tag())) {
                return Err(PodweaveError::Config(format!(
                    "conversation.{} ({:?}) must not contain a speaker tag name",
                    key, role
                )));
            }
        }
        if self.roles_person1.trim() == self.roles_person2.trim() {
            return Err(PodweaveError::Config(
                "conversation.roles_person1 and roles_person2 must differ".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.creativity) {
            return Err(PodweaveError::Config(format!(
                "conversation.creativity must be between 0 and 2 (got {})",
                self.creativity
            )));
        }
        Ok(())
    }
}

/// Long-form generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LongFormSettings {
    /// Minimum characters per content chunk.
    pub min_chunk_size: usize,
    /// Maximum number of content chunks (one generation call each).
    pub max_num_chunks: usize,
    /// Upper bound on the context carried from one chunk to the next.
    pub summary_max_chars: usize,
    /// Attempts per chunk before the run fails.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Timeout for a single generation call.
    pub request_timeout_secs: u64,
}

impl Default for LongFormSettings {
    fn default() -> Self {
        Self {
            min_chunk_size: 600,
            max_num_chunks: 7,
            summary_max_chars: 1500,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 30_000,
            request_timeout_secs: 300,
        }
    }
}

/// Dialogue generation model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Generator provider (openai).
    pub provider: String,
    pub model: String,
    pub max_output_tokens: u32,
    /// Optional API base override (OpenAI-compatible servers).
    pub api_base: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4.1".to_string(),
            max_output_tokens: 8192,
            api_base: None,
        }
    }
}

/// Voices used for the two speakers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub person1: String,
    pub person2: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            person1: "echo".to_string(),
            person2: "shimmer".to_string(),
        }
    }
}

/// Settings for the command-line speech backend (e.g. piper).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTtsSettings {
    /// Program to run. Receives text on stdin.
    pub program: String,
    /// Arguments; `{voice}` and `{output}` are substituted.
    pub args: Vec<String>,
    pub max_bytes_per_call: usize,
}

impl Default for CommandTtsSettings {
    fn default() -> Self {
        Self {
            program: "piper".to_string(),
            args: vec![
                "--model".to_string(),
                "{voice}".to_string(),
                "--output_file".to_string(),
                "{output}".to_string(),
            ],
            max_bytes_per_call: 2000,
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    /// Speech backend (openai, command).
    pub provider: String,
    /// Backend model (openai only).
    pub model: String,
    /// Output container (mp3, wav).
    pub audio_format: String,
    /// Maximum concurrent synthesis calls.
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Phrase spoken by Person2 after the conversation. Empty disables it.
    pub ending_message: String,
    /// Audio file appended after the conversation (takes precedence over `ending_message`).
    pub closing_cue_path: Option<String>,
    pub voices: VoiceSettings,
    pub command: CommandTtsSettings,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "tts-1-hd".to_string(),
            audio_format: "mp3".to_string(),
            max_concurrent: 3,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 30_000,
            request_timeout_secs: 120,
            ending_message: "Bye Bye!".to_string(),
            closing_cue_path: None,
            voices: VoiceSettings::default(),
            command: CommandTtsSettings::default(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PodweaveError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that would otherwise fail midway through a run.
    pub fn validate(&self) -> Result<()> {
        self.conversation.validate()?;

        if self.longform.min_chunk_size == 0 {
            return Err(PodweaveError::Config("longform.min_chunk_size must be positive".into()));
        }
        if self.longform.max_num_chunks == 0 {
            return Err(PodweaveError::Config("longform.max_num_chunks must be positive".into()));
        }
        if self.longform.summary_max_chars < 200 {
            return Err(PodweaveError::Config(
                "longform.summary_max_chars must be at least 200".into(),
            ));
        }
        if self.longform.max_retries == 0 || self.tts.max_retries == 0 {
            return Err(PodweaveError::Config("max_retries must be at least 1".into()));
        }
        if self.tts.max_concurrent == 0 {
            return Err(PodweaveError::Config("tts.max_concurrent must be positive".into()));
        }
        if self.tts.voices.person1.trim().is_empty() || self.tts.voices.person2.trim().is_empty() {
            return Err(PodweaveError::Config("tts.voices must name a voice for both speakers".into()));
        }
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podweave")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Directory where generated transcripts are saved.
    pub fn transcripts_dir(&self) -> PathBuf {
        self.data_dir().join("transcripts")
    }

    /// Directory where rendered podcasts are saved.
    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir().join("audio")
    }
}
