//! Configuration module for Podweave.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{DialoguePrompts, PartPrompts, Prompts};
pub use settings::{
    CommandTtsSettings, ConversationSettings, GeneralSettings, LlmSettings, LongFormSettings,
    PromptSettings, Settings, TtsSettings, VoiceSettings,
};
