//! Speaker-tagged dialogue transcripts.
//!
//! A transcript is plain text where every turn is wrapped in a speaker tag:
//! `<Person1>…</Person1>` or `<Person2>…</Person2>`. [`parse`] turns it into an
//! ordered list of [`Utterance`]s for synthesis.

mod format;
mod parser;

pub use format::{format_transcript, OutputFormat, TranscriptExport, UtteranceExport};
pub use parser::parse;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One of the two fixed conversation roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Speaker {
    Person1,
    Person2,
}

impl Speaker {
    pub const ALL: [Speaker; 2] = [Speaker::Person1, Speaker::Person2];

    /// Tag name used in the transcript markup.
    pub fn tag(self) -> &'static str {
        match self {
            Speaker::Person1 => "Person1",
            Speaker::Person2 => "Person2",
        }
    }

    /// The other speaker.
    pub fn other(self) -> Speaker {
        match self {
            Speaker::Person1 => Speaker::Person2,
            Speaker::Person2 => Speaker::Person1,
        }
    }

    /// Wrap text in this speaker's tags.
    pub fn wrap(self, text: &str) -> String {
        format!("<{tag}>{text}</{tag}>", tag = self.tag())
    }

    fn from_number(n: &str) -> Option<Speaker> {
        match n {
            "1" => Some(Speaker::Person1),
            "2" => Some(Speaker::Person2),
            _ => None,
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// One speaker's single turn, parsed from a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
    /// Position in the transcript, starting at 0.
    pub sequence_index: usize,
}

impl Utterance {
    pub fn new(speaker: Speaker, text: impl Into<String>, sequence_index: usize) -> Self {
        Self {
            speaker,
            text: text.into(),
            sequence_index,
        }
    }

    /// The utterance re-serialized with its speaker tags.
    pub fn to_tagged(&self) -> String {
        self.speaker.wrap(&self.text)
    }
}

/// A complete two-speaker dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Tagged dialogue text.
    pub full_text: String,
    /// Number of distinct speakers. Always 2.
    pub speaker_count: usize,
}

impl Transcript {
    pub const SPEAKER_COUNT: usize = 2;

    pub fn new(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            speaker_count: Self::SPEAKER_COUNT,
        }
    }

    /// Stitch fragment texts in order, one per line block.
    pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Self {
        let full_text = parts
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(full_text)
    }

    /// Parse into utterances.
    pub fn utterances(&self) -> Result<Vec<Utterance>> {
        parse(&self.full_text)
    }

    /// Load a previously saved tagged transcript.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let transcript = Self::new(content.trim());
        // Fail early on files that are not speaker-tagged transcripts.
        transcript.utterances()?;
        Ok(transcript)
    }

    /// Save the tagged text, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.full_text)?;
        Ok(())
    }
}
