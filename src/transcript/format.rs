//! Transcript output formatting (tagged, plain text, JSON).

use super::{Speaker, Transcript, Utterance};
use crate::config::ConversationSettings;
use crate::error::Result;
use serde::Serialize;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    /// The raw speaker-tagged text.
    Tagged,
    /// One "Speaker (role): text" line per turn.
    Plain,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tagged" | "txt" => Ok(OutputFormat::Tagged),
            "plain" | "text" => Ok(OutputFormat::Plain),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use tagged, plain, or json.", s)),
        }
    }
}

/// JSON-serializable transcript for export.
#[derive(Debug, Serialize)]
pub struct TranscriptExport {
    pub speaker_count: usize,
    pub utterances: Vec<UtteranceExport>,
}

#[derive(Debug, Serialize)]
pub struct UtteranceExport {
    pub index: usize,
    pub speaker: Speaker,
    pub role: String,
    pub text: String,
}

impl TranscriptExport {
    fn new(utterances: &[Utterance], conversation: &ConversationSettings) -> Self {
        Self {
            speaker_count: Transcript::SPEAKER_COUNT,
            utterances: utterances
                .iter()
                .map(|u| UtteranceExport {
                    index: u.sequence_index,
                    speaker: u.speaker,
                    role: conversation.role(u.speaker).to_string(),
                    text: u.text.clone(),
                })
                .collect(),
        }
    }
}

/// Format a transcript for output.
pub fn format_transcript(
    transcript: &Transcript,
    format: OutputFormat,
    conversation: &ConversationSettings,
) -> Result<String> {
    match format {
        OutputFormat::Tagged => Ok(transcript.full_text.clone()),
        OutputFormat::Plain => {
            let utterances = transcript.utterances()?;
            Ok(format_plain(&utterances, conversation))
        }
        OutputFormat::Json => {
            let utterances = transcript.utterances()?;
            let export = TranscriptExport::new(&utterances, conversation);
            Ok(serde_json::to_string_pretty(&export)?)
        }
    }
}

fn format_plain(utterances: &[Utterance], conversation: &ConversationSettings) -> String {
    let mut output = String::new();
    for utterance in utterances {
        output.push_str(&format!(
            "{} ({}): {}\n\n",
            utterance.speaker,
            conversation.role(utterance.speaker),
            utterance.text
        ));
    }
    output
}
