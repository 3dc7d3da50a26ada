//! Speaker-tag parser.

use super::{Speaker, Utterance};
use crate::error::{PodweaveError, Result};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Matches `<PersonN>` and `</PersonN>` with optional inner whitespace.
static SPEAKER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*(/?)\s*Person(\d+)\s*>").expect("Invalid regex"));

const EXCERPT_CHARS: usize = 80;

/// Parse a tagged transcript into ordered utterances.
///
/// Text outside tag pairs is discarded. An opening tag that is not closed by
/// the same speaker's closing tag, or any speaker tag other than `Person1` and
/// `Person2`, fails with [`PodweaveError::MalformedTranscript`]. Adjacent turns
/// of the same speaker stay separate.
pub fn parse(full_text: &str) -> Result<Vec<Utterance>> {
    let mut utterances = Vec::new();
    // (speaker, content start, tag start)
    let mut open: Option<(Speaker, usize, usize)> = None;

    for caps in SPEAKER_TAG.captures_iter(full_text) {
        let Some(tag) = caps.get(0) else { continue };
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let number = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let speaker = Speaker::from_number(number).ok_or_else(|| {
            malformed(
                format!(
                    "found speaker tag {:?}; only Person1 and Person2 are allowed",
                    tag.as_str()
                ),
                full_text,
                tag.start(),
            )
        })?;

        match open {
            None if !closing => open = Some((speaker, tag.end(), tag.start())),
            None => debug!("Ignoring stray closing tag {:?} at byte {}", tag.as_str(), tag.start()),
            Some((current, content_start, _)) if closing && current == speaker => {
                let text = normalize_whitespace(&full_text[content_start..tag.start()]);
                if text.is_empty() {
                    debug!("Dropping empty {} turn at byte {}", speaker, content_start);
                } else {
                    let sequence_index = utterances.len();
                    utterances.push(Utterance::new(speaker, text, sequence_index));
                }
                open = None;
            }
            Some((current, _, tag_start)) => {
                return Err(malformed(
                    format!("<{}> is not closed before {:?}", current, tag.as_str()),
                    full_text,
                    tag_start,
                ));
            }
        }
    }

    if let Some((current, _, tag_start)) = open {
        return Err(malformed(
            format!("<{}> is never closed", current),
            full_text,
            tag_start,
        ));
    }

    Ok(utterances)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn malformed(reason: String, full_text: &str, at: usize) -> PodweaveError {
    PodweaveError::MalformedTranscript {
        reason,
        excerpt: full_text[at..].chars().take(EXCERPT_CHARS).collect(),
    }
}
