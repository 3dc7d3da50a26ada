//! Cleanup of raw model output before validation.
//!
//! Models wrap dialogue in code fences, leave scratchpad notes, add stage
//! directions in brackets, and sprinkle markdown emphasis. None of that should
//! be spoken, so it is removed here. Speaker tags and the SSML tags speech
//! backends understand are kept.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static SCRATCHPAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:scratchpad|plaintext)[^\n]*\n.*?```\n?|<scratchpad>.*?</scratchpad>")
        .expect("Invalid regex")
});

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z]*").expect("Invalid regex"));

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("Invalid regex"));

static UNDERSCORE_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w])_([^_\n]+)_").expect("Invalid regex"));

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?\s*([A-Za-z][\w:-]*)[^<>]*>").expect("Invalid regex"));

static SPEAKER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*(/?)\s*(Person\d+)\s*>").expect("Invalid regex"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("Invalid regex"));

/// SSML tags that speech backends accept inside a turn.
const SSML_TAGS: &[&str] = &["speak", "lang", "p", "phoneme", "s", "sub"];

/// Strip everything from raw model output that should not be spoken.
pub fn clean_fragment(raw: &str) -> String {
    let text = SCRATCHPAD.replace_all(raw, "");
    let text = FENCE.replace_all(&text, "");
    let text = BRACKETED.replace_all(&text, "");
    let text = UNDERSCORE_EMPHASIS.replace_all(&text, "$1$2");
    let text = text.replace('*', "");
    let text = ANY_TAG.replace_all(&text, |caps: &Captures| {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if is_kept_tag(name) {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    let text = BLANK_LINES.replace_all(&text, "\n");
    close_dangling_turns(text.trim())
}

fn is_kept_tag(name: &str) -> bool {
    let is_speaker = name
        .strip_prefix("Person")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
    is_speaker || SSML_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name))
}

/// Close a speaker turn that runs into the next opening tag or the end of text.
///
/// Mismatched closing tags are left alone for validation to reject.
fn close_dangling_turns(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    let mut open: Option<String> = None;

    for caps in SPEAKER_TAG.captures_iter(text) {
        let Some(tag) = caps.get(0) else { continue };
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let name = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        out.push_str(&text[last..tag.start()]);
        if closing {
            if open.as_deref() == Some(name) {
                open = None;
            }
        } else if let Some(current) = open.replace(name.to_string()) {
            let trimmed = out.trim_end().len();
            out.truncate(trimmed);
            out.push_str(&format!("</{}>\n", current));
        }
        out.push_str(tag.as_str());
        last = tag.end();
    }

    out.push_str(&text[last..]);
    if let Some(current) = open {
        out.push_str(&format!("</{}>", current));
    }
    out
}
