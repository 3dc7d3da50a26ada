//! Bounded running summary carried between generation calls.
//!
//! The summary is extractive: one topic line per finished fragment plus the
//! last exchange verbatim. Its rendered form never exceeds the configured
//! character budget, so prompt size stays flat however long the
//! conversation gets.

use crate::transcript::{Speaker, Utterance};
use std::collections::VecDeque;

const MAX_TOPICS: usize = 6;
const TOPIC_CHARS: usize = 200;
const RECENT_TURNS: usize = 2;
const RECENT_CHARS: usize = 400;

#[derive(Debug, Clone)]
pub struct RunningSummary {
    topics: VecDeque<String>,
    recent: Vec<(Speaker, String)>,
    max_chars: usize,
}

impl RunningSummary {
    pub fn new(max_chars: usize) -> Self {
        Self {
            topics: VecDeque::new(),
            recent: Vec::new(),
            max_chars,
        }
    }

    /// Fold a finished fragment into the summary.
    pub fn record(&mut self, part_number: usize, utterances: &[Utterance]) {
        if let Some(topic) = topic_of(utterances) {
            self.topics.push_back(format!("Part {}: {}", part_number, topic));
            while self.topics.len() > MAX_TOPICS {
                self.topics.pop_front();
            }
        }

        let skip = utterances.len().saturating_sub(RECENT_TURNS);
        self.recent = utterances[skip..]
            .iter()
            .map(|u| (u.speaker, tail_chars(&u.text, RECENT_CHARS)))
            .collect();
    }

    /// Render within the character budget.
    ///
    /// Oldest topics go first, then older recent turns. Only when a single
    /// turn is left is its text shortened, keeping the speaker tags whole.
    pub fn render(&self) -> String {
        if self.topics.is_empty() && self.recent.is_empty() {
            return String::new();
        }

        let mut topics: VecDeque<&String> = self.topics.iter().collect();
        let mut recent: &[(Speaker, String)] = &self.recent;
        loop {
            let rendered = render_with(&topics, recent);
            if rendered.chars().count() <= self.max_chars {
                return rendered;
            }
            if topics.pop_front().is_some() {
                continue;
            }
            if recent.len() > 1 {
                recent = &recent[1..];
                continue;
            }
            return self.squeeze(recent);
        }
    }

    /// Shorten the one remaining turn from the front until the rendering fits.
    fn squeeze(&self, recent: &[(Speaker, String)]) -> String {
        let Some((speaker, text)) = recent.first() else {
            return String::new();
        };
        let overhead = render_with(&VecDeque::new(), &[(*speaker, String::new())])
            .chars()
            .count();
        let room = self.max_chars.saturating_sub(overhead);
        if room < 2 {
            return String::new();
        }
        render_with(&VecDeque::new(), &[(*speaker, tail_chars(text, room))])
    }
}

fn render_with(topics: &VecDeque<&String>, recent: &[(Speaker, String)]) -> String {
    let mut out = String::new();
    if !topics.is_empty() {
        out.push_str("Topics covered so far:\n");
        for topic in topics {
            out.push_str("- ");
            out.push_str(topic);
            out.push('\n');
        }
    }
    if !recent.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Most recent exchange:\n");
        let turns: Vec<String> = recent.iter().map(|(speaker, text)| speaker.wrap(text)).collect();
        out.push_str(&turns.join("\n"));
    }
    out.trim_end().to_string()
}

/// First sentence of the longest turn, which is usually the substantive one.
fn topic_of(utterances: &[Utterance]) -> Option<String> {
    let longest = utterances.iter().max_by_key(|u| u.text.chars().count())?;
    let sentence = longest
        .text
        .split_inclusive(['.', '!', '?'])
        .next()
        .unwrap_or(&longest.text)
        .trim();
    Some(head_chars(sentence, TOPIC_CHARS))
}

fn head_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", head.trim_end())
}

fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - max + 1).collect();
    format!("…{}", tail.trim_start())
}
