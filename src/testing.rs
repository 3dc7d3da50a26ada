//! Test doubles for the generation and speech backends, plus audio fixtures.

use crate::error::{PodweaveError, Result};
use crate::generation::{GenerationContext, TurnGenerator};
use crate::transcript::Speaker;
use crate::tts::{BackendLimits, SpeechBackend, SpeechRequest};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Generator that replays scripted responses, then writes plausible dialogue.
#[derive(Default)]
pub struct FakeGenerator {
    script: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(String, GenerationContext)>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Responses returned in order before falling back to generated dialogue.
    pub fn with_script(script: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, GenerationContext)> {
        self.calls.lock().unwrap().clone()
    }

    /// Valid dialogue for a part, opened by Person1, for the default podcast name.
    pub fn dialogue_for_part(chunk_index: usize, total_chunks: usize) -> String {
        dialogue(chunk_index, total_chunks, Speaker::Person1, "PODWEAVE", "the source")
    }
}

fn dialogue(chunk_index: usize, total_chunks: usize, opener: Speaker, podcast: &str, topic: &str) -> String {
    let other = opener.other();
    let mut turns = Vec::new();
    if chunk_index == 0 {
        turns.push(opener.wrap(&format!("Welcome to {} - the show. Today we dig into {}.", podcast, topic)));
    } else {
        turns.push(opener.wrap(&format!("Let's keep going with {}.", topic)));
    }
    turns.push(other.wrap(&format!(
        "Part {} is all about {}, which is a fascinating detail.",
        chunk_index + 1,
        topic
    )));
    turns.push(opener.wrap("Absolutely, and it connects to what we said before."));
    if chunk_index + 1 >= total_chunks {
        turns.push(other.wrap("Thanks for listening. Goodbye everyone!"));
    }
    turns.join("\n")
}

#[async_trait]
impl TurnGenerator for FakeGenerator {
    async fn generate(&self, chunk_text: &str, context: &GenerationContext) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((chunk_text.to_string(), context.clone()));

        if let Some(scripted) = self.script.lock().unwrap().pop_front() {
            return scripted;
        }

        let topic: String = chunk_text.chars().take(40).collect();
        Ok(dialogue(
            context.chunk_index,
            context.total_chunks,
            context.next_speaker(),
            &context.conversation.podcast_name,
            topic.trim(),
        ))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

type DelayFn = Box<dyn Fn(&SpeechRequest) -> Duration + Send + Sync>;

/// Speech backend that returns a short WAV per request and records requests.
pub struct FakeSpeechBackend {
    limits: BackendLimits,
    requests: Mutex<Vec<SpeechRequest>>,
    completed: Mutex<Vec<String>>,
    failures_left: AtomicU32,
    garbage_left: AtomicU32,
    fail_on: Option<String>,
    delay: Option<DelayFn>,
}

impl Default for FakeSpeechBackend {
    fn default() -> Self {
        Self {
            limits: BackendLimits::single_speaker(4096),
            requests: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            failures_left: AtomicU32::new(0),
            garbage_left: AtomicU32::new(0),
            fail_on: None,
            delay: None,
        }
    }
}

impl FakeSpeechBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: BackendLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Fail the first `n` calls with a transient error.
    pub fn failing_times(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Answer the first `n` calls with an HTML error page instead of audio.
    pub fn garbage_times(self, n: u32) -> Self {
        self.garbage_left.store(n, Ordering::SeqCst);
        self
    }

    /// Always fail requests whose text contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn with_delay(mut self, delay: impl Fn(&SpeechRequest) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Request texts in the order their calls finished.
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechBackend for FakeSpeechBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn limits(&self) -> BackendLimits {
        self.limits
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(request.clone());
        let text = request.text();

        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(request)).await;
        }
        if self.fail_on.as_deref().is_some_and(|needle| text.contains(needle)) {
            return Err(PodweaveError::OpenAI("simulated outage".to_string()));
        }
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PodweaveError::Timeout(Duration::from_secs(1)));
        }
        if self
            .garbage_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Ok(b"<html>502 bad gateway</html>".to_vec());
        }

        // One sample per byte of text keeps output length traceable.
        let samples: Vec<i16> = text.bytes().map(i16::from).collect();
        self.completed.lock().unwrap().push(text);
        Ok(wav_bytes(24000, 1, &samples))
    }
}

/// 16-bit integer PCM WAV.
pub fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    cursor.into_inner()
}

/// One silent MPEG-1 Layer III frame: 128 kbps, 44.1 kHz, mono.
pub fn mp3_frame() -> Vec<u8> {
    let mut frame = vec![0xFF, 0xFB, 0x90, 0xC4];
    frame.resize(417, 0);
    frame
}

/// A Xing header frame with the same stream parameters as [`mp3_frame`].
pub fn mp3_info_frame() -> Vec<u8> {
    let mut frame = mp3_frame();
    frame[21..25].copy_from_slice(b"Xing");
    frame
}

/// ID3v2.4 tag with a 5-byte body.
pub fn id3v2_tag() -> Vec<u8> {
    let mut tag = b"ID3\x04\x00\x00\x00\x00\x00\x05".to_vec();
    tag.extend_from_slice(b"abcde");
    tag
}
