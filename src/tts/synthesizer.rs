//! Concurrent batch synthesis.

use super::{plan_batches, BackendLimits, Batch, SpeechBackend, SpeechRequest, VoiceAssignment};
use crate::audio::AudioSegment;
use crate::config::TtsSettings;
use crate::error::{PodweaveError, Result};
use crate::retry::RetryPolicy;
use crate::transcript::{Speaker, Utterance};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Turns utterances into ordered audio segments with a [`SpeechBackend`].
pub struct Synthesizer {
    backend: Arc<dyn SpeechBackend>,
    retry: RetryPolicy,
    max_concurrent: usize,
    cancel: CancellationToken,
    show_progress: bool,
}

impl Synthesizer {
    pub fn new(backend: Arc<dyn SpeechBackend>, settings: &TtsSettings) -> Self {
        Self {
            backend,
            retry: RetryPolicy::from(settings),
            max_concurrent: settings.max_concurrent.max(1),
            cancel: CancellationToken::new(),
            show_progress: false,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Synthesize utterances into segments sorted by `sequence_index`.
    ///
    /// Batches run concurrently up to the configured limit. The first batch
    /// that fails after its retries fails the whole call.
    #[instrument(skip_all, fields(utterances = utterances.len(), backend = self.backend.name()))]
    pub async fn synthesize(
        &self,
        utterances: &[Utterance],
        voices: &VoiceAssignment,
        limits: &BackendLimits,
    ) -> Result<Vec<AudioSegment>> {
        if utterances.is_empty() {
            return Err(PodweaveError::InvalidInput("transcript has no utterances".to_string()));
        }

        let batches = plan_batches(utterances, limits);
        let batch_count = batches.len();
        info!(
            "Synthesizing {} utterances in {} batches ({} concurrent)",
            utterances.len(),
            batch_count,
            self.max_concurrent
        );

        let pb = self.progress_bar(batch_count);
        let mut segments = Vec::with_capacity(batch_count);

        let mut stream = stream::iter(batches)
            .map(|batch| self.synthesize_batch(batch, voices))
            .buffer_unordered(self.max_concurrent);

        while let Some(result) = stream.next().await {
            pb.inc(1);
            match result {
                Ok(segment) => segments.push(segment),
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(e);
                }
            }
        }
        pb.finish_and_clear();

        segments.sort_by_key(|s| s.sequence_index);
        Ok(segments)
    }

    /// Synthesize a standalone phrase, such as the sign-off.
    pub async fn synthesize_phrase(
        &self,
        speaker: Speaker,
        text: &str,
        voices: &VoiceAssignment,
        sequence_index: usize,
    ) -> Result<AudioSegment> {
        let batch = Batch::new(vec![Utterance::new(speaker, text, sequence_index)]);
        self.synthesize_batch(batch, voices).await
    }

    async fn synthesize_batch(&self, batch: Batch, voices: &VoiceAssignment) -> Result<AudioSegment> {
        let first = batch.first_index();
        let last = batch.last_index();

        if self.cancel.is_cancelled() {
            return Err(PodweaveError::Cancelled(format!(
                "synthesis stopped before utterance {}",
                first
            )));
        }

        let request = SpeechRequest::from_batch(&batch, voices);
        let label = format!("Utterances {}..={}", first, last);
        debug!("{}: {} bytes", label, batch.byte_len());

        let speakers = batch.speakers();
        self.retry
            .run(&label, &self.cancel, |_| {
                let backend = Arc::clone(&self.backend);
                let request = request.clone();
                let speakers = speakers.clone();
                async move {
                    let bytes = backend.synthesize(&request).await?;
                    // Error pages and truncated streams are retried.
                    AudioSegment::new(first, bytes, speakers).map_err(|e| match e {
                        PodweaveError::Audio(reason) => PodweaveError::UnusableAudio(reason),
                        other => other,
                    })
                }
            })
            .await
            .map_err(|failure| match failure.error {
                PodweaveError::Cancelled(reason) => PodweaveError::Cancelled(reason),
                error => PodweaveError::Synthesis {
                    first_utterance: first,
                    last_utterance: last,
                    attempts: failure.attempts,
                    reason: error.to_string(),
                },
            })
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Speaking  [{bar:30.cyan/blue}] {pos}/{len} batches")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoiceSettings;
    use crate::testing::FakeSpeechBackend;
    use std::time::Duration;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(2),
            Duration::from_secs(5),
        )
    }

    fn synthesizer(backend: Arc<FakeSpeechBackend>, max_concurrent: usize) -> Synthesizer {
        Synthesizer::new(backend, &TtsSettings::default())
            .with_retry(fast_retry(3))
            .with_max_concurrent(max_concurrent)
    }

    fn alternating(n: usize) -> Vec<Utterance> {
        (0..n)
            .map(|i| {
                let speaker = if i % 2 == 0 { Speaker::Person1 } else { Speaker::Person2 };
                Utterance::new(speaker, format!("Utterance {}", i), i)
            })
            .collect()
    }

    fn voices() -> VoiceAssignment {
        VoiceAssignment::from(&VoiceSettings::default())
    }

    #[tokio::test]
    async fn test_single_speaker_backend_gets_one_voice_per_call() {
        let backend = Arc::new(FakeSpeechBackend::new());
        let limits = BackendLimits::single_speaker(4096);
        let segments = synthesizer(Arc::clone(&backend), 2)
            .synthesize(&alternating(4), &voices(), &limits)
            .await
            .unwrap();

        assert_eq!(segments.len(), 4);
        let requests = backend.requests();
        assert_eq!(requests.len(), 4);
        for request in &requests {
            assert_eq!(request.turns.len(), 1);
            let expected = voices().voice_for(request.turns[0].speaker).to_string();
            assert_eq!(request.turns[0].voice, expected);
        }
    }

    #[tokio::test]
    async fn test_segments_sorted_despite_reversed_completion() {
        // Later utterances finish first.
        let backend = Arc::new(FakeSpeechBackend::new().with_delay(|request| {
            let index: u64 = request.text().trim_start_matches("Utterance ").parse().unwrap_or(0);
            Duration::from_millis(200 - index * 40)
        }));
        let utterances = alternating(5);
        let segments = synthesizer(Arc::clone(&backend), 5)
            .synthesize(&utterances, &voices(), &BackendLimits::single_speaker(4096))
            .await
            .unwrap();

        let order: Vec<usize> = segments.iter().map(|s| s.sequence_index).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        let completion = backend.completion_order();
        assert_eq!(completion.first().map(String::as_str), Some("Utterance 4"));
    }

    #[tokio::test]
    async fn test_utterances_are_never_split_across_calls() {
        let backend = Arc::new(FakeSpeechBackend::new());
        let utterances = alternating(9);
        let limits = BackendLimits {
            max_bytes_per_call: 30,
            max_speakers_per_call: 2,
            max_turns_per_call: 3,
        };
        synthesizer(Arc::clone(&backend), 3)
            .synthesize(&utterances, &voices(), &limits)
            .await
            .unwrap();

        let requests = backend.requests();
        let mut sent: Vec<String> = requests
            .iter()
            .flat_map(|r| r.turns.iter().map(|t| t.text.clone()))
            .collect();
        sent.sort();
        let mut expected: Vec<String> = utterances.iter().map(|u| u.text.clone()).collect();
        expected.sort();
        assert_eq!(sent, expected);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let backend = Arc::new(FakeSpeechBackend::new().failing_times(2));
        let segments = synthesizer(Arc::clone(&backend), 1)
            .synthesize(&alternating(1), &voices(), &BackendLimits::single_speaker(4096))
            .await
            .unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_undecodable_audio_is_retried() {
        let backend = Arc::new(FakeSpeechBackend::new().garbage_times(1));
        let segments = synthesizer(Arc::clone(&backend), 1)
            .synthesize(&alternating(1), &voices(), &BackendLimits::single_speaker(4096))
            .await
            .unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_persistently_undecodable_audio_fails_the_batch() {
        let backend = Arc::new(FakeSpeechBackend::new().garbage_times(10));
        let err = synthesizer(Arc::clone(&backend), 1)
            .synthesize(&alternating(1), &voices(), &BackendLimits::single_speaker(4096))
            .await
            .unwrap_err();
        match err {
            PodweaveError::Synthesis { attempts, reason, .. } => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("unusable audio"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_multi_speaker_backend_batches_turns() {
        let backend = Arc::new(FakeSpeechBackend::new().with_limits(BackendLimits {
            max_bytes_per_call: 4096,
            max_speakers_per_call: 2,
            max_turns_per_call: 4,
        }));
        let segments = synthesizer(Arc::clone(&backend), 2)
            .synthesize(&alternating(6), &voices(), &backend.limits())
            .await
            .unwrap();

        let starts: Vec<usize> = segments.iter().map(|s| s.sequence_index).collect();
        assert_eq!(starts, vec![0, 4]);
        assert_eq!(segments[0].speakers, vec![Speaker::Person1, Speaker::Person2]);

        let mut requests = backend.requests();
        requests.sort_by_key(|r| r.turns.len());
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].turns.len(), 4);
        for turn in &requests[1].turns {
            assert_eq!(turn.voice, voices().voice_for(turn.speaker));
        }
    }

    #[tokio::test]
    async fn test_exhausted_batch_reports_utterance_range() {
        let backend = Arc::new(FakeSpeechBackend::new().failing_on("Utterance 2"));
        let err = synthesizer(Arc::clone(&backend), 2)
            .synthesize(&alternating(4), &voices(), &BackendLimits::single_speaker(4096))
            .await
            .unwrap_err();

        match err {
            PodweaveError::Synthesis { first_utterance, last_utterance, attempts, .. } => {
                assert_eq!(first_utterance, 2);
                assert_eq!(last_utterance, 2);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_synthesis() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let backend = Arc::new(FakeSpeechBackend::new());
        let err = synthesizer(Arc::clone(&backend), 2)
            .with_cancellation(cancel)
            .synthesize(&alternating(3), &voices(), &BackendLimits::single_speaker(4096))
            .await
            .unwrap_err();
        assert!(matches!(err, PodweaveError::Cancelled(_)));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_phrase_uses_speaker_voice() {
        let backend = Arc::new(FakeSpeechBackend::new());
        let segment = synthesizer(Arc::clone(&backend), 1)
            .synthesize_phrase(Speaker::Person2, "Bye Bye!", &voices(), 12)
            .await
            .unwrap();
        assert_eq!(segment.sequence_index, 12);
        assert_eq!(backend.requests()[0].voice(), Some("shimmer"));
    }
}
