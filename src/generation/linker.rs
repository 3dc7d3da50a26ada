//! Sequential, context-carrying generation over content chunks.

use super::{clean_fragment, DialogueFragment, GenerationContext, RunningSummary, TurnGenerator};
use crate::chunking::ContentChunk;
use crate::config::{ConversationSettings, LongFormSettings};
use crate::error::{PodweaveError, Result};
use crate::retry::RetryPolicy;
use crate::transcript::{Speaker, Transcript};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Where the linker is in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkerState {
    Init,
    /// Waiting on the generator for chunk `i`.
    Generating(usize),
    /// Folding fragment `i` into the running summary.
    Summarizing(usize),
    Finalizing,
    Done,
    Failed,
}

/// Drives a [`TurnGenerator`] across chunks and stitches the fragments.
///
/// Chunks are processed strictly in order. Each call sees the running summary
/// of everything generated before it, whether it is the first or last part,
/// and which speaker spoke last.
pub struct ContextualLinker {
    generator: Arc<dyn TurnGenerator>,
    conversation: Arc<ConversationSettings>,
    retry: RetryPolicy,
    summary_max_chars: usize,
    cancel: CancellationToken,
    show_progress: bool,
    state: LinkerState,
}

impl ContextualLinker {
    pub fn new(
        generator: Arc<dyn TurnGenerator>,
        conversation: Arc<ConversationSettings>,
        settings: &LongFormSettings,
    ) -> Self {
        Self {
            generator,
            conversation,
            retry: RetryPolicy::from(settings),
            summary_max_chars: settings.summary_max_chars,
            cancel: CancellationToken::new(),
            show_progress: false,
            state: LinkerState::Init,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Draw a progress bar on stderr while generating.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn state(&self) -> LinkerState {
        self.state
    }

    /// Generate one continuous conversation from ordered chunks.
    #[instrument(skip(self, chunks), fields(chunks = chunks.len()))]
    pub async fn link(&mut self, chunks: &[ContentChunk]) -> Result<Transcript> {
        self.run(chunks, true).await
    }

    /// Generate a complete conversation in a single call.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn generate_short_form(&mut self, text: &str) -> Result<Transcript> {
        let chunk = ContentChunk::new(0, text.to_string());
        self.run(std::slice::from_ref(&chunk), false).await
    }

    async fn run(&mut self, chunks: &[ContentChunk], longform: bool) -> Result<Transcript> {
        self.state = LinkerState::Init;
        if chunks.is_empty() {
            self.transition(LinkerState::Failed);
            return Err(PodweaveError::InvalidInput("no content to generate from".to_string()));
        }

        let total = chunks.len();
        info!(
            "Generating {} part(s) with {} ({})",
            total,
            self.generator.name(),
            if longform { "long-form" } else { "short-form" }
        );

        let pb = self.progress_bar(total);
        let mut summary = RunningSummary::new(self.summary_max_chars);
        let mut last_speaker: Option<Speaker> = None;
        let mut parts = Vec::with_capacity(total);

        for chunk in chunks {
            if self.cancel.is_cancelled() {
                pb.finish_and_clear();
                self.transition(LinkerState::Failed);
                return Err(PodweaveError::Cancelled(format!(
                    "generation stopped before part {}",
                    chunk.index + 1
                )));
            }

            self.transition(LinkerState::Generating(chunk.index));
            let context = GenerationContext {
                running_summary: summary.render(),
                chunk_index: chunk.index,
                total_chunks: total,
                last_speaker,
                longform,
                conversation: Arc::clone(&self.conversation),
            };

            let fragment = match self.generate_fragment(chunk.content(), &context).await {
                Ok(fragment) => fragment,
                Err(e) => {
                    pb.finish_and_clear();
                    self.transition(LinkerState::Failed);
                    return Err(e);
                }
            };

            if let (Some(previous), Some(first)) = (last_speaker, fragment.first_speaker()) {
                if previous == first {
                    warn!("Part {} opens with {}, who also closed the previous part", chunk.index + 1, first);
                }
            }

            self.transition(LinkerState::Summarizing(chunk.index));
            summary.record(chunk.index + 1, &fragment.utterances);
            last_speaker = fragment.last_speaker();
            parts.push(fragment.text);
            pb.inc(1);
        }

        pb.finish_and_clear();
        self.transition(LinkerState::Finalizing);

        let transcript = Transcript::from_parts(&parts);
        if let Err(e) = transcript.utterances() {
            self.transition(LinkerState::Failed);
            return Err(e);
        }

        self.transition(LinkerState::Done);
        info!("Transcript complete: {} characters", transcript.full_text.len());
        Ok(transcript)
    }

    async fn generate_fragment(
        &self,
        chunk_text: &str,
        context: &GenerationContext,
    ) -> Result<DialogueFragment> {
        let label = format!("Part {}/{}", context.chunk_index + 1, context.total_chunks);

        let result = self
            .retry
            .run(&label, &self.cancel, |attempt| {
                let generator = Arc::clone(&self.generator);
                let context = context.clone();
                let text = chunk_text.to_string();
                async move {
                    if attempt > 0 {
                        debug!("Retrying part {} (attempt {})", context.chunk_index + 1, attempt + 1);
                    }
                    let raw = generator.generate(&text, &context).await?;
                    DialogueFragment::validate(clean_fragment(&raw), &context)
                }
            })
            .await;

        result.map_err(|failure| match failure.error {
            PodweaveError::Cancelled(reason) => PodweaveError::Cancelled(reason),
            error => PodweaveError::TranscriptGeneration {
                chunk_index: context.chunk_index,
                attempts: failure.attempts,
                reason: error.to_string(),
            },
        })
    }

    fn transition(&mut self, next: LinkerState) {
        debug!("Linker state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Writing   [{bar:30.cyan/blue}] {pos}/{len} parts")
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
    use crate::chunking::segment;
    use crate::testing::FakeGenerator;
    use std::time::Duration;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(2),
            Duration::from_secs(5),
        )
    }

    fn linker(generator: Arc<FakeGenerator>, max_attempts: u32) -> ContextualLinker {
        ContextualLinker::new(
            generator,
            Arc::new(ConversationSettings::default()),
            &LongFormSettings::default(),
        )
        .with_retry(fast_retry(max_attempts))
    }

    fn chunks(n: usize) -> Vec<ContentChunk> {
        (0..n)
            .map(|i| ContentChunk::new(i, format!("Source section {} about topic {}. ", i, i * 7)))
            .collect()
    }

    #[tokio::test]
    async fn test_greeting_and_closing_placement() {
        for n in [1, 2, 5] {
            let generator = Arc::new(FakeGenerator::new());
            let mut linker = linker(Arc::clone(&generator), 3);
            let transcript = linker.link(&chunks(n)).await.unwrap();

            let calls = generator.calls();
            assert_eq!(calls.len(), n);
            for (i, (_, ctx)) in calls.iter().enumerate() {
                assert_eq!(ctx.is_first_chunk(), i == 0, "n={} i={}", n, i);
                assert_eq!(ctx.is_last_chunk(), i == n - 1, "n={} i={}", n, i);
                assert_eq!(ctx.total_chunks, n);
            }

            assert_eq!(transcript.full_text.matches("Welcome to PODWEAVE").count(), 1);
            assert_eq!(transcript.full_text.matches("Goodbye").count(), 1);
            let utterances = transcript.utterances().unwrap();
            assert!(utterances[0].text.starts_with("Welcome to PODWEAVE"));
            assert!(utterances.last().unwrap().text.contains("Goodbye"));
            assert_eq!(linker.state(), LinkerState::Done);
        }
    }

    #[tokio::test]
    async fn test_three_chunk_conversation_has_both_speakers() {
        let text = (0..60)
            .map(|i| format!("Fact number {} explains a different aspect of the subject.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let min = text.chars().count() / 3 - 30;
        let pieces = segment(&text, min, 3).unwrap();
        assert_eq!(pieces.len(), 3);

        let generator = Arc::new(FakeGenerator::new());
        let transcript = linker(Arc::clone(&generator), 3).link(&pieces).await.unwrap();

        let utterances = transcript.utterances().unwrap();
        assert_eq!(utterances[0].speaker, Speaker::Person1);
        assert!(utterances.iter().any(|u| u.speaker == Speaker::Person2));
        for (i, utterance) in utterances.iter().enumerate() {
            assert_eq!(utterance.sequence_index, i);
        }

        // The greeting belongs to the first fragment only.
        let first_fragment_len = crate::transcript::parse(&FakeGenerator::dialogue_for_part(0, 3))
            .unwrap()
            .len();
        let greetings: Vec<usize> = utterances
            .iter()
            .filter(|u| u.text.contains("Welcome to"))
            .map(|u| u.sequence_index)
            .collect();
        assert_eq!(greetings, vec![0]);
        assert!(greetings.iter().all(|&i| i < first_fragment_len));
        assert!(utterances.len() > first_fragment_len);
    }

    #[tokio::test]
    async fn test_context_carries_summary_and_last_speaker() {
        let generator = Arc::new(FakeGenerator::new());
        linker(Arc::clone(&generator), 3).link(&chunks(3)).await.unwrap();

        let calls = generator.calls();
        assert!(calls[0].1.running_summary.is_empty());
        assert_eq!(calls[0].1.last_speaker, None);
        assert!(calls[1].1.running_summary.contains("Part 1:"));
        assert!(calls[1].1.last_speaker.is_some());
        assert!(calls[2].1.running_summary.contains("Part 2:"));
        assert_eq!(calls[1].0, "Source section 1 about topic 7.");
    }

    #[tokio::test]
    async fn test_summary_stays_bounded() {
        let generator = Arc::new(FakeGenerator::new());
        let settings = LongFormSettings {
            summary_max_chars: 300,
            ..LongFormSettings::default()
        };
        let mut linker = ContextualLinker::new(
            Arc::clone(&generator) as Arc<dyn TurnGenerator>,
            Arc::new(ConversationSettings::default()),
            &settings,
        )
        .with_retry(fast_retry(1));

        linker.link(&chunks(20)).await.unwrap();
        for (_, ctx) in generator.calls() {
            assert!(ctx.running_summary.chars().count() <= 300);
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_with_chunk_index() {
        let generator = Arc::new(FakeGenerator::with_script(vec![
            Ok(FakeGenerator::dialogue_for_part(0, 3)),
            Err(PodweaveError::OpenAI("503".into())),
            Err(PodweaveError::Timeout(Duration::from_secs(30))),
            Err(PodweaveError::OpenAI("503".into())),
        ]));
        let mut linker = linker(Arc::clone(&generator), 3);
        let err = linker.link(&chunks(3)).await.unwrap_err();

        match err {
            PodweaveError::TranscriptGeneration { chunk_index, attempts, reason } => {
                assert_eq!(chunk_index, 1);
                assert_eq!(attempts, 3);
                assert!(reason.contains("503"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(linker.state(), LinkerState::Failed);
        assert_eq!(generator.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_degenerate_output_is_retried() {
        let generator = Arc::new(FakeGenerator::with_script(vec![Ok(
            "<Person1></Person1><Person2> </Person2>".to_string(),
        )]));
        let transcript = linker(Arc::clone(&generator), 3).link(&chunks(2)).await.unwrap();

        assert_eq!(generator.calls().len(), 3);
        assert!(transcript.utterances().unwrap().len() >= 4);
    }

    #[tokio::test]
    async fn test_repeated_greeting_is_retried() {
        let generator = Arc::new(FakeGenerator::with_script(vec![
            Ok(FakeGenerator::dialogue_for_part(0, 2)),
            Ok(FakeGenerator::dialogue_for_part(0, 2)),
        ]));
        let transcript = linker(Arc::clone(&generator), 3).link(&chunks(2)).await.unwrap();

        assert_eq!(generator.calls().len(), 3);
        assert_eq!(transcript.full_text.matches("Welcome to").count(), 1);
    }

    #[tokio::test]
    async fn test_early_goodbye_is_retried() {
        // Complete single-part dialogue: greets and says goodbye.
        let generator = Arc::new(FakeGenerator::with_script(vec![Ok(FakeGenerator::dialogue_for_part(0, 1))]));
        let mut linker = linker(Arc::clone(&generator), 3);
        let transcript = linker.link(&chunks(2)).await.unwrap();

        let calls = generator.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].1.chunk_index, 0);
        assert_eq!(calls[1].1.chunk_index, 0);
        assert_eq!(transcript.full_text.matches("Goodbye").count(), 1);
        assert!(transcript.utterances().unwrap().last().unwrap().text.contains("Goodbye"));
    }

    #[tokio::test]
    async fn test_short_form_is_single_call() {
        let generator = Arc::new(FakeGenerator::new());
        let transcript = linker(Arc::clone(&generator), 3)
            .generate_short_form("  A short article.  ")
            .await
            .unwrap();

        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "A short article.");
        assert!(calls[0].1.is_first_chunk() && calls[0].1.is_last_chunk());
        assert!(!calls[0].1.longform);
        assert!(transcript.full_text.contains("Goodbye"));
    }

    #[tokio::test]
    async fn test_cancelled_run_fails() {
        let generator = Arc::new(FakeGenerator::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut linker = linker(Arc::clone(&generator), 3).with_cancellation(cancel);

        let err = linker.link(&chunks(2)).await.unwrap_err();
        assert!(matches!(err, PodweaveError::Cancelled(_)));
        assert_eq!(linker.state(), LinkerState::Failed);
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let generator = Arc::new(FakeGenerator::new());
        let err = linker(generator, 3).link(&[]).await.unwrap_err();
        assert!(matches!(err, PodweaveError::InvalidInput(_)));
    }
}
