//! Generate command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{format_size, Output};
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, ProduceOptions};
use anyhow::Result;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Run the generate command.
pub async fn run_generate(
    inputs: &[String],
    longform: bool,
    transcript_only: bool,
    output: Option<String>,
    name: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    if let Some(name) = name {
        settings.conversation.podcast_name = name;
    }

    let mut checks = vec![Operation::Generate];
    if !transcript_only {
        checks.push(Operation::Synthesize);
    }
    for operation in checks {
        if let Err(e) = preflight::check(operation, &settings) {
            Output::error(&format!("{}", e));
            Output::info("Run 'podweave doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }

    let cancel = cancel_on_ctrl_c();
    let orchestrator = Orchestrator::new(settings)?
        .with_cancellation(cancel)
        .with_progress(true);

    Output::info(&format!(
        "Generating a {} conversation from {} input(s)",
        if longform { "long-form" } else { "short" },
        inputs.len()
    ));

    let options = ProduceOptions {
        longform,
        transcript_only,
        output: output.map(PathBuf::from),
    };

    let result = match orchestrator.produce(inputs, &options).await {
        Ok(result) => result,
        Err(e) => {
            Output::error(&format!("Failed to generate podcast: {}", e));
            return Err(e.into());
        }
    };

    Output::success(&format!("Transcript ready ({} turns)", result.utterance_count));
    Output::kv("Transcript", &result.transcript_path.display().to_string());
    match &result.audio_path {
        Some(path) => {
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            Output::kv("Audio", &format!("{} ({})", path.display(), format_size(size)));
        }
        None => Output::info(&format!(
            "Render it later with: podweave synthesize {}",
            result.transcript_path.display()
        )),
    }

    Ok(())
}

/// Token cancelled on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            Output::warning("Stopping after the calls in flight...");
            token.cancel();
        }
    });
    cancel
}
