//! Synthesize command implementation.

use super::generate::cancel_on_ctrl_c;
use crate::cli::preflight::{self, Operation};
use crate::cli::{format_size, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::PathBuf;

/// Run the synthesize command.
pub async fn run_synthesize(transcript: &str, output: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Synthesize, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'podweave doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let transcript_path = Settings::expand_path(transcript);
    let output = output.map(PathBuf::from);

    let orchestrator = Orchestrator::new(settings)?
        .with_cancellation(cancel_on_ctrl_c())
        .with_progress(true);

    Output::info(&format!("Rendering {}", transcript_path.display()));
    let audio_path = match orchestrator
        .synthesize_file(&transcript_path, output.as_deref())
        .await
    {
        Ok(path) => path,
        Err(e) => {
            Output::error(&format!("Failed to render audio: {}", e));
            return Err(e.into());
        }
    };

    let size = std::fs::metadata(&audio_path).map(|m| m.len()).unwrap_or(0);
    Output::success(&format!("Saved {} ({})", audio_path.display(), format_size(size)));
    Ok(())
}
