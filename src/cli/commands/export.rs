//! Export command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::{format_transcript, OutputFormat, Transcript};
use anyhow::Result;

/// Run the export command.
pub fn run_export(transcript: &str, output: Option<String>, format: &str, settings: Settings) -> Result<()> {
    let output_format: OutputFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let path = Settings::expand_path(transcript);
    let transcript = Transcript::load(&path)?;
    let output_str = format_transcript(&transcript, output_format, &settings.conversation)?;

    match output {
        Some(path) if path != "-" => {
            std::fs::write(&path, &output_str)?;
            let turns = transcript.utterances()?.len();
            Output::success(&format!("Exported {} turns to {}", turns, path));
        }
        _ => {
            println!("{}", output_str);
        }
    }

    Ok(())
}
