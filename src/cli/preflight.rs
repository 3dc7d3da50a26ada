//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{PodweaveError, Result};
use crate::openai::is_api_key_configured;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Transcript generation needs the dialogue model.
    Generate,
    /// Audio rendering needs the speech backend.
    Synthesize,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    settings.validate()?;
    match operation {
        Operation::Generate => {
            if settings.llm.provider.eq_ignore_ascii_case("openai") && settings.llm.api_base.is_none() {
                check_api_key()?;
            }
        }
        Operation::Synthesize => check_speech_backend(settings)?,
    }
    Ok(())
}

fn check_speech_backend(settings: &Settings) -> Result<()> {
    match settings.tts.provider.to_lowercase().as_str() {
        "openai" => check_api_key(),
        "command" => check_tool(&settings.tts.command.program),
        other => Err(PodweaveError::Config(format!("Unknown tts.provider: {}", other))),
    }
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(PodweaveError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ))
    }
}

/// Check if an external program can be started.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--help").output() {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PodweaveError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(PodweaveError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
