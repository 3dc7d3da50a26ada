//! Local speech synthesis through an external program such as piper.

use super::{BackendLimits, SpeechBackend, SpeechRequest};
use crate::config::TtsSettings;
use crate::error::{PodweaveError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Runs a program per request: text on stdin, audio written to `{output}`.
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    max_bytes_per_call: usize,
    temp_dir: PathBuf,
}

impl CommandBackend {
    pub fn new(program: &str, args: Vec<String>, max_bytes_per_call: usize, temp_dir: PathBuf) -> Self {
        Self {
            program: program.to_string(),
            args,
            max_bytes_per_call,
            temp_dir,
        }
    }

    pub fn from_settings(settings: &TtsSettings, temp_dir: PathBuf) -> Self {
        Self::new(
            &settings.command.program,
            settings.command.args.clone(),
            settings.command.max_bytes_per_call,
            temp_dir,
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn render_args(&self, voice: &str, output: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{voice}", voice).replace("{output}", output))
            .collect()
    }
}

#[async_trait]
impl SpeechBackend for CommandBackend {
    fn name(&self) -> &str {
        "command"
    }

    fn limits(&self) -> BackendLimits {
        BackendLimits::single_speaker(self.max_bytes_per_call)
    }

    #[instrument(skip(self, request), fields(program = %self.program))]
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
        let voice = request
            .voice()
            .ok_or_else(|| PodweaveError::InvalidInput("empty speech request".to_string()))?;

        std::fs::create_dir_all(&self.temp_dir)?;
        let output = tempfile::Builder::new()
            .prefix("podweave-")
            .suffix(".audio")
            .tempfile_in(&self.temp_dir)?;
        let output_path = output.path().to_string_lossy().to_string();

        let args = self.render_args(voice, &output_path);
        debug!("Running {} {:?}", self.program, args);

        let spawned = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PodweaveError::ToolNotFound(self.program.clone()));
            }
            Err(e) => {
                return Err(PodweaveError::ToolFailed(format!("{} failed to start: {}", self.program, e)));
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(request.text().as_bytes()).await {
                // The program exited without reading; its status says why.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!("{} closed stdin early", self.program)
                }
                other => other?,
            }
        }

        let result = child.wait_with_output().await?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(PodweaveError::ToolFailed(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(output.path()).await?;
        if bytes.is_empty() {
            return Err(PodweaveError::ToolFailed(format!("{} produced no audio", self.program)));
        }
        Ok(bytes)
    }
}
