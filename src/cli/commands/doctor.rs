//! Doctor command - verify system requirements and configuration.

use crate::cli::{format_size, Output};
use crate::config::Settings;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn section(title: &str, results: Vec<CheckResult>, all: &mut Vec<CheckResult>) {
    println!("{}", style(title).bold());
    for result in &results {
        result.print();
    }
    println!();
    all.extend(results);
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Podweave Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();
    section("Configuration", check_configuration(settings, config_path), &mut checks);
    section("Backends", check_backends(settings), &mut checks);
    section("Directories", check_directories(settings), &mut checks);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before generating podcasts.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Podweave is ready to use.");
    }

    Ok(())
}

fn check_configuration(settings: &Settings, config_path: &Path) -> Vec<CheckResult> {
    let file = if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: podweave config init",
        )
    };

    let values = match settings.validate() {
        Ok(()) => CheckResult::ok("Settings", "valid"),
        Err(e) => CheckResult::error("Settings", &e.to_string(), "Fix with: podweave config edit"),
    };

    vec![file, values]
}

fn check_backends(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();
    let needs_key = (settings.llm.provider.eq_ignore_ascii_case("openai") && settings.llm.api_base.is_none())
        || settings.tts.provider.eq_ignore_ascii_case("openai");
    if needs_key {
        results.push(check_openai_api_key());
    }

    results.push(CheckResult::ok(
        "Dialogue model",
        &format!("{} ({})", settings.llm.model, settings.llm.provider),
    ));

    match settings.tts.provider.to_lowercase().as_str() {
        "openai" => results.push(CheckResult::ok(
            "Speech",
            &format!(
                "openai {} ({} / {})",
                settings.tts.model, settings.tts.voices.person1, settings.tts.voices.person2
            ),
        )),
        "command" => results.push(check_tool(&settings.tts.command.program)),
        other => results.push(CheckResult::error(
            "Speech",
            &format!("unknown provider {}", other),
            "Set tts.provider to openai or command",
        )),
    }

    if let Some(cue) = &settings.tts.closing_cue_path {
        let path = Settings::expand_path(cue);
        results.push(if path.is_file() {
            CheckResult::ok("Closing cue", &path.display().to_string())
        } else {
            CheckResult::error(
                "Closing cue",
                &format!("{} not found", path.display()),
                "Fix tts.closing_cue_path or remove it",
            )
        });
    }

    results
}

/// Check that a speech program can be started.
fn check_tool(name: &str) -> CheckResult {
    match Command::new(name).arg("--help").output() {
        Ok(_) => CheckResult::ok(name, "installed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", install_hint(name))
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), install_hint(name)),
    }
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Check data directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let data_dir = settings.data_dir();
    if !data_dir.exists() {
        return vec![CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        )];
    }

    let mut results = vec![CheckResult::ok("Data directory", &data_dir.display().to_string())];
    let (transcripts, _) = dir_usage(&settings.transcripts_dir());
    results.push(CheckResult::ok("Transcripts", &format!("{} saved", transcripts)));
    let (podcasts, bytes) = dir_usage(&settings.audio_dir());
    results.push(CheckResult::ok(
        "Podcasts",
        &format!("{} saved ({})", podcasts, format_size(bytes)),
    ));
    results
}

/// File count and total size of a directory (not recursive).
fn dir_usage(dir: &Path) -> (usize, u64) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return (0, 0);
    };
    entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .fold((0, 0), |(count, size), m| (count + 1, size + m.len()))
}

/// Platform-specific install hint for speech programs.
fn install_hint(program: &str) -> &'static str {
    match program {
        "piper" => {
            if cfg!(target_os = "macos") {
                "Install with: pipx install piper-tts"
            } else if cfg!(target_os = "linux") {
                "Install with: pip install piper-tts (or download a release binary)"
            } else {
                "Install from: https://github.com/rhasspy/piper"
            }
        }
        _ => "Install the program or fix tts.command.program",
    }
}
