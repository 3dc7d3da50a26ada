//! Podweave - Generative podcast conversations
//!
//! Turns heterogeneous content (web pages, text files, raw text) into a
//! two-host audio conversation.
//!
//! # Overview
//!
//! Long content is split into chunks and turned into dialogue one chunk at a
//! time, each call seeing a bounded summary of the conversation so far, so the
//! result reads as one continuous show. The tagged transcript is then
//! synthesized in backend-sized batches and assembled into a single audio
//! file.
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `extract` - Content extraction (web, files, raw text)
//! - `chunking` - Content segmentation
//! - `generation` - Dialogue generation and contextual linking
//! - `transcript` - Speaker-tagged transcripts and their parser
//! - `tts` - Speech backends and batch synthesis
//! - `audio` - Audio segments and assembly
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use podweave::config::Settings;
//! use podweave::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let transcript = orchestrator
//!         .generate_long_form_transcript(&std::fs::read_to_string("article.txt")?)
//!         .await?;
//!     let audio = orchestrator.synthesize_transcript_to_audio(&transcript).await?;
//!     std::fs::write("podcast.mp3", audio)?;
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod generation;
pub mod openai;
pub mod orchestrator;
pub mod retry;
pub mod transcript;
pub mod tts;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PodweaveError, Result};
