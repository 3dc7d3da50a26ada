//! Audio segments and final assembly.

mod assemble;
mod format;

pub use assemble::assemble;
pub use format::{AudioFormat, Container};

use crate::error::Result;
use crate::transcript::Speaker;
use std::path::Path;
use tracing::debug;

/// Encoded audio for a contiguous run of utterances.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Sequence index of the first utterance in the segment.
    pub sequence_index: usize,
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    /// Speakers heard in this segment, in order of first appearance.
    pub speakers: Vec<Speaker>,
}

impl AudioSegment {
    /// Wrap encoded audio, detecting its format.
    pub fn new(sequence_index: usize, bytes: Vec<u8>, speakers: Vec<Speaker>) -> Result<Self> {
        let format = AudioFormat::detect(&bytes)?;
        Ok(Self {
            sequence_index,
            bytes,
            format,
            speakers,
        })
    }

    /// Load an audio file (closing cue, jingle) as a segment.
    pub fn from_file(path: &Path, sequence_index: usize) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let segment = Self::new(sequence_index, bytes, Vec::new())?;
        debug!("Loaded {} ({})", path.display(), segment.format);
        Ok(segment)
    }
}
