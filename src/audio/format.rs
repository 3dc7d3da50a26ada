//! Audio container detection.
//!
//! Speech backends return either MP3 (MPEG-1/2/2.5 Layer III) or WAV. The
//! assembler only concatenates segments that agree on container, sample rate
//! and channel layout, so each segment's format is detected from its bytes.

use crate::error::{PodweaveError, Result};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp3,
    Wav,
}

impl Container {
    pub fn extension(self) -> &'static str {
        match self {
            Container::Mp3 => "mp3",
            Container::Wav => "wav",
        }
    }
}

impl std::str::FromStr for Container {
    type Err = PodweaveError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(Container::Mp3),
            "wav" => Ok(Container::Wav),
            other => Err(PodweaveError::Config(format!(
                "Unsupported audio format: {}. Use mp3 or wav.",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Container plus the stream parameters that must match across segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Bitrate is deliberately absent: frames of different bitrates concatenate fine.
    Mp3 { sample_rate: u32, channels: u16 },
    Wav {
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
        float: bool,
    },
}

impl AudioFormat {
    /// Detect the format of an encoded audio buffer.
    pub fn detect(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(PodweaveError::Audio("empty audio buffer".to_string()));
        }

        if bytes.starts_with(b"RIFF") {
            let reader = hound::WavReader::new(Cursor::new(bytes))?;
            let spec = reader.spec();
            return Ok(AudioFormat::Wav {
                sample_rate: spec.sample_rate,
                channels: spec.channels,
                bits_per_sample: spec.bits_per_sample,
                float: spec.sample_format == hound::SampleFormat::Float,
            });
        }

        let body = &bytes[id3v2_len(bytes).min(bytes.len())..];
        let offset = find_frame(body)
            .ok_or_else(|| PodweaveError::Audio("no MP3 frame or WAV header found".to_string()))?;
        let header = FrameHeader::parse(&body[offset..])
            .ok_or_else(|| PodweaveError::Audio("invalid MP3 frame header".to_string()))?;

        Ok(AudioFormat::Mp3 {
            sample_rate: header.sample_rate,
            channels: header.channels,
        })
    }

    pub fn container(&self) -> Container {
        match self {
            AudioFormat::Mp3 { .. } => Container::Mp3,
            AudioFormat::Wav { .. } => Container::Wav,
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioFormat::Mp3 { sample_rate, channels } => {
                write!(f, "mp3 {} Hz {}ch", sample_rate, channels)
            }
            AudioFormat::Wav {
                sample_rate,
                channels,
                bits_per_sample,
                float,
            } => write!(
                f,
                "wav {} Hz {}ch {}-bit {}",
                sample_rate,
                channels,
                bits_per_sample,
                if *float { "float" } else { "int" }
            ),
        }
    }
}

/// Length of a leading ID3v2 tag, including header and optional footer.
pub(crate) fn id3v2_len(bytes: &[u8]) -> usize {
    if bytes.len() < 10 || !bytes.starts_with(b"ID3") {
        return 0;
    }
    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b as usize & 0x7f));
    let footer = if bytes[5] & 0x10 != 0 { 10 } else { 0 };
    10 + size + footer
}

/// Whether the buffer ends with a 128-byte ID3v1 tag.
pub(crate) fn has_id3v1(bytes: &[u8]) -> bool {
    bytes.len() >= 128 && &bytes[bytes.len() - 128..bytes.len() - 125] == b"TAG"
}

/// Offset of the first parseable frame header.
pub(crate) fn find_frame(bytes: &[u8]) -> Option<usize> {
    (0..bytes.len().saturating_sub(3)).find(|&i| FrameHeader::parse(&bytes[i..]).is_some())
}

/// Decoded MPEG audio Layer III frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub sample_rate: u32,
    pub channels: u16,
    /// Whole frame length in bytes, header included.
    pub frame_len: usize,
    /// Offset of the Xing/Info tag within the frame.
    pub side_info_end: usize,
}

const BITRATES_V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_V2_L3: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

impl FrameHeader {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
            return None;
        }

        let version = (bytes[1] >> 3) & 0b11;
        let layer = (bytes[1] >> 1) & 0b11;
        // Layer III only.
        if version == 0b01 || layer != 0b01 {
            return None;
        }

        let bitrate_index = (bytes[2] >> 4) as usize;
        let rate_index = ((bytes[2] >> 2) & 0b11) as usize;
        let padding = ((bytes[2] >> 1) & 1) as usize;
        if bitrate_index == 0 || bitrate_index == 0xF || rate_index == 3 {
            return None;
        }

        let mpeg1 = version == 0b11;
        let (bitrate, base_rate) = if mpeg1 {
            (BITRATES_V1_L3[bitrate_index], [44100, 48000, 32000][rate_index])
        } else {
            (BITRATES_V2_L3[bitrate_index], [22050, 24000, 16000][rate_index])
        };
        let sample_rate = if version == 0b00 { base_rate / 2 } else { base_rate };

        let mono = (bytes[3] >> 6) == 0b11;
        let coefficient = if mpeg1 { 144_000 } else { 72_000 };
        let frame_len = (coefficient * bitrate / sample_rate) as usize + padding;

        let side_info = match (mpeg1, mono) {
            (true, false) => 32,
            (true, true) => 17,
            (false, false) => 17,
            (false, true) => 9,
        };

        Some(Self {
            sample_rate,
            channels: if mono { 1 } else { 2 },
            frame_len,
            side_info_end: 4 + side_info,
        })
    }

    /// Whether this frame carries a Xing/Info VBR header instead of audio.
    pub fn is_info_frame(&self, frame: &[u8]) -> bool {
        let at = self.side_info_end;
        frame.len() >= at + 4 && matches!(&frame[at..at + 4], b"Xing" | b"Info")
    }
}
