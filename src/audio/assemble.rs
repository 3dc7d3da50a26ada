//! Concatenation of synthesized segments into one audio file.

use super::format::{find_frame, has_id3v1, id3v2_len, FrameHeader};
use super::{AudioFormat, AudioSegment, Container};
use crate::error::{PodweaveError, Result};
use std::io::Cursor;
use tracing::{debug, info, instrument};

/// Concatenate segments in `sequence_index` order, then the closing cue.
///
/// Every segment must have the same [`AudioFormat`], in the `output`
/// container. Nothing is resampled or transcoded.
#[instrument(skip(segments, closing_cue), fields(segments = segments.len()))]
pub fn assemble(
    segments: &[AudioSegment],
    output: Container,
    closing_cue: Option<&AudioSegment>,
) -> Result<Vec<u8>> {
    let mut ordered: Vec<&AudioSegment> = segments.iter().collect();
    ordered.sort_by_key(|s| s.sequence_index);
    if let Some(cue) = closing_cue {
        ordered.push(cue);
    }

    let first = ordered
        .first()
        .ok_or_else(|| PodweaveError::Audio("no audio segments to assemble".to_string()))?;
    let format = first.format;

    if format.container() != output {
        return Err(PodweaveError::AudioFormatMismatch {
            sequence_index: first.sequence_index,
            expected: output.to_string(),
            found: format.to_string(),
        });
    }
    for segment in &ordered {
        if segment.format != format {
            return Err(PodweaveError::AudioFormatMismatch {
                sequence_index: segment.sequence_index,
                expected: format.to_string(),
                found: segment.format.to_string(),
            });
        }
    }

    let bytes = match output {
        Container::Mp3 => concat_mp3(&ordered),
        Container::Wav => concat_wav(&ordered, format)?,
    };

    info!("Assembled {} segments into {} bytes of {}", ordered.len(), bytes.len(), format);
    Ok(bytes)
}

fn concat_mp3(segments: &[&AudioSegment]) -> Vec<u8> {
    let mut out = Vec::with_capacity(segments.iter().map(|s| s.bytes.len()).sum());
    for segment in segments {
        out.extend_from_slice(mp3_frames(&segment.bytes));
    }
    out
}

/// The frame data of an MP3 buffer: tags and a leading Xing/Info frame removed.
fn mp3_frames(bytes: &[u8]) -> &[u8] {
    let start = id3v2_len(bytes).min(bytes.len());
    let end = if has_id3v1(bytes) { bytes.len() - 128 } else { bytes.len() };
    if start >= end {
        return &[];
    }

    let mut body = &bytes[start..end];
    if let Some(offset) = find_frame(body) {
        body = &body[offset..];
        if let Some(header) = FrameHeader::parse(body) {
            if header.is_info_frame(body) && header.frame_len <= body.len() {
                debug!("Dropping Xing/Info frame");
                body = &body[header.frame_len..];
            }
        }
    }
    body
}

fn concat_wav(segments: &[&AudioSegment], format: AudioFormat) -> Result<Vec<u8>> {
    let AudioFormat::Wav {
        sample_rate,
        channels,
        bits_per_sample,
        float,
    } = format
    else {
        return Err(PodweaveError::Audio("expected WAV segments".to_string()));
    };

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample,
        sample_format: if float {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for segment in segments {
            let mut reader = hound::WavReader::new(Cursor::new(segment.bytes.as_slice()))?;
            if float {
                for sample in reader.samples::<f32>() {
                    writer.write_sample(sample?)?;
                }
            } else {
                for sample in reader.samples::<i32>() {
                    writer.write_sample(sample?)?;
                }
            }
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{id3v2_tag, mp3_frame, mp3_info_frame, wav_bytes};
    use crate::transcript::Speaker;

    fn segment(sequence_index: usize, bytes: Vec<u8>) -> AudioSegment {
        AudioSegment::new(sequence_index, bytes, vec![Speaker::Person1]).unwrap()
    }

    fn read_samples(bytes: &[u8]) -> Vec<i16> {
        hound::WavReader::new(Cursor::new(bytes))
            .unwrap()
            .samples::<i16>()
            .map(|s| s.unwrap())
            .collect()
    }

    #[test]
    fn test_wav_segments_concatenate_in_order() {
        let segments = vec![
            segment(2, wav_bytes(24000, 1, &[5, 6])),
            segment(0, wav_bytes(24000, 1, &[1, 2])),
            segment(1, wav_bytes(24000, 1, &[3, 4])),
        ];
        let out = assemble(&segments, Container::Wav, None).unwrap();
        assert_eq!(read_samples(&out), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_closing_cue_is_appended_last() {
        let segments = vec![segment(0, wav_bytes(16000, 1, &[1])), segment(1, wav_bytes(16000, 1, &[2]))];
        let cue = segment(99, wav_bytes(16000, 1, &[9, 9]));
        let out = assemble(&segments, Container::Wav, Some(&cue)).unwrap();
        assert_eq!(read_samples(&out), vec![1, 2, 9, 9]);
    }

    #[test]
    fn test_mismatched_sample_rate_is_rejected() {
        let segments = vec![
            segment(0, wav_bytes(24000, 1, &[1])),
            segment(1, wav_bytes(22050, 1, &[2])),
        ];
        match assemble(&segments, Container::Wav, None).unwrap_err() {
            PodweaveError::AudioFormatMismatch { sequence_index, expected, found } => {
                assert_eq!(sequence_index, 1);
                assert!(expected.contains("24000"));
                assert!(found.contains("22050"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_container_is_rejected() {
        let segments = vec![segment(0, wav_bytes(24000, 1, &[1]))];
        assert!(matches!(
            assemble(&segments, Container::Mp3, None),
            Err(PodweaveError::AudioFormatMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_segment_list_is_an_error() {
        assert!(assemble(&[], Container::Mp3, None).is_err());
    }

    #[test]
    fn test_mp3_tags_and_info_frames_are_stripped() {
        let mut first = id3v2_tag();
        first.extend(mp3_info_frame());
        first.extend(mp3_frame());

        let mut second = mp3_frame();
        second.extend(mp3_frame());
        let mut id3v1 = b"TAG".to_vec();
        id3v1.resize(128, 0);
        second.extend(id3v1);

        let segments = vec![segment(1, second), segment(0, first)];
        let out = assemble(&segments, Container::Mp3, None).unwrap();

        assert_eq!(out.len(), 3 * mp3_frame().len());
        assert_eq!(&out[..4], &mp3_frame()[..4]);
        assert!(!out.windows(4).any(|w| w == b"Xing" || w == b"TAG\0"));
    }
}
