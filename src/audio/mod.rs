//! Decoded recitation audio.
//!
//! The recitation is decoded once with symphonia into interleaved `f32`
//! samples in `[-1.0, 1.0]`. The encoded bytes are kept alongside so the
//! track can be handed to the muxer unchanged.

pub mod silence;

use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{ClipError, Result};

pub use silence::SilenceDetector;

/// A fully decoded audio track
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
    encoded: Vec<u8>,
    extension: String,
}

impl DecodedAudio {
    /// Decode a complete audio stream held in memory.
    ///
    /// `extension` is a probe hint such as `mp3`; the container is still
    /// sniffed from the bytes.
    pub fn decode(bytes: Vec<u8>, extension: &str) -> Result<Self> {
        let source = Cursor::new(bytes.clone());
        let mss = MediaSourceStream::new(Box::new(source), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if !extension.is_empty() {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| ClipError::Decode(format!("Failed to probe audio: {e}")))?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| ClipError::Decode("No audio track found".to_string()))?;
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| ClipError::Decode(format!("Failed to create decoder: {e}")))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut layout: Option<(usize, u32)> = None;
        let mut skipped = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(ClipError::Decode(format!("Failed to read packet: {e}"))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // A corrupt frame is dropped; the stream itself is still usable
                Err(SymphoniaError::DecodeError(e)) => {
                    skipped += 1;
                    debug!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(ClipError::Decode(format!("Failed to decode packet: {e}"))),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            match layout {
                None => layout = Some((channels, spec.rate)),
                Some((c, r)) if c != channels || r != spec.rate => {
                    return Err(ClipError::Decode(format!(
                        "Stream changed layout from {}ch@{}Hz to {}ch@{}Hz",
                        c, r, channels, spec.rate
                    )));
                }
                Some(_) => {}
            }

            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buffer.samples());
        }

        if skipped > 0 {
            warn!("Skipped {} undecodable audio packets", skipped);
        }

        let (channels, sample_rate) = layout
            .ok_or_else(|| ClipError::Decode("Audio stream contains no decodable packets".to_string()))?;
        if channels == 0 || sample_rate == 0 {
            return Err(ClipError::Decode("Audio stream has no channels or sample rate".to_string()));
        }

        let audio = Self {
            samples,
            channels,
            sample_rate,
            encoded: bytes,
            extension: extension.to_string(),
        };
        debug!(
            "Decoded {}ms of audio ({} channels @ {}Hz)",
            audio.duration_ms(),
            audio.channels,
            audio.sample_rate
        );
        Ok(audio)
    }

    /// Wrap raw interleaved samples; such audio cannot be exported
    pub fn from_samples(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
            encoded: Vec::new(),
            extension: String::new(),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// File extension of the encoded stream, e.g. `mp3`
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Number of sample frames (one sample per channel)
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Total length in whole milliseconds
    pub fn duration_ms(&self) -> u64 {
        let frames = self.frame_count() as f64;
        (frames * 1000.0 / f64::from(self.sample_rate)).round() as u64
    }

    /// First sample frame at or after `ms`
    pub fn frame_at(&self, ms: u64) -> usize {
        let frame = (ms as u128 * u128::from(self.sample_rate) / 1000) as usize;
        frame.min(self.frame_count())
    }

    /// Loudness of the whole track relative to full scale.
    ///
    /// Digital silence yields negative infinity.
    pub fn dbfs(&self) -> f64 {
        let rms = rms(&self.samples);
        if rms == 0.0 {
            f64::NEG_INFINITY
        } else {
            20.0 * rms.log10()
        }
    }

    /// Write the encoded stream to `path` as it was received
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if self.encoded.is_empty() {
            return Err(ClipError::Media("Audio has no encoded stream to export".to_string()));
        }
        std::fs::write(path, &self.encoded)?;
        Ok(())
    }
}

fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (energy / samples.len() as f64).sqrt()
}

/// Convert a dBFS value into a linear amplitude (full scale = 1.0)
pub fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode mono 16-bit PCM as an in-memory WAV file
    pub(crate) fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample((s * f32::from(i16::MAX)) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    /// `ms` milliseconds of a sine tone at `amplitude`
    pub(crate) fn tone(ms: u64, amplitude: f32, sample_rate: u32) -> Vec<f32> {
        let frames = (ms * u64::from(sample_rate) / 1000) as usize;
        (0..frames)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_decode_wav() {
        let samples = tone(1000, 0.5, 8000);
        let audio = DecodedAudio::decode(wav_bytes(&samples, 8000), "wav").unwrap();

        assert_eq!(audio.channels(), 1);
        assert_eq!(audio.sample_rate(), 8000);
        assert_eq!(audio.duration_ms(), 1000);
        assert_eq!(audio.extension(), "wav");
        // sine at 0.5 peak: rms = 0.5 / sqrt(2), about -9 dBFS
        assert!((audio.dbfs() - (-9.03)).abs() < 0.1, "dbfs {}", audio.dbfs());
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let err = DecodedAudio::decode(b"definitely not audio".to_vec(), "mp3").unwrap_err();
        assert!(matches!(err, ClipError::Decode(_)));
    }

    #[test]
    fn test_export_writes_encoded_bytes() {
        let bytes = wav_bytes(&tone(100, 0.2, 8000), 8000);
        let audio = DecodedAudio::decode(bytes.clone(), "wav").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verse.wav");

        audio.export(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), bytes);

        let raw = DecodedAudio::from_samples(vec![0.0; 10], 1, 1000);
        assert!(raw.export(dir.path().join("raw.wav")).is_err());
    }

    #[test]
    fn test_silent_track_dbfs_is_negative_infinity() {
        let audio = DecodedAudio::from_samples(vec![0.0; 1600], 2, 16000);
        assert_eq!(audio.frame_count(), 800);
        assert_eq!(audio.duration_ms(), 50);
        assert_eq!(audio.dbfs(), f64::NEG_INFINITY);
        assert_eq!(db_to_amplitude(f64::NEG_INFINITY), 0.0);
    }
}
