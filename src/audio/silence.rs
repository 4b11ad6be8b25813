use tracing::debug;

use super::{db_to_amplitude, DecodedAudio};

/// Finds stretches of a track that stay quieter than a loudness threshold.
///
/// A window of `min_silence_len_ms` slides over the track in steps of
/// `seek_step_ms`; each window whose RMS is at or below the threshold marks
/// its start as silent. Silent starts that follow each other, or whose
/// windows overlap, are merged into one silence range.
#[derive(Debug, Clone, Copy)]
pub struct SilenceDetector {
    min_silence_len_ms: u64,
    seek_step_ms: u64,
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self::new(350)
    }
}

impl SilenceDetector {
    pub fn new(min_silence_len_ms: u64) -> Self {
        Self {
            min_silence_len_ms: min_silence_len_ms.max(1),
            seek_step_ms: 1,
        }
    }

    pub fn with_seek_step(mut self, seek_step_ms: u64) -> Self {
        self.seek_step_ms = seek_step_ms.max(1);
        self
    }

    /// Silence ranges `[start, end]` in milliseconds, in track order
    pub fn detect_silence(&self, audio: &DecodedAudio, threshold_dbfs: f64) -> Vec<(u64, u64)> {
        let min_len = self.min_silence_len_ms;
        let step = self.seek_step_ms;
        let track_len = audio.duration_ms();
        if track_len < min_len {
            return Vec::new();
        }

        let threshold = db_to_amplitude(threshold_dbfs);
        let energy = EnergyProfile::new(audio);

        let last_start = track_len - min_len;
        let mut starts = (0..=last_start).step_by(step as usize).collect::<Vec<_>>();
        if last_start % step != 0 {
            starts.push(last_start);
        }

        let silent_starts = starts
            .into_iter()
            .filter(|&start| energy.rms(audio, start, start + min_len) <= threshold);

        let mut ranges = Vec::new();
        let mut current: Option<(u64, u64)> = None;
        for start in silent_starts {
            current = match current {
                None => Some((start, start)),
                Some((range_start, prev)) => {
                    let continuous = start == prev + step;
                    let has_gap = start > prev + min_len;
                    if !continuous && has_gap {
                        ranges.push((range_start, prev + min_len));
                        Some((start, start))
                    } else {
                        Some((range_start, start))
                    }
                }
            };
        }
        if let Some((range_start, prev)) = current {
            ranges.push((range_start, prev + min_len));
        }

        ranges
    }

    /// Clip boundary candidates: the midpoint of every silence range.
    ///
    /// `silence_threshold` is how many dB below the track's average
    /// loudness still counts as silence.
    pub fn boundary_points(&self, audio: &DecodedAudio, silence_threshold: f64) -> Vec<u64> {
        let threshold_dbfs = audio.dbfs() - silence_threshold;
        let points: Vec<u64> = self
            .detect_silence(audio, threshold_dbfs)
            .into_iter()
            .map(|(start, end)| (start + end) / 2)
            .collect();

        debug!(
            "Detected {} silence boundaries below {:.2} dBFS: {:?}",
            points.len(),
            threshold_dbfs,
            points
        );
        points
    }
}

/// Cumulative signal energy per sample frame, so any window's RMS is O(1)
struct EnergyProfile {
    cumulative: Vec<f64>,
    channels: usize,
}

impl EnergyProfile {
    fn new(audio: &DecodedAudio) -> Self {
        let channels = audio.channels();
        let mut cumulative = Vec::with_capacity(audio.frame_count() + 1);
        cumulative.push(0.0);

        let mut total = 0.0f64;
        for frame in audio.samples().chunks_exact(channels) {
            total += frame.iter().map(|&s| f64::from(s) * f64::from(s)).sum::<f64>();
            cumulative.push(total);
        }

        Self { cumulative, channels }
    }

    fn rms(&self, audio: &DecodedAudio, start_ms: u64, end_ms: u64) -> f64 {
        let start = audio.frame_at(start_ms);
        let end = audio.frame_at(end_ms).max(start);
        if end == start {
            return 0.0;
        }

        let energy = self.cumulative[end] - self.cumulative[start];
        (energy.max(0.0) / ((end - start) * self.channels) as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tests::tone;

    const RATE: u32 = 8000;

    fn silence(ms: u64) -> Vec<f32> {
        vec![0.0; (ms * u64::from(RATE) / 1000) as usize]
    }

    fn track(parts: &[Vec<f32>]) -> DecodedAudio {
        DecodedAudio::from_samples(parts.concat(), 1, RATE)
    }

    #[test]
    fn test_single_pause_yields_its_midpoint() {
        let audio = track(&[tone(1000, 0.5, RATE), silence(500), tone(1000, 0.5, RATE)]);

        let ranges = SilenceDetector::default().detect_silence(&audio, audio.dbfs() - 8.0);
        assert_eq!(ranges.len(), 1);
        let (start, end) = ranges[0];
        assert!(start <= 1000 && start > 900, "start {}", start);
        assert!(end >= 1500 && end < 1600, "end {}", end);

        let points = SilenceDetector::default().boundary_points(&audio, 8.0);
        assert_eq!(points.len(), 1);
        assert!((1240..=1260).contains(&points[0]), "point {}", points[0]);
    }

    #[test]
    fn test_short_pause_is_not_silence() {
        let audio = track(&[tone(1000, 0.5, RATE), silence(200), tone(1000, 0.5, RATE)]);
        assert!(SilenceDetector::default().boundary_points(&audio, 8.0).is_empty());
    }

    #[test]
    fn test_continuous_tone_has_no_boundaries() {
        let audio = track(&[tone(3000, 0.4, RATE)]);
        assert!(SilenceDetector::default().boundary_points(&audio, 8.0).is_empty());
    }

    #[test]
    fn test_track_shorter_than_min_len() {
        let audio = track(&[silence(300)]);
        assert!(SilenceDetector::default().detect_silence(&audio, -20.0).is_empty());
    }

    #[test]
    fn test_boundaries_are_strictly_increasing() {
        let audio = track(&[
            tone(800, 0.5, RATE),
            silence(600),
            tone(900, 0.5, RATE),
            silence(700),
            tone(500, 0.5, RATE),
            silence(400),
            tone(600, 0.5, RATE),
        ]);

        let points = SilenceDetector::default().boundary_points(&audio, 8.0);
        assert_eq!(points.len(), 3);
        assert!(points.windows(2).all(|w| w[0] < w[1]));
        assert!((1050..=1150).contains(&points[0]), "points {:?}", points);
        assert!((2600..=2700).contains(&points[1]), "points {:?}", points);
    }

    #[test]
    fn test_trailing_silence_reaches_track_end() {
        let audio = track(&[tone(1000, 0.5, RATE), silence(1000)]);
        let ranges = SilenceDetector::default().detect_silence(&audio, audio.dbfs() - 8.0);

        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].1, audio.duration_ms());
    }

    #[test]
    fn test_coarse_seek_step_still_checks_last_window() {
        let audio = track(&[tone(1000, 0.5, RATE), silence(403)]);
        let detector = SilenceDetector::new(350).with_seek_step(10);

        let ranges = detector.detect_silence(&audio, audio.dbfs() - 8.0);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].1, audio.duration_ms());
    }
}
