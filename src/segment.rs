//! Splitting a recited verse into clips.
//!
//! Silence boundaries cut the recitation into time windows and every word of
//! the verse is assigned to exactly one window by its timestamp. A word that
//! no window claims is an error: dropping it would silently corrupt the
//! rendered verse.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::audio::{DecodedAudio, SilenceDetector};
use crate::error::{ClipError, Result};
use crate::verse::{Verse, VerseKey, Word};

/// Default gap between the last window and the end of the audio that is
/// tolerated without adding a trailing window
pub const TRAILING_TOLERANCE_MS: u64 = 100;

/// A time window `(begin, end)` in milliseconds, inclusive on both ends
pub type Window = (u64, u64);

/// A contiguous stretch of the recitation and the words recited in it
#[derive(Debug, Clone, PartialEq)]
pub struct Clip<'v> {
    pub verse_key: VerseKey,
    /// Position of the window this clip was cut from
    pub index: usize,
    pub begin: u64,
    pub end: u64,
    /// Words whose timestamp falls in `[begin, end]`, by timestamp
    pub words: Vec<&'v Word>,
}

impl Clip<'_> {
    /// Length of the clip in milliseconds
    pub fn duration(&self) -> u64 {
        self.end - self.begin
    }

    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.verse_key.file_stem(), self.index)
    }
}

/// Knobs for turning a recitation into clips
#[derive(Debug, Clone, Copy)]
pub struct SegmentSettings {
    pub min_silence_len_ms: u64,
    /// dB below the average loudness that counts as silence
    pub silence_threshold: f64,
    pub trailing_tolerance_ms: u64,
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            min_silence_len_ms: 350,
            silence_threshold: 8.0,
            trailing_tolerance_ms: TRAILING_TOLERANCE_MS,
        }
    }
}

/// Turn boundary points into consecutive windows starting at zero.
///
/// Without boundaries the whole track is one window. A last window that
/// stops more than `tolerance` short of (or past) `total_duration` gets a
/// trailing window up to `total_duration`.
pub fn build_windows(boundaries: &[u64], total_duration: u64, tolerance: u64) -> Vec<Window> {
    let mut windows: Vec<Window> = if boundaries.is_empty() {
        vec![(0, total_duration)]
    } else {
        std::iter::once(0)
            .chain(boundaries.iter().copied())
            .zip(boundaries.iter().copied())
            .collect()
    };

    if let Some(&(_, last_end)) = windows.last() {
        if last_end.abs_diff(total_duration) > tolerance {
            windows.push((last_end, total_duration));
        }
    }

    windows
}

/// Assign every word to the first window containing its timestamp.
///
/// Windows are visited in order, so a word sitting exactly on a boundary
/// shared by two windows lands in the earlier one. Windows that receive no
/// words produce no clip; clip indices keep the window position.
pub fn partition<'v>(
    verse_key: VerseKey,
    words: &'v [Word],
    windows: &[Window],
) -> Result<Vec<Clip<'v>>> {
    // Unassigned words by timestamp; equal words collapse into one entry
    let mut unassigned: BTreeMap<u64, Vec<&'v Word>> = BTreeMap::new();
    for word in words {
        let bucket = unassigned.entry(word.timestamp()).or_default();
        if !bucket.contains(&word) {
            bucket.push(word);
        }
    }

    let mut clips = Vec::new();
    for (index, &(begin, end)) in windows.iter().enumerate() {
        if begin > end {
            continue;
        }

        let claimed: Vec<u64> = unassigned.range(begin..=end).map(|(&ts, _)| ts).collect();
        let clip_words: Vec<&'v Word> = claimed
            .iter()
            .filter_map(|ts| unassigned.remove(ts))
            .flatten()
            .collect();

        if clip_words.is_empty() {
            debug!("Window {} ({}..{}) has no words, skipping", index, begin, end);
            continue;
        }

        clips.push(Clip {
            verse_key,
            index,
            begin,
            end,
            words: clip_words,
        });
    }

    let stranded: usize = unassigned.values().map(Vec::len).sum();
    if stranded > 0 {
        return Err(ClipError::PartitionIncomplete { stranded });
    }

    Ok(clips)
}

/// Cut a verse's recitation into clips.
///
/// Returns the clips together with the decoded audio they index into.
pub fn extract_clips<'v>(
    verse: &'v Verse,
    audio: DecodedAudio,
    settings: &SegmentSettings,
) -> Result<(Vec<Clip<'v>>, DecodedAudio)> {
    let detector = SilenceDetector::new(settings.min_silence_len_ms);
    let boundaries = detector.boundary_points(&audio, settings.silence_threshold);
    let total_duration = audio.duration_ms();

    let windows = build_windows(&boundaries, total_duration, settings.trailing_tolerance_ms);
    let clips = partition(verse.key, &verse.words, &windows)?;

    info!(
        "Verse {}: {} words in {} clips over {}ms",
        verse.key,
        verse.words.len(),
        clips.len(),
        total_duration
    );
    Ok((clips, audio))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn key() -> VerseKey {
        VerseKey::new(1, 1).unwrap()
    }

    /// Word whose timestamp is exactly `ts`
    fn word(content: &str, ts: u64) -> Word {
        Word::new(content, format!("t-{}", content), 1, ts, ts).unwrap()
    }

    fn contents(clip: &Clip<'_>) -> Vec<String> {
        clip.words.iter().map(|w| w.content().to_string()).collect()
    }

    #[test]
    fn test_build_windows_pairs_boundaries_from_zero() {
        let windows = build_windows(&[1000, 2000, 3000], 3050, TRAILING_TOLERANCE_MS);
        assert_eq!(windows, vec![(0, 1000), (1000, 2000), (2000, 3000)]);
    }

    #[test]
    fn test_build_windows_without_silence_spans_everything() {
        assert_eq!(build_windows(&[], 4321, TRAILING_TOLERANCE_MS), vec![(0, 4321)]);
    }

    #[test]
    fn test_trailing_window_added_past_tolerance() {
        let windows = build_windows(&[1000], 1150, TRAILING_TOLERANCE_MS);
        assert_eq!(windows, vec![(0, 1000), (1000, 1150)]);

        let windows = build_windows(&[1000], 1100, TRAILING_TOLERANCE_MS);
        assert_eq!(windows, vec![(0, 1000)]);
    }

    #[test]
    fn test_no_silence_yields_single_clip_with_all_words() {
        let words = vec![word("c", 900), word("a", 10), word("b", 400)];
        let windows = build_windows(&[], 1000, TRAILING_TOLERANCE_MS);

        let clips = partition(key(), &words, &windows).unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!((clips[0].begin, clips[0].end), (0, 1000));
        assert_eq!(clips[0].duration(), 1000);
        assert_eq!(contents(&clips[0]), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_every_word_assigned_exactly_once() {
        let words: Vec<Word> = (0..40).map(|i| word(&format!("w{}", i), i * 97 % 3900)).collect();
        let windows = build_windows(&[500, 1200, 1800, 2600, 3400], 3900, TRAILING_TOLERANCE_MS);

        let clips = partition(key(), &words, &windows).unwrap();

        let assigned: Vec<&Word> = clips.iter().flat_map(|c| c.words.iter().copied()).collect();
        assert_eq!(assigned.len(), words.len());
        let unique: HashSet<&Word> = assigned.iter().copied().collect();
        assert_eq!(unique, words.iter().collect::<HashSet<_>>());
    }

    #[test]
    fn test_words_and_clips_are_ordered() {
        let words = vec![word("d", 2500), word("b", 700), word("a", 100), word("c", 1500), word("e", 2100)];
        let windows = build_windows(&[1000, 2000], 3000, TRAILING_TOLERANCE_MS);

        let clips = partition(key(), &words, &windows).unwrap();
        assert_eq!(clips.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(contents(&clips[0]), vec!["a", "b"]);
        assert_eq!(contents(&clips[1]), vec!["c"]);
        assert_eq!(contents(&clips[2]), vec!["e", "d"]);
        for clip in &clips {
            assert!(clip.words.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()));
        }
    }

    #[test]
    fn test_word_on_shared_boundary_goes_to_earlier_window() {
        let words = vec![word("edge", 1000), word("late", 1500)];
        let windows = build_windows(&[1000, 2000], 2000, TRAILING_TOLERANCE_MS);

        let clips = partition(key(), &words, &windows).unwrap();
        assert_eq!((clips[0].begin, clips[0].end), (0, 1000));
        assert_eq!(contents(&clips[0]), vec!["edge"]);
        assert_eq!(contents(&clips[1]), vec!["late"]);
    }

    #[test]
    fn test_empty_window_is_omitted() {
        let words = vec![word("a", 200), word("b", 2200), word("c", 2800)];
        let windows = build_windows(&[1000, 2000, 3000], 3000, TRAILING_TOLERANCE_MS);

        let clips = partition(key(), &words, &windows).unwrap();
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0].index, 0);
        assert_eq!(clips[1].index, 2);
        assert_eq!(clips[1].words.len(), 2);
        assert_eq!(clips[1].file_stem(), "1-1-2");
    }

    #[test]
    fn test_stranded_word_fails_partition() {
        let words = vec![word("a", 500), word("far", 5000)];
        let windows = build_windows(&[1000, 3000], 3050, TRAILING_TOLERANCE_MS);
        assert_eq!(windows.last(), Some(&(1000, 3000)));

        let err = partition(key(), &words, &windows).unwrap_err();
        assert!(matches!(err, ClipError::PartitionIncomplete { stranded: 1 }));
        assert!(err.to_string().contains("1 words left"));
    }

    #[test]
    fn test_trailing_window_captures_late_words() {
        let words = vec![word("a", 400), word("tail", 1120)];
        let windows = build_windows(&[1000], 1150, TRAILING_TOLERANCE_MS);

        let clips = partition(key(), &words, &windows).unwrap();
        assert_eq!(clips.len(), 2);
        assert_eq!((clips[1].begin, clips[1].end), (1000, 1150));
        assert_eq!(contents(&clips[1]), vec!["tail"]);
    }

    #[test]
    fn test_equal_words_collapse() {
        let words = vec![word("a", 100), word("a", 100), word("b", 100)];
        let clips = partition(key(), &words, &[(0, 200)]).unwrap();
        assert_eq!(contents(&clips[0]), vec!["a", "b"]);
    }

    #[test]
    fn test_extract_clips_from_audio() {
        use crate::audio::tests::tone;

        let rate = 8000;
        let samples = [
            tone(1000, 0.5, rate),
            vec![0.0; 4000],
            tone(1000, 0.5, rate),
        ]
        .concat();
        let audio = DecodedAudio::from_samples(samples, 1, rate);
        let verse = Verse {
            key: key(),
            audio_url: "https://verses.quran.com/x.mp3".to_string(),
            words: vec![
                Word::new("a", "one", 1, 100, 500).unwrap(),
                Word::new("b", "two", 1, 600, 950).unwrap(),
                Word::new("c", "three", 1, 1600, 2400).unwrap(),
            ],
        };

        let (clips, audio) = extract_clips(&verse, audio, &SegmentSettings::default()).unwrap();
        assert_eq!(audio.duration_ms(), 2500);
        assert_eq!(clips.len(), 2);
        assert_eq!(contents(&clips[0]), vec!["a", "b"]);
        assert_eq!(contents(&clips[1]), vec!["c"]);
        assert_eq!(clips[1].end, 2500);
    }
}
