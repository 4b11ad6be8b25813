use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{ClipError, Result};

/// Chapter and verse number of one verse, displayed as `chapter:verse`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseKey {
    pub chapter_id: u32,
    pub verse_id: u32,
}

impl VerseKey {
    pub fn new(chapter_id: u32, verse_id: u32) -> Result<Self> {
        if chapter_id == 0 || verse_id == 0 {
            return Err(ClipError::InvalidVerseKey(format!("{}:{}", chapter_id, verse_id)));
        }
        Ok(Self { chapter_id, verse_id })
    }

    /// Parse a comma-separated list such as `1:1,2:255`
    pub fn parse_list(value: &str) -> Result<Vec<Self>> {
        let keys = value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Self>>>()?;

        if keys.is_empty() {
            return Err(ClipError::InvalidVerseKey(value.to_string()));
        }
        Ok(keys)
    }

    /// File stem used for rendered verse videos
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.chapter_id, self.verse_id)
    }
}

impl fmt::Display for VerseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter_id, self.verse_id)
    }
}

impl FromStr for VerseKey {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ClipError::InvalidVerseKey(s.to_string());

        let (chapter, verse) = s.trim().split_once(':').ok_or_else(invalid)?;
        let chapter_id = chapter.trim().parse::<u32>().map_err(|_| invalid())?;
        let verse_id = verse.trim().parse::<u32>().map_err(|_| invalid())?;

        Self::new(chapter_id, verse_id).map_err(|_| invalid())
    }
}

/// One recitation-aligned word of a verse.
///
/// Words are immutable once built. Two words are the same word when their
/// content, translation and timestamp agree, regardless of the exact
/// `begin`/`end` pair they were built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    content: String,
    translation: String,
    code_page: u32,
    begin: u64,
    end: u64,
}

impl Word {
    pub fn new(
        content: impl Into<String>,
        translation: impl Into<String>,
        code_page: u32,
        begin: u64,
        end: u64,
    ) -> Result<Self> {
        let content = content.into();
        if end < begin {
            return Err(ClipError::InvalidWord(format!(
                "word '{}' ends at {}ms before it begins at {}ms",
                content, end, begin
            )));
        }

        Ok(Self {
            content,
            translation: translation.into(),
            code_page,
            begin,
            end,
        })
    }

    /// Glyph code of the word in the page font
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn translation(&self) -> &str {
        &self.translation
    }

    /// Mushaf page whose font renders `content`
    pub fn code_page(&self) -> u32 {
        self.code_page
    }

    /// Start offset into the recitation audio, in milliseconds
    pub fn begin(&self) -> u64 {
        self.begin
    }

    /// End offset into the recitation audio, in milliseconds
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Midpoint of the word in the audio, in milliseconds
    pub fn timestamp(&self) -> u64 {
        (self.begin + self.end) / 2
    }
}

impl PartialEq for Word {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
            && self.translation == other.translation
            && self.timestamp() == other.timestamp()
    }
}

impl Eq for Word {}

impl Hash for Word {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content.hash(state);
        self.translation.hash(state);
        self.timestamp().hash(state);
    }
}

/// A verse as delivered by the verse source: the words plus where its
/// recitation lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verse {
    pub key: VerseKey,
    pub audio_url: String,
    pub words: Vec<Word>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_verse_key() {
        let key: VerseKey = "2:255".parse().unwrap();
        assert_eq!(key, VerseKey { chapter_id: 2, verse_id: 255 });
        assert_eq!(key.to_string(), "2:255");
        assert_eq!(key.file_stem(), "2-255");
    }

    #[test]
    fn test_parse_verse_key_rejects_bad_input() {
        for bad in ["", "1", "1:", ":1", "0:1", "1:0", "a:b", "-1:2", "1:2:3"] {
            assert!(bad.parse::<VerseKey>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_parse_verse_key_list() {
        let keys = VerseKey::parse_list("1:1, 2:255,112:4").unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[1], VerseKey { chapter_id: 2, verse_id: 255 });
        assert_eq!(keys[2].to_string(), "112:4");

        assert!(VerseKey::parse_list("").is_err());
        assert!(VerseKey::parse_list(" , ").is_err());
        assert!(VerseKey::parse_list("1:1,x").is_err());
    }

    #[test]
    fn test_word_timestamp_is_floored_midpoint() {
        let word = Word::new("a", "in", 1, 100, 201).unwrap();
        assert_eq!(word.timestamp(), 150);
    }

    #[test]
    fn test_word_rejects_reversed_span() {
        let err = Word::new("a", "in", 1, 300, 200).unwrap_err();
        assert!(matches!(err, ClipError::InvalidWord(_)));
        assert!(Word::new("a", "in", 1, 200, 200).is_ok());
    }

    #[test]
    fn test_word_identity_ignores_exact_span() {
        let a = Word::new("a", "in", 1, 100, 200).unwrap();
        let b = Word::new("a", "in", 2, 140, 160).unwrap();
        let c = Word::new("a", "the", 1, 100, 200).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<&Word> = [&a, &b, &c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
