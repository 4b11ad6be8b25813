use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::error::{ClipError, Result};
use super::reciters::Reciter;
use super::types::{Verse, VerseKey, Word};

// Positions of the millisecond offsets inside one audio segment entry
const SEGMENT_BEGIN: usize = 2;
const SEGMENT_END: usize = 3;

/// Supplies verse data and raw downloads to the workflow
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerseSource: Send + Sync {
    /// Fetch words, translation and audio location of a verse
    async fn fetch_verse(&self, key: VerseKey) -> Result<Verse>;

    /// Download a resource (audio, font) as raw bytes
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// URL of the font that renders glyphs of the given mushaf page
    fn font_url(&self, code_page: u32) -> String;
}

#[derive(Debug, Deserialize)]
struct VerseResponse {
    verse: RawVerse,
}

#[derive(Debug, Deserialize)]
struct RawVerse {
    words: Vec<RawWord>,
    audio: RawAudio,
}

#[derive(Debug, Deserialize)]
struct RawAudio {
    url: String,
    #[serde(default)]
    segments: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct RawWord {
    position: usize,
    char_type_name: String,
    #[serde(default)]
    translation: Option<RawTranslation>,
    // code_vN / vN_page depend on the configured code version
    #[serde(flatten)]
    fields: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawTranslation {
    #[serde(default)]
    text: Option<String>,
}

/// quran.com v4 client
pub struct QuranApiClient {
    client: Client,
    config: ApiConfig,
    reciter: Reciter,
}

impl QuranApiClient {
    pub fn new(config: ApiConfig, reciter: Reciter) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("quran-clips/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClipError::Http)?;

        Ok(Self { client, config, reciter })
    }

    fn verse_url(&self, key: VerseKey) -> String {
        let version = self.config.code_version;
        format!(
            "{}/verses/by_key/{}?language={}&words=true&audio={}&word_fields=code_v{},v{}_page",
            self.config.base_url.trim_end_matches('/'),
            key,
            self.config.language,
            self.reciter.id,
            version,
            version,
        )
    }
}

#[async_trait]
impl VerseSource for QuranApiClient {
    async fn fetch_verse(&self, key: VerseKey) -> Result<Verse> {
        let url = self.verse_url(key);
        info!("Fetching verse {} from {}", key, url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ClipError::Api(format!(
                "Fetching verse {} failed: HTTP {}",
                key,
                response.status()
            )));
        }

        let raw: Value = response.json().await?;
        let verse = parse_verse(key, raw, &self.config)?;

        debug!("Verse {} has {} words", key, verse.words.len());
        Ok(verse)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Downloading {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClipError::Api(format!(
                "Downloading {} failed: HTTP {}",
                url,
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    fn font_url(&self, code_page: u32) -> String {
        format!(
            "{}/v{}/ttf/p{}.ttf",
            self.config.fonts_base_url.trim_end_matches('/'),
            self.config.code_version,
            code_page
        )
    }
}

/// Map a `verses/by_key` response onto a [`Verse`]
fn parse_verse(key: VerseKey, raw: Value, config: &ApiConfig) -> Result<Verse> {
    if !raw.is_object() || raw.get("error").is_some_and(|e| !e.is_null()) {
        return Err(ClipError::Api(format!("Error fetching verse {} information", key)));
    }

    let response: VerseResponse = serde_json::from_value(raw)?;
    let segments = &response.verse.audio.segments;
    let content_field = format!("code_v{}", config.code_version);
    let page_field = format!("v{}_page", config.code_version);

    let mut words = Vec::with_capacity(response.verse.words.len());
    for raw_word in &response.verse.words {
        // Verse-end markers and other non-words carry no recitation span
        if raw_word.char_type_name != "word" {
            continue;
        }

        let index = raw_word.position.saturating_sub(1);
        let segment = segments
            .get(index)
            .or_else(|| segments.last())
            .ok_or_else(|| ClipError::Api(format!("Verse {} has no audio segments", key)))?;

        let (begin, end) = match (segment.get(SEGMENT_BEGIN), segment.get(SEGMENT_END)) {
            (Some(&begin), Some(&end)) if begin >= 0.0 && end >= 0.0 => {
                (begin.round() as u64, end.round() as u64)
            }
            _ => {
                return Err(ClipError::Api(format!(
                    "Malformed audio segment {:?} in verse {}",
                    segment, key
                )));
            }
        };

        let content = raw_word
            .fields
            .get(&content_field)
            .and_then(Value::as_str)
            .ok_or_else(|| ClipError::Api(format!("Word without {} in verse {}", content_field, key)))?;
        let code_page = raw_word
            .fields
            .get(&page_field)
            .and_then(Value::as_u64)
            .ok_or_else(|| ClipError::Api(format!("Word without {} in verse {}", page_field, key)))?;
        let translation = raw_word
            .translation
            .as_ref()
            .and_then(|t| t.text.clone())
            .unwrap_or_default();

        words.push(Word::new(content, translation, code_page as u32, begin, end)?);
    }

    Ok(Verse {
        key,
        audio_url: resolve_url(&response.verse.audio.url, &config.audio_base_url)?,
        words,
    })
}

/// Resolve a CDN-relative path against `base`; absolute URLs pass through
pub fn resolve_url(path: &str, base: &str) -> Result<String> {
    let base = Url::parse(base)
        .map_err(|e| ClipError::Api(format!("Invalid audio base URL {}: {}", base, e)))?;
    let url = base
        .join(path)
        .map_err(|e| ClipError::Api(format!("Invalid audio URL {}: {}", path, e)))?;
    Ok(url.to_string())
}
