use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, ClipError};

// Defaults for fields that older config files may not carry
fn default_min_silence_len_ms() -> u64 {
    350
}

fn default_trailing_tolerance_ms() -> u64 {
    100
}

fn default_max_transition_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub recitation: RecitationConfig,
    pub render: RenderConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// quran.com API root, e.g. https://api.quran.com/api/v4
    pub base_url: String,
    /// Base URL that relative recitation audio paths are resolved against
    pub audio_base_url: String,
    /// Base URL of the per-page mushaf fonts
    pub fonts_base_url: String,
    /// Language of the word-by-word translation
    pub language: String,
    /// Glyph code version (1 or 2); selects `code_vN` and the matching fonts
    pub code_version: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecitationConfig {
    /// Reciter name, see `quran-clips reciters`
    pub reciter: String,
    /// Minimum length of a silence interval in milliseconds
    #[serde(default = "default_min_silence_len_ms")]
    pub min_silence_len_ms: u64,
    /// Gap between the last boundary and the end of the audio that is still
    /// absorbed into the last clip
    #[serde(default = "default_trailing_tolerance_ms")]
    pub trailing_tolerance_ms: u64,
    /// Overrides the reciter's silence threshold (dB below average loudness)
    #[serde(default)]
    pub silence_threshold: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Arabic glyph size in pixels
    pub font_size: f32,
    /// Translation text size in pixels
    pub translation_font_size: f32,
    /// Space between lines in pixels
    pub vertical_padding: u32,
    /// Share of the frame width text may occupy
    pub text_max_width_ratio: f32,
    /// Upper bound of the fade in/out length in milliseconds
    #[serde(default = "default_max_transition_ms")]
    pub max_transition_ms: u64,
    /// Translation font, either an http(s) URL or a local path
    pub translation_font: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Additional encoding options for the rendered video stream
    /// Common options: ["-preset", "medium", "-crf", "23"]
    pub encode_options: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://api.quran.com/api/v4".to_string(),
                audio_base_url: "https://verses.quran.com/".to_string(),
                fonts_base_url: "https://quran.com/fonts/quran/hafs".to_string(),
                language: "en".to_string(),
                code_version: 1,
            },
            recitation: RecitationConfig {
                reciter: "Mishari Rashid al-`Afasy".to_string(),
                min_silence_len_ms: default_min_silence_len_ms(),
                trailing_tolerance_ms: default_trailing_tolerance_ms(),
                silence_threshold: None,
            },
            render: RenderConfig {
                width: 540,
                height: 1080,
                fps: 30,
                font_size: 35.0,
                translation_font_size: 20.0,
                vertical_padding: 5,
                text_max_width_ratio: 0.8,
                max_transition_ms: default_max_transition_ms(),
                translation_font: "https://github.com/google/fonts/raw/main/apache/opensans/OpenSans-Regular.ttf".to_string(),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                encode_options: vec![
                    // "-preset".to_string(), "medium".to_string(),
                    // "-crf".to_string(), "23".to_string(),
                ],
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClipError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ClipError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ClipError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
