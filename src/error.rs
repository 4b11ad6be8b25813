use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Quran API error: {0}")]
    Api(String),

    #[error("Audio decoding error: {0}")]
    Decode(String),

    #[error("Failed to group verse words into clips. {stranded} words left unorganized")]
    PartitionIncomplete { stranded: usize },

    #[error("No clips found for verse {0}")]
    NoClips(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Rendering error: {0}")]
    Render(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid verse key '{0}': expected chapter_id:verse_id with positive integers")]
    InvalidVerseKey(String),

    #[error("Invalid word: {0}")]
    InvalidWord(String),

    #[error("Invalid resolution '{0}': expected WidthxHeight with positive integers")]
    InvalidResolution(String),

    #[error("Unsupported reciter: {0}")]
    UnknownReciter(String),
}

pub type Result<T> = std::result::Result<T, ClipError>;
