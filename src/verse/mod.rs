// Verse data: keys, words, reciters and the quran.com client that supplies them

pub mod api;
pub mod reciters;
pub mod types;

pub use api::{QuranApiClient, VerseSource};
pub use reciters::Reciter;
pub use types::{Verse, VerseKey, Word};
