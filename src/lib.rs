//! quran-clips - Recited Verse Video Rendering
//!
//! Fetches verse text, word-by-word translation and recitation audio from
//! quran.com, splits the recitation into clips at its pauses, and renders
//! the clips into a captioned MP4 using ffmpeg.

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod render;
pub mod segment;
pub mod verse;
pub mod workflow;
