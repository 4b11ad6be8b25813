// Media processing over the ffmpeg binary
//
// - Commands: typed builders for the ffmpeg invocations
// - Processor: encoder process handling, muxing and concatenation

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Video encoding and muxing operations the workflow relies on
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Check that the media processor can be run
    fn check_availability(&self) -> Result<()>;

    /// First line of the media processor's version banner
    async fn get_version_info(&self) -> Result<String>;

    /// Start an encoder that turns packed RGB frames into `output_path`
    fn open_video_writer(
        &self,
        output_path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<VideoWriter>;

    /// Combine a silent video with an audio track
    async fn merge_audio_and_video(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()>;

    /// Join videos end to end without re-encoding
    async fn concatenate(&self, inputs: &[PathBuf], output_path: &Path) -> Result<()>;
}

pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default (ffmpeg) media processor
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
