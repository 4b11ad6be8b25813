use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin};
use tracing::{debug, info, warn};

use crate::config::MediaConfig;
use crate::error::{ClipError, Result};
use super::{concat_list, MediaCommand, MediaCommandBuilder, MediaProcessorTrait};

/// A running encoder fed one packed RGB frame at a time
pub struct VideoWriter {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    frame_len: usize,
    frames_written: u64,
    output_path: PathBuf,
}

impl VideoWriter {
    fn start(command: &MediaCommand, frame_len: usize, output_path: &Path) -> Result<Self> {
        let mut child = command.spawn_with_stdin()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipError::Media("Encoder stdin is not available".to_string()))?;

        Ok(Self {
            child: Some(child),
            stdin: Some(stdin),
            frame_len,
            frames_written: 0,
            output_path: output_path.to_path_buf(),
        })
    }

    pub fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() != self.frame_len {
            return Err(ClipError::Media(format!(
                "Frame has {} bytes, encoder expects {}",
                frame.len(),
                self.frame_len
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ClipError::Media("Encoder input already closed".to_string()))?;
        stdin
            .write_all(frame)
            .map_err(|e| ClipError::Media(format!("Failed to write frame to encoder: {}", e)))?;

        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Close the input and wait for the encoder to flush the file
    pub fn finish(mut self) -> Result<PathBuf> {
        drop(self.stdin.take());

        let child = self
            .child
            .take()
            .ok_or_else(|| ClipError::Media("Encoder already finished".to_string()))?;
        let output = child
            .wait_with_output()
            .map_err(|e| ClipError::Media(format!("Failed to wait for encoder: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClipError::Media(format!("Frame encoding failed: {}", stderr)));
        }

        debug!("Encoded {} frames into {}", self.frames_written, self.output_path.display());
        Ok(std::mem::take(&mut self.output_path))
    }
}

impl Drop for VideoWriter {
    fn drop(&mut self) {
        // Abandoned before finish(): stop the encoder and reap it
        if let Some(mut child) = self.child.take() {
            drop(self.stdin.take());
            if let Err(e) = child.kill() {
                debug!("Encoder already exited: {}", e);
            }
            if let Err(e) = child.wait() {
                warn!("Failed to reap encoder process: {}", e);
            }
        }
    }
}

/// ffmpeg-backed media processor
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    fn check_availability(&self) -> Result<()> {
        let output = self
            .command_builder
            .version_check()
            .execute_blocking_output()
            .map_err(|e| ClipError::Media(format!("ffmpeg not found: {}", e)))?;

        if output.status.success() {
            info!("ffmpeg is available");
            Ok(())
        } else {
            Err(ClipError::Media("ffmpeg version check failed".to_string()))
        }
    }

    async fn get_version_info(&self) -> Result<String> {
        let output = self
            .command_builder
            .version_check()
            .execute_blocking_output()
            .map_err(|e| ClipError::Media(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClipError::Media(format!("ffmpeg version check failed: {}", stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or("Unknown version").to_string())
    }

    fn open_video_writer(
        &self,
        output_path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<VideoWriter> {
        info!("Encoding {}x{}@{}fps video to {}", width, height, fps, output_path.display());

        let command = self.command_builder.encode_frames(
            output_path,
            width,
            height,
            fps,
            &self.config.encode_options,
        );
        let frame_len = width as usize * height as usize * 3;
        VideoWriter::start(&command, frame_len, output_path)
    }

    async fn merge_audio_and_video(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        info!(
            "Merging {} and {} -> {}",
            video_path.display(),
            audio_path.display(),
            output_path.display()
        );

        self.command_builder
            .merge_audio_and_video(video_path, audio_path, output_path)
            .execute()
            .await
    }

    async fn concatenate(&self, inputs: &[PathBuf], output_path: &Path) -> Result<()> {
        if inputs.is_empty() {
            return Err(ClipError::Media("Nothing to concatenate".to_string()));
        }
        info!("Concatenating {} videos into {}", inputs.len(), output_path.display());

        let list = tempfile::Builder::new()
            .prefix("quran-clips-concat")
            .suffix(".txt")
            .tempfile()?;
        std::fs::write(list.path(), concat_list(inputs))?;

        self.command_builder
            .concatenate(list.path(), output_path)
            .execute()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleeper() -> VideoWriter {
        let command = MediaCommand::new("sleep", "Idle encoder").arg("30");
        VideoWriter::start(&command, 3, Path::new("out.mp4")).unwrap()
    }

    #[test]
    fn test_write_frame_rejects_wrong_size() {
        let mut writer = sleeper();
        assert!(matches!(writer.write_frame(&[0, 0]), Err(ClipError::Media(_))));
        assert_eq!(writer.frames_written(), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_dropped_writer_reaps_encoder() {
        let writer = sleeper();
        let pid = writer.child.as_ref().map(Child::id).unwrap();
        let proc_entry = PathBuf::from(format!("/proc/{}", pid));
        assert!(proc_entry.exists());

        drop(writer);

        // A zombie would keep its /proc entry until waited on
        assert!(!proc_entry.exists());
    }

    #[test]
    fn test_missing_encoder_binary_fails_to_start() {
        let command = MediaCommand::new("/nonexistent/ffmpeg-binary", "Frame encoding");
        assert!(matches!(
            VideoWriter::start(&command, 3, Path::new("out.mp4")),
            Err(ClipError::Media(_))
        ));
    }
}
