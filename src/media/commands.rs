use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use tracing::debug;

use crate::error::{ClipError, Result};

/// One ffmpeg invocation: binary, arguments and a label for error messages
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add an input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Set the output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Overwrite the output without asking
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Only report errors on stderr
    pub fn quiet(self) -> Self {
        self.arg("-loglevel").arg("error").arg("-nostats")
    }

    /// Set the video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set the audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Select an input stream for the output
    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    /// Set the pixel format
    pub fn pixel_format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-pix_fmt").arg(format)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args);
        cmd
    }

    /// Run to completion; a non-zero exit is an error carrying stderr
    pub async fn execute(&self) -> Result<()> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = self
            .command()
            .output()
            .map_err(|e| ClipError::Media(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClipError::Media(format!("{} failed: {}", self.description, stderr)));
        }

        Ok(())
    }

    /// Run to completion and hand back the raw process output
    pub fn execute_blocking_output(&self) -> std::io::Result<Output> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);
        self.command().output()
    }

    /// Start the command with stdin piped for streamed input
    pub fn spawn_with_stdin(&self) -> Result<Child> {
        debug!("Spawning media command: {} {:?}", self.binary_path, self.args);

        self.command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ClipError::Media(format!("Failed to start ffmpeg: {}", e)))
    }
}

/// Builds the ffmpeg invocations the pipeline needs
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Encode packed RGB frames read from stdin into an H.264 video
    pub fn encode_frames<P: AsRef<Path>>(
        &self,
        output_path: P,
        width: u32,
        height: u32,
        fps: u32,
        additional_options: &[String],
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Frame encoding")
            .overwrite()
            .quiet()
            .arg("-f").arg("rawvideo")
            .pixel_format("rgb24")
            .arg("-s").arg(format!("{}x{}", width, height))
            .arg("-r").arg(fps.to_string())
            .arg("-i").arg("-")
            .arg("-an")
            .video_codec("libx264")
            .pixel_format("yuv420p")
            .args(additional_options.iter().cloned())
            .output(output_path)
    }

    /// Put the recitation audio under a rendered video
    pub fn merge_audio_and_video<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio/video merge")
            .overwrite()
            .quiet()
            .input(video_path)
            .input(audio_path)
            .map("0:v:0")
            .map("1:a:0")
            .video_codec("copy")
            .audio_codec("aac")
            .arg("-shortest")
            .output(output_path)
    }

    /// Join the videos listed in a concat demuxer list file
    pub fn concatenate<P: AsRef<Path>>(&self, list_file: P, output_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Video concatenation")
            .overwrite()
            .quiet()
            .arg("-f").arg("concat")
            .arg("-safe").arg("0")
            .input(list_file)
            .arg("-c").arg("copy")
            .output(output_path)
    }

    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

/// Contents of a concat demuxer list naming `paths` in order
pub fn concat_list<P: AsRef<Path>>(paths: &[P]) -> String {
    paths
        .iter()
        .map(|p| {
            let path = p.as_ref().to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", path)
        })
        .collect()
}
