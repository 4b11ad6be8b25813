use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ClipError;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render verses into captioned videos and join them into one file
    Render {
        /// Verses to render, e.g. 1:1 or 1:1,2:255
        #[arg(short = 'k', long, default_value = "1:1")]
        verse_key: String,

        /// Existing directory for the per-verse videos
        #[arg(short, long, default_value = "dist")]
        dist: PathBuf,

        /// Frames per second of the videos
        #[arg(long)]
        fps: Option<u32>,

        /// Video resolution as WidthxHeight
        #[arg(short, long)]
        resolution: Option<Resolution>,

        /// Reciter name (see `reciters`)
        #[arg(long)]
        reciter: Option<String>,

        /// Path of the joined release video
        #[arg(short, long, default_value = "release.mp4")]
        output: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show how a verse's recitation is split into clips
    Segment {
        /// Verse to segment, e.g. 2:255
        #[arg(short = 'k', long)]
        verse_key: String,

        /// Reciter name (see `reciters`)
        #[arg(long)]
        reciter: Option<String>,
    },

    /// List supported reciters
    Reciters,

    /// Write the default configuration file
    InitConfig {
        /// Where to write it
        #[arg(short, long, default_value = "config.toml")]
        path: PathBuf,
    },
}

/// Frame size given as `WidthxHeight`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClipError::InvalidResolution(s.to_string());

        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = height.trim().parse::<u32>().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        assert_eq!("540x1080".parse::<Resolution>().unwrap(), Resolution { width: 540, height: 1080 });
        assert_eq!("1920X1080".parse::<Resolution>().unwrap().to_string(), "1920x1080");
    }

    #[test]
    fn test_parse_resolution_rejects_bad_input() {
        for bad in ["", "540", "540x", "x1080", "0x1080", "540x0", "-5x10", "axb", "1x2x3"] {
            assert!(bad.parse::<Resolution>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_render_arguments() {
        let args = Args::try_parse_from([
            "quran-clips",
            "-v",
            "render",
            "-k",
            "1:1,2:255",
            "--fps",
            "24",
            "-r",
            "720x1280",
            "--yes",
        ])
        .unwrap();

        assert!(args.verbose);
        match args.command {
            Commands::Render { verse_key, dist, fps, resolution, output, yes, .. } => {
                assert_eq!(verse_key, "1:1,2:255");
                assert_eq!(dist, PathBuf::from("dist"));
                assert_eq!(fps, Some(24));
                assert_eq!(resolution, Some(Resolution { width: 720, height: 1280 }));
                assert_eq!(output, PathBuf::from("release.mp4"));
                assert!(yes);
            }
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn test_bad_resolution_argument_is_rejected() {
        assert!(Args::try_parse_from(["quran-clips", "render", "-r", "wide"]).is_err());
    }
}
