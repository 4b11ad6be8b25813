use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::audio::DecodedAudio;
use crate::config::Config;
use crate::error::{ClipError, Result};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait, VideoWriter};
use crate::render::{FontCache, Renderer};
use crate::segment::{extract_clips, Clip, SegmentSettings};
use crate::verse::{reciters, QuranApiClient, Verse, VerseKey, VerseSource};

/// Printable outline of one clip
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSummary {
    pub index: usize,
    pub begin: u64,
    pub end: u64,
    pub translations: Vec<String>,
}

impl From<&Clip<'_>> for ClipSummary {
    fn from(clip: &Clip<'_>) -> Self {
        Self {
            index: clip.index,
            begin: clip.begin,
            end: clip.end,
            translations: clip.words.iter().map(|w| w.translation().to_string()).collect(),
        }
    }
}

pub struct Workflow {
    config: Config,
    source: Box<dyn VerseSource>,
    media: Box<dyn MediaProcessorTrait>,
    renderer: Renderer,
    settings: SegmentSettings,
}

impl Workflow {
    pub fn new(
        config: Config,
        source: Box<dyn VerseSource>,
        media: Box<dyn MediaProcessorTrait>,
    ) -> Result<Self> {
        let reciter = reciters::find(&config.recitation.reciter)?;
        let settings = SegmentSettings {
            min_silence_len_ms: config.recitation.min_silence_len_ms,
            silence_threshold: config
                .recitation
                .silence_threshold
                .unwrap_or(reciter.silence_threshold),
            trailing_tolerance_ms: config.recitation.trailing_tolerance_ms,
        };
        let renderer = Renderer::new(config.render.clone())?;

        Ok(Self {
            config,
            source,
            media,
            renderer,
            settings,
        })
    }

    /// Wire up the quran.com client and ffmpeg from configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let reciter = reciters::find(&config.recitation.reciter)?;
        info!("Using reciter {} (recitation {})", reciter.name, reciter.id);

        let source = QuranApiClient::new(config.api.clone(), reciter)?;
        let media = MediaProcessorFactory::create_processor(config.media.clone());

        // Check dependencies
        media.check_availability()?;

        Self::new(config, Box::new(source), media)
    }

    pub async fn media_version(&self) -> Result<String> {
        self.media.get_version_info().await
    }

    /// Fetch a verse and decode its recitation
    pub async fn load_verse(&self, key: VerseKey) -> Result<(Verse, DecodedAudio)> {
        info!("Loading verse [{}] information...", key);
        let verse = self.source.fetch_verse(key).await?;

        let bytes = self.source.fetch_bytes(&verse.audio_url).await?;
        debug!("Downloaded {} bytes of audio for verse {}", bytes.len(), key);

        let audio = DecodedAudio::decode(bytes, &audio_extension(&verse.audio_url)?)?;
        Ok((verse, audio))
    }

    /// Segment a verse without rendering it
    pub async fn segment_verse(&self, key: VerseKey) -> Result<Vec<ClipSummary>> {
        let (verse, audio) = self.load_verse(key).await?;
        let (clips, _audio) = self.extract(&verse, audio)?;
        Ok(clips.iter().map(ClipSummary::from).collect())
    }

    /// Cut a loaded verse into clips; a verse without clips is an error
    fn extract<'v>(
        &self,
        verse: &'v Verse,
        audio: DecodedAudio,
    ) -> Result<(Vec<Clip<'v>>, DecodedAudio)> {
        let (clips, audio) = extract_clips(verse, audio, &self.settings)?;
        if clips.is_empty() {
            return Err(ClipError::NoClips(verse.key.to_string()));
        }
        Ok((clips, audio))
    }

    /// Render every verse into `dist` and join them into `output`
    pub async fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        keys: &[VerseKey],
        dist: P,
        output: Q,
    ) -> Result<PathBuf> {
        let dist = dist.as_ref();
        let output = output.as_ref();

        if !dist.is_dir() {
            return Err(ClipError::Config(format!(
                "Output directory {} does not exist",
                dist.display()
            )));
        }
        if keys.is_empty() {
            return Err(ClipError::Config("No verse keys given".to_string()));
        }

        let mut fonts = FontCache::new(self.load_translation_font().await?)?;

        let mut videos = Vec::with_capacity(keys.len());
        for &key in keys {
            let video = self.render_verse(key, dist, &mut fonts).await?;
            info!("Rendered verse {} to {}", key, video.display());
            videos.push(video);
        }

        self.media.concatenate(&videos, output).await?;
        info!("Wrote {} verses to {}", videos.len(), output.display());
        Ok(output.to_path_buf())
    }

    /// Render one verse to `{dist}/{chapter}-{verse}.mp4`
    pub async fn render_verse(
        &self,
        key: VerseKey,
        dist: &Path,
        fonts: &mut FontCache,
    ) -> Result<PathBuf> {
        let (verse, audio) = self.load_verse(key).await?;

        info!("Extracting clips...");
        let (clips, audio) = self.extract(&verse, audio)?;

        self.load_page_fonts(&clips, fonts).await?;

        let scratch = tempfile::Builder::new().prefix("quran-clips").tempdir()?;
        let silent_video = scratch.path().join("video.mp4");
        let extension = match audio.extension() {
            "" => "mp3",
            ext => ext,
        };
        let audio_track = scratch.path().join(format!("audio.{}", extension));

        let mut writer = self.media.open_video_writer(
            &silent_video,
            self.renderer.width(),
            self.renderer.height(),
            self.renderer.fps(),
        )?;
        self.write_clips(&mut writer, &clips, audio.duration_ms(), fonts)?;
        writer.finish()?;

        info!("Saving...");
        audio.export(&audio_track)?;

        let output = dist.join(format!("{}.mp4", key.file_stem()));
        self.media
            .merge_audio_and_video(&silent_video, &audio_track, &output)
            .await?;

        Ok(output)
    }

    fn write_clips(
        &self,
        writer: &mut VideoWriter,
        clips: &[Clip<'_>],
        total_duration: u64,
        fonts: &FontCache,
    ) -> Result<()> {
        let progress = ProgressBar::new(clips.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} clips ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        progress.set_message("rendering");

        // Stretches without a clip stay black so the video keeps pace with the audio
        let mut position = 0u64;
        for clip in clips {
            self.write_blank(writer, position, clip.begin)?;

            let frames = self.renderer.render_clip(clip, fonts)?;
            for frame in frames.iter() {
                writer.write_frame(&frame)?;
            }

            position = clip.end;
            progress.inc(1);
        }
        self.write_blank(writer, position, total_duration)?;

        progress.finish_with_message("rendered");
        debug!("Wrote {} frames", writer.frames_written());
        Ok(())
    }

    fn write_blank(&self, writer: &mut VideoWriter, from: u64, to: u64) -> Result<()> {
        let count = self.renderer.frames_between(from, to);
        if count == 0 {
            return Ok(());
        }

        let blank = self.renderer.blank_frame();
        for _ in 0..count {
            writer.write_frame(&blank)?;
        }
        Ok(())
    }

    async fn load_page_fonts(&self, clips: &[Clip<'_>], fonts: &mut FontCache) -> Result<()> {
        for clip in clips {
            for word in &clip.words {
                let page = word.code_page();
                if fonts.has_page(page) {
                    continue;
                }

                let url = self.source.font_url(page);
                debug!("Loading font for page {} from {}", page, url);
                let bytes = self.source.fetch_bytes(&url).await?;
                fonts.insert_page(page, bytes)?;
            }
        }
        Ok(())
    }

    async fn load_translation_font(&self) -> Result<Vec<u8>> {
        let location = &self.config.render.translation_font;
        if location.starts_with("http://") || location.starts_with("https://") {
            self.source.fetch_bytes(location).await
        } else {
            fs::read(location)
                .await
                .map_err(|e| ClipError::Font(format!("Failed to read font {}: {}", location, e)))
        }
    }
}

/// Lower-case extension of the file a URL points at, `mp3` when unknown
fn audio_extension(url: &str) -> Result<String> {
    let url = Url::parse(url).map_err(|e| ClipError::Api(format!("Invalid audio URL {}: {}", url, e)))?;
    let extension = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase);

    Ok(extension.unwrap_or_else(|| "mp3".to_string()))
}
