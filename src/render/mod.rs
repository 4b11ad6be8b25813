//! Frame rendering for clips.
//!
//! Each clip becomes one static card (Arabic glyphs on top, the English
//! translation underneath, both centred) that fades in from and out to
//! black. Frames are produced as packed RGB8 buffers ready for the encoder.

pub mod layout;

use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use std::collections::HashMap;
use tracing::debug;

use crate::config::RenderConfig;
use crate::error::{ClipError, Result};
use crate::segment::Clip;
use layout::{font_scale, line_width, split_words, terms_to_lines, Term};

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Fonts needed to draw clips: the translation font plus one font per
/// mushaf page, since word glyph codes only make sense in their page font
pub struct FontCache {
    translation: FontVec,
    pages: HashMap<u32, FontVec>,
}

impl FontCache {
    pub fn new(translation_font: Vec<u8>) -> Result<Self> {
        let translation = FontVec::try_from_vec(translation_font)
            .map_err(|e| ClipError::Font(format!("Invalid translation font: {}", e)))?;
        Ok(Self {
            translation,
            pages: HashMap::new(),
        })
    }

    pub fn has_page(&self, code_page: u32) -> bool {
        self.pages.contains_key(&code_page)
    }

    pub fn insert_page(&mut self, code_page: u32, bytes: Vec<u8>) -> Result<()> {
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| ClipError::Font(format!("Invalid font for page {}: {}", code_page, e)))?;
        self.pages.insert(code_page, font);
        Ok(())
    }

    fn page(&self, code_page: u32) -> Result<&FontVec> {
        self.pages
            .get(&code_page)
            .ok_or_else(|| ClipError::Font(format!("Font for page {} was not loaded", code_page)))
    }
}

/// Frame index of a millisecond offset at `fps`
pub fn frame_index(ms: u64, fps: u32) -> u64 {
    ms * u64::from(fps) / 1000
}

/// How dark frame `index` of `frame_count` is, from 0 (untouched) to 1
/// (black), for a fade of `transition` frames at each end
pub fn fade_darkness(index: u64, frame_count: u64, transition: u64) -> f32 {
    if transition == 0 || frame_count == 0 {
        return 0.0;
    }

    let fade_in = if index <= transition {
        (transition - index) as f32 / transition as f32
    } else {
        0.0
    };

    let fade_out_start = (frame_count - 1).saturating_sub(transition);
    let fade_out = if index >= fade_out_start {
        (index - fade_out_start) as f32 / transition as f32
    } else {
        0.0
    };

    fade_in.max(fade_out).clamp(0.0, 1.0)
}

/// The frames of one clip, generated on demand from a single card
pub struct ClipFrames {
    card: RgbImage,
    frame_count: u64,
    transition: u64,
}

impl ClipFrames {
    pub fn len(&self) -> u64 {
        self.frame_count
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Packed RGB8 pixels of frame `index`
    pub fn frame(&self, index: u64) -> Vec<u8> {
        let darkness = fade_darkness(index, self.frame_count, self.transition);
        if darkness == 0.0 {
            return self.card.as_raw().clone();
        }

        let keep = 1.0 - darkness;
        self.card
            .as_raw()
            .iter()
            .map(|&v| (f32::from(v) * keep).round() as u8)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        (0..self.frame_count).map(move |i| self.frame(i))
    }
}

pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(ClipError::Render(format!(
                "Frame size must be positive, got {}x{}",
                config.width, config.height
            )));
        }
        if config.fps == 0 {
            return Err(ClipError::Render("Frames per second must be positive".to_string()));
        }
        Ok(Self { config })
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn fps(&self) -> u32 {
        self.config.fps
    }

    /// Size in bytes of one packed RGB8 frame
    pub fn frame_len(&self) -> usize {
        self.config.width as usize * self.config.height as usize * 3
    }

    /// Number of frames spanning `[begin, end)` on the global timeline.
    ///
    /// Counting on absolute positions keeps consecutive clips from drifting
    /// against the audio.
    pub fn frames_between(&self, begin: u64, end: u64) -> u64 {
        frame_index(end, self.config.fps).saturating_sub(frame_index(begin, self.config.fps))
    }

    /// A black frame, used to cover stretches of audio without a clip
    pub fn blank_frame(&self) -> Vec<u8> {
        vec![0; self.frame_len()]
    }

    /// Lay out `clip` and return its frames
    pub fn render_clip(&self, clip: &Clip<'_>, fonts: &FontCache) -> Result<ClipFrames> {
        let card = self.draw_card(clip, fonts)?;
        let frame_count = self.frames_between(clip.begin, clip.end);
        let transition_ms = (clip.duration() / 6).min(self.config.max_transition_ms);
        let transition = frame_index(transition_ms, self.config.fps);

        debug!(
            "Clip {} ({}..{}ms): {} frames, {} frame fade",
            clip.file_stem(),
            clip.begin,
            clip.end,
            frame_count,
            transition
        );

        Ok(ClipFrames {
            card,
            frame_count,
            transition,
        })
    }

    fn draw_card(&self, clip: &Clip<'_>, fonts: &FontCache) -> Result<RgbImage> {
        let max_width = (self.config.width as f32 * self.config.text_max_width_ratio) as u32;

        let mut glyph_terms = Vec::with_capacity(clip.words.len());
        for word in &clip.words {
            let font = fonts.page(word.code_page())?;
            let scale = font_scale(font, self.config.font_size);
            glyph_terms.push(Term::new(word.content(), font, scale));
        }
        // Right to left: wrap in reading order, then draw each line reversed
        let glyph_lines: Vec<Vec<Term<'_>>> = terms_to_lines(glyph_terms, max_width)
            .into_iter()
            .map(|line| line.into_iter().rev().collect())
            .collect();

        let translation = clip
            .words
            .iter()
            .map(|word| word.translation())
            .collect::<Vec<_>>()
            .join(" ");
        let translation_scale = font_scale(&fonts.translation, self.config.translation_font_size);
        let translation_terms = split_words(&translation)
            .into_iter()
            .map(|text| Term::new(text, &fonts.translation, translation_scale))
            .collect();
        let translation_lines = terms_to_lines(translation_terms, max_width);

        let mut card = RgbImage::new(self.config.width, self.config.height);
        let center_x = self.config.width as f32 / 2.0;
        let mut y = self.config.height as f32 / 2.0;
        let padding = self.config.vertical_padding as f32;

        for line in &glyph_lines {
            self.draw_line(&mut card, line, center_x, y);
            y += self.config.font_size + padding;
        }
        y += self.config.translation_font_size + padding;
        for line in &translation_lines {
            self.draw_line(&mut card, line, center_x, y);
            y += self.config.translation_font_size + padding;
        }

        Ok(card)
    }

    fn draw_line(&self, card: &mut RgbImage, line: &[Term<'_>], center_x: f32, y: f32) {
        let mut x = center_x - line_width(line) as f32 / 2.0;
        for term in line {
            if !term.text.trim().is_empty() {
                draw_text_mut(card, TEXT_COLOR, x as i32, y as i32, term.scale, term.font, &term.text);
            }
            x += term.width as f32;
        }
    }
}
