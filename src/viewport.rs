//! Scroll and highlight geometry for the active word.
//!
//! Geometry is estimated from font metrics rather than measured glyphs: one
//! text line per `\n`, a fixed advance per character. The scroll target only
//! moves when it drifts further than the hysteresis band from the last
//! applied offset.

use crate::config::{AppConfig, FontFamily};
use crate::tokenizer::NormalizedText;
use tracing::{debug, trace};

/// Rendering collaborator's current layout settings, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub font_size: f32,
    pub font_family: FontFamily,
    /// Multiplier applied to the font size.
    pub line_height: f32,
    pub line_spacing: f32,
    pub letter_spacing: f32,
    pub margin_horizontal: f32,
    pub margin_vertical: f32,
    pub viewport_height: f32,
}

impl LayoutMetrics {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            font_size: config.font_size as f32,
            font_family: config.font_family,
            line_height: config.line_height,
            line_spacing: config.line_spacing,
            letter_spacing: config.letter_spacing as f32,
            margin_horizontal: f32::from(config.margin_horizontal),
            margin_vertical: f32::from(config.margin_vertical),
            viewport_height: config.viewport_height,
        }
    }

    /// Height of one rendered line including spacing.
    pub fn line_px(&self) -> f32 {
        self.font_size * self.line_height + self.line_spacing
    }

    pub fn char_width_px(&self) -> f32 {
        let family_scale = match self.font_family {
            FontFamily::Monospace | FontFamily::CourierNew | FontFamily::Consolas => 0.64,
            FontFamily::Serif | FontFamily::Georgia | FontFamily::TimesNewRoman => 0.56,
            FontFamily::Verdana => 0.6,
            _ => 0.55,
        };
        self.font_size * family_scale + self.letter_spacing
    }

    fn is_usable(&self) -> bool {
        let finite = [
            self.font_size,
            self.line_height,
            self.line_spacing,
            self.letter_spacing,
            self.margin_horizontal,
            self.margin_vertical,
            self.viewport_height,
        ]
        .iter()
        .all(|value| value.is_finite());
        finite && self.font_size > 0.0 && self.line_px() > 0.0 && self.viewport_height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportUpdate {
    /// Scroll offset in effect after this update.
    pub scroll_y: f32,
    /// Whether `scroll_y` changed and a scroll command should be issued.
    pub scrolled: bool,
    pub highlight: HighlightRect,
}

#[derive(Debug, Clone)]
pub struct ViewportSync {
    /// Char positions of every `\n`, ascending.
    breaks: Vec<usize>,
    char_len: usize,
    hysteresis: f32,
    highlight_min_width: f32,
    last_applied: f32,
}

impl ViewportSync {
    pub fn new(text: NormalizedText, hysteresis: f32, highlight_min_width: f32) -> Self {
        let mut char_len = 0;
        let mut breaks = Vec::new();
        for (pos, ch) in text.chars().enumerate() {
            if ch == '\n' {
                breaks.push(pos);
            }
            char_len = pos + 1;
        }
        Self {
            breaks,
            char_len,
            hysteresis,
            highlight_min_width,
            last_applied: 0.0,
        }
    }

    pub fn last_applied(&self) -> f32 {
        self.last_applied
    }

    /// Forget the applied scroll offset; the next update measures from the top.
    pub fn reset(&mut self) {
        self.last_applied = 0.0;
    }

    /// Geometry for the word starting at char `offset`. `None` when the metrics are
    /// unusable or the offset is outside the text; the caller skips the
    /// scroll and highlight for that tick.
    pub fn update(
        &mut self,
        offset: usize,
        word: &str,
        metrics: &LayoutMetrics,
    ) -> Option<ViewportUpdate> {
        if !metrics.is_usable() {
            debug!(?metrics, "Skipping viewport update; layout metrics unusable");
            return None;
        }
        if offset > self.char_len {
            debug!(offset, len = self.char_len, "Skipping viewport update; offset past text");
            return None;
        }

        let line = self.breaks.partition_point(|&pos| pos < offset);
        let line_start = match line {
            0 => 0,
            n => self.breaks[n - 1] + 1,
        };
        let column = offset - line_start;

        let line_px = metrics.line_px();
        let char_width = metrics.char_width_px();
        let vertical = line as f32 * line_px;

        let highlight = HighlightRect {
            x: metrics.margin_horizontal + column as f32 * char_width,
            y: metrics.margin_vertical + vertical,
            width: (word.chars().count() as f32 * char_width).max(self.highlight_min_width),
            height: line_px,
        };

        let viewport = metrics.viewport_height;
        let candidate = (vertical - viewport / 3.0).max(0.0);
        let scrolled = (candidate - self.last_applied).abs() > viewport * self.hysteresis;
        if scrolled {
            debug!(
                from = self.last_applied,
                to = candidate,
                line,
                "Viewport scroll applied"
            );
            self.last_applied = candidate;
        } else {
            trace!(candidate, kept = self.last_applied, "Viewport scroll within hysteresis");
        }

        Some(ViewportUpdate {
            scroll_y: self.last_applied,
            scrolled,
            highlight,
        })
    }
}
