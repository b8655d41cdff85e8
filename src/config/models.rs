use crate::config::defaults;
use crate::error::ReaderError;
use crate::resolver::ResolverTuning;
use serde::Deserialize;
use tracing::warn;

/// Speeds offered by the speed selector.
pub const SUPPORTED_WORDS_PER_MINUTE: &[u32] = &[
    100, 150, 200, 250, 300, 350, 400, 450, 500, 600, 700, 800, 900, 1000,
];

/// Sizes offered by the font size selector.
pub const SUPPORTED_FONT_SIZES: &[u32] = &[12, 14, 16, 18, 20, 24, 28, 32, 36, 48];

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_words_per_minute")]
    pub words_per_minute: u32,
    #[serde(default = "crate::config::defaults::default_show_context")]
    pub show_context: bool,
    #[serde(default = "crate::config::defaults::default_font_size")]
    pub font_size: u32,
    #[serde(default)]
    pub font_family: FontFamily,
    #[serde(default = "crate::config::defaults::default_line_height")]
    pub line_height: f32,
    #[serde(default = "crate::config::defaults::default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default)]
    pub letter_spacing: u32,
    #[serde(default = "crate::config::defaults::default_margin")]
    pub margin_horizontal: u16,
    #[serde(default = "crate::config::defaults::default_margin")]
    pub margin_vertical: u16,
    #[serde(default = "crate::config::defaults::default_viewport_height")]
    pub viewport_height: f32,
    #[serde(default = "crate::config::defaults::default_scroll_hysteresis")]
    pub scroll_hysteresis: f32,
    #[serde(default = "crate::config::defaults::default_highlight_min_width")]
    pub highlight_min_width: f32,
    #[serde(default = "crate::config::defaults::default_adjacency_window")]
    pub adjacency_window: usize,
    #[serde(default = "crate::config::defaults::default_phrase_radius")]
    pub phrase_radius: usize,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            words_per_minute: defaults::default_words_per_minute(),
            show_context: defaults::default_show_context(),
            font_size: defaults::default_font_size(),
            font_family: FontFamily::default(),
            line_height: defaults::default_line_height(),
            line_spacing: defaults::default_line_spacing(),
            letter_spacing: 0,
            margin_horizontal: defaults::default_margin(),
            margin_vertical: defaults::default_margin(),
            viewport_height: defaults::default_viewport_height(),
            scroll_hysteresis: defaults::default_scroll_hysteresis(),
            highlight_min_width: defaults::default_highlight_min_width(),
            adjacency_window: defaults::default_adjacency_window(),
            phrase_radius: defaults::default_phrase_radius(),
            log_level: defaults::default_log_level(),
        }
    }
}

impl AppConfig {
    /// Bring every field back into its supported range.
    pub fn sanitized(mut self) -> Self {
        self.words_per_minute = snap_words_per_minute(self.words_per_minute);
        self.font_size = self
            .font_size
            .clamp(defaults::MIN_FONT_SIZE, defaults::MAX_FONT_SIZE);
        self.line_height = finite_or(self.line_height, defaults::default_line_height()).clamp(0.8, 3.0);
        self.line_spacing = finite_or(self.line_spacing, 0.0).max(0.0);
        self.viewport_height =
            finite_or(self.viewport_height, defaults::default_viewport_height()).max(1.0);
        self.scroll_hysteresis =
            finite_or(self.scroll_hysteresis, defaults::default_scroll_hysteresis()).clamp(0.0, 1.0);
        self.highlight_min_width = finite_or(self.highlight_min_width, 0.0).max(0.0);
        self
    }

    pub fn resolver_tuning(&self) -> ResolverTuning {
        ResolverTuning {
            adjacency_window: self.adjacency_window,
            phrase_radius: self.phrase_radius,
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

/// Nearest supported speed; ties go to the slower option.
pub fn snap_words_per_minute(wpm: u32) -> u32 {
    SUPPORTED_WORDS_PER_MINUTE
        .iter()
        .copied()
        .min_by_key(|supported| supported.abs_diff(wpm))
        .unwrap_or(defaults::DEFAULT_WORDS_PER_MINUTE)
}

/// Parse a speed selector label such as `"300 WPM"` or `"300"`.
pub fn parse_speed_selection(label: &str) -> Result<u32, ReaderError> {
    leading_integer(label)
        .filter(|wpm| *wpm > 0)
        .map(snap_words_per_minute)
        .ok_or_else(|| ReaderError::InvalidConfiguration {
            field: "speed",
            value: label.to_string(),
        })
}

/// Parse a font size selector label such as `"20"` or `"20 pt"`.
pub fn parse_font_size_selection(label: &str) -> Result<u32, ReaderError> {
    leading_integer(label)
        .filter(|size| (defaults::MIN_FONT_SIZE..=defaults::MAX_FONT_SIZE).contains(size))
        .ok_or_else(|| ReaderError::InvalidConfiguration {
            field: "font size",
            value: label.to_string(),
        })
}

fn leading_integer(label: &str) -> Option<u32> {
    label.split_whitespace().next()?.parse().ok()
}

/// Font family options.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    Arial,
    Verdana,
    Georgia,
    TimesNewRoman,
    CourierNew,
    Consolas,
    Sans,
    Serif,
    Monospace,
}

impl FontFamily {
    pub const ALL: [FontFamily; 9] = [
        FontFamily::Arial,
        FontFamily::Verdana,
        FontFamily::Georgia,
        FontFamily::TimesNewRoman,
        FontFamily::CourierNew,
        FontFamily::Consolas,
        FontFamily::Sans,
        FontFamily::Serif,
        FontFamily::Monospace,
    ];

    /// Parse a font selector label; unknown names fall back to the default.
    pub fn from_label(label: &str) -> Self {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|family| family.to_string().eq_ignore_ascii_case(wanted))
            .unwrap_or_else(|| {
                warn!(label = wanted, "Unknown font family; using default");
                FontFamily::default()
            })
    }
}

impl Default for FontFamily {
    fn default() -> Self {
        FontFamily::Arial
    }
}

impl std::fmt::Display for FontFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FontFamily::Arial => "Arial",
            FontFamily::Verdana => "Verdana",
            FontFamily::Georgia => "Georgia",
            FontFamily::TimesNewRoman => "Times New Roman",
            FontFamily::CourierNew => "Courier New",
            FontFamily::Consolas => "Consolas",
            FontFamily::Sans => "Sans",
            FontFamily::Serif => "Serif",
            FontFamily::Monospace => "Monospace",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
