use super::defaults;
use super::models::{AppConfig, FontFamily, LogLevel};
use serde::Deserialize;

/// On-disk layout: one TOML table per concern.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    reading: ReadingConfig,
    #[serde(default)]
    appearance: AppearanceConfig,
    #[serde(default)]
    viewport: ViewportConfig,
    #[serde(default)]
    resolver: ResolverConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            words_per_minute: tables.reading.words_per_minute,
            show_context: tables.reading.show_context,
            font_size: tables.appearance.font_size,
            font_family: tables.appearance.font_family,
            line_height: tables.appearance.line_height,
            line_spacing: tables.appearance.line_spacing,
            letter_spacing: tables.appearance.letter_spacing,
            margin_horizontal: tables.appearance.margin_horizontal,
            margin_vertical: tables.appearance.margin_vertical,
            viewport_height: tables.viewport.viewport_height,
            scroll_hysteresis: tables.viewport.scroll_hysteresis,
            highlight_min_width: tables.viewport.highlight_min_width,
            adjacency_window: tables.resolver.adjacency_window,
            phrase_radius: tables.resolver.phrase_radius,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            reading: ReadingConfig {
                words_per_minute: config.words_per_minute,
                show_context: config.show_context,
            },
            appearance: AppearanceConfig {
                font_size: config.font_size,
                font_family: config.font_family,
                line_height: config.line_height,
                line_spacing: config.line_spacing,
                letter_spacing: config.letter_spacing,
                margin_horizontal: config.margin_horizontal,
                margin_vertical: config.margin_vertical,
            },
            viewport: ViewportConfig {
                viewport_height: config.viewport_height,
                scroll_hysteresis: config.scroll_hysteresis,
                highlight_min_width: config.highlight_min_width,
            },
            resolver: ResolverConfig {
                adjacency_window: config.adjacency_window,
                phrase_radius: config.phrase_radius,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReadingConfig {
    #[serde(default = "defaults::default_words_per_minute")]
    words_per_minute: u32,
    #[serde(default = "defaults::default_show_context")]
    show_context: bool,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        ReadingConfig {
            words_per_minute: defaults::default_words_per_minute(),
            show_context: defaults::default_show_context(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct AppearanceConfig {
    #[serde(default = "defaults::default_font_size")]
    font_size: u32,
    #[serde(default)]
    font_family: FontFamily,
    #[serde(default = "defaults::default_line_height")]
    line_height: f32,
    #[serde(default = "defaults::default_line_spacing")]
    line_spacing: f32,
    #[serde(default)]
    letter_spacing: u32,
    #[serde(default = "defaults::default_margin")]
    margin_horizontal: u16,
    #[serde(default = "defaults::default_margin")]
    margin_vertical: u16,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        AppearanceConfig {
            font_size: defaults::default_font_size(),
            font_family: FontFamily::default(),
            line_height: defaults::default_line_height(),
            line_spacing: defaults::default_line_spacing(),
            letter_spacing: 0,
            margin_horizontal: defaults::default_margin(),
            margin_vertical: defaults::default_margin(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ViewportConfig {
    #[serde(default = "defaults::default_viewport_height")]
    viewport_height: f32,
    #[serde(default = "defaults::default_scroll_hysteresis")]
    scroll_hysteresis: f32,
    #[serde(default = "defaults::default_highlight_min_width")]
    highlight_min_width: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        ViewportConfig {
            viewport_height: defaults::default_viewport_height(),
            scroll_hysteresis: defaults::default_scroll_hysteresis(),
            highlight_min_width: defaults::default_highlight_min_width(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ResolverConfig {
    #[serde(default = "defaults::default_adjacency_window")]
    adjacency_window: usize,
    #[serde(default = "defaults::default_phrase_radius")]
    phrase_radius: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            adjacency_window: defaults::default_adjacency_window(),
            phrase_radius: defaults::default_phrase_radius(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
