pub const DEFAULT_WORDS_PER_MINUTE: u32 = 250;
pub const DEFAULT_FONT_SIZE: u32 = 20;
pub const MIN_FONT_SIZE: u32 = 8;
pub const MAX_FONT_SIZE: u32 = 72;

pub(crate) fn default_words_per_minute() -> u32 {
    DEFAULT_WORDS_PER_MINUTE
}

pub(crate) fn default_show_context() -> bool {
    true
}

pub(crate) fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

pub(crate) fn default_line_height() -> f32 {
    1.2
}

pub(crate) fn default_line_spacing() -> f32 {
    0.0
}

pub(crate) fn default_margin() -> u16 {
    15
}

pub(crate) fn default_viewport_height() -> f32 {
    600.0
}

pub(crate) fn default_scroll_hysteresis() -> f32 {
    1.0 / 3.0
}

pub(crate) fn default_highlight_min_width() -> f32 {
    8.0
}

pub(crate) fn default_adjacency_window() -> usize {
    crate::resolver::DEFAULT_ADJACENCY_WINDOW
}

pub(crate) fn default_phrase_radius() -> usize {
    crate::resolver::DEFAULT_PHRASE_RADIUS
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
