//! Configuration loading for the speed reader.
//!
//! All user-tunable settings are centralized here and loaded from
//! `conf/config.toml` if present. Any missing or invalid entries fall back to
//! documented defaults so playback can still start.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{
    AppConfig, FontFamily, LogLevel, SUPPORTED_FONT_SIZES, SUPPORTED_WORDS_PER_MINUTE,
    parse_font_size_selection, parse_speed_selection, snap_words_per_minute,
};
pub use defaults::{DEFAULT_FONT_SIZE, DEFAULT_WORDS_PER_MINUTE, MAX_FONT_SIZE, MIN_FONT_SIZE};
