use super::models::AppConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const TABLE_NAMES: [&str; 5] = ["reading", "appearance", "viewport", "resolver", "logging"];

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

/// Parse either the sectioned layout or a flat list of keys.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let raw: toml::Table = toml::from_str(contents).context("config is not valid TOML")?;
    let sectioned = TABLE_NAMES
        .iter()
        .any(|name| raw.get(*name).is_some_and(toml::Value::is_table));

    let config = if sectioned {
        toml::from_str::<ConfigTables>(contents)
            .context("failed to read sectioned config")?
            .into()
    } else {
        toml::from_str::<AppConfig>(contents).context("failed to read flat config")?
    };
    Ok(config.sanitized())
}

/// Render the sectioned layout.
pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string(&ConfigTables::from(config)).context("failed to serialize config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FontFamily, LogLevel};

    #[test]
    fn sectioned_layout_is_read() {
        let config = parse_config(
            r#"
            [reading]
            words_per_minute = 400
            show_context = false

            [appearance]
            font_size = 24
            font_family = "courier-new"

            [logging]
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.words_per_minute, 400);
        assert!(!config.show_context);
        assert_eq!(config.font_size, 24);
        assert_eq!(config.font_family, FontFamily::CourierNew);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.margin_horizontal, 15);
    }

    #[test]
    fn flat_layout_is_read() {
        let config = parse_config("words_per_minute = 600\nphrase_radius = 3\n").unwrap();
        assert_eq!(config.words_per_minute, 600);
        assert_eq!(config.phrase_radius, 3);
        assert_eq!(config.font_size, 20);
    }

    #[test]
    fn empty_document_is_all_defaults() {
        assert_eq!(parse_config("").unwrap(), AppConfig::default());
    }

    #[test]
    fn parsed_speed_snaps_to_supported_value() {
        let config = parse_config("[reading]\nwords_per_minute = 333\n").unwrap();
        assert_eq!(config.words_per_minute, 350);
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(parse_config("[reading\nwords_per_minute = ").is_err());
        assert!(parse_config("[reading]\nwords_per_minute = \"fast\"\n").is_err());
    }

    #[test]
    fn serialized_config_reads_back() {
        let config = AppConfig {
            words_per_minute: 700,
            show_context: false,
            font_family: FontFamily::Georgia,
            ..AppConfig::default()
        };
        let text = serialize_config(&config).unwrap();
        assert!(text.contains("[reading]"));
        assert_eq!(parse_config(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("speed-reader-missing-config.toml");
        let _ = fs::remove_file(&path);
        assert_eq!(load_config(&path), AppConfig::default());
    }
}
