//! Converter configuration.
//!
//! Handles loading, validating, and merging a `webp-batch.toml` file on top
//! of the stock defaults. Command-line flags override the merged result.
//!
//! ```text
//! stock defaults  ←  webp-batch.toml (sparse)  ←  --quality / --max-dimension / --archive-name
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [conversion]
//! quality = 85              # WebP quality, clamped to 70-100 when applied
//! max_dimension = 2000      # Longest allowed edge in pixels
//!
//! [export]
//! archive_name = "imagenes-webp.zip"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::convert::DEFAULT_MAX_DIMENSION;
use crate::export::DEFAULT_ARCHIVE_NAME;
use crate::imaging::{DEFAULT_QUALITY, MAX_QUALITY, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "webp-batch.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration.
///
/// User config files need only specify the values they want to override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    pub conversion: ConversionConfig,
    pub export: ExportConfig,
}

/// Settings applied to every conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    /// WebP quality in percent. Values below 70 are raised to 70 when applied.
    pub quality: u32,
    /// Longest allowed output edge in pixels. Smaller images are never upscaled.
    pub max_dimension: u32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl ConversionConfig {
    /// The configured quality, clamped into range.
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

/// Bulk export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Filename of the zip archive.
    pub archive_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

/// Values given on the command line, each replacing its config key.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub quality: Option<u32>,
    pub max_dimension: Option<u32>,
    pub archive_name: Option<String>,
}

impl ConverterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conversion.quality > MAX_QUALITY {
            return Err(ConfigError::Validation(
                "conversion.quality must be at most 100".into(),
            ));
        }
        if self.conversion.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "conversion.max_dimension must be positive".into(),
            ));
        }
        let name = &self.export.archive_name;
        if name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "export.archive_name must be a bare filename".into(),
            ));
        }
        match name.strip_suffix(".zip") {
            Some(stem) if !stem.is_empty() => Ok(()),
            _ => Err(ConfigError::Validation(
                "export.archive_name must end in .zip".into(),
            )),
        }
    }

    /// Apply command-line overrides and re-validate.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Some(quality) = overrides.quality {
            self.conversion.quality = quality;
        }
        if let Some(max_dimension) = overrides.max_dimension {
            self.conversion.max_dimension = max_dimension;
        }
        if let Some(archive_name) = overrides.archive_name {
            self.export.archive_name = archive_name;
        }
        self.validate()?;
        Ok(self)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ConverterConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ConverterConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ConverterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file is
/// absent.
pub fn load_config(path: &Path) -> Result<ConverterConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Load config from `path`, which must exist.
pub fn load_config_file(path: &Path) -> Result<ConverterConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    resolve_config(Some(toml::from_str(&content)?))
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# webp-batch Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The file is read from ./webp-batch.toml, or from the path given with
# --config. Command-line flags override values set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Conversion
# ---------------------------------------------------------------------------
[conversion]
# WebP encoding quality in percent (70 = smallest, 100 = best).
# Values below 70 are raised to 70; values above 100 are rejected.
quality = 85

# Longest allowed edge in pixels. Larger images are scaled down keeping
# their aspect ratio; smaller ones are left at their natural size.
max_dimension = 2000

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Filename of the zip archive written by --archive.
archive_name = "imagenes-webp.zip"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ConverterConfig::default();
        assert_eq!(config.conversion.quality, 85);
        assert_eq!(config.conversion.max_dimension, 2000);
        assert_eq!(config.export.archive_name, "imagenes-webp.zip");
    }

    #[test]
    fn parse_partial_config() {
        let config: ConverterConfig = toml::from_str(
            r#"
[conversion]
quality = 92
"#,
        )
        .unwrap();
        assert_eq!(config.conversion.quality, 92);
        assert_eq!(config.conversion.max_dimension, 2000);
        assert_eq!(config.export.archive_name, "imagenes-webp.zip");
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<ConverterConfig, _> = toml::from_str(
            r#"
[conversion]
qualty = 90
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn low_quality_is_clamped_when_applied() {
        let config: ConverterConfig = toml::from_str("[conversion]\nquality = 40\n").unwrap();
        config.validate().unwrap();
        assert_eq!(config.conversion.quality().percent(), 70);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_rejects_quality_over_100() {
        let mut config = ConverterConfig::default();
        config.conversion.quality = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_max_dimension() {
        let mut config = ConverterConfig::default();
        config.conversion.max_dimension = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_archive_name() {
        let mut config = ConverterConfig::default();
        for bad in ["images.tar", ".zip", "", "out/images.zip"] {
            config.export.archive_name = bad.to_string();
            assert!(config.validate().is_err(), "{bad:?} should be rejected");
        }
        config.export.archive_name = "fotos.zip".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_replace_config_values() {
        let config = ConverterConfig::default()
            .with_overrides(Overrides {
                quality: Some(95),
                max_dimension: None,
                archive_name: Some("out.zip".to_string()),
            })
            .unwrap();
        assert_eq!(config.conversion.quality, 95);
        assert_eq!(config.conversion.max_dimension, 2000);
        assert_eq!(config.export.archive_name, "out.zip");
    }

    #[test]
    fn overrides_are_validated() {
        let result = ConverterConfig::default().with_overrides(Overrides {
            max_dimension: Some(0),
            ..Overrides::default()
        });
        assert!(result.is_err());
    }

    // =========================================================================
    // Merging and loading
    // =========================================================================

    #[test]
    fn merge_toml_overlay_wins_and_base_preserved() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n[b]\nz = 4\n").unwrap();
        let merged = merge_toml(base, overlay);

        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
        assert_eq!(merged["b"]["z"].as_integer(), Some(4));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, ConverterConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
[conversion]
max_dimension = 1024

[export]
archive_name = "batch.zip"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.conversion.max_dimension, 1024);
        assert_eq!(config.conversion.quality, 85);
        assert_eq!(config.export.archive_name, "batch.zip");
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[conversion]\nquality = 150\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_rejects_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[conversion\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_file_requires_existing_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_file(&tmp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: ConverterConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, ConverterConfig::default());
    }
}
