use crate::error::ConfigError;
use crate::link_parser::{LinkExtractor, DEFAULT_BASE_URL};
use crate::paragraph::DEFAULT_MAX_SECTION_DEPTH;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Tunables for one analysis engine. Every field has a default, so an empty
/// TOML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Links resolving to this origin with a `title` query are internal.
    pub base_url: String,
    /// Quiet period after the last content change before a pass runs.
    pub debounce_ms: u64,
    /// "Low readability" fires when the score is strictly above this.
    pub readability_threshold: f64,
    /// Lines must be longer than this (in chars) to count as duplicate contents.
    pub duplicate_line_min_len: usize,
    /// How many ancestor levels the section disambiguator may walk.
    pub max_section_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            debounce_ms: 500,
            readability_threshold: 3.0,
            duplicate_line_min_len: 4,
            max_section_depth: DEFAULT_MAX_SECTION_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_base_url()?;
        if self.debounce_ms == 0 {
            return Err(ConfigError::OutOfRange {
                field: "debounce_ms",
                expected: "greater than 0",
                actual: self.debounce_ms.to_string(),
            });
        }
        if !self.readability_threshold.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "readability_threshold",
                expected: "a finite number",
                actual: self.readability_threshold.to_string(),
            });
        }
        if !(1..=DEFAULT_MAX_SECTION_DEPTH).contains(&self.max_section_depth) {
            return Err(ConfigError::OutOfRange {
                field: "max_section_depth",
                expected: "between 1 and 6",
                actual: self.max_section_depth.to_string(),
            });
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|source| ConfigError::BaseUrl {
            url: self.base_url.clone(),
            source,
        })
    }

    /// Link extractor bound to `base_url`.
    pub fn link_extractor(&self) -> Result<LinkExtractor, ConfigError> {
        Ok(LinkExtractor::new(self.parsed_base_url()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn overrides_individual_fields() {
        let config = EngineConfig::from_toml_str(
            r#"
            base_url = "https://wiki.example/"
            debounce_ms = 250
            readability_threshold = 3.5
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://wiki.example/");
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.readability_threshold, 3.5);
        assert_eq!(config.duplicate_line_min_len, 4);
    }

    #[test]
    fn rejects_relative_base_url() {
        let err = EngineConfig::from_toml_str(r#"base_url = "/wiki""#).unwrap_err();
        assert!(matches!(err, ConfigError::BaseUrl { .. }), "got {err:?}");
    }

    #[test]
    fn rejects_zero_debounce() {
        let err = EngineConfig::from_toml_str("debounce_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "debounce_ms", .. }));
    }

    #[test]
    fn rejects_out_of_range_depth() {
        let err = EngineConfig::from_toml_str("max_section_depth = 9").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "max_section_depth", .. }));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = EngineConfig::from_toml_str("colour = \"blue\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/suggestions.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
