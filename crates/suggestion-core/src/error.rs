use thiserror::Error;

/// Errors produced while decoding a paragraph path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path segment `{0}` is missing its ordinal prefix")]
    MissingOrdinal(String),

    #[error("path segment `{0}` has an invalid ordinal")]
    InvalidOrdinal(String),

    #[error("path segment `{segment}` is not valid base64: {reason}")]
    InvalidEncoding { segment: String, reason: String },

    #[error("path segment `{0}` does not decode to UTF-8")]
    InvalidUtf8(String),
}

/// Errors produced while loading or validating an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("base_url `{url}` is not an absolute URL: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{field} must be {expected}, got {actual}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        actual: String,
    },
}
