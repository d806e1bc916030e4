//! Error types for ability tasks.
//!
//! Owner loss, filter mismatches and redundant unregistration are not errors
//! in this crate family; they are handled locally by the tasks. The variants
//! here only cover construction and configuration boundaries.

/// Result type alias for ability task operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building tags, queries or task configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A gameplay tag name failed validation.
    #[error("Invalid gameplay tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: &'static str },

    /// A TOML configuration document could not be parsed.
    #[error("Invalid task configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Create an invalid tag error.
    pub fn invalid_tag(tag: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidTag {
            tag: tag.into(),
            reason,
        }
    }
}
