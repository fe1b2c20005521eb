//! Error types for tag list parsing and serialization.

use thiserror::Error;

/// Result type for tag list operations.
pub type TagResult<T> = Result<T, TagError>;

/// Errors raised while reading or writing a tag list.
#[derive(Debug, Error)]
pub enum TagError {
    /// The text is not valid YAML, or is YAML of the wrong shape.
    #[error("YAML tag list error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The text is not valid JSON, or is JSON of the wrong shape.
    #[error("JSON tag list error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown tag list format name.
    #[error("unknown tag list format '{name}', expected YAML or JSON")]
    UnknownFormat { name: String },

    /// Unknown audio container extension.
    #[error("unsupported container extension '{ext}', expected one of: mp3, ogg, flac")]
    UnknownContainer { ext: String },

    /// A cell of a tag table could not be turned into a tag.
    #[error("invalid tag table row {row}: {message}")]
    InvalidTableRow { row: usize, message: String },
}

impl TagError {
    /// Creates a new unknown format error.
    pub fn unknown_format(name: impl Into<String>) -> Self {
        Self::UnknownFormat { name: name.into() }
    }

    /// Creates a new unknown container error.
    pub fn unknown_container(ext: impl Into<String>) -> Self {
        Self::UnknownContainer { ext: ext.into() }
    }

    /// Creates a new invalid table row error.
    pub fn invalid_row(row: usize, message: impl Into<String>) -> Self {
        Self::InvalidTableRow {
            row,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TagError::unknown_format("toml");
        assert!(err.to_string().contains("'toml'"));

        let err = TagError::unknown_container("wav");
        assert!(err.to_string().contains("'wav'"));

        let err = TagError::invalid_row(3, "missing value");
        assert_eq!(err.to_string(), "invalid tag table row 3: missing value");
    }
}
