//! Error types for dasher-media.

use std::io;
use thiserror::Error;

/// Result type for dasher-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for dasher-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed box structure.
    #[error("Invalid box: {0}")]
    InvalidBox(String),

    /// Box header or body runs past the end of its parent.
    #[error("Truncated {box_type} box at offset {offset}: need {need} bytes, have {have}")]
    Truncated {
        box_type: String,
        offset: u64,
        need: u64,
        have: u64,
    },

    /// Bad box path syntax.
    #[error("Invalid box path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Malformed manifest, fragment or timed-text document.
    #[error("XML error: {0}")]
    Xml(String),

    /// Bad key material.
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// Subtitle document could not be segmented.
    #[error("Invalid subtitle: {0}")]
    InvalidSubtitle(String),
}

impl Error {
    /// Create an invalid box error.
    pub fn invalid_box(msg: impl Into<String>) -> Self {
        Self::InvalidBox(msg.into())
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an XML error from anything printable.
    pub fn xml(err: impl std::fmt::Display) -> Self {
        Self::Xml(err.to_string())
    }

    /// Create an invalid key error.
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Create an invalid subtitle error.
    pub fn invalid_subtitle(msg: impl Into<String>) -> Self {
        Self::InvalidSubtitle(msg.into())
    }

    /// True for errors caused by malformed binary input.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidBox(_) | Self::Truncated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_classification() {
        assert!(Error::invalid_box("size below header").is_format_error());
        assert!(Error::Truncated {
            box_type: "moov".into(),
            offset: 0,
            need: 100,
            have: 20
        }
        .is_format_error());
        assert!(!Error::xml("unexpected end").is_format_error());
    }

    #[test]
    fn test_error_display() {
        let err = Error::invalid_path("moov/pssh[", "unterminated selector");
        assert_eq!(
            err.to_string(),
            "Invalid box path 'moov/pssh[': unterminated selector"
        );
    }
}
