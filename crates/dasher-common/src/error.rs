//! Common error types used throughout dasher.

/// Common error type for dasher.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// DRM was requested but the key material is incomplete.
    #[error("Missing key material: {0}")]
    MissingKeyMaterial(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new MissingKeyMaterial error.
    pub fn missing_key_material<S: Into<String>>(msg: S) -> Self {
        Self::MissingKeyMaterial(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
