//! Error types for session operations
//!
//! Every failure in the engine is scoped to the current session; none of
//! these are fatal to the process.

use thiserror::Error;

/// Errors that can occur while editing, compositing or persisting a session
#[derive(Error, Debug)]
pub enum RecolorError {
    /// A bitmap could not be allocated
    #[error("Out of memory allocating {width}x{height} bitmap")]
    OutOfMemory { width: u32, height: u32 },

    /// IO error from std::io
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The mask oracle failed or returned unusable data
    #[error("Mask oracle failed: {0}")]
    Oracle(String),

    /// A persisted record could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Settings could not be read or written
    #[error("Config error: {0}")]
    Config(String),

    /// The operation needs a loaded image
    #[error("No image loaded")]
    NoImage,

    /// A project id that isn't a plain file name
    #[error("Invalid project id: {0:?}")]
    InvalidProjectId(String),
}

/// Result type alias for session operations
pub type RecolorResult<T> = Result<T, RecolorError>;

impl From<String> for RecolorError {
    fn from(s: String) -> Self {
        RecolorError::Oracle(s)
    }
}

impl From<&str> for RecolorError {
    fn from(s: &str) -> Self {
        RecolorError::Oracle(s.to_string())
    }
}

impl From<serde_json::Error> for RecolorError {
    fn from(e: serde_json::Error) -> Self {
        RecolorError::Config(e.to_string())
    }
}

impl RecolorError {
    /// Whether this error should be shown to the user as a memory warning
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, RecolorError::OutOfMemory { .. })
    }
}
