//! Error types for structpdf library.
//!
//! Only fatal conditions surface here. Recoverable page- and block-level
//! degradations are recorded as [`Diagnostic`](crate::model::Diagnostic)s on
//! the middle document instead.

use std::io;
use thiserror::Error;

/// Result type alias for structpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while structuring a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The document has no pages.
    #[error("Document has no pages")]
    EmptyDocument,

    /// Input data could not be interpreted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// An external model (layout detector, text recognizer) failed.
    #[error("Model error: {0}")]
    Model(String),

    /// An external model call exceeded its time budget.
    #[error("Model call timed out after {0} ms")]
    Timeout(u128),

    /// Error decoding or encoding raster images.
    #[error("Image error: {0}")]
    Image(String),

    /// Error during rendering (Markdown, JSON, overlays).
    #[error("Rendering error: {0}")]
    Render(String),

    /// A structural invariant of the middle document does not hold.
    #[error("Invariant violated on page {page_idx}: {message}")]
    Invariant {
        /// Page where the violation was found
        page_idx: usize,
        /// Description of the violation
        message: String,
    },

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::Render(format!("PDF output error: {}", err))
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            other => Error::Image(other.to_string()),
        }
    }
}
