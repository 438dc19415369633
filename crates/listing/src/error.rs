//! Error types for the listing engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Listing error type covering every terminal outcome of a listing request.
///
/// The payloads exist for operator logs only. Callers rendering a response
/// for a client must use [`ListingError::status_code`] and a fixed body, never
/// the `Display` output, which contains absolute paths and OS error text.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The requested path is missing, is not a directory, or escapes the root.
    ///
    /// These causes are deliberately folded into one variant.
    #[error("not found: {requested}")]
    NotFound {
        /// The raw path as the client supplied it.
        requested: String,
    },

    /// The resolved directory itself could not be opened for reading.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// Canonical path of the directory.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Enumeration failed after the directory was opened, including any
    /// failure below the top level during a recursive walk.
    #[error("error reading {path}")]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl ListingError {
    /// Create a not-found error for a requested path.
    pub fn not_found(requested: impl Into<String>) -> Self {
        ListingError::NotFound {
            requested: requested.into(),
        }
    }

    /// HTTP status code class this outcome maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            ListingError::NotFound { .. } => 404,
            ListingError::PermissionDenied { .. } => 403,
            ListingError::Read { .. } => 500,
        }
    }
}

/// Result type alias for listing operations.
pub type Result<T> = std::result::Result<T, ListingError>;
