//! Extraction errors.
//!
//! These never escape the extraction boundary in the normal pipeline; the
//! infallible `extract_*` entrypoints log them and return an empty mapping.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons an artifact could not be turned into metrics.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No candidate artifact in the directory.
    #[error("no JSON result files found in {}", .0.display())]
    NoArtifact(PathBuf),

    /// Several fallback candidates and no canonical file to disambiguate.
    #[error("{count} JSON files in {} and no canonical result file, refusing to guess", .dir.display())]
    Ambiguous {
        /// Directory that was searched
        dir: PathBuf,
        /// Number of candidates found
        count: usize,
    },

    /// The artifact exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Unreadable {
        /// Artifact path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The artifact is not valid JSON.
    #[error("invalid JSON in {}: {source}", .path.display())]
    InvalidJson {
        /// Artifact path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// The artifact parsed but its top level is not an object.
    #[error("expected a JSON object in {}, got {found}", .path.display())]
    NotAnObject {
        /// Artifact path
        path: PathBuf,
        /// JSON type that was found instead
        found: &'static str,
    },
}

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
