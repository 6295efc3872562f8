// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Reporter errors.

use thiserror::Error;

/// Longest response body kept on an error.
const BODY_EXCERPT_CHARS: usize = 500;

/// Errors from delivering metrics to the monitoring backend.
#[derive(Debug, Error)]
pub enum ReporterError {
    /// No API key configured.
    #[error("{0} not set, skipping export")]
    MissingApiKey(&'static str),

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body excerpt
        body: String,
    },

    /// The backend accepted the request but reported a failure.
    #[error("backend rejected submission: {0}")]
    Rejected(String),

    /// Every batch in one attempt failed.
    #[error("all {0} batches failed")]
    AllBatchesFailed(usize),

    /// Payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReporterError {
    pub(crate) fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: excerpt(body),
        }
    }
}

pub(crate) fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

/// Result type for reporter operations.
pub type Result<T> = std::result::Result<T, ReporterError>;
