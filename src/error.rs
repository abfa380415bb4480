//! Error types for the txt2deck library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DeckError`]: **Fatal**: the deck cannot be produced at all
//!   (unreadable source, invalid configuration, render or write failure).
//!   Returned as `Err(DeckError)` from the top-level `build_deck*` functions.
//!
//! * [`AssetError`]: **Per-slide**: one background fetch reached a terminal
//!   failure (network error, non-success status, timeout). Stored in the
//!   slide's result slot so the completion barrier still observes it; the
//!   configured [`crate::config::FailurePolicy`] then decides whether the
//!   whole run aborts or the slide renders without a background.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the txt2deck library.
#[derive(Debug, Error)]
pub enum DeckError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// Source text file was not found at the given path.
    #[error("Source file not found: '{path}'\nCheck the path exists and is readable.")]
    SourceNotFound { path: PathBuf },

    /// Process does not have read permission on the source file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the source failed part-way (I/O error or invalid UTF-8).
    #[error("Failed to read source '{path}': {source}")]
    SourceReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Segmentation produced no slides, so there is nothing to render
    /// and no slide 0 to title the deck with.
    #[error("Source '{path}' produced no slides ({lines} lines read, window size {window_size})")]
    NoSlides {
        path: PathBuf,
        lines: usize,
        window_size: usize,
    },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// A background fetch failed terminally and the failure policy is `Abort`.
    #[error("Background for slide {index} could not be fetched: {source}\nRetry later, or pass --on-fetch-failure plain.")]
    FetchFailed {
        index: usize,
        #[source]
        source: AssetError,
    },

    /// The temporary asset directory could not be created or removed.
    #[error("Asset storage error at '{path}': {source}")]
    AssetStoreFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Building the presentation package failed.
    #[error("Failed to render slide {slide}: {detail}")]
    RenderFailed { slide: usize, detail: String },

    /// Could not create or write the output presentation file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Terminal failure reason for a single slide's background fetch.
///
/// Always recorded in the slide's slot; never left implicit.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum AssetError {
    /// The image endpoint answered with a non-success status.
    #[error("slide {index}: HTTP {status} after {attempts} attempt(s)")]
    Http {
        index: usize,
        status: u16,
        attempts: u32,
    },

    /// Connection, TLS or body-streaming failure.
    #[error("slide {index}: network error after {attempts} attempt(s): {detail}")]
    Network {
        index: usize,
        attempts: u32,
        detail: String,
    },

    /// Every attempt exceeded the per-fetch timeout.
    #[error("slide {index}: fetch timed out after {secs}s ({attempts} attempt(s))")]
    Timeout {
        index: usize,
        secs: u64,
        attempts: u32,
    },

    /// The response body is not a recognised image format.
    #[error("slide {index}: response body is not an image")]
    NotAnImage { index: usize },

    /// Writing the downloaded body into asset storage failed.
    #[error("slide {index}: could not store asset: {detail}")]
    Io { index: usize, detail: String },

    /// The fetch task itself died (panic or runtime shutdown).
    #[error("slide {index}: fetch task failed: {detail}")]
    TaskFailed { index: usize, detail: String },
}

impl AssetError {
    /// Slide index this failure belongs to.
    pub fn index(&self) -> usize {
        match self {
            AssetError::Http { index, .. }
            | AssetError::Network { index, .. }
            | AssetError::Timeout { index, .. }
            | AssetError::NotAnImage { index }
            | AssetError::Io { index, .. }
            | AssetError::TaskFailed { index, .. } => *index,
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Client errors (4xx other than 408/429) and non-image bodies are
    /// permanent; everything else is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AssetError::Http { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            AssetError::Network { .. } | AssetError::Timeout { .. } => true,
            AssetError::NotAnImage { .. }
            | AssetError::Io { .. }
            | AssetError::TaskFailed { .. } => false,
        }
    }

    /// Copy of this error with the attempt counter replaced.
    pub(crate) fn with_attempts(self, n: u32) -> Self {
        match self {
            AssetError::Http { index, status, .. } => AssetError::Http {
                index,
                status,
                attempts: n,
            },
            AssetError::Network { index, detail, .. } => AssetError::Network {
                index,
                attempts: n,
                detail,
            },
            AssetError::Timeout { index, secs, .. } => AssetError::Timeout {
                index,
                secs,
                attempts: n,
            },
            other => other,
        }
    }
}
