//! Progress-callback trait for per-slide pipeline events.
//!
//! Inject an [`Arc<dyn DeckProgressCallback>`] via
//! [`crate::config::DeckConfigBuilder::progress_callback`] to receive events
//! as background fetches complete. The CLI uses this to print one line per
//! finished fetch and a final completion line.
//!
//! # Example
//!
//! ```rust
//! use txt2deck::{DeckProgressCallback, DeckConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     fetched: AtomicUsize,
//! }
//!
//! impl DeckProgressCallback for CountingCallback {
//!     fn on_fetch_complete(&self, index: usize, completed: usize, total: usize) {
//!         self.fetched.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("slide {completed}/{total} (index {index})");
//!     }
//! }
//!
//! let config = DeckConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { fetched: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it fetches backgrounds and writes the deck.
///
/// Fetch events arrive from the fan-in loop one at a time, but the
/// callback may be invoked from any runtime worker thread, hence
/// `Send + Sync`. All methods default to no-ops.
pub trait DeckProgressCallback: Send + Sync {
    /// Called once after segmentation, before any fetch is launched.
    ///
    /// `fetching` is false when backgrounds are disabled and no fetch
    /// will be issued.
    fn on_deck_start(&self, total_slides: usize, fetching: bool) {
        let _ = (total_slides, fetching);
    }

    /// Called when a slide's background reached `Succeeded`.
    ///
    /// # Arguments
    /// * `index`    : 0-based slide index
    /// * `completed`: terminal fetches so far, including this one
    /// * `total`    : number of slides
    fn on_fetch_complete(&self, index: usize, completed: usize, total: usize) {
        let _ = (index, completed, total);
    }

    /// Called when a slide's background reached `Failed` (retries exhausted).
    fn on_fetch_error(&self, index: usize, completed: usize, total: usize, error: &str) {
        let _ = (index, completed, total, error);
    }

    /// Called once after the deck file has been written.
    fn on_deck_complete(&self, path: &Path, slides: usize) {
        let _ = (path, slides);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DeckProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DeckConfig`].
pub type ProgressCallback = Arc<dyn DeckProgressCallback>;
