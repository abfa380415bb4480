//! # txt2deck
//!
//! Turn a plain-text file into a slide deck with themed background images.
//!
//! Each non-blank line of the source is slide text. Lines are grouped into
//! slides by a sliding window of `L` lines, every slide gets a background
//! image fetched by keyword, and the result is written as a `.pptx` file
//! named after the deck title.
//!
//! ## Pipeline Overview
//!
//! ```text
//! talk.txt
//!  │
//!  ├─ 1. Ingest    read to EOF, trim every line
//!  ├─ 2. Segment   sliding window of L lines; blank lines end a window early
//!  ├─ 3. Fetch     one concurrent image request per slide, streamed to disk
//!  ├─ 4. Barrier   wait until every fetch has settled (success or failure)
//!  ├─ 5. Assemble  text box + background per slide, in slide order
//!  └─ 6. Write     <title>.pptx, then remove the downloaded images
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use txt2deck::{build_deck, DeckConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DeckConfig::builder()
//!         .window_size(2)
//!         .keywords(["mountains"])
//!         .build()?;
//!     let output = build_deck("talk.txt", &config).await?;
//!     println!("{} slides → {}", output.stats.total_slides, output.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `txt2deck` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! txt2deck = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DeckConfig, DeckConfigBuilder, FailurePolicy, NO_BACKGROUND_KEYWORD};
pub use convert::{build_deck, build_deck_from_lines, build_deck_from_str, build_deck_sync, plan_slides};
pub use error::{AssetError, DeckError};
pub use output::{BackgroundStatus, DeckOutput, DeckStats, SlideReport};
pub use pipeline::barrier::{CompletionBarrier, SlotState};
pub use pipeline::fetch::{HttpImageSource, ImageRequest, ImageSource};
pub use pipeline::segment::{segment, Slide};
pub use progress::{DeckProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{fetch_stream, AssetStream};
