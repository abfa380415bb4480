//! Output types for a finished deck run.

use crate::error::AssetError;
use crate::pipeline::barrier::SlotState;
use crate::pipeline::segment::Slide;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckOutput {
    /// Where the presentation file was written.
    pub path: PathBuf,
    pub title: String,
    /// One entry per slide, in deck order.
    pub slides: Vec<SlideReport>,
    pub stats: DeckStats,
}

/// What ended up on one slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideReport {
    pub index: usize,
    /// Source line the slide starts at (0-based).
    pub start_line: usize,
    pub text: String,
    pub background: BackgroundStatus,
}

/// How a slide's background was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackgroundStatus {
    /// Image downloaded and embedded.
    Fetched { bytes: u64 },
    /// Fetch failed terminally; the slide is plain.
    Failed { error: AssetError },
    /// Backgrounds were disabled.
    Skipped,
}

impl BackgroundStatus {
    pub fn from_slot(slot: &SlotState) -> Self {
        match slot {
            SlotState::Succeeded(asset) => BackgroundStatus::Fetched { bytes: asset.bytes },
            SlotState::Failed(e) => BackgroundStatus::Failed { error: e.clone() },
            SlotState::Skipped | SlotState::Pending => BackgroundStatus::Skipped,
        }
    }
}

/// Run statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckStats {
    /// Non-blank and blank lines read from the source.
    pub source_lines: usize,
    pub total_slides: usize,
    pub fetched: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Sum of downloaded background sizes.
    pub background_bytes: u64,
    pub fetch_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Slide-by-slide report for `slides` and their settled `slots`.
pub(crate) fn slide_reports(slides: &[Slide], slots: &[SlotState]) -> Vec<SlideReport> {
    slides
        .iter()
        .zip(slots)
        .map(|(slide, slot)| SlideReport {
            index: slide.index,
            start_line: slide.start_line,
            text: slide.text.clone(),
            background: BackgroundStatus::from_slot(slot),
        })
        .collect()
}
