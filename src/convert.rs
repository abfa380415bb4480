//! End-to-end deck building entry points.
//!
//! [`build_deck`] runs the whole pipeline and returns once the presentation
//! file is on disk. Use [`crate::stream::fetch_stream`] directly when you
//! want the per-slide fetch outcomes as they arrive.

use crate::config::DeckConfig;
use crate::error::DeckError;
use crate::output::{slide_reports, BackgroundStatus, DeckOutput, DeckStats};
use crate::pipeline::barrier::{self, CompletionBarrier, SlotState};
use crate::pipeline::ingest::{self, Line};
use crate::pipeline::segment::{self, Slide};
use crate::pipeline::store::AssetStore;
use crate::pipeline::{assemble, write};
use crate::stream;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Source name reported for decks built from in-memory text.
const IN_MEMORY_SOURCE: &str = "<text>";

/// Build a slide deck from a text file.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `path`: Plain-text source, one slide line per line
/// * `config`: Deck configuration
///
/// # Returns
/// `Ok(DeckOutput)` once the presentation file has been written. With
/// [`crate::FailurePolicy::PlainBackground`] some slides may lack a
/// background (check `output.stats.failed`).
///
/// # Errors
/// Returns `Err(DeckError)` for fatal errors:
/// - Source not found / unreadable
/// - The source segments into zero slides
/// - A background fetch failed under the default abort policy
/// - Rendering or writing the presentation failed
pub async fn build_deck(
    path: impl AsRef<Path>,
    config: &DeckConfig,
) -> Result<DeckOutput, DeckError> {
    let path = path.as_ref();
    info!("Starting deck: {}", path.display());
    let lines = ingest::ingest_file(path).await?;
    build_deck_from_lines(&lines, path, config).await
}

/// Build a slide deck from text already in memory.
pub async fn build_deck_from_str(
    text: &str,
    config: &DeckConfig,
) -> Result<DeckOutput, DeckError> {
    let lines = ingest::lines_from_str(text);
    build_deck_from_lines(&lines, Path::new(IN_MEMORY_SOURCE), config).await
}

/// Build a slide deck from ingested lines. `source` only labels errors.
pub async fn build_deck_from_lines(
    lines: &[Line],
    source: &Path,
    config: &DeckConfig,
) -> Result<DeckOutput, DeckError> {
    let total_start = Instant::now();

    // ── Step 1: Segment ──────────────────────────────────────────────────
    let slides = segment_or_fail(lines, source, config)?;
    let total = slides.len();
    let fetching = config.backgrounds_enabled();
    info!("{} lines → {} slides", lines.len(), total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_deck_start(total, fetching);
    }

    // ── Step 2: Asset storage ────────────────────────────────────────────
    let store = AssetStore::create(config).await?;

    // ── Step 3: Fan out fetches, fan in at the barrier ───────────────────
    let fetch_start = Instant::now();
    let slots = if fetching {
        let outcomes = stream::fetch_stream(&slides, store.locations(), config)?;
        barrier::gather(outcomes, total, config.progress_callback.as_ref()).await?
    } else {
        info!("Backgrounds disabled, skipping {} fetches", total);
        CompletionBarrier::skipped(total).into_slots()?
    };
    let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;
    debug!("Barrier released after {}ms", fetch_duration_ms);

    let reports = slide_reports(&slides, &slots);
    let mut stats = tally(&slots);
    stats.source_lines = lines.len();
    stats.fetch_duration_ms = fetch_duration_ms;

    // ── Step 4: Assemble and write ───────────────────────────────────────
    let deck = assemble::assemble(&slides, slots, config)?;
    let path = write::write_deck(&deck, config).await?;

    // ── Step 5: Tear down asset storage ──────────────────────────────────
    store.teardown().await?;

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "done: {} slides ({} fetched, {} failed, {} skipped) in {}ms",
        stats.total_slides, stats.fetched, stats.failed, stats.skipped, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_deck_complete(&path, total);
    }

    Ok(DeckOutput {
        path,
        title: deck.title,
        slides: reports,
        stats,
    })
}

/// Synchronous wrapper around [`build_deck`].
///
/// Creates a temporary tokio runtime internally.
pub fn build_deck_sync(
    path: impl AsRef<Path>,
    config: &DeckConfig,
) -> Result<DeckOutput, DeckError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DeckError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(build_deck(path, config))
}

/// Read and segment a source without fetching or writing anything.
///
/// Fails with [`DeckError::NoSlides`] exactly when [`build_deck`] would.
pub async fn plan_slides(
    path: impl AsRef<Path>,
    config: &DeckConfig,
) -> Result<Vec<Slide>, DeckError> {
    let path = path.as_ref();
    let lines = ingest::ingest_file(path).await?;
    segment_or_fail(&lines, path, config)
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn segment_or_fail(
    lines: &[Line],
    source: &Path,
    config: &DeckConfig,
) -> Result<Vec<Slide>, DeckError> {
    let slides = segment::segment_lines(lines, config.window_size);
    if slides.is_empty() {
        return Err(DeckError::NoSlides {
            path: PathBuf::from(source),
            lines: lines.len(),
            window_size: config.window_size,
        });
    }
    Ok(slides)
}

fn tally(slots: &[SlotState]) -> DeckStats {
    let mut stats = DeckStats {
        total_slides: slots.len(),
        ..DeckStats::default()
    };
    for slot in slots {
        match BackgroundStatus::from_slot(slot) {
            BackgroundStatus::Fetched { bytes } => {
                stats.fetched += 1;
                stats.background_bytes += bytes;
            }
            BackgroundStatus::Failed { .. } => stats.failed += 1,
            BackgroundStatus::Skipped => stats.skipped += 1,
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetError;
    use crate::pipeline::fetch::StoredAsset;
    use image::ImageFormat;

    #[tokio::test]
    async fn empty_source_fails_before_touching_storage() {
        let scratch = tempfile::tempdir().unwrap();
        let assets = scratch.path().join("assets");
        let config = DeckConfig::builder()
            .asset_dir(&assets)
            .output_dir(scratch.path())
            .build()
            .unwrap();

        let err = build_deck_from_str("", &config).await.unwrap_err();
        assert!(matches!(err, DeckError::NoSlides { lines: 0, .. }));
        assert!(!assets.exists());
    }

    #[tokio::test]
    async fn disabled_backgrounds_build_without_fetching() {
        let scratch = tempfile::tempdir().unwrap();
        let config = DeckConfig::builder()
            .keywords(["none"])
            // Unroutable; would fail if anything were fetched.
            .image_endpoint("http://127.0.0.1:9/")
            .output_dir(scratch.path())
            .build()
            .unwrap();

        let out = build_deck_from_str("Intro\nA\nB\nC\nD\n", &config)
            .await
            .unwrap();
        assert_eq!(out.title, "Intro");
        assert_eq!(out.stats.total_slides, 3);
        assert_eq!(out.stats.skipped, 3);
        assert_eq!(out.stats.fetched, 0);
        assert_eq!(out.path, scratch.path().join("Intro.pptx"));
        assert!(out.path.exists());
    }

    #[tokio::test]
    async fn plan_reports_slides_without_side_effects() {
        let scratch = tempfile::tempdir().unwrap();
        let src = scratch.path().join("talk.txt");
        std::fs::write(&src, "Title\nA\nB\nC\nD\n").unwrap();

        let slides = plan_slides(&src, &DeckConfig::default()).await.unwrap();
        let texts: Vec<&str> = slides.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Title", "A\nB", "C\nD"]);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 1);
    }

    #[test]
    fn tally_counts_each_state() {
        let slots = vec![
            SlotState::Succeeded(StoredAsset {
                path: "img0.png".into(),
                format: ImageFormat::Png,
                bytes: 40,
            }),
            SlotState::Failed(AssetError::NotAnImage { index: 1 }),
            SlotState::Skipped,
        ];
        let stats = tally(&slots);
        assert_eq!(
            (stats.total_slides, stats.fetched, stats.failed, stats.skipped),
            (3, 1, 1, 1)
        );
        assert_eq!(stats.background_bytes, 40);
    }
}
