//! Streaming fetch API: emit background outcomes as they complete.
//!
//! [`fetch_stream`] fans out one fetch task per slide and yields an
//! [`AssetOutcome`] for each, in completion order (not slide order). The
//! pipeline's fan-in in [`crate::pipeline::barrier::gather`] consumes it;
//! embedders can consume it directly to drive their own progress display.
//!
//! Every slide yields exactly one item. A task that dies (panic, runtime
//! shutdown) still yields a [`AssetError::TaskFailed`] outcome, so a
//! consumer counting items up to the slide count can never hang.

use crate::config::DeckConfig;
use crate::error::{AssetError, DeckError};
use crate::pipeline::fetch::{self, AssetOutcome, HttpImageSource, ImageRequest, ImageSource};
use crate::pipeline::segment::Slide;
use crate::pipeline::store::AssetLocations;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-slide fetch outcomes.
pub type AssetStream = Pin<Box<dyn Stream<Item = AssetOutcome> + Send>>;

/// Fetch one background per slide, streaming outcomes as they settle.
///
/// Concurrency is `config.max_concurrent_fetches`, or every slide at once
/// when unset. Each fetch runs as its own tokio task.
///
/// # Returns
/// - `Ok(AssetStream)`: one outcome per slide, completion order
/// - `Err(DeckError)`: the HTTP image source could not be built
pub fn fetch_stream(
    slides: &[Slide],
    locations: AssetLocations,
    config: &DeckConfig,
) -> Result<AssetStream, DeckError> {
    let source = resolve_source(config)?;
    let keywords = config.keyword_query();
    let concurrency = config
        .max_concurrent_fetches
        .unwrap_or(slides.len())
        .max(1);

    info!(
        "Fetching {} background(s) for '{}' ({} at a time)",
        slides.len(),
        keywords,
        concurrency
    );

    let requests: Vec<ImageRequest> = slides
        .iter()
        .map(|s| ImageRequest {
            index: s.index,
            keywords: keywords.clone(),
        })
        .collect();
    let cfg = config.clone();

    let s = stream::iter(requests.into_iter().map(move |request| {
        let source = Arc::clone(&source);
        let locations = locations.clone();
        let cfg = cfg.clone();
        async move {
            let index = request.index;
            let task = tokio::spawn(async move {
                fetch::fetch_asset(&source, &request, &locations, &cfg).await
            });
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => AssetOutcome {
                    index,
                    result: Err(AssetError::TaskFailed {
                        index,
                        detail: e.to_string(),
                    }),
                    attempts: 0,
                    duration_ms: 0,
                },
            }
        }
    }))
    .buffer_unordered(concurrency);

    Ok(Box::pin(s))
}

/// The injected image source, or the HTTP source for `config.image_endpoint`.
fn resolve_source(config: &DeckConfig) -> Result<Arc<dyn ImageSource>, DeckError> {
    if let Some(ref source) = config.image_source {
        return Ok(Arc::clone(source));
    }
    Ok(Arc::new(HttpImageSource::from_config(config)?))
}
