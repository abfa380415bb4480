//! End-to-end integration tests for txt2deck.
//!
//! Most tests drive the full pipeline against an in-process image source,
//! so they need no network. The live test at the bottom hits the real image
//! endpoint and is gated behind the `E2E_ENABLED` environment variable.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture
//!
//! Include the live test:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing_subscriber::EnvFilter;
use txt2deck::{
    build_deck, build_deck_from_str, plan_slides, AssetError, BackgroundStatus, DeckConfig,
    DeckError, DeckProgressCallback, FailurePolicy, ImageRequest, ImageSource,
};
use zip::ZipArchive;

// ── Test helpers ─────────────────────────────────────────────────────────────

const TALK: &str = "Rust in production\nWhy we switched\nWhat broke\nWhat we kept\nWhat we learned\n";

fn jpeg_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 9, Rgb([40, 90, 160]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .expect("encode jpeg");
    buf
}

/// In-process image source. Later slides answer first, so completion
/// order is the reverse of slide order. Slides in `failing` always fail.
struct FakeSource {
    body: Vec<u8>,
    slides: usize,
    failing: HashSet<usize>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ImageRequest>>,
}

impl FakeSource {
    fn new(slides: usize) -> Arc<Self> {
        Self::failing(slides, &[])
    }

    fn failing(slides: usize, failing: &[usize]) -> Arc<Self> {
        Arc::new(Self {
            body: jpeg_bytes(),
            slides,
            failing: failing.iter().copied().collect(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ImageSource for FakeSource {
    async fn fetch_into(
        &self,
        request: &ImageRequest,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, AssetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        let delay = self.slides.saturating_sub(request.index) as u64 * 15;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        if self.failing.contains(&request.index) {
            return Err(AssetError::Http {
                index: request.index,
                status: 503,
                attempts: 1,
            });
        }
        sink.write_all(&self.body).await.unwrap();
        Ok(self.body.len() as u64)
    }
}

/// Records every progress event.
#[derive(Default)]
struct Recorder {
    started: AtomicUsize,
    completed: Mutex<Vec<usize>>,
    errors: Mutex<Vec<usize>>,
    finished: Mutex<Option<PathBuf>>,
}

impl DeckProgressCallback for Recorder {
    fn on_deck_start(&self, _total_slides: usize, _fetching: bool) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_fetch_complete(&self, _index: usize, completed: usize, _total: usize) {
        self.completed.lock().unwrap().push(completed);
    }
    fn on_fetch_error(&self, index: usize, _completed: usize, _total: usize, _error: &str) {
        self.errors.lock().unwrap().push(index);
    }
    fn on_deck_complete(&self, path: &Path, _slides: usize) {
        *self.finished.lock().unwrap() = Some(path.to_path_buf());
    }
}

struct Scratch {
    _root: tempfile::TempDir,
    source: PathBuf,
    assets: PathBuf,
    out: PathBuf,
}

fn scratch(text: &str) -> Scratch {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("talk.txt");
    std::fs::write(&source, text).unwrap();
    Scratch {
        source,
        assets: root.path().join("temp"),
        out: root.path().join("out"),
        _root: root,
    }
}

fn config_for(s: &Scratch, source: Arc<dyn ImageSource>) -> txt2deck::DeckConfigBuilder {
    DeckConfig::builder()
        .image_source(source)
        .asset_dir(&s.assets)
        .output_dir(&s.out)
        .max_retries(0)
        .fetch_timeout_secs(5)
}

fn read_part(path: &Path, name: &str) -> Option<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = ZipArchive::new(file).unwrap();
    let mut part = archive.by_name(name).ok()?;
    let mut s = String::new();
    part.read_to_string(&mut s).unwrap();
    Some(s)
}

fn media_count(path: &Path) -> usize {
    let file = std::fs::File::open(path).unwrap();
    let archive = ZipArchive::new(file).unwrap();
    archive
        .file_names()
        .filter(|n| n.starts_with("ppt/media/"))
        .count()
}

// ── Full pipeline (fake source, always run) ──────────────────────────────────

#[tokio::test]
async fn test_deck_written_with_one_background_per_slide() {
    let s = scratch(TALK);
    let source = FakeSource::new(3);
    let config = config_for(&s, source.clone()).build().unwrap();

    let output = build_deck(&s.source, &config).await.expect("build should succeed");

    assert_eq!(output.title, "Rust in production");
    assert_eq!(output.path, s.out.join("Rust in production.pptx"));
    assert!(output.path.exists());
    assert_eq!(output.stats.total_slides, 3);
    assert_eq!(output.stats.fetched, 3);
    assert_eq!(output.stats.source_lines, 5);
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);

    assert_eq!(media_count(&output.path), 3);
    for n in 1..=3 {
        let slide = read_part(&output.path, &format!("ppt/slides/slide{n}.xml")).unwrap();
        assert!(slide.contains("<p:bg>"), "slide {n} should have a background");
    }
    assert!(read_part(&output.path, "ppt/slides/slide4.xml").is_none());

    // Downloaded images are gone once the deck is written.
    assert!(!s.assets.exists());
}

#[tokio::test]
async fn test_slide_order_survives_reverse_completion() {
    let s = scratch(TALK);
    let config = config_for(&s, FakeSource::new(3)).build().unwrap();

    let output = build_deck(&s.source, &config).await.unwrap();

    let texts: Vec<&str> = output.slides.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Rust in production",
            "Why we switched\nWhat broke",
            "What we kept\nWhat we learned"
        ]
    );
    let first = read_part(&output.path, "ppt/slides/slide1.xml").unwrap();
    let third = read_part(&output.path, "ppt/slides/slide3.xml").unwrap();
    assert!(first.contains("<a:t>Rust in production</a:t>"));
    assert!(third.contains("<a:t>What we kept</a:t>"));
    assert!(third.contains("<a:t>What we learned</a:t>"));

    let rels = read_part(&output.path, "ppt/slides/_rels/slide3.xml.rels").unwrap();
    assert!(rels.contains("../media/image3.jpg"));
}

#[tokio::test]
async fn test_requests_carry_keywords_and_slide_index() {
    let s = scratch(TALK);
    let source = FakeSource::new(3);
    let config = config_for(&s, source.clone())
        .keywords(["sea", "night"])
        .build()
        .unwrap();

    build_deck(&s.source, &config).await.unwrap();

    let mut seen = source.seen.lock().unwrap().clone();
    seen.sort_by_key(|r| r.index);
    let indices: Vec<usize> = seen.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(seen.iter().all(|r| r.keywords == "sea,night"));
}

#[tokio::test]
async fn test_progress_events_cover_every_slide() {
    let s = scratch(TALK);
    let recorder = Arc::new(Recorder::default());
    let config = config_for(&s, FakeSource::new(3))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let output = build_deck(&s.source, &config).await.unwrap();

    assert_eq!(recorder.started.load(Ordering::SeqCst), 1);
    assert_eq!(*recorder.completed.lock().unwrap(), vec![1, 2, 3]);
    assert!(recorder.errors.lock().unwrap().is_empty());
    assert_eq!(recorder.finished.lock().unwrap().clone(), Some(output.path));
}

// ── Failure handling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_abort_policy_waits_for_all_then_fails() {
    let s = scratch(TALK);
    let recorder = Arc::new(Recorder::default());
    let source = FakeSource::failing(3, &[1, 2]);
    let config = config_for(&s, source.clone())
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let err = build_deck(&s.source, &config).await.unwrap_err();

    assert!(
        matches!(err, DeckError::FetchFailed { index: 1, .. }),
        "got {err:?}"
    );
    // Every fetch settled before the run gave up.
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        recorder.completed.lock().unwrap().len() + recorder.errors.lock().unwrap().len(),
        3
    );
    assert!(recorder.finished.lock().unwrap().is_none());
    assert!(!s.out.join("Rust in production.pptx").exists());
}

#[tokio::test]
async fn test_plain_policy_writes_deck_without_failed_backgrounds() {
    let s = scratch(TALK);
    let config = config_for(&s, FakeSource::failing(3, &[2]))
        .failure_policy(FailurePolicy::PlainBackground)
        .build()
        .unwrap();

    let output = build_deck(&s.source, &config).await.unwrap();

    assert_eq!(output.stats.fetched, 2);
    assert_eq!(output.stats.failed, 1);
    assert!(matches!(
        output.slides[2].background,
        BackgroundStatus::Failed {
            error: AssetError::Http { status: 503, .. }
        }
    ));
    assert_eq!(media_count(&output.path), 2);
    let third = read_part(&output.path, "ppt/slides/slide3.xml").unwrap();
    assert!(!third.contains("<p:bg>"));
}

#[tokio::test]
async fn test_stalled_source_cannot_hang_the_run() {
    struct Stalled;

    #[async_trait]
    impl ImageSource for Stalled {
        async fn fetch_into(
            &self,
            _request: &ImageRequest,
            _sink: &mut (dyn AsyncWrite + Unpin + Send),
        ) -> Result<u64, AssetError> {
            futures::future::pending::<()>().await;
            unreachable!()
        }
    }

    let s = scratch(TALK);
    let config = config_for(&s, Arc::new(Stalled))
        .fetch_timeout_secs(1)
        .failure_policy(FailurePolicy::PlainBackground)
        .build()
        .unwrap();

    let output = tokio::time::timeout(Duration::from_secs(20), build_deck(&s.source, &config))
        .await
        .expect("pipeline must finish once every fetch has timed out")
        .unwrap();
    assert_eq!(output.stats.failed, 3);
    assert_eq!(media_count(&output.path), 0);
}

// ── Backgrounds disabled ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_none_keyword_issues_no_fetches() {
    let s = scratch(TALK);
    let source = FakeSource::new(3);
    let config = config_for(&s, source.clone())
        .keywords(["none"])
        .build()
        .unwrap();

    let output = build_deck(&s.source, &config).await.unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    assert_eq!(output.stats.skipped, 3);
    assert!(output
        .slides
        .iter()
        .all(|r| r.background == BackgroundStatus::Skipped));
    assert_eq!(media_count(&output.path), 0);
}

// ── Inputs and naming ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_explicit_title_names_the_file() {
    let s = scratch(TALK);
    let config = config_for(&s, FakeSource::new(3))
        .title("Q3: lessons/learned")
        .build()
        .unwrap();

    let output = build_deck(&s.source, &config).await.unwrap();

    assert_eq!(output.title, "Q3: lessons/learned");
    assert_eq!(output.path, s.out.join("Q3_ lessons_learned.pptx"));
    let core = read_part(&output.path, "docProps/core.xml").unwrap();
    assert!(core.contains("<dc:title>Q3: lessons/learned</dc:title>"));
}

#[tokio::test]
async fn test_missing_source_is_reported() {
    let s = scratch(TALK);
    let config = config_for(&s, FakeSource::new(0)).build().unwrap();

    let err = build_deck(s.source.with_file_name("nope.txt"), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, DeckError::SourceNotFound { .. }));
}

#[tokio::test]
async fn test_one_line_source_has_no_slides() {
    let s = scratch("Just a title\n");
    let source = FakeSource::new(1);
    let config = config_for(&s, source.clone()).build().unwrap();

    let err = build_deck(&s.source, &config).await.unwrap_err();
    assert!(matches!(err, DeckError::NoSlides { lines: 1, window_size: 2, .. }));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    assert!(!s.assets.exists());
}

#[tokio::test]
async fn test_plan_matches_built_deck() {
    let s = scratch("Title\nA\nB\n\nC\nD\nE\nF\n");
    let config = config_for(&s, FakeSource::new(4))
        .window_size(3)
        .build()
        .unwrap();

    let planned = plan_slides(&s.source, &config).await.unwrap();
    let output = build_deck(&s.source, &config).await.unwrap();

    let planned: Vec<&str> = planned.iter().map(|p| p.text.as_str()).collect();
    let built: Vec<&str> = output.slides.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(planned, built);
    assert_eq!(built, vec!["Title", "A\nB", "C\nD\nE"]);
}

#[tokio::test]
async fn test_build_from_str_uses_same_pipeline() {
    let s = scratch("");
    let config = config_for(&s, FakeSource::new(3)).build().unwrap();

    let output = build_deck_from_str(TALK, &config).await.unwrap();
    assert_eq!(output.stats.total_slides, 3);
    assert!(output.path.starts_with(&s.out));
}

#[tokio::test]
async fn test_output_serialises_to_json() {
    let s = scratch(TALK);
    let config = config_for(&s, FakeSource::new(3)).build().unwrap();

    let output = build_deck(&s.source, &config).await.unwrap();
    let json = serde_json::to_value(&output).unwrap();

    assert_eq!(json["title"], "Rust in production");
    assert_eq!(json["stats"]["total_slides"], 3);
    assert_eq!(json["slides"][1]["background"]["status"], "fetched");
}

// ── Callback API (always run) ────────────────────────────────────────────────

#[tokio::test]
async fn test_callback_send_in_tokio_spawn() {
    let recorder = Arc::new(Recorder::default());
    let cb: Arc<dyn DeckProgressCallback> = recorder.clone();

    let handle = tokio::spawn(async move {
        cb.on_fetch_complete(0, 1, 2);
        cb.on_fetch_error(1, 2, 2, "boom");
    });
    handle.await.unwrap();

    assert_eq!(*recorder.completed.lock().unwrap(), vec![1]);
    assert_eq!(*recorder.errors.lock().unwrap(), vec![1]);
}

// ── Live endpoint (needs network) ────────────────────────────────────────────

#[tokio::test]
async fn test_live_endpoint_builds_deck() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
        return;
    }

    let s = scratch(TALK);
    let config = DeckConfig::builder()
        .asset_dir(&s.assets)
        .output_dir(&s.out)
        .failure_policy(FailurePolicy::PlainBackground)
        .build()
        .unwrap();

    let output = build_deck(&s.source, &config)
        .await
        .expect("live build should succeed");

    println!(
        "{} fetched, {} failed → {}",
        output.stats.fetched,
        output.stats.failed,
        output.path.display()
    );
    assert_eq!(output.stats.total_slides, 3);
    assert!(output.path.exists());
}
