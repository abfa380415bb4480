//! Configuration types for text-to-deck conversion.
//!
//! All pipeline behaviour is controlled through [`DeckConfig`], built via its
//! [`DeckConfigBuilder`]. One struct carries every knob so the same config can
//! be shared by the segmenter, the fetch tasks and the assembler, and logged
//! as a whole when a run needs to be reproduced.

use crate::error::DeckError;
use crate::pipeline::fetch::ImageSource;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Keyword value that switches background images off entirely.
pub const NO_BACKGROUND_KEYWORD: &str = "none";

/// Default themed-image search endpoint. Keywords and a per-slide `sig`
/// disambiguator are appended as the query string.
pub const DEFAULT_IMAGE_ENDPOINT: &str = "https://source.unsplash.com/featured/1600x900/";

/// Upper bound for [`DeckConfig::max_retries`].
pub const MAX_RETRIES: u32 = 10;

static RE_HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{6}$").unwrap());

/// Configuration for a text-to-deck run.
///
/// Built via [`DeckConfig::builder()`] or using [`DeckConfig::default()`].
///
/// # Example
/// ```rust
/// use txt2deck::DeckConfig;
///
/// let config = DeckConfig::builder()
///     .window_size(3)
///     .keywords(["mountains", "fog"])
///     .font_color("ffcc00")
///     .build()
///     .unwrap();
/// assert_eq!(config.font_color, "FFCC00");
/// ```
#[derive(Clone)]
pub struct DeckConfig {
    /// Number of source lines grouped into one slide (the window size). Default: 2.
    ///
    /// Also drives the height of the text box: each line of window claims
    /// 10 % of the slide height.
    pub window_size: usize,

    /// Transparency of the text box background, 0–100. Default: 30.
    pub opacity: u8,

    /// Text colour as six hex digits, no `#`. Default: `FFFFFF`.
    pub font_color: String,

    /// Text font family. Default: `Arial`.
    pub font_face: String,

    /// Text size in points. Default: 28.
    pub font_size: u32,

    /// Render slide text bold. Default: true.
    pub bold: bool,

    /// Search keywords for the background images. Default: `["landscape"]`.
    ///
    /// Joined with `,` into the query. The joined value `none` disables
    /// backgrounds: nothing is fetched and no image layer is painted.
    pub keywords: Vec<String>,

    /// Explicit deck title. If None, the text of slide 0 names the deck.
    pub title: Option<String>,

    /// Themed-image search endpoint. Default: [`DEFAULT_IMAGE_ENDPOINT`].
    pub image_endpoint: String,

    /// Per-attempt fetch timeout in seconds. Default: 30.
    ///
    /// An attempt that exceeds this is a terminal failure of that attempt,
    /// so a stalled connection can never hold the completion barrier open.
    pub fetch_timeout_secs: u64,

    /// Maximum retry attempts per slide after the first fetch fails.
    /// Clamped to [`MAX_RETRIES`]. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per retry. Default: 500.
    pub retry_backoff_ms: u64,

    /// Cap on simultaneous fetches. Default: None (every slide at once).
    pub max_concurrent_fetches: Option<usize>,

    /// What to do once a slide's fetch has failed terminally. Default: [`FailurePolicy::Abort`].
    pub failure_policy: FailurePolicy,

    /// Directory for downloaded backgrounds. If None, a unique directory is
    /// created under the system temp dir.
    pub asset_dir: Option<PathBuf>,

    /// Directory the presentation file is written to. Default: current dir.
    pub output_dir: PathBuf,

    /// Pre-constructed image source. If None, images come over HTTP from
    /// `image_endpoint`.
    pub image_source: Option<Arc<dyn ImageSource>>,

    /// Receives per-slide fetch events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            window_size: 2,
            opacity: 30,
            font_color: "FFFFFF".to_string(),
            font_face: "Arial".to_string(),
            font_size: 28,
            bold: true,
            keywords: vec!["landscape".to_string()],
            title: None,
            image_endpoint: DEFAULT_IMAGE_ENDPOINT.to_string(),
            fetch_timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 500,
            max_concurrent_fetches: None,
            failure_policy: FailurePolicy::default(),
            asset_dir: None,
            output_dir: PathBuf::from("."),
            image_source: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DeckConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeckConfig")
            .field("window_size", &self.window_size)
            .field("opacity", &self.opacity)
            .field("font_color", &self.font_color)
            .field("font_face", &self.font_face)
            .field("font_size", &self.font_size)
            .field("bold", &self.bold)
            .field("keywords", &self.keywords)
            .field("title", &self.title)
            .field("image_endpoint", &self.image_endpoint)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("failure_policy", &self.failure_policy)
            .field("asset_dir", &self.asset_dir)
            .field("output_dir", &self.output_dir)
            .field(
                "image_source",
                &self.image_source.as_ref().map(|_| "<dyn ImageSource>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DeckProgressCallback>"),
            )
            .finish()
    }
}

impl DeckConfig {
    /// Create a new builder for `DeckConfig`.
    pub fn builder() -> DeckConfigBuilder {
        DeckConfigBuilder {
            config: Self::default(),
        }
    }

    /// Keywords as they appear in the search query.
    pub fn keyword_query(&self) -> String {
        self.keywords.join(",")
    }

    /// False when the keyword option is exactly the `none` sentinel.
    pub fn backgrounds_enabled(&self) -> bool {
        self.keyword_query() != NO_BACKGROUND_KEYWORD
    }
}

/// Builder for [`DeckConfig`].
#[derive(Debug)]
pub struct DeckConfigBuilder {
    config: DeckConfig,
}

impl DeckConfigBuilder {
    pub fn window_size(mut self, lines: usize) -> Self {
        self.config.window_size = lines;
        self
    }

    pub fn opacity(mut self, opacity: u8) -> Self {
        self.config.opacity = opacity.min(100);
        self
    }

    pub fn font_color(mut self, hex: impl Into<String>) -> Self {
        let hex: String = hex.into();
        self.config.font_color = hex.trim_start_matches('#').to_ascii_uppercase();
        self
    }

    pub fn font_face(mut self, face: impl Into<String>) -> Self {
        self.config.font_face = face.into();
        self
    }

    pub fn font_size(mut self, pt: u32) -> Self {
        self.config.font_size = pt.clamp(1, 400);
        self
    }

    pub fn bold(mut self, v: bool) -> Self {
        self.config.bold = v;
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set an explicit title. An empty string means "no title".
    pub fn title(mut self, title: impl Into<String>) -> Self {
        let title: String = title.into();
        self.config.title = if title.is_empty() { None } else { Some(title) };
        self
    }

    pub fn image_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.image_endpoint = url.into();
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_concurrent_fetches(mut self, n: usize) -> Self {
        self.config.max_concurrent_fetches = Some(n.max(1));
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.asset_dir = Some(dir.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn image_source(mut self, source: Arc<dyn ImageSource>) -> Self {
        self.config.image_source = Some(source);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DeckConfig, DeckError> {
        let c = &self.config;
        if c.window_size == 0 {
            return Err(DeckError::InvalidConfig(
                "Window size must be ≥ 1 line".into(),
            ));
        }
        if !RE_HEX_COLOR.is_match(&c.font_color) {
            return Err(DeckError::InvalidConfig(format!(
                "Font colour must be six hex digits, got '{}'",
                c.font_color
            )));
        }
        if c.font_face.trim().is_empty() {
            return Err(DeckError::InvalidConfig("Font family is empty".into()));
        }
        if c.keywords.is_empty() || c.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(DeckError::InvalidConfig(
                "Keywords must be non-empty (use 'none' to disable backgrounds)".into(),
            ));
        }
        if c.image_source.is_none() && reqwest::Url::parse(&c.image_endpoint).is_err() {
            return Err(DeckError::InvalidConfig(format!(
                "Image endpoint is not a valid URL: '{}'",
                c.image_endpoint
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What happens once a slide's background fetch has terminally failed.
///
/// Either way the failure is a terminal slot state, so the completion
/// barrier always fires; the policy only decides what assembly does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Abort the run with [`DeckError::FetchFailed`]; nothing is written. (default)
    #[default]
    Abort,
    /// Render the failed slides without a background image.
    PlainBackground,
}
