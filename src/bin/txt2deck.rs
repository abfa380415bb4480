//! CLI binary for txt2deck.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `DeckConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use txt2deck::config::MAX_RETRIES;
use txt2deck::{
    build_deck, plan_slides, DeckConfig, DeckProgressCallback, FailurePolicy, ProgressCallback,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one `slide N` line per settled fetch above a
/// live bar, then a final `done` line. Fetches settle out of order, so the
/// printed N is the running count, not the slide index.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Reading source…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} slides  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Fetching");
    }

    /// Stop the bar without a summary line, so an error prints on a clean line.
    fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

impl DeckProgressCallback for CliProgressCallback {
    fn on_deck_start(&self, total_slides: usize, fetching: bool) {
        if fetching {
            self.activate_bar(total_slides);
            self.bar.println(format!(
                "{} {}",
                cyan("◆"),
                bold(&format!("Fetching {total_slides} backgrounds…"))
            ));
        } else {
            self.bar.set_prefix("Writing");
            self.bar.set_message(format!("{total_slides} slides, no backgrounds"));
        }
    }

    fn on_fetch_complete(&self, index: usize, completed: usize, _total: usize) {
        self.bar.println(format!(
            "  {} slide {}  {}",
            green("✓"),
            completed,
            dim(&format!("(#{index})"))
        ));
        self.bar.inc(1);
    }

    fn on_fetch_error(&self, index: usize, completed: usize, _total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} slide {}  {}  {}",
            red("✗"),
            completed,
            dim(&format!("(#{index})")),
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_deck_complete(&self, path: &Path, slides: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} done  {} slides  →  {}",
                green("✔"),
                bold(&slides.to_string()),
                bold(&path.display().to_string())
            );
        } else {
            eprintln!(
                "{} done  {} slides ({} without background)  →  {}",
                cyan("⚠"),
                bold(&slides.to_string()),
                red(&failed.to_string()),
                bold(&path.display().to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Two lines per slide, landscape backgrounds
  txt2deck talk.txt

  # Three lines per slide, mountain photos, yellow Georgia text
  txt2deck -l 3 -k mountains -c FFCC00 -f Georgia talk.txt

  # Several keywords
  txt2deck -k sea,night talk.txt

  # No background images at all
  txt2deck -k none talk.txt

  # Explicit title (and output file name), written to ./decks
  txt2deck -t "Quarterly review" --output-dir decks talk.txt

  # Keep going when an image cannot be fetched
  txt2deck --on-fetch-failure plain talk.txt

  # Preview the slide split without fetching anything
  txt2deck --plan-only talk.txt

SLIDES:
  Line 1 of the source is the title slide. After it, every slide takes up
  to --lines consecutive lines; a blank line ends a slide early. A trailing
  group shorter than half a window is dropped.

ENVIRONMENT VARIABLES:
  Every option can also be set through a TXT2DECK_* variable, for example
  TXT2DECK_LINES=3 or TXT2DECK_KEYWORDS=sea,night.
  RUST_LOG overrides the log filter.
"#;

/// Turn a plain-text file into a slide deck with themed backgrounds.
#[derive(Parser, Debug)]
#[command(
    name = "txt2deck",
    version,
    about = "Turn a plain-text file into a slide deck with themed background images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source text file. Exactly one.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Lines per slide.
    #[arg(short, long, env = "TXT2DECK_LINES", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(1..))]
    lines: u32,

    /// Transparency of the text background, 0–100.
    #[arg(short = 'o', long, env = "TXT2DECK_OPACITY", default_value_t = 30,
          value_parser = clap::value_parser!(u8).range(0..=100))]
    opacity: u8,

    /// Text colour as six hex digits.
    #[arg(short, long, env = "TXT2DECK_COLOR", default_value = "FFFFFF")]
    color: String,

    /// Text font family.
    #[arg(short, long, env = "TXT2DECK_FONT", default_value = "Arial")]
    font: String,

    /// Background image keywords; `none` disables backgrounds.
    #[arg(short, long, env = "TXT2DECK_KEYWORDS", value_delimiter = ',',
          default_value = "landscape")]
    keywords: Vec<String>,

    /// Deck title; also names the output file. Defaults to the first slide.
    #[arg(short, long, env = "TXT2DECK_TITLE")]
    title: Option<String>,

    /// Directory the deck is written to.
    #[arg(long, env = "TXT2DECK_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Directory for downloaded images (removed afterwards). Defaults to a
    /// fresh temp directory.
    #[arg(long, env = "TXT2DECK_ASSET_DIR")]
    asset_dir: Option<PathBuf>,

    /// Themed-image search endpoint.
    #[arg(long, env = "TXT2DECK_ENDPOINT", default_value = txt2deck::config::DEFAULT_IMAGE_ENDPOINT)]
    endpoint: String,

    /// Per-image fetch timeout in seconds.
    #[arg(long, env = "TXT2DECK_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Retries per image after the first failed attempt, at most 10.
    #[arg(long, env = "TXT2DECK_RETRIES", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(0..=MAX_RETRIES as i64))]
    retries: u32,

    /// What to do when an image cannot be fetched.
    #[arg(long, env = "TXT2DECK_ON_FETCH_FAILURE", value_enum, default_value = "abort")]
    on_fetch_failure: FailureArg,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "TXT2DECK_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "TXT2DECK_NO_PROGRESS")]
    no_progress: bool,

    /// Print the slide split only; fetch and write nothing.
    #[arg(long)]
    plan_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TXT2DECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TXT2DECK_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FailureArg {
    /// Stop without writing a deck.
    Abort,
    /// Render the affected slides without a background.
    Plain,
}

impl From<FailureArg> for FailurePolicy {
    fn from(v: FailureArg) -> Self {
        match v {
            FailureArg::Abort => FailurePolicy::Abort,
            FailureArg::Plain => FailurePolicy::PlainBackground,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Invocation check ─────────────────────────────────────────────────
    let source = source_path(&cli)?;

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar prints the per-slide lines itself.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.plan_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let bar = show_progress.then(CliProgressCallback::new);
    let progress_cb = bar
        .clone()
        .map(|cb| cb as Arc<dyn DeckProgressCallback>);

    let result = run(&cli, source, progress_cb, show_progress).await;
    if let (Err(_), Some(bar)) = (&result, &bar) {
        bar.abandon();
    }
    result
}

/// The single source file named on the command line.
fn source_path(cli: &Cli) -> Result<&Path> {
    match cli.files.as_slice() {
        [source] => Ok(source.as_path()),
        _ => anyhow::bail!("Only 1 file may be passed."),
    }
}

async fn run(
    cli: &Cli,
    source: &Path,
    progress_cb: Option<ProgressCallback>,
    show_progress: bool,
) -> Result<()> {
    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(cli, progress_cb)?;

    // ── Plan-only mode ───────────────────────────────────────────────────
    if cli.plan_only {
        let slides = plan_slides(source, &config)
            .await
            .with_context(|| format!("Failed to plan slides for {}", source.display()))?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&slides).context("Failed to serialise slides")?
            );
        } else {
            for slide in &slides {
                println!(
                    "── slide {} (line {}) ──",
                    slide.index + 1,
                    slide.start_line + 1
                );
                println!("{}", slide.text);
            }
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let output = build_deck(source, &config)
        .await
        .context("Deck build failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        // Only print the summary when the progress callback is disabled.
        eprintln!(
            "done  {} slides  ({} fetched, {} failed, {} skipped)  {}ms  →  {}",
            output.stats.total_slides,
            output.stats.fetched,
            output.stats.failed,
            output.stats.skipped,
            output.stats.total_duration_ms,
            output.path.display()
        );
    }

    Ok(())
}

/// Map CLI args to `DeckConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DeckConfig> {
    let mut builder = DeckConfig::builder()
        .window_size(cli.lines as usize)
        .opacity(cli.opacity)
        .font_color(cli.color.as_str())
        .font_face(cli.font.as_str())
        .keywords(cli.keywords.iter().map(|k| k.trim().to_string()))
        .image_endpoint(cli.endpoint.as_str())
        .fetch_timeout_secs(cli.timeout)
        .max_retries(cli.retries)
        .failure_policy(cli.on_fetch_failure.clone().into())
        .output_dir(&cli.output_dir);

    if let Some(ref title) = cli.title {
        builder = builder.title(title.as_str());
    }
    if let Some(ref dir) = cli.asset_dir {
        builder = builder.asset_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
