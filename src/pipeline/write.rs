//! Deck output: name the file, render the package, write it atomically.

use crate::config::DeckConfig;
use crate::error::DeckError;
use crate::pipeline::assemble::Deck;
use crate::pipeline::pptx;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use tracing::{debug, info};

/// Presentation file extension.
pub const DECK_EXTENSION: &str = "pptx";

const MAX_STEM_CHARS: usize = 80;

static RE_UNDERSCORE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

/// File name for a deck titled `title`: `<sanitised title>.pptx`.
///
/// Path separators, reserved punctuation and control characters (line
/// breaks included) become `_`; runs of `_` collapse; the result is
/// trimmed and capped at 80 characters. An empty result becomes
/// `untitled`, and Windows device names get a trailing `_`.
pub fn deck_file_name(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let collapsed = RE_UNDERSCORE_RUN.replace_all(&replaced, "_");

    let mut stem: String = collapsed
        .trim_matches(&['_', ' ', '.'][..])
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    stem = stem.trim_end_matches(&['_', ' ', '.'][..]).to_string();

    if stem.is_empty() {
        stem = "untitled".to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    format!("{stem}.{DECK_EXTENSION}")
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}' | '\u{7F}')
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Render `deck` and write it to `<output_dir>/<deck_file_name(title)>`.
///
/// Uses atomic write (temp file + rename), so an interrupted run never
/// leaves a truncated deck behind. Returns the final path.
pub async fn write_deck(deck: &Deck, config: &DeckConfig) -> Result<PathBuf, DeckError> {
    let path = config.output_dir.join(deck_file_name(&deck.title));

    let to_render = deck.clone();
    let bytes = tokio::task::spawn_blocking(move || pptx::render(&to_render))
        .await
        .map_err(|e| DeckError::Internal(format!("Render task panicked: {}", e)))??;
    debug!("Rendered {} bytes for {} slides", bytes.len(), deck.slides.len());

    let write_err = |e: std::io::Error| DeckError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    };

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(write_err)?;

    let tmp_path = path.with_extension(format!("{DECK_EXTENSION}.tmp"));
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::assemble::{BoxGeometry, RenderedSlide, TextOverlay};

    #[test]
    fn plain_title_is_kept() {
        assert_eq!(deck_file_name("Quarterly review"), "Quarterly review.pptx");
    }

    #[test]
    fn separators_and_breaks_are_replaced() {
        assert_eq!(deck_file_name("a/b\\c: d?"), "a_b_c_ d.pptx");
        assert_eq!(deck_file_name("Line one\nLine two"), "Line one_Line two.pptx");
        assert_eq!(deck_file_name("x<<>>y"), "x_y.pptx");
    }

    #[test]
    fn empty_and_reserved_names() {
        assert_eq!(deck_file_name(""), "untitled.pptx");
        assert_eq!(deck_file_name("///"), "untitled.pptx");
        assert_eq!(deck_file_name("con"), "con_.pptx");
    }

    #[test]
    fn long_titles_are_capped_on_char_boundaries() {
        let title = "é".repeat(200);
        let name = deck_file_name(&title);
        let stem = name.trim_end_matches(".pptx");
        assert_eq!(stem.chars().count(), MAX_STEM_CHARS);
    }

    fn deck(title: &str) -> Deck {
        Deck {
            title: title.into(),
            slides: vec![RenderedSlide {
                index: 0,
                background: None,
                text: TextOverlay {
                    text: title.into(),
                    font_face: "Arial".into(),
                    font_size: 28,
                    bold: true,
                    color: "FFFFFF".into(),
                    fill_color: "333333".into(),
                    fill_transparency: 30,
                    geometry: BoxGeometry::for_window(1),
                },
            }],
        }
    }

    #[tokio::test]
    async fn writes_deck_into_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("decks");
        let config = DeckConfig::builder().output_dir(&out).build().unwrap();

        let path = write_deck(&deck("Hello"), &config).await.unwrap();
        assert_eq!(path, out.join("Hello.pptx"));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert!(!out.join("Hello.pptx.tmp").exists());
    }

    #[tokio::test]
    async fn existing_deck_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeckConfig::builder().output_dir(dir.path()).build().unwrap();
        std::fs::write(dir.path().join("Hello.pptx"), b"stale").unwrap();

        let path = write_deck(&deck("Hello"), &config).await.unwrap();
        assert_ne!(std::fs::read(path).unwrap(), b"stale");
    }
}
