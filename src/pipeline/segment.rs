//! Slide segmentation: group trimmed source lines into slide texts.
//!
//! A single forward pass over an immutable line sequence with a cursor `i`
//! and a window size `L`:
//!
//! 1. A blank line under the cursor is skipped (one line only, and the loop
//!    carries on from the adjusted cursor).
//! 2. A slide is built only while `i < len − L/2`, compared as real numbers.
//!    A final group starting inside the last `L/2` lines is dropped.
//! 3. The window grows line by line up to `L` lines and stops in front of
//!    the first blank line, or the end of input; the next window then starts
//!    at that blank line.
//! 4. The slide built at `i == 0` is the title slide: it holds line 0 alone
//!    and the next window starts at line 1.
//!
//! ```text
//! L = 2     Title | A B | C D | E      → ["Title", "A\nB", "C\nD"]
//!                                 └─ dropped: starts in the last L/2 lines
//! ```

use crate::pipeline::ingest::Line;
use serde::{Deserialize, Serialize};

/// Separator placed between the lines of one slide.
pub const LINE_SEPARATOR: char = '\n';

/// One slide as produced by segmentation.
///
/// `index` is dense and ascending; it is the deck position and the key of
/// the slide's background asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub index: usize,
    /// Position of the slide's first line in the source.
    pub start_line: usize,
    pub text: String,
}

/// Segment raw line texts into slide texts.
///
/// `window` must be ≥ 1; zero is treated as one.
pub fn segment<S: AsRef<str>>(lines: &[S], window: usize) -> Vec<String> {
    windows(lines, window)
        .into_iter()
        .map(|(_, text)| text)
        .collect()
}

/// Segment ingested lines into indexed slides.
pub fn segment_lines(lines: &[Line], window: usize) -> Vec<Slide> {
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    windows(&texts, window)
        .into_iter()
        .enumerate()
        .map(|(index, (start, text))| Slide {
            index,
            start_line: lines[start].number,
            text,
        })
        .collect()
}

/// The windowing pass. Returns `(start position, slide text)` pairs.
fn windows<S: AsRef<str>>(lines: &[S], window: usize) -> Vec<(usize, String)> {
    let window = window.max(1);
    let len = lines.len();
    let tail_guard = len as f64 - window as f64 / 2.0;
    let mut out = Vec::new();
    let mut i = 0;

    while i < len {
        if lines[i].as_ref().is_empty() {
            i += 1;
        }

        let mut advance = window;

        if (i as f64) < tail_guard {
            let mut text = lines[i].as_ref().to_string();

            if i == 0 {
                advance = 1;
            } else {
                for j in 1..window {
                    match lines.get(i + j).map(AsRef::as_ref) {
                        Some(next) if !next.is_empty() => {
                            text.push(LINE_SEPARATOR);
                            text.push_str(next);
                        }
                        _ => {
                            advance = j;
                            break;
                        }
                    }
                }
            }

            out.push((i, text));
        }

        i = i.saturating_add(advance);
    }

    out
}
