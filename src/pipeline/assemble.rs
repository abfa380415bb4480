//! Deck assembly: combine slide texts with their settled background slots.
//!
//! Runs strictly after the completion barrier has released, so every slot
//! it reads is terminal. Produces a [`Deck`]: a format-neutral description
//! of what each slide shows, in slide index order. Serialising it to a
//! presentation package is [`crate::pipeline::pptx`]'s job.

use crate::config::{DeckConfig, FailurePolicy};
use crate::error::DeckError;
use crate::pipeline::barrier::SlotState;
use crate::pipeline::segment::Slide;
use image::ImageFormat;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Fill colour painted behind the slide text.
pub const TEXT_FILL_COLOR: &str = "333333";

/// Percent of slide height claimed by each line of the window.
const LINE_HEIGHT_PCT: f64 = 10.0;

/// An assembled, ready-to-render deck.
#[derive(Debug, Clone)]
pub struct Deck {
    pub title: String,
    pub slides: Vec<RenderedSlide>,
}

#[derive(Debug, Clone)]
pub struct RenderedSlide {
    pub index: usize,
    /// Full-bleed background image; None paints a plain slide.
    pub background: Option<Background>,
    pub text: TextOverlay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background {
    pub path: PathBuf,
    pub format: ImageFormat,
}

/// The centred text box laid over the background.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextOverlay {
    pub text: String,
    pub font_face: String,
    pub font_size: u32,
    pub bold: bool,
    /// Six hex digits, uppercase.
    pub color: String,
    pub fill_color: String,
    /// Transparency of the fill, 0–100.
    pub fill_transparency: u8,
    pub geometry: BoxGeometry,
}

/// Text box placement in percent of the slide's width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxGeometry {
    pub x_pct: f64,
    pub y_pct: f64,
    pub w_pct: f64,
    pub h_pct: f64,
}

impl BoxGeometry {
    /// Full-width band of height `10·L %`, vertically centred. Both values
    /// are clamped into the slide for windows of more than ten lines.
    pub fn for_window(window_size: usize) -> Self {
        let h_pct = (LINE_HEIGHT_PCT * window_size as f64).min(100.0);
        let y_pct = ((100.0 - h_pct) / 2.0).max(0.0);
        Self {
            x_pct: 0.0,
            y_pct,
            w_pct: 100.0,
            h_pct,
        }
    }
}

/// Build the deck from `slides` and their settled `slots`.
///
/// `slots[i]` belongs to `slides[i]`. With [`FailurePolicy::Abort`] the
/// first failed slot (lowest index) aborts assembly; with
/// [`FailurePolicy::PlainBackground`] failed slides render without an image.
/// When backgrounds are disabled no image is attached, whatever the slots
/// hold.
pub fn assemble(
    slides: &[Slide],
    slots: Vec<SlotState>,
    config: &DeckConfig,
) -> Result<Deck, DeckError> {
    if slides.len() != slots.len() {
        return Err(DeckError::Internal(format!(
            "{} slides but {} background slots",
            slides.len(),
            slots.len()
        )));
    }
    let Some(first) = slides.first() else {
        return Err(DeckError::Internal("cannot assemble an empty deck".into()));
    };

    if config.failure_policy == FailurePolicy::Abort {
        if let Some((index, err)) = slots.iter().enumerate().find_map(|(i, s)| match s {
            SlotState::Failed(e) => Some((i, e.clone())),
            _ => None,
        }) {
            return Err(DeckError::FetchFailed { index, source: err });
        }
    }

    let backgrounds = config.backgrounds_enabled();
    let geometry = BoxGeometry::for_window(config.window_size);
    let title = config.title.clone().unwrap_or_else(|| first.text.clone());

    let mut rendered = Vec::with_capacity(slides.len());
    for (slide, slot) in slides.iter().zip(slots) {
        let background = match slot {
            SlotState::Succeeded(asset) if backgrounds => Some(Background {
                path: asset.path,
                format: asset.format,
            }),
            SlotState::Failed(e) => {
                warn!("Slide {} rendered without background: {}", slide.index, e);
                None
            }
            SlotState::Pending => {
                return Err(DeckError::Internal(format!(
                    "slot {} still pending at assembly",
                    slide.index
                )))
            }
            _ => None,
        };

        rendered.push(RenderedSlide {
            index: slide.index,
            background,
            text: TextOverlay {
                text: slide.text.clone(),
                font_face: config.font_face.clone(),
                font_size: config.font_size,
                bold: config.bold,
                color: config.font_color.clone(),
                fill_color: TEXT_FILL_COLOR.to_string(),
                fill_transparency: config.opacity,
                geometry,
            },
        });
    }

    debug!("Assembled '{}' with {} slides", title, rendered.len());
    Ok(Deck {
        title,
        slides: rendered,
    })
}
