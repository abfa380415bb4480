//! Completion barrier: the fan-in gate between fetching and assembly.
//!
//! Each slide owns one [`SlotState`] that moves exactly once from `Pending`
//! to a terminal state. The barrier counts terminal slots and releases when
//! the count reaches the slide count: exactly once, and only after every
//! fetch has settled, failures included.
//!
//! The barrier is owned by the single fan-in loop in [`gather`], which
//! receives outcomes one at a time from the fetch stream. Ordering comes
//! from that single consumer, so no lock or atomic is involved.

use crate::error::{AssetError, DeckError};
use crate::pipeline::fetch::{AssetOutcome, StoredAsset};
use crate::progress::ProgressCallback;
use crate::stream::AssetStream;
use futures::StreamExt;
use tracing::{debug, info};

/// Per-slide fetch result slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Pending,
    Succeeded(StoredAsset),
    Failed(AssetError),
    /// No fetch was needed (backgrounds disabled).
    Skipped,
}

impl SlotState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SlotState::Pending)
    }
}

impl From<AssetOutcome> for SlotState {
    fn from(outcome: AssetOutcome) -> Self {
        match outcome.result {
            Ok(asset) => SlotState::Succeeded(asset),
            Err(e) => SlotState::Failed(e),
        }
    }
}

/// What recording one terminal state did to the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// More slots are still pending.
    Waiting { completed: usize, total: usize },
    /// This arrival settled the last slot. Returned once per barrier.
    Released { total: usize },
}

#[derive(Debug)]
pub struct CompletionBarrier {
    slots: Vec<SlotState>,
    terminal: usize,
}

impl CompletionBarrier {
    /// A barrier over `total` pending slots.
    pub fn new(total: usize) -> Self {
        Self {
            slots: vec![SlotState::Pending; total],
            terminal: 0,
        }
    }

    /// A barrier whose slots are all born `Skipped`; already released.
    pub fn skipped(total: usize) -> Self {
        Self {
            slots: vec![SlotState::Skipped; total],
            terminal: total,
        }
    }

    pub fn total(&self) -> usize {
        self.slots.len()
    }

    pub fn completed(&self) -> usize {
        self.terminal
    }

    pub fn is_released(&self) -> bool {
        self.terminal == self.slots.len()
    }

    /// Settle slot `index` with a terminal `state`.
    ///
    /// Settling a slot twice, settling with `Pending`, or an index outside
    /// the deck is an internal error: it would mean a fetch result was
    /// duplicated or invented.
    pub fn record(&mut self, index: usize, state: SlotState) -> Result<Arrival, DeckError> {
        if !state.is_terminal() {
            return Err(DeckError::Internal(format!(
                "slot {index} recorded without a terminal state"
            )));
        }
        let total = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            DeckError::Internal(format!("slot {index} out of range (deck has {total} slides)"))
        })?;
        if slot.is_terminal() {
            return Err(DeckError::Internal(format!("slot {index} settled twice")));
        }

        *slot = state;
        self.terminal += 1;

        if self.terminal == total {
            Ok(Arrival::Released { total })
        } else {
            Ok(Arrival::Waiting {
                completed: self.terminal,
                total,
            })
        }
    }

    /// Hand the settled slots to assembly. Fails while any slot is pending.
    pub fn into_slots(self) -> Result<Vec<SlotState>, DeckError> {
        if !self.is_released() {
            return Err(DeckError::Internal(format!(
                "assembly requested with {} of {} slots pending",
                self.slots.len() - self.terminal,
                self.slots.len()
            )));
        }
        Ok(self.slots)
    }
}

/// Drain `outcomes` into a barrier over `total` slots and return the
/// settled slots once it releases.
///
/// Emits one progress line per settled fetch. A stream that ends before
/// every slot settled is reported as an error instead of waiting forever.
pub async fn gather(
    mut outcomes: AssetStream,
    total: usize,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<SlotState>, DeckError> {
    let mut barrier = CompletionBarrier::new(total);

    while !barrier.is_released() {
        let Some(outcome) = outcomes.next().await else {
            break;
        };
        let index = outcome.index;
        let state = SlotState::from(outcome);
        let error = match &state {
            SlotState::Failed(e) => Some(e.to_string()),
            _ => None,
        };

        let arrival = barrier.record(index, state)?;
        let completed = barrier.completed();
        info!("slide {}", completed);

        if let Some(cb) = progress {
            match error {
                None => cb.on_fetch_complete(index, completed, total),
                Some(ref e) => cb.on_fetch_error(index, completed, total, e),
            }
        }
        if let Arrival::Released { total } = arrival {
            debug!("Barrier released after {} fetches", total);
        }
    }

    barrier.into_slots()
}
