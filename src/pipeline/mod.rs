//! Pipeline stages for text-to-deck conversion.
//!
//! Each submodule implements exactly one step, so each can be tested on
//! its own.
//!
//! ## Data Flow
//!
//! ```text
//! ingest ──▶ segment ──▶ fetch ×N ──▶ barrier ──▶ assemble ──▶ write
//! (lines)    (slides)    (store)      (fan-in)    (deck)       (pptx)
//! ```
//!
//! 1. [`ingest`]  : read the source to EOF into trimmed lines
//! 2. [`segment`] : group lines into slide texts with the sliding window
//! 3. [`fetch`]   : one themed background per slide, streamed into the
//!    asset [`store`]; the only stage with network I/O
//! 4. [`barrier`] : wait until every fetch has settled, success or failure
//! 5. [`assemble`]: pair slide texts with their backgrounds and styling
//! 6. [`write`]   : render the package ([`pptx`]) and write it atomically

pub mod assemble;
pub mod barrier;
pub mod fetch;
pub mod ingest;
pub mod pptx;
pub mod segment;
pub mod store;
pub mod write;
