//! Word-by-word speed reading core.
//!
//! A source is extracted to plain text, normalized and split into words
//! ([`tokenizer`]). Playback ticks at a fixed rate ([`playback`], driven by
//! [`runtime`]); on every tick the active word is mapped back to its offset
//! in the normalized text ([`resolver`]) and turned into scroll and highlight
//! geometry ([`viewport`]). [`session`] ties one loaded document together.

pub mod cancellation;
pub mod config;
pub mod error;
pub mod extract;
pub mod playback;
pub mod resolver;
pub mod runtime;
pub mod session;
pub mod tokenizer;
pub mod viewport;

pub use error::ReaderError;
pub use playback::{LifecycleEvent, PlaybackPhase};
pub use runtime::{StopHandle, Timeline, TimelineHandle};
pub use session::{DisplaySink, ReaderSession, RenderSurface, SessionCommand, SessionEvent};
