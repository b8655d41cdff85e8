//! Fixed-rate playback state machine.
//!
//! `state` owns the phase and index; `transitions` maps each event to the
//! ordered effects the session must perform. No timers live here.

mod state;
mod transitions;

pub use state::{LifecycleEvent, PlaybackController, PlaybackPhase, interval_for};
pub use transitions::{PlaybackAction, PlaybackEvent, transition};
