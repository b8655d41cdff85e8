//! Error kinds surfaced by the reading core.
//!
//! None of these abort the process; the session turns each one into a
//! lifecycle event so the front end can re-enable its start control.

use crate::playback::PlaybackPhase;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReaderError {
    /// Tokenization produced no words.
    #[error("No words were extracted from the source")]
    EmptySource,

    /// The extraction collaborator failed.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// A side effect of an active tick failed; playback is back at Idle.
    #[error("Playback failed at word {index}: {message}")]
    Tick { index: usize, message: String },

    /// A user selection could not be parsed; the default was used instead.
    #[error("Invalid {field} selection {value:?}")]
    InvalidConfiguration { field: &'static str, value: String },

    /// The operation was abandoned because stop was requested.
    #[error("Operation cancelled")]
    Cancelled,

    /// The command does not apply in the current phase.
    #[error("Cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: PlaybackPhase,
    },
}

impl ReaderError {
    /// Warnings are shown to the user but are not failures.
    pub fn is_warning(&self) -> bool {
        matches!(self, ReaderError::EmptySource)
    }
}
