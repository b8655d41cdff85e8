use serde::Serialize;
use std::fmt;
use std::time::Duration;

const MICROS_PER_MINUTE: u64 = 60_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    Idle,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaybackPhase::Idle => "idle",
            PlaybackPhase::Running => "running",
            PlaybackPhase::Paused => "paused",
            PlaybackPhase::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Lifecycle notifications for the display collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Started { total: usize },
    Paused { index: usize },
    Resumed { index: usize },
    Stopped,
    Completed { total: usize },
    Warning(String),
    Error(String),
}

impl LifecycleEvent {
    /// Whether the front end should offer its start control again.
    pub fn start_enabled(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::Stopped
                | LifecycleEvent::Completed { .. }
                | LifecycleEvent::Warning(_)
                | LifecycleEvent::Error(_)
        )
    }
}

/// Tick period for a speed. Integer microseconds, so every supported speed
/// divides exactly.
pub fn interval_for(words_per_minute: u32) -> Duration {
    Duration::from_micros(MICROS_PER_MINUTE / u64::from(words_per_minute.max(1)))
}

/// Word index, phase and timing of one loaded document.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    pub(super) phase: PlaybackPhase,
    pub(super) index: usize,
    pub(super) total: usize,
    pub(super) words_per_minute: u32,
    pub(super) interval: Duration,
}

impl PlaybackController {
    pub fn new(total: usize, words_per_minute: u32) -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            index: 0,
            total,
            words_per_minute,
            interval: interval_for(words_per_minute),
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn words_per_minute(&self) -> u32 {
        self.words_per_minute
    }

    /// Interval of the current run; fixed between start and stop.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.phase == PlaybackPhase::Running
    }

    /// Takes effect on the next start.
    pub fn set_words_per_minute(&mut self, words_per_minute: u32) {
        self.words_per_minute = words_per_minute;
    }

    /// Point the controller at a freshly tokenized document.
    pub(crate) fn reload(&mut self, total: usize) {
        self.total = total;
        self.index = 0;
        self.phase = PlaybackPhase::Idle;
    }

    /// Step past the word just presented.
    pub(crate) fn advance(&mut self) {
        if self.phase == PlaybackPhase::Running && self.index < self.total {
            self.index += 1;
        }
    }

    /// Progress pair for the word at `index`: 1-based position and total.
    pub fn progress(&self) -> (usize, usize) {
        ((self.index + 1).min(self.total), self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_hundred_wpm_ticks_every_two_hundred_ms() {
        assert_eq!(interval_for(300), Duration::from_millis(200));
        assert_eq!(interval_for(250), Duration::from_millis(240));
        assert_eq!(interval_for(1000), Duration::from_millis(60));
    }

    #[test]
    fn zero_speed_does_not_divide_by_zero() {
        assert_eq!(interval_for(0), Duration::from_secs(60));
    }

    #[test]
    fn start_control_follows_lifecycle() {
        assert!(!LifecycleEvent::Started { total: 3 }.start_enabled());
        assert!(!LifecycleEvent::Paused { index: 1 }.start_enabled());
        assert!(LifecycleEvent::Stopped.start_enabled());
        assert!(LifecycleEvent::Error("x".into()).start_enabled());
        assert!(LifecycleEvent::Warning("x".into()).start_enabled());
    }

    #[test]
    fn lifecycle_events_serialize_with_tag() {
        let json = serde_json::to_string(&LifecycleEvent::Started { total: 5 }).unwrap();
        assert_eq!(json, r#"{"event":"started","data":{"total":5}}"#);
        let json = serde_json::to_string(&LifecycleEvent::Stopped).unwrap();
        assert_eq!(json, r#"{"event":"stopped"}"#);
    }

    #[test]
    fn advance_is_bounded_by_total() {
        let mut controller = PlaybackController::new(1, 300);
        controller.phase = PlaybackPhase::Running;
        controller.advance();
        controller.advance();
        assert_eq!(controller.index(), 1);
    }
}
