//! One loaded document and everything derived from it.
//!
//! The session owns the normalized text, word sequence, position cache,
//! playback controller and viewport state. It is created when a source
//! finishes extracting, reset on stop, and dropped when another source is
//! opened. Collaborators are passed in per command so the session never
//! outlives or aliases them.

use crate::config::{AppConfig, snap_words_per_minute};
use crate::error::ReaderError;
use crate::playback::{
    LifecycleEvent, PlaybackAction, PlaybackController, PlaybackEvent, PlaybackPhase, transition,
};
use crate::resolver::PositionResolver;
use crate::tokenizer::Document;
use crate::viewport::{HighlightRect, LayoutMetrics, ViewportSync};
use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Receives the word stream and lifecycle notifications.
pub trait DisplaySink: Send {
    fn show_word(&mut self, word: &str) -> Result<()>;
    fn show_progress(&mut self, current: usize, total: usize) -> Result<()>;
    fn lifecycle(&mut self, event: &LifecycleEvent) -> Result<()>;
}

/// The context view: supplies layout metrics and accepts scroll/highlight
/// commands.
pub trait RenderSurface: Send {
    /// `None` when no geometry is available yet.
    fn metrics(&self) -> Option<LayoutMetrics>;
    fn scroll_to(&mut self, y: f32) -> Result<()>;
    fn draw_highlight(&mut self, rect: HighlightRect) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Pause,
    Resume,
    TogglePause,
    Stop,
    Tick,
    SetContextEnabled(bool),
    SetWordsPerMinute(u32),
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Start => "reader_start",
            Self::Pause => "reader_pause",
            Self::Resume => "reader_resume",
            Self::TogglePause => "reader_toggle_pause",
            Self::Stop => "reader_stop",
            Self::Tick => "reader_tick",
            Self::SetContextEnabled(_) => "reader_set_context_enabled",
            Self::SetWordsPerMinute(_) => "reader_set_words_per_minute",
        }
    }
}

/// What the timeline must do with its recurring tick after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerDirective {
    #[default]
    Unchanged,
    Schedule(Duration),
    Cancel,
}

#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub action: &'static str,
    pub phase: PlaybackPhase,
    pub index: usize,
    pub timer: TimerDirective,
    pub lifecycle: Vec<LifecycleEvent>,
    pub error: Option<ReaderError>,
}

pub struct ReaderSession {
    raw: Arc<str>,
    document: Document,
    resolver: PositionResolver,
    viewport: ViewportSync,
    controller: PlaybackController,
    config: AppConfig,
    context_enabled: bool,
    /// Set once positions were cleared; the next start retokenizes.
    stale: bool,
}

impl ReaderSession {
    pub fn load(raw: impl Into<Arc<str>>, config: &AppConfig) -> Self {
        let raw = raw.into();
        let config = config.clone().sanitized();
        let document = Document::from_raw(&raw);
        info!(
            raw_chars = raw.len(),
            words = document.words.len(),
            "Loaded reading session"
        );
        Self {
            resolver: PositionResolver::new(
                document.text.clone(),
                document.words.clone(),
                config.resolver_tuning(),
            ),
            viewport: ViewportSync::new(
                document.text.clone(),
                config.scroll_hysteresis,
                config.highlight_min_width,
            ),
            controller: PlaybackController::new(document.words.len(), config.words_per_minute),
            context_enabled: config.show_context,
            document,
            raw,
            config,
            stale: false,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn resolver(&self) -> &PositionResolver {
        &self.resolver
    }

    pub fn viewport(&self) -> &ViewportSync {
        &self.viewport
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.controller.phase()
    }

    pub fn index(&self) -> usize {
        self.controller.index()
    }

    pub fn total(&self) -> usize {
        self.controller.total()
    }

    pub fn interval(&self) -> Duration {
        self.controller.interval()
    }

    pub fn words_per_minute(&self) -> u32 {
        self.controller.words_per_minute()
    }

    pub fn context_enabled(&self) -> bool {
        self.context_enabled
    }

    pub fn apply_command(
        &mut self,
        command: SessionCommand,
        sink: &mut dyn DisplaySink,
        surface: &mut dyn RenderSurface,
    ) -> SessionEvent {
        let action = command.action();
        let mut event = SessionEvent {
            action,
            phase: self.phase(),
            index: self.index(),
            timer: TimerDirective::Unchanged,
            lifecycle: Vec::new(),
            error: None,
        };

        let playback_event = match command {
            SessionCommand::Start => {
                self.refresh_if_stale();
                Some(PlaybackEvent::StartRequested)
            }
            SessionCommand::Pause => Some(PlaybackEvent::PauseRequested),
            SessionCommand::Resume => Some(PlaybackEvent::ResumeRequested),
            SessionCommand::TogglePause => match self.phase() {
                PlaybackPhase::Running => Some(PlaybackEvent::PauseRequested),
                PlaybackPhase::Paused => Some(PlaybackEvent::ResumeRequested),
                PlaybackPhase::Idle | PlaybackPhase::Completed => {
                    self.refresh_if_stale();
                    Some(PlaybackEvent::StartRequested)
                }
            },
            SessionCommand::Stop => Some(PlaybackEvent::StopRequested),
            SessionCommand::Tick => Some(PlaybackEvent::TickFired),
            SessionCommand::SetContextEnabled(enabled) => {
                info!(enabled, "Context view toggled");
                self.context_enabled = enabled;
                None
            }
            SessionCommand::SetWordsPerMinute(wpm) => {
                let snapped = snap_words_per_minute(wpm);
                if snapped != wpm {
                    debug!(requested = wpm, snapped, "Speed snapped to supported value");
                }
                self.controller.set_words_per_minute(snapped);
                None
            }
        };

        if let Some(playback_event) = playback_event {
            self.dispatch(playback_event, sink, surface, &mut event);
        }

        event.phase = self.phase();
        event.index = self.index();
        event
    }

    fn dispatch(
        &mut self,
        playback_event: PlaybackEvent,
        sink: &mut dyn DisplaySink,
        surface: &mut dyn RenderSurface,
        event: &mut SessionEvent,
    ) {
        match transition(&mut self.controller, playback_event) {
            Ok(actions) => self.perform(actions, sink, surface, event),
            Err(err) if err.is_warning() => {
                warn!(action = event.action, "{err}");
                self.notify(LifecycleEvent::Warning(err.to_string()), sink, event);
                event.error = Some(err);
            }
            Err(err) => {
                debug!(action = event.action, "Command rejected: {err}");
                event.error = Some(err);
            }
        }
    }

    fn perform(
        &mut self,
        actions: Vec<PlaybackAction>,
        sink: &mut dyn DisplaySink,
        surface: &mut dyn RenderSurface,
        event: &mut SessionEvent,
    ) {
        for action in actions {
            match action {
                PlaybackAction::ScheduleTick { interval } => {
                    event.timer = TimerDirective::Schedule(interval);
                }
                PlaybackAction::CancelTick => event.timer = TimerDirective::Cancel,
                PlaybackAction::ClearPositions => {
                    self.resolver.clear();
                    self.viewport.reset();
                    self.stale = true;
                }
                PlaybackAction::Notify(lifecycle) => {
                    if matches!(lifecycle, LifecycleEvent::Completed { .. }) {
                        self.stale = true;
                    }
                    self.notify(lifecycle, sink, event);
                }
                PlaybackAction::Present { index } => {
                    if let Err(err) = self.present(index, sink, surface) {
                        error!(index, "Tick failed: {err:#}");
                        let failed = PlaybackEvent::TickFailed {
                            message: format!("{err:#}"),
                        };
                        if let Ok(recovery) = transition(&mut self.controller, failed) {
                            self.perform(recovery, sink, surface, event);
                        }
                        event.error = Some(ReaderError::Tick {
                            index,
                            message: format!("{err:#}"),
                        });
                    }
                }
            }
        }
    }

    fn notify(&mut self, lifecycle: LifecycleEvent, sink: &mut dyn DisplaySink, event: &mut SessionEvent) {
        if let Err(err) = sink.lifecycle(&lifecycle) {
            warn!(?lifecycle, "Display rejected lifecycle event: {err:#}");
        }
        event.lifecycle.push(lifecycle);
    }

    /// Per-tick effects, in order: word, viewport, progress, advance.
    fn present(
        &mut self,
        index: usize,
        sink: &mut dyn DisplaySink,
        surface: &mut dyn RenderSurface,
    ) -> Result<()> {
        let words = self.document.words.clone();
        let word = words
            .get(index)
            .ok_or_else(|| anyhow!("word {index} is outside the loaded document"))?;

        sink.show_word(word)?;
        if self.context_enabled {
            self.sync_viewport(index, word, surface);
        }
        let (current, total) = self.controller.progress();
        sink.show_progress(current, total)?;
        self.controller.advance();
        trace!(index, word, "Presented word");
        Ok(())
    }

    fn sync_viewport(&mut self, index: usize, word: &str, surface: &mut dyn RenderSurface) {
        let Some(metrics) = surface.metrics() else {
            debug!(index, "No layout metrics; skipping viewport update");
            return;
        };
        let Some(offset) = self.resolver.resolve(index) else {
            return;
        };
        let Some(update) = self.viewport.update(offset, word, &metrics) else {
            return;
        };
        if update.scrolled {
            if let Err(err) = surface.scroll_to(update.scroll_y) {
                warn!(index, "Scroll command failed: {err:#}");
            }
        }
        if let Err(err) = surface.draw_highlight(update.highlight) {
            warn!(index, "Highlight command failed: {err:#}");
        }
    }

    fn refresh_if_stale(&mut self) {
        if !self.stale || !matches!(self.phase(), PlaybackPhase::Idle | PlaybackPhase::Completed) {
            return;
        }
        self.document = Document::from_raw(&self.raw);
        self.resolver = PositionResolver::new(
            self.document.text.clone(),
            self.document.words.clone(),
            self.config.resolver_tuning(),
        );
        self.viewport = ViewportSync::new(
            self.document.text.clone(),
            self.config.scroll_hysteresis,
            self.config.highlight_min_width,
        );
        self.controller.reload(self.document.words.len());
        self.stale = false;
        debug!(words = self.document.words.len(), "Retokenized source for new run");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FontFamily;
    use std::cell::Cell;

    #[derive(Default)]
    struct RecordingSink {
        words: Vec<String>,
        progress: Vec<(usize, usize)>,
        lifecycle: Vec<LifecycleEvent>,
        fail_on_word: Option<usize>,
    }

    impl DisplaySink for RecordingSink {
        fn show_word(&mut self, word: &str) -> Result<()> {
            if self.fail_on_word == Some(self.words.len()) {
                anyhow::bail!("display closed");
            }
            self.words.push(word.to_string());
            Ok(())
        }

        fn show_progress(&mut self, current: usize, total: usize) -> Result<()> {
            self.progress.push((current, total));
            Ok(())
        }

        fn lifecycle(&mut self, event: &LifecycleEvent) -> Result<()> {
            self.lifecycle.push(event.clone());
            Ok(())
        }
    }

    struct RecordingSurface {
        metrics: Option<LayoutMetrics>,
        metric_queries: Cell<usize>,
        scrolls: Vec<f32>,
        highlights: Vec<HighlightRect>,
    }

    impl RecordingSurface {
        fn with_metrics() -> Self {
            Self {
                metrics: Some(LayoutMetrics {
                    font_size: 20.0,
                    font_family: FontFamily::Arial,
                    line_height: 1.0,
                    line_spacing: 0.0,
                    letter_spacing: 0.0,
                    margin_horizontal: 15.0,
                    margin_vertical: 15.0,
                    viewport_height: 100.0,
                }),
                metric_queries: Cell::new(0),
                scrolls: Vec::new(),
                highlights: Vec::new(),
            }
        }

        fn without_metrics() -> Self {
            Self {
                metrics: None,
                ..Self::with_metrics()
            }
        }
    }

    impl RenderSurface for RecordingSurface {
        fn metrics(&self) -> Option<LayoutMetrics> {
            self.metric_queries.set(self.metric_queries.get() + 1);
            self.metrics
        }

        fn scroll_to(&mut self, y: f32) -> Result<()> {
            self.scrolls.push(y);
            Ok(())
        }

        fn draw_highlight(&mut self, rect: HighlightRect) -> Result<()> {
            self.highlights.push(rect);
            Ok(())
        }
    }

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|n| {
                if n % 10 == 9 {
                    format!("w{n}\n")
                } else {
                    format!("w{n} ")
                }
            })
            .collect()
    }

    fn run(
        session: &mut ReaderSession,
        command: SessionCommand,
        sink: &mut RecordingSink,
        surface: &mut RecordingSurface,
    ) -> SessionEvent {
        session.apply_command(command, sink, surface)
    }

    #[test]
    fn plays_reference_text_to_completion() {
        let mut session = ReaderSession::load("Hello   world.\n\nThis is   great.", &AppConfig::default());
        let mut sink = RecordingSink::default();
        let mut surface = RecordingSurface::with_metrics();

        let started = run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        assert_eq!(started.action, "reader_start");
        assert_eq!(
            started.timer,
            TimerDirective::Schedule(Duration::from_millis(240))
        );
        for _ in 0..5 {
            run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        }
        assert_eq!(sink.words, vec!["Hello", "world.", "This", "is", "great."]);
        assert_eq!(sink.progress.last(), Some(&(5, 5)));
        assert_eq!(surface.highlights.len(), 5);
        assert_eq!(session.phase(), PlaybackPhase::Running);

        let done = run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        assert_eq!(done.phase, PlaybackPhase::Completed);
        assert_eq!(done.timer, TimerDirective::Cancel);
        assert_eq!(
            sink.lifecycle,
            vec![
                LifecycleEvent::Started { total: 5 },
                LifecycleEvent::Completed { total: 5 }
            ]
        );
    }

    #[test]
    fn empty_source_warns_and_stays_idle() {
        let mut session = ReaderSession::load("  \n\t", &AppConfig::default());
        let mut sink = RecordingSink::default();
        let mut surface = RecordingSurface::with_metrics();

        let event = run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        assert_eq!(event.error, Some(ReaderError::EmptySource));
        assert_eq!(event.phase, PlaybackPhase::Idle);
        assert_eq!(event.timer, TimerDirective::Unchanged);
        assert!(matches!(sink.lifecycle.as_slice(), [LifecycleEvent::Warning(_)]));
        assert!(sink.lifecycle[0].start_enabled());
    }

    #[test]
    fn stop_mid_run_resets_and_retokenizes() {
        let mut session = ReaderSession::load(numbered_words(500), &AppConfig::default());
        let mut sink = RecordingSink::default();
        let mut surface = RecordingSurface::with_metrics();

        run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        for _ in 0..250 {
            run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        }
        assert_eq!(session.index(), 250);
        assert!(!session.resolver().cache().is_empty());
        let before = session.document().text.clone();

        let stopped = run(&mut session, SessionCommand::Stop, &mut sink, &mut surface);
        assert_eq!(stopped.phase, PlaybackPhase::Idle);
        assert_eq!(stopped.index, 0);
        assert_eq!(stopped.timer, TimerDirective::Cancel);
        assert!(session.resolver().cache().is_empty());

        let again = run(&mut session, SessionCommand::Stop, &mut sink, &mut surface);
        assert_eq!(again.phase, PlaybackPhase::Idle);
        assert_eq!(
            sink.lifecycle.iter().filter(|e| **e == LifecycleEvent::Stopped).count(),
            1
        );

        run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        assert!(!session.document().text.same_instance(&before));
        assert_eq!(session.document().text, before);
        assert_eq!(session.total(), 500);
        run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        assert_eq!(sink.words.last().map(String::as_str), Some("w0"));
    }

    #[test]
    fn failing_display_stops_playback_with_error() {
        let mut session = ReaderSession::load("one two three four", &AppConfig::default());
        let mut sink = RecordingSink {
            fail_on_word: Some(2),
            ..RecordingSink::default()
        };
        let mut surface = RecordingSurface::with_metrics();

        run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        let failed = run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);

        assert_eq!(failed.phase, PlaybackPhase::Idle);
        assert_eq!(failed.timer, TimerDirective::Cancel);
        assert!(matches!(failed.error, Some(ReaderError::Tick { index: 2, .. })));
        match sink.lifecycle.last() {
            Some(LifecycleEvent::Error(message)) => {
                assert!(message.contains("display closed"), "{message}")
            }
            other => panic!("expected error event, got {other:?}"),
        }

        let late = run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        assert_eq!(late.phase, PlaybackPhase::Idle);
        assert_eq!(sink.words, vec!["one", "two"]);
    }

    #[test]
    fn disabled_context_never_touches_surface() {
        let config = AppConfig {
            show_context: false,
            ..AppConfig::default()
        };
        let mut session = ReaderSession::load("alpha beta gamma", &config);
        let mut sink = RecordingSink::default();
        let mut surface = RecordingSurface::with_metrics();

        run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        for _ in 0..3 {
            run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        }
        assert_eq!(sink.words.len(), 3);
        assert_eq!(surface.metric_queries.get(), 0);
        assert!(surface.highlights.is_empty());
        assert!(session.resolver().cache().is_empty());

        run(&mut session, SessionCommand::SetContextEnabled(true), &mut sink, &mut surface);
        assert!(session.context_enabled());
    }

    #[test]
    fn missing_metrics_skip_viewport_but_keep_playing() {
        let mut session = ReaderSession::load("alpha beta", &AppConfig::default());
        let mut sink = RecordingSink::default();
        let mut surface = RecordingSurface::without_metrics();

        run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        assert_eq!(sink.words, vec!["alpha", "beta"]);
        assert_eq!(surface.metric_queries.get(), 2);
        assert!(surface.highlights.is_empty());
    }

    #[test]
    fn long_documents_scroll_with_damping() {
        let mut session = ReaderSession::load(numbered_words(300), &AppConfig::default());
        let mut sink = RecordingSink::default();
        let mut surface = RecordingSurface::with_metrics();

        run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        for _ in 0..300 {
            run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        }
        assert_eq!(surface.highlights.len(), 300);
        assert!(!surface.scrolls.is_empty());
        assert!(surface.scrolls.len() < 300);
        assert!(surface.scrolls.windows(2).all(|pair| pair[1] > pair[0]));
    }

    #[test]
    fn toggle_pause_cycles_through_phases() {
        let mut session = ReaderSession::load("a b c d", &AppConfig::default());
        let mut sink = RecordingSink::default();
        let mut surface = RecordingSurface::with_metrics();

        let event = run(&mut session, SessionCommand::TogglePause, &mut sink, &mut surface);
        assert_eq!(event.phase, PlaybackPhase::Running);
        run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);

        let event = run(&mut session, SessionCommand::TogglePause, &mut sink, &mut surface);
        assert_eq!(event.phase, PlaybackPhase::Paused);
        assert_eq!(event.timer, TimerDirective::Cancel);
        assert_eq!(event.index, 1);

        let event = run(&mut session, SessionCommand::TogglePause, &mut sink, &mut surface);
        assert_eq!(event.phase, PlaybackPhase::Running);
        assert_eq!(event.index, 1);
        assert!(matches!(event.timer, TimerDirective::Schedule(_)));
    }

    #[test]
    fn invalid_commands_report_without_notifying() {
        let mut session = ReaderSession::load("a b", &AppConfig::default());
        let mut sink = RecordingSink::default();
        let mut surface = RecordingSurface::with_metrics();

        let event = run(&mut session, SessionCommand::Resume, &mut sink, &mut surface);
        assert!(matches!(
            event.error,
            Some(ReaderError::InvalidTransition { action: "resume", .. })
        ));
        assert!(sink.lifecycle.is_empty());
    }

    #[test]
    fn speed_change_waits_for_next_start() {
        let mut session = ReaderSession::load("a b c", &AppConfig::default());
        let mut sink = RecordingSink::default();
        let mut surface = RecordingSurface::with_metrics();

        run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        run(&mut session, SessionCommand::SetWordsPerMinute(310), &mut sink, &mut surface);
        assert_eq!(session.words_per_minute(), 300);
        assert_eq!(session.interval(), Duration::from_millis(240));

        run(&mut session, SessionCommand::Stop, &mut sink, &mut surface);
        let event = run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        assert_eq!(event.timer, TimerDirective::Schedule(Duration::from_millis(200)));
    }

    #[test]
    fn start_after_completion_replays_from_first_word() {
        let mut session = ReaderSession::load("x y", &AppConfig::default());
        let mut sink = RecordingSink::default();
        let mut surface = RecordingSurface::with_metrics();

        run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        for _ in 0..3 {
            run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        }
        assert_eq!(session.phase(), PlaybackPhase::Completed);

        let event = run(&mut session, SessionCommand::Start, &mut sink, &mut surface);
        assert_eq!(event.phase, PlaybackPhase::Running);
        run(&mut session, SessionCommand::Tick, &mut sink, &mut surface);
        assert_eq!(sink.words, vec!["x", "y", "x"]);
    }
}
