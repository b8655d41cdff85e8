//! The playback timeline: one worker thread, one recurring deadline.
//!
//! The worker owns the session and both collaborators. Commands arrive over
//! a channel; while running, the worker waits on that channel until the next
//! tick deadline, so commands are handled strictly between ticks. Extraction
//! runs on its own thread and reports back through the same channel, tagged
//! with a request id so superseded results are dropped. The last opened
//! source is kept, so a start after an interrupted extraction extracts again.

use crate::cancellation::{CancellationToken, is_cancellation};
use crate::config::AppConfig;
use crate::error::ReaderError;
use crate::extract::{Source, extract_text};
use crate::playback::{LifecycleEvent, PlaybackPhase};
use crate::session::{DisplaySink, ReaderSession, RenderSurface, SessionCommand, TimerDirective};
use anyhow::{Context, Result, anyhow};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug)]
enum TimelineCommand {
    Open(Source),
    Session(SessionCommand),
    Extracted {
        request_id: u64,
        result: Result<String, ReaderError>,
    },
    Shutdown,
}

type ExtractionSlot = Arc<Mutex<Option<CancellationToken>>>;

pub struct Timeline;

impl Timeline {
    pub fn spawn(
        config: AppConfig,
        sink: Box<dyn DisplaySink>,
        surface: Box<dyn RenderSurface>,
    ) -> Result<TimelineHandle> {
        let (tx, rx) = mpsc::channel();
        let extraction: ExtractionSlot = Arc::default();
        let worker = Worker::new(config, sink, surface, tx.clone(), extraction.clone());
        let join = thread::Builder::new()
            .name("speed-reader-timeline".into())
            .spawn(move || worker.run(rx))
            .context("Failed to spawn timeline thread")?;
        info!("Timeline started");
        Ok(TimelineHandle {
            stopper: StopHandle { tx, extraction },
            join: Some(join),
        })
    }
}

/// Cloneable stop trigger, usable from any thread or a signal handler.
#[derive(Clone)]
pub struct StopHandle {
    tx: Sender<TimelineCommand>,
    extraction: ExtractionSlot,
}

impl StopHandle {
    /// Cancel any in-flight extraction immediately, then ask the timeline to
    /// stop playback.
    pub fn stop(&self) -> Result<()> {
        self.cancel_extraction();
        self.send(TimelineCommand::Session(SessionCommand::Stop))
    }

    fn cancel_extraction(&self) {
        if let Ok(slot) = self.extraction.lock() {
            if let Some(token) = slot.as_ref() {
                token.cancel();
            }
        }
    }

    fn send(&self, command: TimelineCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow!("timeline is no longer running"))
    }
}

pub struct TimelineHandle {
    stopper: StopHandle,
    join: Option<JoinHandle<()>>,
}

impl TimelineHandle {
    pub fn stopper(&self) -> StopHandle {
        self.stopper.clone()
    }

    /// Extract `source` off the timeline and replace the current session.
    pub fn open(&self, source: Source) -> Result<()> {
        self.stopper.send(TimelineCommand::Open(source))
    }

    /// Start playback; if a source is still extracting, or its extraction was
    /// interrupted, start once it lands.
    pub fn start(&self) -> Result<()> {
        self.session(SessionCommand::Start)
    }

    pub fn pause(&self) -> Result<()> {
        self.session(SessionCommand::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.session(SessionCommand::Resume)
    }

    pub fn toggle_pause(&self) -> Result<()> {
        self.session(SessionCommand::TogglePause)
    }

    pub fn stop(&self) -> Result<()> {
        self.stopper.stop()
    }

    pub fn set_words_per_minute(&self, wpm: u32) -> Result<()> {
        self.session(SessionCommand::SetWordsPerMinute(wpm))
    }

    pub fn set_context_enabled(&self, enabled: bool) -> Result<()> {
        self.session(SessionCommand::SetContextEnabled(enabled))
    }

    /// Stop any active run, end the worker, and wait for it.
    pub fn shutdown(mut self) -> Result<()> {
        self.stopper.cancel_extraction();
        let _ = self.stopper.send(TimelineCommand::Shutdown);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("timeline thread panicked"))?;
        }
        info!("Timeline shut down");
        Ok(())
    }

    fn session(&self, command: SessionCommand) -> Result<()> {
        self.stopper.send(TimelineCommand::Session(command))
    }
}

impl Drop for TimelineHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            let _ = self.stopper.send(TimelineCommand::Shutdown);
        }
    }
}

struct Worker {
    config: AppConfig,
    sink: Box<dyn DisplaySink>,
    surface: Box<dyn RenderSurface>,
    session: Option<ReaderSession>,
    /// Last opened source, kept for re-extraction.
    source: Option<Source>,
    tx: Sender<TimelineCommand>,
    extraction: ExtractionSlot,
    next_request_id: u64,
    active_request: Option<u64>,
    start_when_loaded: bool,
    deadline: Option<Instant>,
    interval: Duration,
}

impl Worker {
    fn new(
        config: AppConfig,
        sink: Box<dyn DisplaySink>,
        surface: Box<dyn RenderSurface>,
        tx: Sender<TimelineCommand>,
        extraction: ExtractionSlot,
    ) -> Self {
        Self {
            config,
            sink,
            surface,
            session: None,
            source: None,
            tx,
            extraction,
            next_request_id: 1,
            active_request: None,
            start_when_loaded: false,
            deadline: None,
            interval: Duration::ZERO,
        }
    }

    fn run(mut self, rx: Receiver<TimelineCommand>) {
        loop {
            let command = match self.deadline {
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match rx.recv_timeout(wait) {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => {
                            self.tick();
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match rx.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
            };
            if !self.handle(command) {
                break;
            }
        }
        self.cancel_extraction();
        debug!("Timeline worker exiting");
    }

    /// Returns false when the worker should exit.
    fn handle(&mut self, command: TimelineCommand) -> bool {
        match command {
            TimelineCommand::Open(source) => self.open(source),
            TimelineCommand::Session(SessionCommand::Start | SessionCommand::TogglePause)
                if self.session.is_none() =>
            {
                self.start_unloaded()
            }
            TimelineCommand::Session(SessionCommand::Stop) => {
                self.cancel_extraction();
                self.active_request = None;
                self.start_when_loaded = false;
                self.apply(SessionCommand::Stop);
            }
            TimelineCommand::Session(command) => self.apply(command),
            TimelineCommand::Extracted { request_id, result } => {
                self.on_extracted(request_id, result)
            }
            TimelineCommand::Shutdown => {
                let active = self
                    .session
                    .as_ref()
                    .is_some_and(|session| matches!(session.phase(), PlaybackPhase::Running | PlaybackPhase::Paused));
                if active {
                    self.apply(SessionCommand::Stop);
                }
                return false;
            }
        }
        true
    }

    /// Start with no session: defer behind a running extraction, extract the
    /// last source again, or warn.
    fn start_unloaded(&mut self) {
        if self.active_request.is_some() {
            debug!("Start requested while extracting; deferring");
            self.start_when_loaded = true;
        } else if let Some(source) = self.source.clone() {
            info!(source = %source.describe(), "Start requested without a session; extracting again");
            self.open(source);
            self.start_when_loaded = self.active_request.is_some();
        } else {
            self.notify(LifecycleEvent::Warning("No source is loaded".into()));
        }
    }

    fn open(&mut self, source: Source) {
        self.cancel_extraction();
        self.apply(SessionCommand::Stop);
        self.session = None;
        self.source = Some(source.clone());

        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1).max(1);
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.extraction.lock() {
            *slot = Some(token.clone());
        }
        self.active_request = Some(request_id);
        info!(request_id, source = %source.describe(), "Scheduling extraction");

        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("speed-reader-extract".into())
            .spawn(move || {
                let result = match extract_text(&source, &token) {
                    _ if token.is_cancelled() => Err(ReaderError::Cancelled),
                    Ok(text) => Ok(text),
                    Err(err) if is_cancellation(&err) => Err(ReaderError::Cancelled),
                    Err(err) => Err(ReaderError::Extraction(format!("{err:#}"))),
                };
                let _ = tx.send(TimelineCommand::Extracted { request_id, result });
            });
        if let Err(err) = spawned {
            self.active_request = None;
            self.fail_extraction(ReaderError::Extraction(format!(
                "could not start extraction thread: {err}"
            )));
        }
    }

    fn on_extracted(&mut self, request_id: u64, result: Result<String, ReaderError>) {
        if self.active_request != Some(request_id) {
            debug!(request_id, active = ?self.active_request, "Discarding stale extraction result");
            return;
        }
        self.active_request = None;
        if let Ok(mut slot) = self.extraction.lock() {
            *slot = None;
        }

        match result {
            Ok(text) => {
                self.session = Some(ReaderSession::load(text, &self.config));
                info!(request_id, "Source ready");
                if std::mem::take(&mut self.start_when_loaded) {
                    self.apply(SessionCommand::Start);
                }
            }
            Err(error @ ReaderError::Cancelled) => {
                info!(request_id, "{error}; no session created");
                self.start_when_loaded = false;
            }
            Err(error) => {
                self.start_when_loaded = false;
                self.fail_extraction(error);
            }
        }
    }

    fn fail_extraction(&mut self, error: ReaderError) {
        warn!("{error}");
        self.notify(LifecycleEvent::Error(error.to_string()));
    }

    fn tick(&mut self) {
        if let Some(deadline) = self.deadline {
            let next = deadline + self.interval;
            let now = Instant::now();
            // Fell more than a whole interval behind: realign instead of bursting.
            self.deadline = Some(if next + self.interval < now {
                now + self.interval
            } else {
                next
            });
        }
        self.apply(SessionCommand::Tick);
    }

    fn apply(&mut self, command: SessionCommand) {
        self.remember(&command);
        let Some(session) = self.session.as_mut() else {
            self.deadline = None;
            return;
        };
        let event = session.apply_command(command, self.sink.as_mut(), self.surface.as_mut());
        match event.timer {
            TimerDirective::Schedule(interval) => {
                self.interval = interval;
                self.deadline = Some(Instant::now() + interval);
            }
            TimerDirective::Cancel => self.deadline = None,
            TimerDirective::Unchanged => {}
        }
    }

    /// Settings also apply to sessions created by later opens.
    fn remember(&mut self, command: &SessionCommand) {
        match command {
            SessionCommand::SetWordsPerMinute(wpm) => {
                self.config.words_per_minute = crate::config::snap_words_per_minute(*wpm)
            }
            SessionCommand::SetContextEnabled(enabled) => self.config.show_context = *enabled,
            _ => {}
        }
    }

    fn notify(&mut self, event: LifecycleEvent) {
        if let Err(err) = self.sink.lifecycle(&event) {
            warn!(?event, "Display rejected lifecycle event: {err:#}");
        }
    }

    fn cancel_extraction(&mut self) {
        if let Ok(mut slot) = self.extraction.lock() {
            if let Some(token) = slot.take() {
                debug!("Cancelling in-flight extraction");
                token.cancel();
            }
        }
    }
}
