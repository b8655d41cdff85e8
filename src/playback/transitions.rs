use super::state::{LifecycleEvent, PlaybackController, PlaybackPhase, interval_for};
use crate::error::ReaderError;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    StartRequested,
    PauseRequested,
    ResumeRequested,
    StopRequested,
    TickFired,
    TickFailed { message: String },
}

/// Effects for the session to carry out, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackAction {
    ScheduleTick { interval: Duration },
    CancelTick,
    /// Run the per-tick effects for this word, then advance.
    Present { index: usize },
    ClearPositions,
    Notify(LifecycleEvent),
}

pub fn transition(
    controller: &mut PlaybackController,
    event: PlaybackEvent,
) -> Result<Vec<PlaybackAction>, ReaderError> {
    match event {
        PlaybackEvent::StartRequested => on_start(controller),
        PlaybackEvent::PauseRequested => on_pause(controller),
        PlaybackEvent::ResumeRequested => on_resume(controller),
        PlaybackEvent::StopRequested => Ok(on_stop(controller)),
        PlaybackEvent::TickFired => Ok(on_tick(controller)),
        PlaybackEvent::TickFailed { message } => Ok(on_tick_failed(controller, message)),
    }
}

fn on_start(controller: &mut PlaybackController) -> Result<Vec<PlaybackAction>, ReaderError> {
    match controller.phase {
        PlaybackPhase::Running => {
            debug!(index = controller.index, "Start ignored; already running");
            Ok(Vec::new())
        }
        PlaybackPhase::Paused => on_resume(controller),
        PlaybackPhase::Idle | PlaybackPhase::Completed => {
            if controller.total == 0 {
                controller.phase = PlaybackPhase::Idle;
                return Err(ReaderError::EmptySource);
            }
            controller.index = 0;
            controller.interval = interval_for(controller.words_per_minute);
            controller.phase = PlaybackPhase::Running;
            info!(
                total = controller.total,
                wpm = controller.words_per_minute,
                interval_ms = controller.interval.as_millis() as u64,
                "Playback started"
            );
            Ok(vec![
                PlaybackAction::ScheduleTick {
                    interval: controller.interval,
                },
                PlaybackAction::Notify(LifecycleEvent::Started {
                    total: controller.total,
                }),
            ])
        }
    }
}

fn on_pause(controller: &mut PlaybackController) -> Result<Vec<PlaybackAction>, ReaderError> {
    if controller.phase != PlaybackPhase::Running {
        return Err(ReaderError::InvalidTransition {
            action: "pause",
            phase: controller.phase,
        });
    }
    controller.phase = PlaybackPhase::Paused;
    info!(index = controller.index, "Playback paused");
    Ok(vec![
        PlaybackAction::CancelTick,
        PlaybackAction::Notify(LifecycleEvent::Paused {
            index: controller.index,
        }),
    ])
}

fn on_resume(controller: &mut PlaybackController) -> Result<Vec<PlaybackAction>, ReaderError> {
    if controller.phase != PlaybackPhase::Paused {
        return Err(ReaderError::InvalidTransition {
            action: "resume",
            phase: controller.phase,
        });
    }
    controller.phase = PlaybackPhase::Running;
    info!(index = controller.index, "Playback resumed");
    Ok(vec![
        PlaybackAction::ScheduleTick {
            interval: controller.interval,
        },
        PlaybackAction::Notify(LifecycleEvent::Resumed {
            index: controller.index,
        }),
    ])
}

fn on_stop(controller: &mut PlaybackController) -> Vec<PlaybackAction> {
    let previous = controller.phase;
    controller.phase = PlaybackPhase::Idle;
    controller.index = 0;

    let mut actions = vec![PlaybackAction::CancelTick, PlaybackAction::ClearPositions];
    if previous != PlaybackPhase::Idle {
        info!(from = %previous, "Playback stopped");
        actions.push(PlaybackAction::Notify(LifecycleEvent::Stopped));
    } else {
        debug!("Stop while idle");
    }
    actions
}

fn on_tick(controller: &mut PlaybackController) -> Vec<PlaybackAction> {
    if controller.phase != PlaybackPhase::Running {
        debug!(phase = %controller.phase, "Dropping tick outside a run");
        return Vec::new();
    }
    if controller.index >= controller.total {
        controller.phase = PlaybackPhase::Completed;
        info!(total = controller.total, "Playback completed");
        return vec![
            PlaybackAction::CancelTick,
            PlaybackAction::Notify(LifecycleEvent::Completed {
                total: controller.total,
            }),
        ];
    }
    vec![PlaybackAction::Present {
        index: controller.index,
    }]
}

fn on_tick_failed(controller: &mut PlaybackController, message: String) -> Vec<PlaybackAction> {
    let error = ReaderError::Tick {
        index: controller.index,
        message,
    };
    warn!(phase = %controller.phase, "Tick failed; returning to idle: {error}");
    controller.phase = PlaybackPhase::Idle;
    controller.index = 0;
    vec![
        PlaybackAction::CancelTick,
        PlaybackAction::ClearPositions,
        PlaybackAction::Notify(LifecycleEvent::Error(error.to_string())),
    ]
}
