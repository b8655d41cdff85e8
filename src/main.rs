//! Terminal front end for the speed reader.
//!
//! - Parse command-line arguments.
//! - Load configuration from `conf/config.toml` (or `--config`).
//! - Open the source on the timeline and play it word by word.
//! - Read `p` / `s` / `q` from stdin; Ctrl-C stops and quits.

use anyhow::{Context, Result, anyhow, bail};
use serde_json::json;
use speed_reader::config::{
    AppConfig, DEFAULT_FONT_SIZE, DEFAULT_WORDS_PER_MINUTE, load_config,
    parse_font_size_selection, parse_speed_selection,
};
use speed_reader::extract::Source;
use speed_reader::viewport::{HighlightRect, LayoutMetrics};
use speed_reader::{DisplaySink, LifecycleEvent, RenderSurface, Timeline};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: speed-reader [--config PATH] [--wpm N] [--font-size N] [--no-context] [--json] <file-or-url>";

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<PathBuf>,
    wpm: Option<String>,
    font_size: Option<String>,
    no_context: bool,
    json: bool,
    source: String,
}

enum UiEvent {
    Lifecycle(LifecycleEvent),
    Input(String),
    InputClosed,
    Interrupted,
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("conf/config.toml"));
    let config = apply_overrides(load_config(&config_path), &args);

    if env::var_os("RUST_LOG").is_none() {
        set_log_level(reload_handle, config.log_level.as_filter_str());
    }
    info!(
        source = %args.source,
        wpm = config.words_per_minute,
        font_size = config.font_size,
        context = config.show_context,
        level = %config.log_level,
        "Starting speed reader"
    );

    let (ui_tx, ui_rx) = mpsc::channel();
    let sink = TerminalSink {
        json: args.json,
        pending_word: None,
        events: ui_tx.clone(),
    };
    let surface = TerminalSurface {
        json: args.json,
        metrics: LayoutMetrics::from_config(&config),
    };
    let handle = Timeline::spawn(config, Box::new(sink), Box::new(surface))?;

    let stopper = handle.stopper();
    let interrupt_tx = ui_tx.clone();
    ctrlc::set_handler(move || {
        let _ = stopper.stop();
        let _ = interrupt_tx.send(UiEvent::Interrupted);
    })
    .context("Failed to install Ctrl-C handler")?;

    spawn_stdin_reader(ui_tx)?;

    handle.open(Source::from_arg(&args.source))?;
    handle.start()?;

    for event in ui_rx {
        match event {
            UiEvent::Lifecycle(LifecycleEvent::Completed { total }) => {
                info!(total, "Finished reading");
                break;
            }
            UiEvent::Lifecycle(LifecycleEvent::Warning(_) | LifecycleEvent::Error(_)) => break,
            UiEvent::Lifecycle(_) => {}
            UiEvent::Input(line) => match line.trim() {
                "p" => handle.toggle_pause()?,
                "s" => handle.stop()?,
                "q" => break,
                "" => {}
                other => eprintln!("Unknown command {other:?}; use p (pause/resume), s (stop), q (quit)"),
            },
            UiEvent::InputClosed => debug!("stdin closed; controls disabled"),
            UiEvent::Interrupted => {
                info!("Interrupted");
                break;
            }
        }
    }

    handle.shutdown()
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut source = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or_else(|| anyhow!("--config needs a path\n{USAGE}"))?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            "--wpm" => {
                parsed.wpm = Some(args.next().ok_or_else(|| anyhow!("--wpm needs a value\n{USAGE}"))?);
            }
            "--font-size" => {
                parsed.font_size = Some(
                    args.next()
                        .ok_or_else(|| anyhow!("--font-size needs a value\n{USAGE}"))?,
                );
            }
            "--no-context" => parsed.no_context = true,
            "--json" => parsed.json = true,
            "-h" | "--help" => bail!("{USAGE}"),
            flag if flag.starts_with("--") => bail!("Unknown option {flag}\n{USAGE}"),
            other if source.is_none() => source = Some(other.to_string()),
            _ => bail!("Only one source may be given\n{USAGE}"),
        }
    }
    parsed.source = source.ok_or_else(|| anyhow!("{USAGE}"))?;
    Ok(parsed)
}

/// Command-line selections win over the config file; unparseable ones fall
/// back to the documented defaults.
fn apply_overrides(mut config: AppConfig, args: &CliArgs) -> AppConfig {
    if let Some(label) = &args.wpm {
        config.words_per_minute = parse_speed_selection(label).unwrap_or_else(|err| {
            warn!("{err}; using {DEFAULT_WORDS_PER_MINUTE} WPM");
            DEFAULT_WORDS_PER_MINUTE
        });
    }
    if let Some(label) = &args.font_size {
        config.font_size = parse_font_size_selection(label).unwrap_or_else(|err| {
            warn!("{err}; using font size {DEFAULT_FONT_SIZE}");
            DEFAULT_FONT_SIZE
        });
    }
    if args.no_context {
        config.show_context = false;
    }
    config.sanitized()
}

fn spawn_stdin_reader(events: Sender<UiEvent>) -> Result<()> {
    thread::Builder::new()
        .name("speed-reader-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if events.send(UiEvent::Input(line)).is_err() {
                    return;
                }
            }
            let _ = events.send(UiEvent::InputClosed);
        })
        .context("Failed to spawn stdin reader")?;
    Ok(())
}

struct TerminalSink {
    json: bool,
    pending_word: Option<String>,
    events: Sender<UiEvent>,
}

impl DisplaySink for TerminalSink {
    fn show_word(&mut self, word: &str) -> Result<()> {
        if self.json {
            write_json_line(&json!({ "type": "word", "word": word }))
        } else {
            self.pending_word = Some(word.to_string());
            Ok(())
        }
    }

    fn show_progress(&mut self, current: usize, total: usize) -> Result<()> {
        if self.json {
            return write_json_line(&json!({ "type": "progress", "current": current, "total": total }));
        }
        let word = self.pending_word.take().unwrap_or_default();
        let mut out = io::stdout().lock();
        writeln!(out, "[{current:>6}/{total}] {word}").context("Failed to write word")?;
        out.flush().context("Failed to flush stdout")
    }

    fn lifecycle(&mut self, event: &LifecycleEvent) -> Result<()> {
        let _ = self.events.send(UiEvent::Lifecycle(event.clone()));
        if self.json {
            return write_json_line(&json!({ "type": "lifecycle", "lifecycle": event }));
        }
        match event {
            LifecycleEvent::Started { total } => eprintln!("Reading {total} words (p: pause, s: stop, q: quit)"),
            LifecycleEvent::Paused { index } => eprintln!("Paused at word {}", index + 1),
            LifecycleEvent::Resumed { index } => eprintln!("Resumed at word {}", index + 1),
            LifecycleEvent::Stopped => eprintln!("Stopped (p to start again)"),
            LifecycleEvent::Completed { total } => eprintln!("Done: {total} words"),
            LifecycleEvent::Warning(message) => eprintln!("Warning: {message}"),
            LifecycleEvent::Error(message) => eprintln!("Error: {message}"),
        }
        Ok(())
    }
}

/// Layout estimate for an imaginary context pane; in JSON mode its commands
/// are emitted for an external renderer.
struct TerminalSurface {
    json: bool,
    metrics: LayoutMetrics,
}

impl RenderSurface for TerminalSurface {
    fn metrics(&self) -> Option<LayoutMetrics> {
        Some(self.metrics)
    }

    fn scroll_to(&mut self, y: f32) -> Result<()> {
        if self.json {
            return write_json_line(&json!({ "type": "scroll", "y": y }));
        }
        debug!(y, "Context scroll");
        Ok(())
    }

    fn draw_highlight(&mut self, rect: HighlightRect) -> Result<()> {
        if self.json {
            return write_json_line(&json!({
                "type": "highlight",
                "x": rect.x,
                "y": rect.y,
                "width": rect.width,
                "height": rect.height,
            }));
        }
        Ok(())
    }
}

fn write_json_line(value: &serde_json::Value) -> Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer(&mut out, value).context("Failed to encode event")?;
    writeln!(out).context("Failed to write event")?;
    out.flush().context("Failed to flush stdout")
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    debug!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        debug!(%level, "Applied log level from config");
    }
}
