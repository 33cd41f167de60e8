//! Keyboard operator surface.
//!
//! Arrow keys jog while held: Up/Down fast forward/reverse, Right/Left slow
//! forward/reverse. Terminals that report key releases stop on release; others
//! stop once auto-repeat has been silent for the release timeout.
//!
//! z re-zero, s/e start/end test, r reset graph, m toggle mode, c/t
//! compression/tension, x export, space stop, q or Esc quit.
//! Text entry: f <travel> query force, a <mode 1-4> [xmin xmax ymin ymax] axis,
//! o <dir> export directory; Enter submits, Esc cancels.

use crossbeam_channel as xch;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{execute, terminal};
use rig_core::{AxisMode, Direction, JogCommand, OperatorEvent, Signal, SpeedTier, TestMode};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Longest silence between auto-repeats before a held arrow counts as released.
pub const RELEASE_AFTER: Duration = Duration::from_millis(750);
const POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Query,
    Axis,
    ExportDir,
}

#[derive(Debug)]
pub struct KeyMap {
    held: Option<(KeyCode, Instant)>,
    entry: Option<(EntryKind, String)>,
    release_after: Duration,
}

fn jog_for(code: KeyCode) -> Option<(Direction, SpeedTier)> {
    match code {
        KeyCode::Up => Some((Direction::Forward, SpeedTier::Fast)),
        KeyCode::Down => Some((Direction::Reverse, SpeedTier::Fast)),
        KeyCode::Right => Some((Direction::Forward, SpeedTier::Slow)),
        KeyCode::Left => Some((Direction::Reverse, SpeedTier::Slow)),
        _ => None,
    }
}

fn axis_event(text: &str) -> Option<OperatorEvent> {
    let mut parts = text.split_whitespace();
    let mode = parts
        .next()
        .and_then(|m| m.parse::<u8>().ok())
        .and_then(AxisMode::from_index)?;
    let mut bounds: [String; 4] = Default::default();
    for (slot, v) in bounds.iter_mut().zip(parts) {
        *slot = v.to_string();
    }
    Some(OperatorEvent::ConfigureAxis { mode, bounds })
}

impl KeyMap {
    pub fn new(release_after: Duration) -> Self {
        Self {
            held: None,
            entry: None,
            release_after,
        }
    }

    /// Text being typed, for the prompt line.
    pub fn prompt(&self) -> Option<&str> {
        self.entry.as_ref().map(|(_, s)| s.as_str())
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> Vec<OperatorEvent> {
        if key.kind == KeyEventKind::Release {
            return match self.held {
                Some((code, _)) if code == key.code => {
                    self.held = None;
                    vec![OperatorEvent::Jog(JogCommand::Stop)]
                }
                _ => Vec::new(),
            };
        }
        // Raw mode swallows SIGINT.
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![OperatorEvent::Quit];
        }
        if let Some((kind, mut text)) = self.entry.take() {
            return match key.code {
                KeyCode::Enter => Self::submit(kind, &text).into_iter().collect(),
                KeyCode::Esc => Vec::new(),
                KeyCode::Backspace => {
                    text.pop();
                    self.entry = Some((kind, text));
                    Vec::new()
                }
                KeyCode::Char(c) => {
                    text.push(c);
                    self.entry = Some((kind, text));
                    Vec::new()
                }
                _ => {
                    self.entry = Some((kind, text));
                    Vec::new()
                }
            };
        }
        if let Some((direction, tier)) = jog_for(key.code) {
            let changed = self.held.is_none_or(|(code, _)| code != key.code);
            self.held = Some((key.code, now));
            return if changed {
                vec![OperatorEvent::Jog(JogCommand::Move(direction, tier))]
            } else {
                Vec::new()
            };
        }
        if key.kind != KeyEventKind::Press {
            return Vec::new();
        }
        let ev = match key.code {
            KeyCode::Char(' ') => {
                self.held = None;
                OperatorEvent::Jog(JogCommand::Stop)
            }
            KeyCode::Char('z') => OperatorEvent::Rezero,
            KeyCode::Char('s') => OperatorEvent::StartTest,
            KeyCode::Char('e') => OperatorEvent::EndTest,
            KeyCode::Char('r') => OperatorEvent::ResetGraph,
            KeyCode::Char('m') => OperatorEvent::ToggleTestMode,
            KeyCode::Char('c') => OperatorEvent::SetTestMode(TestMode::Compression),
            KeyCode::Char('t') => OperatorEvent::SetTestMode(TestMode::Tension),
            KeyCode::Char('x') => OperatorEvent::Export,
            KeyCode::Char('q') | KeyCode::Esc => OperatorEvent::Quit,
            KeyCode::Char('f') => return self.begin(EntryKind::Query),
            KeyCode::Char('a') => return self.begin(EntryKind::Axis),
            KeyCode::Char('o') => return self.begin(EntryKind::ExportDir),
            _ => return Vec::new(),
        };
        vec![ev]
    }

    fn begin(&mut self, kind: EntryKind) -> Vec<OperatorEvent> {
        self.entry = Some((kind, String::new()));
        Vec::new()
    }

    fn submit(kind: EntryKind, text: &str) -> Option<OperatorEvent> {
        match kind {
            EntryKind::Query => Some(OperatorEvent::QueryForceAtTravel(text.to_string())),
            EntryKind::Axis => {
                let ev = axis_event(text);
                if ev.is_none() {
                    tracing::warn!(input = text, "axis mode must be 1-4");
                }
                ev
            }
            EntryKind::ExportDir => {
                let t = text.trim();
                (!t.is_empty()).then(|| OperatorEvent::SetExportDir(PathBuf::from(t)))
            }
        }
    }

    /// Synthesize a release when auto-repeat for the held arrow has gone quiet.
    pub fn on_idle(&mut self, now: Instant) -> Option<OperatorEvent> {
        let (_, seen) = self.held?;
        if now.saturating_duration_since(seen) >= self.release_after {
            self.held = None;
            return Some(OperatorEvent::Jog(JogCommand::Stop));
        }
        None
    }
}

/// Raw terminal mode for the lifetime of the guard.
struct RawMode {
    enhanced: bool,
}

impl RawMode {
    fn enable() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false)
            && execute!(
                std::io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .is_ok();
        Ok(Self { enhanced })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
    }
}

/// Background keyboard reader feeding operator events into a channel.
pub struct KeyReader {
    stop: Signal,
    join_handle: Option<JoinHandle<()>>,
}

impl KeyReader {
    pub fn spawn(tx: xch::Sender<OperatorEvent>, shutdown: Signal) -> eyre::Result<Self> {
        let raw = RawMode::enable()?;
        let stop = Signal::new();
        let stop_thread = stop.clone();
        let join_handle = std::thread::Builder::new()
            .name("keys".into())
            .spawn(move || {
                let _raw = raw;
                read_loop(&tx, &shutdown, &stop_thread);
            })?;
        Ok(Self {
            stop,
            join_handle: Some(join_handle),
        })
    }
}

fn read_loop(tx: &xch::Sender<OperatorEvent>, shutdown: &Signal, stop: &Signal) {
    let mut map = KeyMap::new(RELEASE_AFTER);
    while !shutdown.is_raised() && !stop.is_raised() {
        let mut out = Vec::new();
        match event::poll(POLL) {
            Ok(true) => match event::read() {
                Ok(Event::Key(k)) => out = map.on_key(k, Instant::now()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "keyboard read failed");
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "keyboard poll failed");
                break;
            }
        }
        out.extend(map.on_idle(Instant::now()));
        for ev in out {
            if tx.send(ev).is_err() {
                return;
            }
        }
    }
}

impl Drop for KeyReader {
    fn drop(&mut self) {
        self.stop.raise();
        if let Some(h) = self.join_handle.take()
            && h.join().is_err()
        {
            tracing::warn!("keyboard thread panicked");
        }
    }
}
