//! Terminal presentation: a refreshed status line, or JSON lines with `--json`.

use rig_core::{Direction, ForceQuery, Frame, Notice, Presenter, TestMode};
use serde_json::json;
use std::io::Write;

pub struct ConsolePresenter<W: Write> {
    out: W,
    json: bool,
    /// Print every n-th frame.
    every: usize,
    frames: usize,
    status_shown: bool,
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W, json: bool, every: usize) -> Self {
        Self {
            out,
            json,
            every: every.max(1),
            frames: 0,
            status_shown: false,
        }
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::debug!(error = %e, "console write failed");
        }
    }

    /// Full line. Raw terminal mode needs an explicit carriage return.
    fn emit(&mut self, line: &str) {
        let lead = if std::mem::take(&mut self.status_shown) { "\r\n" } else { "" };
        self.write(&format!("{lead}{line}\r\n"));
    }

    /// Redraw the status line in place.
    fn refresh(&mut self, line: &str) {
        self.status_shown = true;
        self.write(&format!("\r{line}\x1b[K"));
    }
}

fn mode_name(m: TestMode) -> &'static str {
    match m {
        TestMode::Compression => "compression",
        TestMode::Tension => "tension",
    }
}

fn direction_name(d: Direction) -> &'static str {
    match d {
        Direction::Forward => "forward",
        Direction::Reverse => "reverse",
        Direction::Stop => "stop",
    }
}

pub fn frame_json(f: &Frame<'_>) -> serde_json::Value {
    let r = f.reading;
    json!({
        "event": "frame",
        "force": r.abs_force,
        "travel": r.abs_travel,
        "rel_force": r.rel_force,
        "rel_travel": r.rel_travel,
        "volts": r.volts,
        "mode": mode_name(f.mode),
        "test_active": f.test_active,
        "direction": direction_name(f.motion.direction),
        "frequency_hz": f.motion.frequency_hz,
        "points": f.graph.len(),
        "axis_mode": f.axis_mode.index(),
        "x": [f.bounds.x.0, f.bounds.x.1],
        "y": [f.bounds.y.0, f.bounds.y.1],
    })
}

pub fn notice_json(n: &Notice) -> serde_json::Value {
    match n {
        Notice::Info(m) => json!({ "event": "notice", "level": "info", "message": m }),
        Notice::Warning(m) => json!({ "event": "notice", "level": "warning", "message": m }),
        Notice::Error(m) => json!({ "event": "notice", "level": "error", "message": m }),
        Notice::ForceAtTravel { target, result } => {
            let (status, force) = match result {
                ForceQuery::Force(f) => ("ok", Some(*f)),
                ForceQuery::NoData => ("no_data", None),
                ForceQuery::InvalidInput => ("invalid_input", None),
            };
            json!({ "event": "force_at_travel", "target": target, "status": status, "force": force })
        }
        Notice::Exported(p) => json!({ "event": "exported", "path": p.display().to_string() }),
    }
}

fn notice_text(n: &Notice) -> String {
    match n {
        Notice::Info(m) => m.clone(),
        Notice::Warning(m) => format!("warning: {m}"),
        Notice::Error(m) => format!("error: {m}"),
        Notice::ForceAtTravel { target, result } => match result {
            ForceQuery::Force(f) => format!("force at travel {target} in: {f:.2} lb"),
            ForceQuery::NoData => "no data available yet".to_string(),
            ForceQuery::InvalidInput => format!("'{target}' is not a valid travel value"),
        },
        Notice::Exported(p) => format!("saved {}", p.display()),
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn frame(&mut self, frame: &Frame<'_>) {
        self.frames += 1;
        if (self.frames - 1) % self.every != 0 {
            return;
        }
        if self.json {
            let line = frame_json(frame).to_string();
            self.emit(&line);
            return;
        }
        let r = frame.reading;
        let line = format!(
            "force {:>9.2} lb  travel {:>8.4} in  | rel {:>9.2} lb {:>8.4} in  | {} {}{}",
            r.abs_force,
            r.abs_travel,
            r.rel_force,
            r.rel_travel,
            mode_name(frame.mode),
            direction_name(frame.motion.direction),
            if frame.test_active { "  [REC]" } else { "" },
        );
        self.refresh(&line);
    }

    fn notice(&mut self, notice: &Notice) {
        let line = if self.json {
            notice_json(notice).to_string()
        } else {
            notice_text(notice)
        };
        self.emit(&line);
    }
}
