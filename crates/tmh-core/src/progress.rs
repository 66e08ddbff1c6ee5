//! Throttled, human-readable transfer progress.
//!
//! Each line is written to stdout with [`PROGRESS_PREFIX`] so a supervising
//! process can tell progress updates apart from ordinary log lines.

use std::{
    io::{self, Stdout, Write},
    time::{Duration, Instant},
};

/// Literal prefix of every progress line.
pub const PROGRESS_PREFIX: &str = "__PROGRESS__";

const BAR_WIDTH: usize = 30;
const BAR_FILLED: char = '█';
const BAR_EMPTY: char = '░';

/// Human byte size, 1024-based, two decimals: `1023.00B`, `1.00KB`, `1.00MB`.
pub fn format_bytes(bytes: f64) -> String {
    let mut size = bytes;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.2}{unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2}TB")
}

pub fn format_speed(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}

/// `42s` under a minute, `3m 7s` otherwise.
pub fn format_eta(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else {
        format!("{}m {}s", seconds / 60, seconds % 60)
    }
}

pub fn percent(current: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    current as f64 / total as f64 * 100.0
}

fn bar(current: u64, total: u64) -> String {
    let filled = if total == 0 {
        0
    } else {
        ((BAR_WIDTH as u128 * current as u128) / total as u128).min(BAR_WIDTH as u128) as usize
    };
    let mut s = String::with_capacity(BAR_WIDTH * 3);
    s.extend(std::iter::repeat(BAR_FILLED).take(filled));
    s.extend(std::iter::repeat(BAR_EMPTY).take(BAR_WIDTH - filled));
    s
}

/// Render one progress line (without the prefix).
pub fn render_line(current: u64, total: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let (speed_str, eta_str) = if secs > 0.0 {
        let speed = current as f64 / secs;
        let eta = if speed > 0.0 && current < total {
            let remaining = (total - current) as f64;
            format!("ETA {}", format_eta((remaining / speed) as u64))
        } else {
            String::new()
        };
        (format_speed(speed), eta)
    } else {
        ("--".to_string(), String::new())
    };

    format!(
        "[{}] {:5.1}% | {:>10}/{:<10} | {:>12} | {:<15}",
        bar(current, total),
        percent(current, total),
        format_bytes(current as f64),
        format_bytes(total as f64),
        speed_str,
        eta_str,
    )
}

/// Per-transfer progress closure state. Created right before a transfer starts.
pub struct ProgressReporter<W: Write> {
    out: W,
    started: Instant,
    last_emit: Instant,
    interval: Duration,
}

impl ProgressReporter<Stdout> {
    pub fn stdout(interval: Duration) -> Self {
        Self::new(io::stdout(), interval)
    }
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(out: W, interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            out,
            started: now,
            last_emit: now,
            interval,
        }
    }

    pub fn update(&mut self, current: u64, total: u64) -> bool {
        self.update_at(Instant::now(), current, total)
    }

    /// Returns whether a line was emitted. Completion (`current == total`)
    /// always emits; an unknown total of 0 is throttled like any other update.
    pub fn update_at(&mut self, now: Instant, current: u64, total: u64) -> bool {
        let complete = current == total;
        if now.saturating_duration_since(self.last_emit) < self.interval && !complete {
            return false;
        }

        let line = render_line(current, total, now.saturating_duration_since(self.started));
        // Best-effort: a closed stdout must not fail the transfer.
        let _ = writeln!(self.out, "{PROGRESS_PREFIX}{line}");
        let _ = self.out.flush();

        self.last_emit = now;
        true
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
