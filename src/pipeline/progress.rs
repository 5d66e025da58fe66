use std::time::{Duration, Instant};

/// Caller-supplied progress callback, receiving percentages in `[0, 100]`.
pub type ProgressFn = Box<dyn FnMut(f64) + Send>;

/// Highest percentage reported before finalization completes.
pub const MAX_PENDING_PERCENT: f64 = 99.0;

/// Throttled, monotonic progress forwarding.
///
/// Values are clamped to `[0, 99]` and never decrease. At most one call is forwarded per
/// `interval`; [`ProgressReporter::finish`] always forwards exactly `100`.
pub struct ProgressReporter {
    callback: Option<ProgressFn>,
    interval: Duration,
    current: f64,
    last_reported: Option<f64>,
    last_emit: Option<Instant>,
}

impl ProgressReporter {
    /// Wrap `callback`; `None` makes every update a no-op.
    pub fn new(callback: Option<ProgressFn>, interval: Duration) -> Self {
        Self {
            callback,
            interval,
            current: 0.0,
            last_reported: None,
            last_emit: None,
        }
    }

    /// Latest computed percentage (including values held back by throttling).
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Record `position / duration`. Unknown or zero durations are ignored.
    pub fn update(&mut self, position_sec: f64, duration_sec: f64) {
        if duration_sec.is_nan() || duration_sec <= 0.0 || !position_sec.is_finite() {
            return;
        }
        let pct = (position_sec * 100.0 / duration_sec).clamp(0.0, MAX_PENDING_PERCENT);
        self.current = self.current.max(pct);

        let due = self
            .last_emit
            .is_none_or(|at| at.elapsed() >= self.interval);
        let advanced = self.last_reported.is_none_or(|last| self.current > last);
        if due && advanced {
            self.emit(self.current);
        }
    }

    /// Report completion.
    pub fn finish(&mut self) {
        self.current = 100.0;
        self.emit(100.0);
    }

    fn emit(&mut self, pct: f64) {
        self.last_reported = Some(pct);
        self.last_emit = Some(Instant::now());
        if let Some(cb) = self.callback.as_mut() {
            cb(pct);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/progress.rs"]
mod tests;
