use crate::CaptureError;
use metrics::{Counter, Histogram};
use std::time::Duration;

/// Capture pipeline counters. Handles are noop-backed until a recorder is
/// installed.
pub struct Metrics {
    pub captures_completed: Counter,
    pub captures_failed: Counter,
    pub capture_duration: Histogram,
    pub redirect_loops: Counter,
    pub timeout_errors: Counter,
    pub session_teardowns: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            captures_completed: Counter::noop(),
            captures_failed: Counter::noop(),
            capture_duration: Histogram::noop(),
            redirect_loops: Counter::noop(),
            timeout_errors: Counter::noop(),
            session_teardowns: Counter::noop(),
        }
    }

    pub fn record_capture(&self, duration: Duration, success: bool) {
        if success {
            self.captures_completed.increment(1);
        } else {
            self.captures_failed.increment(1);
        }
        self.capture_duration.record(duration.as_secs_f64());
    }

    pub fn record_error(&self, error: &CaptureError) {
        match error {
            CaptureError::RedirectLoop => self.redirect_loops.increment(1),
            CaptureError::NavigationTimeout | CaptureError::CaptureTimeout(_) => {
                self.timeout_errors.increment(1)
            }
            _ => {}
        }
    }

    pub fn record_session_teardown(&self) {
        self.session_teardowns.increment(1);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
