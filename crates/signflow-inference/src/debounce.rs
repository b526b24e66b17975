//! Repeat suppression for recognized gestures.

use signflow_core::Timestamp;

/// Suppresses the same label when it recurs within `debounce_secs` of the
/// last accepted occurrence. A different label always passes and restarts
/// the interval.
#[derive(Debug, Clone)]
pub struct GestureDebouncer {
    debounce_secs: f64,
    last: Option<(String, Timestamp)>,
}

impl GestureDebouncer {
    pub fn new(debounce_secs: f64) -> Self {
        Self {
            debounce_secs,
            last: None,
        }
    }

    pub fn debounce_secs(&self) -> f64 {
        self.debounce_secs
    }

    /// Returns `true` if the label should be reported
    pub fn accept(&mut self, label: &str, timestamp: Timestamp) -> bool {
        if let Some((last_label, last_time)) = &self.last {
            if last_label == label && timestamp.secs_since(*last_time) < self.debounce_secs {
                return false;
            }
        }

        self.last = Some((label.to_string(), timestamp));
        true
    }

    pub fn last_label(&self) -> Option<&str> {
        self.last.as_ref().map(|(l, _)| l.as_str())
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
