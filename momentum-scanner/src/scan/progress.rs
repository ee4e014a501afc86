//! Scan progress events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event kind: intermediate progress or the final completion notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    Progress,
    Complete,
}

/// One progress notification from a running scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: ProgressKind,
    pub message: String,
    /// 0-100
    pub percent: u8,
}

impl ProgressEvent {
    pub fn progress(percent: u8, message: impl Into<String>) -> Self {
        Self {
            kind: ProgressKind::Progress,
            message: message.into(),
            percent: percent.min(100),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            kind: ProgressKind::Complete,
            message: message.into(),
            percent: 100,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}%] {}", self.percent, self.message)
    }
}

/// Receives progress events. Closures taking a `&ProgressEvent` qualify.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: &ProgressEvent) {}
}

/// Percent reported while checking the `index`-th of `total` VCP candidates.
pub fn vcp_phase_percent(index: usize, total: usize) -> u8 {
    let fraction = index as f64 / total.max(1) as f64;
    60 + (fraction * 35.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink_collects_events() {
        let seen = Mutex::new(Vec::new());
        let sink = |e: &ProgressEvent| seen.lock().unwrap().push(e.percent);
        sink.emit(&ProgressEvent::progress(5, "Fetching"));
        sink.emit(&ProgressEvent::complete("Done"));
        assert_eq!(*seen.lock().unwrap(), vec![5, 100]);
    }

    #[test]
    fn test_vcp_phase_percent() {
        assert_eq!(vcp_phase_percent(0, 20), 60);
        assert_eq!(vcp_phase_percent(10, 20), 77);
        assert_eq!(vcp_phase_percent(19, 20), 93);
        assert_eq!(vcp_phase_percent(0, 0), 60);
    }

    #[test]
    fn test_event_wire_shape() {
        let json = serde_json::to_value(ProgressEvent::complete("Scan complete")).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["percent"], 100);
        assert_eq!(ProgressEvent::progress(120, "x").percent, 100);
        assert_eq!(ProgressEvent::progress(20, "Received").to_string(), "[20%] Received");
    }
}
