//! Display collaborator for the radar.
//! The controller renders views and reports events; `DisplayState` keeps the
//! latest of each for the HTTP API and mirrors events into the log.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::config::EVENT_LOG_CAPACITY;
use crate::types::{now_ms, LoggedEvent, RadarEvent, RankedView, Severity};

pub trait RadarDisplay: Send + Sync {
    fn render(&self, view: &RankedView);
    fn report(&self, event: RadarEvent);
}

pub struct DisplayState {
    latest: Mutex<Option<RankedView>>,
    events: Mutex<VecDeque<LoggedEvent>>,
    capacity: usize,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            latest: Mutex::new(None),
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// Most recently rendered view, if any.
    pub fn latest_view(&self) -> Option<RankedView> {
        self.latest.lock().ok().and_then(|v| v.clone())
    }

    /// Newest first.
    pub fn recent_events(&self, limit: usize) -> Vec<LoggedEvent> {
        let Ok(events) = self.events.lock() else {
            return Vec::new();
        };
        events.iter().rev().take(limit).cloned().collect()
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::new()
    }
}

impl RadarDisplay for DisplayState {
    fn render(&self, view: &RankedView) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(view.clone());
        }
    }

    fn report(&self, event: RadarEvent) {
        let severity = event.severity();
        let message = event.to_string();
        match severity {
            Severity::Info => info!(event = "RADAR_EVENT", "{message}"),
            Severity::Warn => warn!(event = "RADAR_EVENT", "{message}"),
        }

        if let Ok(mut events) = self.events.lock() {
            if events.len() >= self.capacity {
                events.pop_front();
            }
            events.push_back(LoggedEvent { at: now_ms(), severity, message, event });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_latest_view() {
        let d = DisplayState::new();
        assert!(d.latest_view().is_none());
        d.render(&RankedView { generated_at: 1, ..Default::default() });
        d.render(&RankedView { generated_at: 2, ..Default::default() });
        assert_eq!(d.latest_view().unwrap().generated_at, 2);
    }

    #[test]
    fn event_log_is_bounded_and_newest_first() {
        let d = DisplayState::with_capacity(2);
        d.report(RadarEvent::NoCandidates);
        d.report(RadarEvent::Cleared);
        d.report(RadarEvent::PersistFailed { error: "disk full".into() });

        let events = d.recent_events(10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].severity, Severity::Warn);
        assert_eq!(events[0].message, "CACHE: save failed: disk full");
        assert_eq!(events[1].event, RadarEvent::Cleared);
        assert_eq!(d.recent_events(1).len(), 1);
    }
}
