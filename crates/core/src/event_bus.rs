//! Mutation announcements. Every successful change to a sequence, step or
//! campaign is reported as a [`DomainEvent`] so a front end can confirm it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::types::{DomainEvent, EventType};

/// Receiver for domain events. Services hold one as `Arc<dyn EventSink>`.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

/// Drops every event. The default for services built without a sink.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: DomainEvent) {}
}

/// Keeps events in arrival order so callers can inspect what was announced.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn count_type(&self, event_type: EventType) -> usize {
        self.lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    // Poisoning is ignored: a push never leaves the vector half-written.
    fn lock(&self) -> MutexGuard<'_, Vec<DomainEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: DomainEvent) {
        self.lock().push(event);
    }
}

/// Stamp a new event for `entity_id` with a fresh id and the current time.
pub fn make_event(
    event_type: EventType,
    entity_id: impl ToString,
    detail: serde_json::Value,
) -> DomainEvent {
    DomainEvent {
        event_id: Uuid::new_v4(),
        event_type,
        entity_id: entity_id.to_string(),
        detail,
        timestamp: Utc::now(),
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_keeps_order_and_counts_by_type() {
        let sink = capture_sink();
        assert_eq!(sink.count(), 0);

        sink.emit(make_event(
            EventType::StepAdded,
            "seq-1",
            serde_json::json!({"step_type": "email"}),
        ));
        sink.emit(make_event(
            EventType::SequenceStatusChanged,
            "seq-1",
            serde_json::json!({"to": "active"}),
        ));

        assert_eq!(sink.count(), 2);
        assert_eq!(sink.count_type(EventType::StepAdded), 1);
        assert_eq!(sink.count_type(EventType::StepRemoved), 0);

        let events = sink.events();
        assert_eq!(events[0].event_type, EventType::StepAdded);
        assert_eq!(events[1].detail["to"], "active");
        assert_ne!(events[0].event_id, events[1].event_id);
    }

    #[test]
    fn test_make_event_stringifies_entity_id() {
        let id = Uuid::new_v4();
        let event = make_event(EventType::CampaignCreated, id, serde_json::Value::Null);
        assert_eq!(event.entity_id, id.to_string());
    }

    #[test]
    fn test_noop_sink_accepts_events() {
        let sink = noop_sink();
        sink.emit(make_event(EventType::StepEdited, "seq-1", serde_json::Value::Null));
    }
}
