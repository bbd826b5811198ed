use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event emitted after a successful mutation. The UI turns these into
/// confirmation toasts; other sinks may forward them to activity feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub entity_id: String,
    pub detail: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Sequence events
    SequenceCreated,
    SequenceDeleted,
    SequenceStatusChanged,
    StepAdded,
    StepEdited,
    StepRemoved,
    StepsReordered,
    // Campaign events
    CampaignCreated,
    CampaignStatusChanged,
    CampaignMetricsRecorded,
    CampaignProgressUpdated,
    // Template events
    TemplateRendered,
}

// ─── Template Management ────────────────────────────────────────────────

/// Reusable message body referenced by email steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub category: TemplateCategory,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    Prospecting,
    FollowUp,
    Nurturing,
    Onboarding,
    #[serde(other)]
    Other,
}
