use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ordered, typed outreach flow. List order is execution order along the
/// happy path; condition steps may redirect flow to another step by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: SequenceStatus,
    pub trigger: Trigger,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceStatus {
    Draft,
    Active,
    Paused,
    Completed,
}

/// How contacts enter a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Trigger {
    Manual,
    Automatic { condition: String },
}

/// A single unit of a sequence. The kind is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum StepKind {
    Email {
        #[serde(default)]
        template_id: Option<String>,
    },
    Delay {
        delay: Delay,
    },
    Condition {
        condition: Condition,
    },
}

/// Payload-free discriminant of [`StepKind`], used when creating steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Email,
    Delay,
    Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delay {
    pub value: u32,
    pub unit: DelayUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayUnit {
    Minutes,
    Hours,
    Days,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub condition_type: ConditionType,
    pub value: String,
    #[serde(default)]
    pub target_step_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    EmailOpened,
    EmailClicked,
    Custom,
}

/// Partial update for a step. Payload fields must match the step's kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepPatch {
    #[serde(default)]
    pub name: Option<String>,
    /// `Some(None)` clears the template reference.
    #[serde(default)]
    pub template_id: Option<Option<String>>,
    #[serde(default)]
    pub delay: Option<Delay>,
    #[serde(default)]
    pub condition: Option<Condition>,
}

/// Result of removing a step: the step itself and any branch references
/// that now point nowhere.
#[derive(Debug, Clone)]
pub struct StepRemoval {
    pub step: Step,
    pub dangling: Vec<leadnectar_core::DanglingReference>,
}

/// Per-kind step counts for list views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounts {
    pub email: usize,
    pub delay: usize,
    pub condition: usize,
}

impl Step {
    pub fn step_type(&self) -> StepType {
        match self.kind {
            StepKind::Email { .. } => StepType::Email,
            StepKind::Delay { .. } => StepType::Delay,
            StepKind::Condition { .. } => StepType::Condition,
        }
    }

    /// Branch target of a condition step, if any.
    pub fn target_step_id(&self) -> Option<Uuid> {
        match &self.kind {
            StepKind::Condition { condition } => condition.target_step_id,
            _ => None,
        }
    }
}

impl StepKind {
    /// Default payload for a freshly added step.
    pub fn default_for(step_type: StepType) -> Self {
        match step_type {
            StepType::Email => StepKind::Email { template_id: None },
            StepType::Delay => StepKind::Delay {
                delay: Delay {
                    value: 1,
                    unit: DelayUnit::Days,
                },
            },
            StepType::Condition => StepKind::Condition {
                condition: Condition {
                    condition_type: ConditionType::EmailOpened,
                    value: "true".to_string(),
                    target_step_id: None,
                },
            },
        }
    }
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Email => "email",
            StepType::Delay => "delay",
            StepType::Condition => "condition",
        }
    }

    pub fn default_name(&self) -> &'static str {
        match self {
            StepType::Email => "Envoyer un email",
            StepType::Delay => "Attendre",
            StepType::Condition => "Condition",
        }
    }
}

impl Delay {
    pub fn new(value: u32, unit: DelayUnit) -> Self {
        Self { value, unit }
    }

    pub fn to_duration(&self) -> Duration {
        let value = i64::from(self.value);
        match self.unit {
            DelayUnit::Minutes => Duration::minutes(value),
            DelayUnit::Hours => Duration::hours(value),
            DelayUnit::Days => Duration::days(value),
        }
    }
}

impl Sequence {
    /// A new, empty draft sequence.
    pub fn new(name: impl Into<String>, trigger: Trigger) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            status: SequenceStatus::Draft,
            trigger,
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Refresh `updated_at`, never moving it backwards.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }

    pub fn step(&self, step_id: Uuid) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn position(&self, step_id: Uuid) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    pub fn step_counts(&self) -> StepCounts {
        let mut counts = StepCounts::default();
        for step in &self.steps {
            match step.step_type() {
                StepType::Email => counts.email += 1,
                StepType::Delay => counts.delay += 1,
                StepType::Condition => counts.condition += 1,
            }
        }
        counts
    }

    /// Sum of all delay steps along the happy path.
    pub fn total_delay(&self) -> Duration {
        self.steps
            .iter()
            .filter_map(|s| match &s.kind {
                StepKind::Delay { delay } => Some(delay.to_duration()),
                _ => None,
            })
            .fold(Duration::zero(), |acc, d| acc + d)
    }
}
