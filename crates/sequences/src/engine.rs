use std::sync::Arc;

use dashmap::DashMap;
use leadnectar_core::config::SequenceConfig;
use leadnectar_core::event_bus::{make_event, EventSink};
use leadnectar_core::types::EventType;
use leadnectar_core::{DanglingReference, NectarError, NectarResult};
use leadnectar_store::{Filter, RecordStore, Table};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state_machine::{SequenceEvent, SequenceStateMachine};
use crate::types::{
    Condition, ConditionType, Delay, DelayUnit, Sequence, SequenceStatus, Step, StepPatch,
    StepRemoval, StepType, Trigger,
};
use crate::validation::{validate_payloads, validate_sequence, validate_trigger};

/// Owns the sequences of one tenant. Each mutation runs against a working
/// copy, is written to the store as one record update, and is committed to
/// the in-memory map only once the write succeeds.
#[derive(Clone)]
pub struct SequenceEngine {
    sequences: Arc<DashMap<Uuid, Sequence>>,
    store: Arc<dyn RecordStore>,
    state_machine: Arc<SequenceStateMachine>,
    event_sink: Arc<dyn EventSink>,
    config: SequenceConfig,
}

impl std::fmt::Debug for SequenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceEngine")
            .field("sequences", &self.sequences.len())
            .field("config", &self.config)
            .finish()
    }
}

impl SequenceEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            sequences: Arc::new(DashMap::new()),
            store,
            state_machine: Arc::new(SequenceStateMachine::new()),
            event_sink: leadnectar_core::event_bus::noop_sink(),
            config: SequenceConfig::default(),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub fn with_config(mut self, config: SequenceConfig) -> Self {
        self.config = config;
        self
    }

    /// Reload every stored sequence into memory. Rows whose trigger or step
    /// payloads are invalid are skipped. Returns how many were loaded.
    pub fn load_from_store(&self) -> NectarResult<usize> {
        let rows = self.store.query(Table::Sequences, &Filter::all())?;
        let mut count = 0;
        for row in rows {
            let sequence: Sequence = serde_json::from_value(row)?;
            if let Err(err) = validate_payloads(&sequence) {
                warn!(sequence_id = %sequence.id, error = %err, "Skipping invalid stored sequence");
                continue;
            }
            self.report_dangling(&sequence);
            self.sequences.insert(sequence.id, sequence);
            count += 1;
        }
        info!(count, "Loaded sequences from store");
        Ok(count)
    }

    // ─── Sequences ─────────────────────────────────────────────────────────

    pub fn create_sequence(
        &self,
        name: impl Into<String>,
        description: Option<String>,
        trigger: Trigger,
    ) -> NectarResult<Sequence> {
        validate_trigger(&trigger)?;
        let mut sequence = Sequence::new(name, trigger);
        sequence.description = description;
        self.insert_sequence(sequence)
    }

    /// Store a fully built sequence (imports, seeding). The trigger and every
    /// step payload must be valid; dangling branches are only reported.
    pub fn insert_sequence(&self, sequence: Sequence) -> NectarResult<Sequence> {
        if sequence.steps.len() > self.config.max_steps {
            return Err(too_many_steps(self.config.max_steps));
        }
        validate_payloads(&sequence)?;
        self.report_dangling(&sequence);
        self.store
            .insert(Table::Sequences, serde_json::to_value(&sequence)?)?;
        info!(sequence_id = %sequence.id, name = %sequence.name, "Created sequence");
        self.sequences.insert(sequence.id, sequence.clone());
        self.emit(EventType::SequenceCreated, sequence.id, serde_json::json!({"name": &sequence.name}));
        Ok(sequence)
    }

    pub fn get_sequence(&self, id: Uuid) -> Option<Sequence> {
        self.sequences.get(&id).map(|r| r.value().clone())
    }

    /// All sequences, newest first.
    pub fn list_sequences(&self) -> Vec<Sequence> {
        let mut sequences: Vec<Sequence> =
            self.sequences.iter().map(|r| r.value().clone()).collect();
        sequences.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sequences
    }

    pub fn delete_sequence(&self, id: Uuid) -> NectarResult<()> {
        if !self.sequences.contains_key(&id) {
            return Err(NectarError::not_found("sequence", id));
        }
        self.store.delete(Table::Sequences, &id.to_string())?;
        self.sequences.remove(&id);
        info!(sequence_id = %id, "Deleted sequence");
        self.emit(EventType::SequenceDeleted, id, serde_json::Value::Null);
        Ok(())
    }

    pub fn rename_sequence(
        &self,
        id: Uuid,
        name: impl Into<String>,
        description: Option<String>,
    ) -> NectarResult<Sequence> {
        let name = name.into();
        self.mutate(id, |seq| {
            seq.rename(name, description);
            Ok(())
        })
        .map(|(_, seq)| seq)
    }

    pub fn set_trigger(&self, id: Uuid, trigger: Trigger) -> NectarResult<Sequence> {
        self.mutate(id, |seq| seq.set_trigger(trigger))
            .map(|(_, seq)| seq)
    }

    // ─── Steps ─────────────────────────────────────────────────────────────

    pub fn add_step(&self, sequence_id: Uuid, step_type: StepType) -> NectarResult<Step> {
        let max_steps = self.config.max_steps;
        let (step, _) = self.mutate(sequence_id, |seq| {
            if seq.steps.len() >= max_steps {
                return Err(too_many_steps(max_steps));
            }
            Ok(seq.add_step(step_type))
        })?;
        info!(sequence_id = %sequence_id, step_id = %step.id, step_type = step_type.as_str(), "Added step");
        self.emit(
            EventType::StepAdded,
            sequence_id,
            serde_json::json!({"step_id": step.id, "step_type": step_type}),
        );
        Ok(step)
    }

    pub fn insert_step(
        &self,
        sequence_id: Uuid,
        index: usize,
        step_type: StepType,
    ) -> NectarResult<Step> {
        let max_steps = self.config.max_steps;
        let (step, _) = self.mutate(sequence_id, |seq| {
            if seq.steps.len() >= max_steps {
                return Err(too_many_steps(max_steps));
            }
            seq.insert_step(index, step_type)
        })?;
        info!(sequence_id = %sequence_id, step_id = %step.id, index, "Inserted step");
        self.emit(
            EventType::StepAdded,
            sequence_id,
            serde_json::json!({"step_id": step.id, "step_type": step_type, "index": index}),
        );
        Ok(step)
    }

    pub fn edit_step(
        &self,
        sequence_id: Uuid,
        step_id: Uuid,
        patch: StepPatch,
    ) -> NectarResult<Step> {
        let (step, seq) = self.mutate(sequence_id, |seq| {
            seq.edit_step(step_id, patch).map(Step::clone)
        })?;
        info!(sequence_id = %sequence_id, step_id = %step_id, "Edited step");
        self.report_dangling(&seq);
        self.emit(
            EventType::StepEdited,
            sequence_id,
            serde_json::json!({"step_id": step_id}),
        );
        Ok(step)
    }

    pub fn remove_step(&self, sequence_id: Uuid, step_id: Uuid) -> NectarResult<StepRemoval> {
        let (removal, _) = self.mutate(sequence_id, |seq| seq.remove_step(step_id))?;
        info!(
            sequence_id = %sequence_id,
            step_id = %step_id,
            dangling = removal.dangling.len(),
            "Removed step"
        );
        self.emit(
            EventType::StepRemoved,
            sequence_id,
            serde_json::json!({"step_id": step_id, "dangling": removal.dangling}),
        );
        Ok(removal)
    }

    pub fn reorder_steps(&self, sequence_id: Uuid, from: usize, to: usize) -> NectarResult<Sequence> {
        if from == to {
            // Range check only: nothing moves, so nothing is written or announced.
            let mut seq = self
                .get_sequence(sequence_id)
                .ok_or_else(|| NectarError::not_found("sequence", sequence_id))?;
            seq.reorder_steps(from, to)?;
            return Ok(seq);
        }
        let (_, seq) = self.mutate(sequence_id, |seq| seq.reorder_steps(from, to))?;
        info!(sequence_id = %sequence_id, from, to, "Reordered steps");
        self.emit(
            EventType::StepsReordered,
            sequence_id,
            serde_json::json!({"from": from, "to": to}),
        );
        Ok(seq)
    }

    // ─── Status ────────────────────────────────────────────────────────────

    pub fn apply_event(&self, sequence_id: Uuid, event: SequenceEvent) -> NectarResult<Sequence> {
        let sm = self.state_machine.clone();
        let result = self.mutate(sequence_id, |seq| {
            let from = seq.status;
            sm.apply(seq, event).map(|to| (from, to))
        });
        let ((from, to), seq) = match result {
            Ok(done) => done,
            Err(err) => {
                warn!(sequence_id = %sequence_id, ?event, error = %err, "Rejected status change");
                return Err(err);
            }
        };
        info!(sequence_id = %sequence_id, ?from, ?to, "Sequence status changed");
        self.emit(
            EventType::SequenceStatusChanged,
            sequence_id,
            serde_json::json!({"from": from, "to": to}),
        );
        Ok(seq)
    }

    pub fn transition_to(&self, sequence_id: Uuid, to: SequenceStatus) -> NectarResult<Sequence> {
        let current = self
            .sequences
            .get(&sequence_id)
            .map(|r| r.status)
            .ok_or_else(|| NectarError::not_found("sequence", sequence_id))?;
        let event = self.state_machine.event_for(current, to)?;
        self.apply_event(sequence_id, event)
    }

    pub fn available_events(&self, sequence_id: Uuid) -> NectarResult<Vec<SequenceEvent>> {
        self.sequences
            .get(&sequence_id)
            .map(|r| self.state_machine.available_events(r.status))
            .ok_or_else(|| NectarError::not_found("sequence", sequence_id))
    }

    // ─── Validation ────────────────────────────────────────────────────────

    pub fn validate(&self, sequence_id: Uuid) -> NectarResult<Vec<DanglingReference>> {
        let seq = self
            .sequences
            .get(&sequence_id)
            .ok_or_else(|| NectarError::not_found("sequence", sequence_id))?;
        Ok(validate_sequence(&seq))
    }

    // ─── Internals ─────────────────────────────────────────────────────────

    /// Run `f` on a working copy of the sequence, persist it, then commit.
    fn mutate<T, F>(&self, id: Uuid, f: F) -> NectarResult<(T, Sequence)>
    where
        F: FnOnce(&mut Sequence) -> NectarResult<T>,
    {
        let mut entry = self
            .sequences
            .get_mut(&id)
            .ok_or_else(|| NectarError::not_found("sequence", id))?;

        let mut working = entry.value().clone();
        let out = f(&mut working)?;

        self.store.update(
            Table::Sequences,
            &id.to_string(),
            serde_json::to_value(&working)?,
        )?;
        debug!(sequence_id = %id, steps = working.steps.len(), "Persisted sequence");

        *entry.value_mut() = working.clone();
        Ok((out, working))
    }

    fn report_dangling(&self, seq: &Sequence) {
        if !self.config.validate_on_mutation {
            return;
        }
        let dangling = validate_sequence(seq);
        if !dangling.is_empty() {
            warn!(
                sequence_id = %seq.id,
                count = dangling.len(),
                "Sequence has dangling branch references"
            );
        }
    }

    fn emit(&self, event_type: EventType, sequence_id: Uuid, detail: serde_json::Value) {
        self.event_sink
            .emit(make_event(event_type, sequence_id, detail));
    }

    /// Seeds two demo sequences for development and testing.
    pub fn seed_demo_sequences(&self) -> NectarResult<Vec<Uuid>> {
        info!("Seeding demo sequences");

        // ---- 1. Cold outreach with a follow-up on no-open ----
        let mut prospecting = Sequence::new("Prospection SaaS", Trigger::Manual)
            .with_description("Premier contact puis relance si l'email n'est pas ouvert");
        let intro = prospecting.add_step(StepType::Email);
        prospecting.edit_step(intro.id, template_patch("Premier contact", "template-1"))?;
        let wait = prospecting.add_step(StepType::Delay);
        prospecting.edit_step(
            wait.id,
            StepPatch {
                delay: Some(Delay::new(3, DelayUnit::Days)),
                ..Default::default()
            },
        )?;
        let check = prospecting.add_step(StepType::Condition);
        let follow_up = prospecting.add_step(StepType::Email);
        prospecting.edit_step(follow_up.id, template_patch("Relance", "template-2"))?;
        prospecting.edit_step(
            check.id,
            StepPatch {
                name: Some("Email ouvert ?".to_string()),
                condition: Some(Condition {
                    condition_type: ConditionType::EmailOpened,
                    value: "false".to_string(),
                    target_step_id: Some(follow_up.id),
                }),
                ..Default::default()
            },
        )?;

        // ---- 2. Webinar invitation on new lead ----
        let mut webinar = Sequence::new(
            "Relance webinar",
            Trigger::Automatic {
                condition: "contact.source = 'webinar'".to_string(),
            },
        );
        let invite = webinar.add_step(StepType::Email);
        webinar.edit_step(invite.id, template_patch("Invitation", "template-3"))?;
        let pause = webinar.add_step(StepType::Delay);
        webinar.edit_step(
            pause.id,
            StepPatch {
                delay: Some(Delay::new(12, DelayUnit::Hours)),
                ..Default::default()
            },
        )?;
        let reminder = webinar.add_step(StepType::Email);
        webinar.edit_step(reminder.id, template_patch("Rappel", "template-3"))?;

        let ids = vec![prospecting.id, webinar.id];
        self.insert_sequence(prospecting)?;
        self.insert_sequence(webinar)?;

        info!("Seeded 2 demo sequences");
        Ok(ids)
    }
}

fn template_patch(name: &str, template_id: &str) -> StepPatch {
    StepPatch {
        name: Some(name.to_string()),
        template_id: Some(Some(template_id.to_string())),
        ..Default::default()
    }
}

fn too_many_steps(max_steps: usize) -> NectarError {
    NectarError::validation(format!("a sequence holds at most {} steps", max_steps))
}
