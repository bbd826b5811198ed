//! Campaign registry: owns campaigns, their lifecycle and metrics updates.

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use leadnectar_core::config::CampaignConfig;
use leadnectar_core::event_bus::{make_event, EventSink};
use leadnectar_core::types::EventType;
use leadnectar_core::{NectarError, NectarResult};
use leadnectar_sequences::Sequence;
use leadnectar_store::{Filter, RecordStore, Table};
use tracing::{info, warn};
use uuid::Uuid;

use crate::lifecycle::{CampaignEvent, CampaignLifecycle};
use crate::metrics::{FunnelMetrics, MetricsRollup};
use crate::types::{Campaign, CampaignStatus, CampaignType, CreateCampaignRequest, Schedule};

#[derive(Clone)]
pub struct CampaignRegistry {
    campaigns: Arc<DashMap<Uuid, Campaign>>,
    store: Arc<dyn RecordStore>,
    lifecycle: Arc<CampaignLifecycle>,
    event_sink: Arc<dyn EventSink>,
    config: CampaignConfig,
}

impl std::fmt::Debug for CampaignRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignRegistry")
            .field("campaigns", &self.campaigns.len())
            .field("config", &self.config)
            .finish()
    }
}

impl CampaignRegistry {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            campaigns: Arc::new(DashMap::new()),
            store,
            lifecycle: Arc::new(CampaignLifecycle::new()),
            event_sink: leadnectar_core::event_bus::noop_sink(),
            config: CampaignConfig::default(),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub fn with_config(mut self, config: CampaignConfig) -> Self {
        self.config = config;
        self
    }

    /// Reload stored campaigns, skipping rows that break the progress,
    /// schedule or funnel rules. Returns how many were loaded.
    pub fn load_from_store(&self) -> NectarResult<usize> {
        let rows = self.store.query(Table::Campaigns, &Filter::all())?;
        let mut count = 0;
        for row in rows {
            let campaign: Campaign = serde_json::from_value(row)?;
            if let Err(err) = campaign.validate(self.config.enforce_funnel) {
                warn!(campaign_id = %campaign.id, error = %err, "Skipping invalid stored campaign");
                continue;
            }
            self.campaigns.insert(campaign.id, campaign);
            count += 1;
        }
        info!(count, "Loaded campaigns from store");
        Ok(count)
    }

    pub fn create_campaign(&self, req: CreateCampaignRequest) -> NectarResult<Campaign> {
        let campaign = Campaign::new(req)?;
        self.store
            .insert(Table::Campaigns, serde_json::to_value(&campaign)?)?;
        info!(campaign_id = %campaign.id, name = %campaign.name, "Created campaign");
        self.campaigns.insert(campaign.id, campaign.clone());
        self.emit(
            EventType::CampaignCreated,
            campaign.id,
            serde_json::json!({"name": &campaign.name, "type": campaign.campaign_type}),
        );
        Ok(campaign)
    }

    /// An email campaign that runs `sequence` against `contacts` recipients.
    pub fn create_from_sequence(
        &self,
        sequence: &Sequence,
        contacts: u64,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> NectarResult<Campaign> {
        self.create_campaign(CreateCampaignRequest {
            name: sequence.name.clone(),
            campaign_type: CampaignType::Email,
            contacts,
            schedule: Schedule::new(start, end)?,
            sequence_id: Some(sequence.id),
        })
    }

    pub fn get_campaign(&self, id: Uuid) -> Option<Campaign> {
        self.campaigns.get(&id).map(|r| r.value().clone())
    }

    pub fn list_campaigns(&self) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> =
            self.campaigns.iter().map(|r| r.value().clone()).collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn list_by_status(&self, status: CampaignStatus) -> Vec<Campaign> {
        self.list_campaigns()
            .into_iter()
            .filter(|c| c.status == status)
            .collect()
    }

    pub fn apply_event(&self, id: Uuid, event: CampaignEvent) -> NectarResult<Campaign> {
        let lifecycle = self.lifecycle.clone();
        let result = self.mutate(id, |c| {
            let from = c.status;
            lifecycle.apply(c, event).map(|to| (from, to))
        });
        let ((from, to), campaign) = match result {
            Ok(done) => done,
            Err(err) => {
                warn!(campaign_id = %id, ?event, error = %err, "Rejected campaign status change");
                return Err(err);
            }
        };
        info!(campaign_id = %id, ?from, ?to, "Campaign status changed");
        self.emit(
            EventType::CampaignStatusChanged,
            id,
            serde_json::json!({"from": from, "to": to}),
        );
        Ok(campaign)
    }

    /// Replace the campaign's counters. Counters never decrease, and with
    /// `enforce_funnel` the stages must narrow from sent to replied.
    pub fn record_metrics(&self, id: Uuid, metrics: FunnelMetrics) -> NectarResult<Campaign> {
        let enforce_funnel = self.config.enforce_funnel;
        let (_, campaign) = self.mutate(id, |c| {
            c.metrics.check_progression(&metrics)?;
            if enforce_funnel {
                metrics.validate()?;
            }
            c.metrics = metrics;
            c.touch();
            Ok(())
        })?;
        info!(
            campaign_id = %id,
            sent = metrics.sent,
            opened = metrics.opened,
            clicked = metrics.clicked,
            replied = metrics.replied,
            "Recorded campaign metrics"
        );
        self.emit(
            EventType::CampaignMetricsRecorded,
            id,
            serde_json::to_value(metrics)?,
        );
        Ok(campaign)
    }

    pub fn set_progress(&self, id: Uuid, progress: u8) -> NectarResult<Campaign> {
        let (_, campaign) = self.mutate(id, |c| c.set_progress(progress))?;
        self.emit(
            EventType::CampaignProgressUpdated,
            id,
            serde_json::json!({"progress": progress}),
        );
        Ok(campaign)
    }

    pub fn rollup(&self) -> MetricsRollup {
        let campaigns = self.list_campaigns();
        MetricsRollup::from_campaigns(&campaigns)
    }

    fn mutate<T, F>(&self, id: Uuid, f: F) -> NectarResult<(T, Campaign)>
    where
        F: FnOnce(&mut Campaign) -> NectarResult<T>,
    {
        let mut entry = self
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| NectarError::not_found("campaign", id))?;

        let mut working = entry.value().clone();
        let out = f(&mut working)?;
        self.store.update(
            Table::Campaigns,
            &id.to_string(),
            serde_json::to_value(&working)?,
        )?;
        *entry.value_mut() = working.clone();
        Ok((out, working))
    }

    fn emit(&self, event_type: EventType, campaign_id: Uuid, detail: serde_json::Value) {
        self.event_sink
            .emit(make_event(event_type, campaign_id, detail));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadnectar_core::event_bus::capture_sink;
    use leadnectar_sequences::{StepType, Trigger};
    use leadnectar_store::MemoryStore;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
    }

    fn registry() -> (CampaignRegistry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CampaignRegistry::new(store.clone()), store)
    }

    fn create(registry: &CampaignRegistry, name: &str) -> Campaign {
        registry
            .create_campaign(CreateCampaignRequest {
                name: name.to_string(),
                campaign_type: CampaignType::Email,
                contacts: 100,
                schedule: Schedule { start: start(), end: None },
                sequence_id: None,
            })
            .unwrap()
    }

    #[test]
    fn test_create_persists() {
        let (registry, store) = registry();
        let c = create(&registry, "A");
        assert_eq!(store.len(Table::Campaigns), 1);
        assert_eq!(registry.get_campaign(c.id).unwrap(), c);
    }

    #[test]
    fn test_record_metrics_enforces_funnel() {
        let (registry, _) = registry();
        let c = create(&registry, "A");
        registry
            .record_metrics(c.id, FunnelMetrics::new(78, 52, 21, 14))
            .unwrap();
        assert!(matches!(
            registry.record_metrics(c.id, FunnelMetrics::new(80, 52, 60, 14)),
            Err(NectarError::Validation(_))
        ));
        assert_eq!(
            registry.get_campaign(c.id).unwrap().metrics,
            FunnelMetrics::new(78, 52, 21, 14)
        );
    }

    #[test]
    fn test_record_metrics_rejects_decrease_even_without_funnel_check() {
        let store = Arc::new(MemoryStore::new());
        let registry = CampaignRegistry::new(store).with_config(CampaignConfig {
            enforce_funnel: false,
        });
        let c = create(&registry, "A");
        registry
            .record_metrics(c.id, FunnelMetrics::new(5, 9, 0, 0))
            .unwrap();
        assert!(registry
            .record_metrics(c.id, FunnelMetrics::new(4, 9, 0, 0))
            .is_err());
    }

    #[test]
    fn test_lifecycle_events_emitted() {
        let sink = capture_sink();
        let store = Arc::new(MemoryStore::new());
        let registry = CampaignRegistry::new(store).with_event_sink(sink.clone());
        let c = create(&registry, "A");
        registry.apply_event(c.id, CampaignEvent::Activate).unwrap();
        registry.apply_event(c.id, CampaignEvent::Pause).unwrap();
        assert!(registry.apply_event(c.id, CampaignEvent::Retry).is_err());
        assert_eq!(sink.count_type(EventType::CampaignStatusChanged), 2);
        assert_eq!(registry.list_by_status(CampaignStatus::Paused).len(), 1);
    }

    #[test]
    fn test_create_from_sequence() {
        let (registry, _) = registry();
        let mut seq = Sequence::new("Relance webinar", Trigger::Manual);
        seq.add_step(StepType::Email);
        let c = registry
            .create_from_sequence(&seq, 42, start(), None)
            .unwrap();
        assert_eq!(c.name, "Relance webinar");
        assert_eq!(c.sequence_id, Some(seq.id));
        assert_eq!(c.campaign_type, CampaignType::Email);
        assert_eq!(c.contacts, 42);
    }

    #[test]
    fn test_rollup_and_reload() {
        let store = Arc::new(MemoryStore::new());
        let registry = CampaignRegistry::new(store.clone());
        let a = create(&registry, "A");
        let b = create(&registry, "B");
        registry
            .record_metrics(a.id, FunnelMetrics::new(100, 50, 10, 5))
            .unwrap();
        registry
            .record_metrics(b.id, FunnelMetrics::new(100, 30, 10, 5))
            .unwrap();
        registry.apply_event(a.id, CampaignEvent::Activate).unwrap();
        registry.set_progress(a.id, 40).unwrap();

        let rollup = registry.rollup();
        assert_eq!(rollup.campaigns, 2);
        assert_eq!(rollup.active, 1);
        assert_eq!(rollup.contacts, 200);
        assert_eq!(rollup.totals, FunnelMetrics::new(200, 80, 20, 10));
        assert!((rollup.rates.open_rate - 0.4).abs() < 1e-9);

        let fresh = CampaignRegistry::new(store);
        assert_eq!(fresh.load_from_store().unwrap(), 2);
        assert_eq!(fresh.get_campaign(a.id).unwrap().progress, 40);
    }

    #[test]
    fn test_load_skips_invalid_stored_campaigns() {
        let store = Arc::new(MemoryStore::new());
        let registry = CampaignRegistry::new(store.clone());
        let good = create(&registry, "good");
        let overfull = create(&registry, "overfull");
        let inverted = create(&registry, "inverted");
        let backwards = create(&registry, "backwards");

        store
            .update(Table::Campaigns, &overfull.id.to_string(), serde_json::json!({"progress": 250}))
            .unwrap();
        store
            .update(
                Table::Campaigns,
                &inverted.id.to_string(),
                serde_json::json!({"metrics": {"sent": 5, "opened": 9, "clicked": 0, "replied": 0}}),
            )
            .unwrap();
        store
            .update(
                Table::Campaigns,
                &backwards.id.to_string(),
                serde_json::json!({"schedule": {"start": "2026-09-10", "end": "2026-09-01"}}),
            )
            .unwrap();

        let fresh = CampaignRegistry::new(store.clone());
        assert_eq!(fresh.load_from_store().unwrap(), 1);
        assert!(fresh.get_campaign(good.id).is_some());
        assert!(fresh.get_campaign(overfull.id).is_none());
        assert!(fresh.get_campaign(inverted.id).is_none());

        let lenient = CampaignRegistry::new(store).with_config(CampaignConfig {
            enforce_funnel: false,
        });
        assert_eq!(lenient.load_from_store().unwrap(), 2);
        assert!(lenient.get_campaign(inverted.id).is_some());
    }
}
