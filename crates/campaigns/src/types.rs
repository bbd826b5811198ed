//! Campaign domain types.

use chrono::{DateTime, NaiveDate, Utc};
use leadnectar_core::{NectarError, NectarResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::FunnelMetrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub status: CampaignStatus,
    #[serde(rename = "type")]
    pub campaign_type: CampaignType,
    /// Number of audience members targeted.
    pub contacts: u64,
    /// Caller-supplied completion percentage, 0–100.
    pub progress: u8,
    pub metrics: FunnelMetrics,
    pub schedule: Schedule,
    /// Sequence this campaign runs, when it is not a single-shot send.
    #[serde(default)]
    pub sequence_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    Email,
    Linkedin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl Schedule {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> NectarResult<Self> {
        let schedule = Self { start, end };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> NectarResult<()> {
        match self.end {
            Some(end) if end < self.start => Err(NectarError::validation(format!(
                "schedule ends ({}) before it starts ({})",
                end, self.start
            ))),
            _ => Ok(()),
        }
    }

    /// Whether `day` falls inside the schedule window (open-ended when no end).
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && self.end.map_or(true, |end| day <= end)
    }
}

/// Input for creating a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub campaign_type: CampaignType,
    pub contacts: u64,
    pub schedule: Schedule,
    #[serde(default)]
    pub sequence_id: Option<Uuid>,
}

impl Campaign {
    pub fn new(req: CreateCampaignRequest) -> NectarResult<Self> {
        if req.name.trim().is_empty() {
            return Err(NectarError::validation("campaign name must not be empty"));
        }
        req.schedule.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: req.name,
            status: CampaignStatus::Draft,
            campaign_type: req.campaign_type,
            contacts: req.contacts,
            progress: 0,
            metrics: FunnelMetrics::default(),
            schedule: req.schedule,
            sequence_id: req.sequence_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Refresh `updated_at`, never moving it backwards.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }

    pub fn set_progress(&mut self, progress: u8) -> NectarResult<()> {
        check_progress(progress)?;
        self.progress = progress;
        self.touch();
        Ok(())
    }

    /// Record-level rules for a campaign read back from storage. The funnel
    /// ordering is only checked when `enforce_funnel` is set.
    pub fn validate(&self, enforce_funnel: bool) -> NectarResult<()> {
        if self.name.trim().is_empty() {
            return Err(NectarError::validation("campaign name must not be empty"));
        }
        check_progress(self.progress)?;
        self.schedule.validate()?;
        if enforce_funnel {
            self.metrics.validate()?;
        }
        Ok(())
    }
}

fn check_progress(progress: u8) -> NectarResult<()> {
    if progress > 100 {
        return Err(NectarError::validation(format!(
            "progress must be between 0 and 100, got {}",
            progress
        )));
    }
    Ok(())
}
