use leadnectar_core::lifecycle::TransitionTable;
use leadnectar_core::NectarResult;
use serde::{Deserialize, Serialize};

use crate::types::{Campaign, CampaignStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignEvent {
    Activate,
    Pause,
    Resume,
    Complete,
    Fail,
    Retry,
}

/// Campaign status transitions. `Completed` is terminal; a failed campaign
/// can be retried.
#[derive(Debug, Clone)]
pub struct CampaignLifecycle {
    table: TransitionTable<CampaignStatus, CampaignEvent>,
}

impl CampaignLifecycle {
    pub fn new() -> Self {
        use CampaignEvent::*;
        use CampaignStatus::*;

        Self {
            table: TransitionTable::new(&[
                (Draft, Activate, Active),
                (Draft, Complete, Completed),
                (Active, Pause, Paused),
                (Active, Complete, Completed),
                (Active, Fail, Failed),
                (Paused, Resume, Active),
                (Paused, Complete, Completed),
                (Paused, Fail, Failed),
                (Failed, Retry, Active),
            ]),
        }
    }

    pub fn can_transition(&self, from: CampaignStatus, to: CampaignStatus) -> bool {
        self.table.can_transition(from, to)
    }

    pub fn available_events(&self, status: CampaignStatus) -> Vec<CampaignEvent> {
        self.table.events_from(status)
    }

    pub fn apply(&self, campaign: &mut Campaign, event: CampaignEvent) -> NectarResult<CampaignStatus> {
        let to = self.table.apply(campaign.status, event)?;
        campaign.status = to;
        campaign.touch();
        Ok(to)
    }
}

impl Default for CampaignLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
