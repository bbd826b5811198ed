//! Outreach campaigns: audience size, schedule window, lifecycle, and
//! engagement funnel metrics.

pub mod lifecycle;
pub mod metrics;
pub mod registry;
pub mod types;

pub use lifecycle::{CampaignEvent, CampaignLifecycle};
pub use metrics::{FunnelMetrics, FunnelRates, MetricsRollup};
pub use registry::CampaignRegistry;
pub use types::{Campaign, CampaignStatus, CampaignType, CreateCampaignRequest, Schedule};
