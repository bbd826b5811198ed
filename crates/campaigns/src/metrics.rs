//! Engagement funnel metrics: sent → opened → clicked → replied.

use leadnectar_core::{NectarError, NectarResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelMetrics {
    pub sent: u64,
    pub opened: u64,
    pub clicked: u64,
    pub replied: u64,
}

/// Stage ratios relative to `sent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FunnelRates {
    pub open_rate: f64,
    pub click_rate: f64,
    pub reply_rate: f64,
}

impl FunnelMetrics {
    pub fn new(sent: u64, opened: u64, clicked: u64, replied: u64) -> Self {
        Self {
            sent,
            opened,
            clicked,
            replied,
        }
    }

    /// Check `sent ≥ opened ≥ clicked ≥ replied`.
    pub fn validate(&self) -> NectarResult<()> {
        let stages = [
            ("sent", self.sent),
            ("opened", self.opened),
            ("clicked", self.clicked),
            ("replied", self.replied),
        ];
        for pair in stages.windows(2) {
            let (upper, upper_count) = pair[0];
            let (lower, lower_count) = pair[1];
            if lower_count > upper_count {
                return Err(NectarError::validation(format!(
                    "{} ({}) exceeds {} ({})",
                    lower, lower_count, upper, upper_count
                )));
            }
        }
        Ok(())
    }

    /// Check that `next` never decreases any counter relative to `self`.
    pub fn check_progression(&self, next: &FunnelMetrics) -> NectarResult<()> {
        let pairs = [
            ("sent", self.sent, next.sent),
            ("opened", self.opened, next.opened),
            ("clicked", self.clicked, next.clicked),
            ("replied", self.replied, next.replied),
        ];
        for (name, current, proposed) in pairs {
            if proposed < current {
                return Err(NectarError::validation(format!(
                    "{} cannot decrease from {} to {}",
                    name, current, proposed
                )));
            }
        }
        Ok(())
    }

    pub fn rates(&self) -> FunnelRates {
        if self.sent == 0 {
            return FunnelRates::default();
        }
        let sent = self.sent as f64;
        FunnelRates {
            open_rate: self.opened as f64 / sent,
            click_rate: self.clicked as f64 / sent,
            reply_rate: self.replied as f64 / sent,
        }
    }

    fn saturating_add(&self, other: &FunnelMetrics) -> FunnelMetrics {
        FunnelMetrics {
            sent: self.sent.saturating_add(other.sent),
            opened: self.opened.saturating_add(other.opened),
            clicked: self.clicked.saturating_add(other.clicked),
            replied: self.replied.saturating_add(other.replied),
        }
    }
}

/// Totals across a set of campaigns, for dashboards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRollup {
    pub campaigns: u64,
    pub active: u64,
    pub contacts: u64,
    pub totals: FunnelMetrics,
    pub rates: FunnelRates,
}

impl MetricsRollup {
    pub fn from_campaigns<'a>(campaigns: impl IntoIterator<Item = &'a crate::types::Campaign>) -> Self {
        let mut rollup = MetricsRollup::default();
        for c in campaigns {
            rollup.campaigns += 1;
            if c.status == crate::types::CampaignStatus::Active {
                rollup.active += 1;
            }
            rollup.contacts = rollup.contacts.saturating_add(c.contacts);
            rollup.totals = rollup.totals.saturating_add(&c.metrics);
        }
        rollup.rates = rollup.totals.rates();
        rollup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_funnel() {
        assert!(FunnelMetrics::new(78, 52, 21, 14).validate().is_ok());
        assert!(FunnelMetrics::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_funnel_rejected() {
        let err = FunnelMetrics::new(10, 4, 5, 1).validate().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: clicked (5) exceeds opened (4)");
        assert!(FunnelMetrics::new(10, 11, 0, 0).validate().is_err());
        assert!(FunnelMetrics::new(10, 5, 2, 3).validate().is_err());
    }

    #[test]
    fn test_progression() {
        let current = FunnelMetrics::new(10, 5, 2, 1);
        assert!(current.check_progression(&FunnelMetrics::new(12, 5, 3, 1)).is_ok());
        assert!(current.check_progression(&current).is_ok());
        let err = current
            .check_progression(&FunnelMetrics::new(12, 4, 3, 1))
            .unwrap_err();
        assert!(err.to_string().contains("opened cannot decrease from 5 to 4"));
    }

    #[test]
    fn test_rates() {
        let rates = FunnelMetrics::new(200, 100, 50, 10).rates();
        assert!((rates.open_rate - 0.5).abs() < f64::EPSILON);
        assert!((rates.click_rate - 0.25).abs() < f64::EPSILON);
        assert!((rates.reply_rate - 0.05).abs() < f64::EPSILON);
        assert_eq!(FunnelMetrics::default().rates(), FunnelRates::default());
    }
}
