//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TransportError, UpliftError, UpliftResult, ValidationError};

/// Tunables shared by aggregation, classification, charting and replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Default delay between replayed frames.
    pub replay_interval_ms: u64,
    /// Minimum backing users before a rate or uplift is displayed.
    pub min_display_users: u64,
    /// Bottom share of a ranked table flagged as losers.
    pub loser_fraction: f64,
    /// Rows included in the ranked bar series.
    pub bar_chart_limit: usize,
    /// Replay event stream buffer.
    pub event_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            replay_interval_ms: 400,
            min_display_users: 50,
            loser_fraction: 0.2,
            bar_chart_limit: 8,
            event_capacity: 256,
        }
    }
}

impl DashboardConfig {
    /// Parses a (possibly partial) configuration; missing fields take defaults.
    pub fn from_json_str(json: &str) -> UpliftResult<Self> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| {
            UpliftError::Transport(TransportError::DeserializationFailed {
                message: e.to_string(),
            })
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Default inter-frame delay.
    #[must_use]
    pub const fn replay_interval(&self) -> Duration {
        Duration::from_millis(self.replay_interval_ms)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.loser_fraction.is_finite() || !(0.0..=1.0).contains(&self.loser_fraction) {
            return Err(ValidationError::InvalidConfig {
                reason: format!("loser_fraction must be within [0, 1], got {}", self.loser_fraction),
            });
        }
        if self.bar_chart_limit == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "bar_chart_limit must be > 0".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "event_capacity must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        DashboardConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        let mut c = DashboardConfig::default();
        c.loser_fraction = 1.5;
        assert!(c.validate().is_err());

        let mut c = DashboardConfig::default();
        c.loser_fraction = f64::NAN;
        assert!(c.validate().is_err());

        let mut c = DashboardConfig::default();
        c.bar_chart_limit = 0;
        assert!(c.validate().is_err());

        let mut c = DashboardConfig::default();
        c.event_capacity = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let c = DashboardConfig::from_json_str(r#"{"replay_interval_ms": 50}"#).unwrap();
        assert_eq!(c.replay_interval(), Duration::from_millis(50));
        assert_eq!(c.min_display_users, 50);
        assert_eq!(c.bar_chart_limit, 8);
    }

    #[test]
    fn json_is_validated() {
        let err = DashboardConfig::from_json_str(r#"{"bar_chart_limit": 0}"#).unwrap_err();
        assert!(err.is_validation());
    }
}
