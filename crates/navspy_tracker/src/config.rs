//! Tracker configuration
//!
//! Every field has a default matching a 56px fixed navigation bar, so an
//! empty TOML table is a valid configuration:
//!
//! ```toml
//! nav_height = 56.0
//! nav_gap = 8.0
//! bottom_margin_percent = 55.0
//! thresholds = [0.1, 0.25, 0.5, 0.75, 0.9]
//! reference_fraction = 0.3
//! retry_limit = 10
//! retry_interval_ms = 150
//! ```

use std::time::Duration;

use navspy_core::{IntersectionOptions, Length, RootMargin, Viewport};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Configuration for an [`ActiveSectionTracker`](crate::ActiveSectionTracker)
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Height of the fixed navigation bar in pixels
    pub nav_height: f32,
    /// Extra pixels trimmed below the navigation bar for visibility checks
    pub nav_gap: f32,
    /// Share of the viewport height trimmed from the bottom for visibility
    /// checks
    pub bottom_margin_percent: f32,
    /// Visibility ratios at which intersection batches are delivered
    pub thresholds: Vec<f32>,
    /// Position of the proximity reference line below the navigation bar,
    /// as a fraction of the viewport height
    pub reference_fraction: f32,
    /// Retries after the initial lookup before giving up on missing sections
    pub retry_limit: u32,
    /// Delay between lookups in milliseconds
    pub retry_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            nav_height: 56.0,
            nav_gap: 8.0,
            bottom_margin_percent: 55.0,
            thresholds: vec![0.1, 0.25, 0.5, 0.75, 0.9],
            reference_fraction: 0.3,
            retry_limit: 10,
            retry_interval_ms: 150,
        }
    }
}

impl TrackerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Same configuration with a different navigation bar height
    pub fn with_nav_height(mut self, nav_height: f32) -> Self {
        self.nav_height = nav_height;
        self
    }

    pub fn with_retry(mut self, limit: u32, interval: Duration) -> Self {
        self.retry_limit = limit;
        self.retry_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("nav_height", self.nav_height),
            ("nav_gap", self.nav_gap),
            ("bottom_margin_percent", self.bottom_margin_percent),
            ("reference_fraction", self.reference_fraction),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDimension { field, value });
            }
        }

        if let Some(bad) = self
            .thresholds
            .iter()
            .find(|t| !(0.0..=1.0).contains(*t))
        {
            return Err(ConfigError::ThresholdOutOfRange(*bad));
        }
        if self.thresholds.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::ThresholdsUnsorted);
        }

        if self.retry_interval_ms == 0 {
            return Err(ConfigError::ZeroRetryInterval);
        }
        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Root margin for the visibility evaluator: the navigation bar (plus
    /// gap) off the top, `bottom_margin_percent` off the bottom
    pub fn root_margin(&self) -> RootMargin {
        RootMargin::vertical(
            Length::Px(-(self.nav_height + self.nav_gap)),
            Length::Percent(-self.bottom_margin_percent),
        )
    }

    pub fn intersection_options(&self) -> Result<IntersectionOptions> {
        Ok(IntersectionOptions::new(
            self.root_margin(),
            self.thresholds.iter().copied(),
        )?)
    }

    /// Viewport-relative y of the proximity reference line
    pub fn reference_line(&self, viewport: Viewport) -> f32 {
        self.nav_height + viewport.height * self.reference_fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_navbar() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.root_margin().to_string(), "-64px 0px -55% 0px");
        assert_eq!(config.retry_interval(), Duration::from_millis(150));
        assert_eq!(config.reference_line(Viewport::new(1000.0, 800.0)), 296.0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = TrackerConfig::from_toml_str("nav_height = 72.0\nretry_limit = 3").unwrap();
        assert_eq!(config.nav_height, 72.0);
        assert_eq!(config.retry_limit, 3);
        assert_eq!(config.thresholds, vec![0.1, 0.25, 0.5, 0.75, 0.9]);
    }

    #[test]
    fn test_invalid_configs() {
        let unsorted = TrackerConfig {
            thresholds: vec![0.5, 0.1],
            ..Default::default()
        };
        assert!(matches!(unsorted.validate(), Err(ConfigError::ThresholdsUnsorted)));

        let out_of_range = TrackerConfig {
            thresholds: vec![0.5, 1.2],
            ..Default::default()
        };
        assert!(matches!(
            out_of_range.validate(),
            Err(ConfigError::ThresholdOutOfRange(_))
        ));

        let zero_interval = TrackerConfig::default().with_retry(10, Duration::ZERO);
        assert!(matches!(zero_interval.validate(), Err(ConfigError::ZeroRetryInterval)));

        let negative = TrackerConfig::default().with_nav_height(-1.0);
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::InvalidDimension { field: "nav_height", .. })
        ));

        assert!(matches!(
            TrackerConfig::from_toml_str("unknown_key = 1"),
            Err(ConfigError::Parse(_))
        ));
    }
}
