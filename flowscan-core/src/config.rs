//! FlowScan configuration.
//!
//! Loaded from TOML. Every section and key is optional and falls back to the built-in
//! defaults, so an empty file is a valid configuration.

use crate::data::session::SessionHours;
use crate::data::{ProviderId, DEFAULT_DAILY_ORDER, DEFAULT_HOURLY_ORDER};
use crate::indicators::{IndicatorParams, IndicatorPipeline};
use crate::signals::SignalParams;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Provider order per resolution plus the shared HTTP timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub daily: Vec<ProviderId>,
    pub hourly: Vec<ProviderId>,
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            daily: DEFAULT_DAILY_ORDER.to_vec(),
            hourly: DEFAULT_HOURLY_ORDER.to_vec(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowScanConfig {
    pub providers: ProvidersConfig,
    pub session: SessionHours,
    pub indicators: IndicatorParams,
    pub signals: SignalParams,
}

impl FlowScanConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_order("providers.daily", &self.providers.daily)?;
        check_order("providers.hourly", &self.providers.hourly)?;
        if self.providers.timeout_secs == 0 {
            return Err(ConfigError::Invalid("providers.timeout_secs must be >= 1".into()));
        }

        let SessionHours { start_hour, end_hour } = self.session;
        if end_hour > 23 || start_hour > end_hour {
            return Err(ConfigError::Invalid(format!(
                "session hours must satisfy start_hour <= end_hour <= 23 (got {start_hour}..={end_hour})"
            )));
        }

        let i = &self.indicators;
        for (name, value) in [
            ("indicators.mfi_period", i.mfi_period),
            ("indicators.slope_window", i.slope_window),
            ("indicators.ma_short", i.ma_short),
            ("indicators.ma_long", i.ma_long),
            ("signals.signal_window", self.signals.signal_window),
            ("signals.price_change_lookback", self.signals.price_change_lookback),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be >= 1")));
            }
        }
        if !(i.volume_multiplier.is_finite() && i.volume_multiplier >= 0.0) {
            return Err(ConfigError::Invalid(
                "indicators.volume_multiplier must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    /// Signal parameters with the moving-average windows taken from the indicator section.
    pub fn signal_params(&self) -> SignalParams {
        SignalParams {
            ma_short: self.indicators.ma_short,
            ma_long: self.indicators.ma_long,
            ..self.signals.clone()
        }
    }

    pub fn pipeline(&self) -> IndicatorPipeline {
        IndicatorPipeline::new(self.indicators.clone())
    }
}

fn check_order(name: &str, order: &[ProviderId]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for id in order {
        if !seen.insert(*id) {
            return Err(ConfigError::Invalid(format!("{name} lists '{id}' more than once")));
        }
    }
    Ok(())
}
