use std::time::Duration;

use serde::Deserialize;
use zenith_core::{orb_value, BoxError, Config, Injected, OrbValue, ZENITH_CONFIG_ORB};

/// The `heartbeat` config section. Missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HeartbeatSettings {
    pub interval_ms: u64,
    pub message: String,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            message: "alive".to_string(),
        }
    }
}

impl HeartbeatSettings {
    pub const SECTION: &'static str = "heartbeat";

    pub fn from_config(config: &Config) -> zenith_core::Result<Self> {
        config.get_or(Self::SECTION, Self::default())
    }

    /// Never zero, `tokio::time::interval` panics on a zero period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

pub(crate) fn factory(deps: &Injected) -> Result<OrbValue, BoxError> {
    let config = deps.one::<Config>(ZENITH_CONFIG_ORB)?;
    Ok(orb_value(HeartbeatSettings::from_config(&config)?))
}
