use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Which display the capture backend duplicates.
    #[serde(alias = "displayIndex")]
    pub display_index: u8,

    /// Bounded wait for the next frame. A timeout is a normal no-op cycle,
    /// so this only tunes how quickly the loop notices a stop request.
    #[serde(alias = "acquireTimeoutMs")]
    pub acquire_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            display_index:      0,
            acquire_timeout_ms: 100,
        }
    }
}

impl BridgeConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}
