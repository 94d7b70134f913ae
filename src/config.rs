//! Mediator configuration parameters
//!
//! Timer durations and the static device profile.  Settings that change at
//! runtime (cell-auto, cell-on, ...) are not configuration; they arrive as
//! signals.

use core::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What kind of watch this is.  Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// The device carries an embedded SIM.
    pub esim_device: bool,
    /// Regional build that ignores eSIM profile deactivation.
    pub local_edition: bool,
}

/// Longest timer any duration field may arm
pub const MAX_TIMER_MS: u64 = 24 * 60 * 60 * 1000;

/// Core mediator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    // --- Hysteresis ---
    /// How long the radio stays on after the proxy reconnects.  <= 0 turns
    /// lingering off.
    pub cell_linger_duration_ms: i64,
    /// Slack the alarm service may add to a linger deadline
    pub max_acceptable_linger_delay_ms: u64,
    /// Hold-off before a proxy-disconnected enable that follows a
    /// power-save, thermal, user-absent or cell-setting disable
    pub cell_delay_ms: u64,

    // --- Execution ---
    /// Upper bound on the wait for the modem to confirm a power change
    pub radio_power_wait_ms: u64,
    /// Keep the radio on this long after an emergency call ends
    pub emergency_radio_on_linger_ms: u64,

    pub device: DeviceProfile,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            cell_linger_duration_ms: 30_000,
            max_acceptable_linger_delay_ms: 30_000,
            cell_delay_ms: 30_000,

            radio_power_wait_ms: 5_000,
            emergency_radio_on_linger_ms: 363_000, // 6 min 3 s

            device: DeviceProfile::default(),
        }
    }
}

impl MediatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.radio_power_wait_ms == 0 {
            return Err(ConfigError::ValidationFailed("radio_power_wait_ms must be > 0"));
        }
        if self.cell_delay_ms == 0 {
            return Err(ConfigError::ValidationFailed("cell_delay_ms must be > 0"));
        }
        if self.emergency_radio_on_linger_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "emergency_radio_on_linger_ms must be > 0",
            ));
        }
        if self.cell_delay_ms > MAX_TIMER_MS {
            return Err(ConfigError::ValidationFailed("cell_delay_ms exceeds one day"));
        }
        if self.cell_linger_duration_ms > MAX_TIMER_MS as i64 {
            return Err(ConfigError::ValidationFailed(
                "cell_linger_duration_ms exceeds one day",
            ));
        }
        if self.max_acceptable_linger_delay_ms > MAX_TIMER_MS {
            return Err(ConfigError::ValidationFailed(
                "max_acceptable_linger_delay_ms exceeds one day",
            ));
        }
        if self.emergency_radio_on_linger_ms > MAX_TIMER_MS {
            return Err(ConfigError::ValidationFailed(
                "emergency_radio_on_linger_ms exceeds one day",
            ));
        }
        Ok(())
    }

    pub const fn linger_enabled(&self) -> bool {
        self.cell_linger_duration_ms > 0
    }

    pub const fn radio_power_wait(&self) -> Duration {
        Duration::from_millis(self.radio_power_wait_ms)
    }

    pub const fn emergency_radio_on_linger(&self) -> Duration {
        Duration::from_millis(self.emergency_radio_on_linger_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
