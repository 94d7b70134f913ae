//! Inbound signals and worker messages.
//!
//! Each platform callback (broadcast receiver, settings observer, tracker
//! listener) is one [`Signal`] variant.  The
//! [`CellMediator`](super::service::CellMediator) consumes them in a single
//! dispatch `match`.
//!
//! `Signal` is serde-tagged so that a feed of JSON lines such as
//! `{"signal":"proxy_connected_changed","connected":false}` can drive the
//! daemon.

use serde::{Deserialize, Serialize};

use crate::hysteresis::TimerKind;
use crate::policy::{IccState, SignalQuality};

/// Settings values read once when boot completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsSnapshot {
    pub cell_auto: bool,
    pub cell_on: bool,
    pub esim_profile_deactivated: bool,
    pub esim_test_mode: bool,
    pub mobile_signal_detector_allowed: bool,
    pub off_during_power_save: bool,
    pub off_when_wifi_connected: bool,
    /// Radio power as the modem reports it at boot; `None` if unknown.
    pub radio_on: Option<bool>,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            cell_auto: true,
            cell_on: true,
            esim_profile_deactivated: false,
            esim_test_mode: false,
            mobile_signal_detector_allowed: true,
            off_during_power_save: true,
            off_when_wifi_connected: true,
            radio_on: None,
        }
    }
}

/// External events that feed the signal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    // ── Lifecycle ───────────────────────────────────────────
    BootCompleted {
        proxy_connected: bool,
        #[serde(default)]
        settings: SettingsSnapshot,
    },
    UserUnlocked,

    // ── Power and device modes ──────────────────────────────
    PowerSaveChanged { in_power_save: bool },
    DeviceIdleChanged {
        idle: bool,
        #[serde(default)]
        doze_cellular_allowlisted: bool,
    },
    ActivityModeChanged { enabled: bool },
    CellOnlyModeChanged { enabled: bool },
    ThermalEmergencyChanged { enabled: bool, affects_cellular: bool },
    UserAbsentRadiosOffChanged { enabled: bool },
    DeviceEnableChanged { enabled: bool, affects_cellular: bool },

    // ── Connectivity and demand ─────────────────────────────
    ProxyConnectedChanged { connected: bool },
    WifiConnectedChanged { connected: bool },
    HighBandwidthRequestsChanged { count: u32 },
    CellularRequestsChanged { count: u32 },
    SignalQualityChanged { quality: SignalQuality },

    // ── Settings observers ──────────────────────────────────
    CellAutoSettingChanged { enabled: bool },
    CellOnSettingChanged { enabled: bool },
    EsimProfileActivationChanged { deactivated: bool },
    MobileSignalDetectorSettingChanged { allowed: bool },
    /// `self_change` is set when the write came from the mediator itself.
    EnableCellularOnBootChanged {
        #[serde(default)]
        self_change: bool,
    },
    VowifiSettingChanged { enabled: bool },

    // ── Broadcasts ──────────────────────────────────────────
    EsimTestModeChanged { enabled: bool },
    SimStateChanged { icc_state: IccState },
    CarrierConfigChanged { doze_cellular_allowlisted: bool },
    SubscriptionsChanged { has_active_esim: bool, vowifi_enabled: bool },

    // ── Telephony ───────────────────────────────────────────
    /// Off-hook or ringing on any subscription.
    PhoneStateChanged { in_call: bool },
    NewOutgoingCall { emergency: bool },
    EmergencyCallbackModeChanged { active: bool },
    /// Precise call state went idle.
    CallStateIdle,
    /// The emergency PDN connection was torn down.
    EmergencyPdnDisconnected,
}

/// Everything the worker's queue carries into the mediator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Signal(Signal),
    TimerFired { kind: TimerKind, token: u64 },
}

impl From<Signal> for Message {
    fn from(signal: Signal) -> Self {
        Self::Signal(signal)
    }
}
