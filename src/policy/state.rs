//! Signal state: the single record of every input the policy looks at.
//!
//! Owned by the mediator service and mutated only from the worker thread.

use serde::{Deserialize, Serialize};

/// ICC (SIM card) state as reported by the SIM-state broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IccState {
    /// No broadcast received since boot.
    #[default]
    InitialBoot,
    Absent,
    NotReady,
    Ready,
    Loaded,
    /// Any broadcast value not listed above.
    #[serde(other)]
    Unknown,
}

impl IccState {
    /// Map a raw broadcast value.  Anything unrecognised is `Unknown`.
    pub fn from_broadcast(value: &str) -> Self {
        match value {
            "ABSENT" => Self::Absent,
            "NOT_READY" => Self::NotReady,
            "READY" => Self::Ready,
            "LOADED" => Self::Loaded,
            _ => Self::Unknown,
        }
    }

    /// A physical SIM is usable.
    pub const fn is_loaded(self) -> bool {
        matches!(self, Self::Ready | Self::Loaded)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InitialBoot => "INITIAL_BOOT",
            Self::Absent => "ABSENT",
            Self::NotReady => "NOT_READY",
            Self::Unknown => "UNKNOWN",
            Self::Ready => "READY",
            Self::Loaded => "LOADED",
        }
    }
}

/// Output of the mobile signal detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalQuality {
    #[default]
    Ok,
    Unstable,
    NoSignal,
}

impl SignalQuality {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Unstable => "unstable",
            Self::NoSignal => "no_signal",
        }
    }
}

/// Every condition the rule cascade reads.
///
/// Field groups follow the collaborator that feeds them.  Settings fields
/// default to the platform defaults so that a freshly booted mediator with
/// no further input evaluates to `OFF_PROXY_CONNECTED` while connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalState {
    pub booted: bool,
    pub user_unlocked: bool,

    // ── Telephony ───────────────────────────────────────────
    pub in_telephony_call: bool,
    pub in_ecbm: bool,
    pub in_emergency_call: bool,
    pub radio_on_after_emergency_call: bool,

    // ── SIM / eSIM ──────────────────────────────────────────
    pub esim_device: bool,
    pub local_edition: bool,
    pub has_active_esim_subscription: bool,
    pub esim_profile_deactivated: bool,
    pub esim_test_mode: bool,
    pub icc_state: IccState,

    // ── Device modes ────────────────────────────────────────
    pub cell_only_mode: bool,
    pub device_enabled: bool,
    pub device_enable_affects_cellular: bool,
    pub thermal_emergency: bool,
    pub device_idle: bool,
    pub doze_cellular_allowlisted: bool,
    pub user_absent_radios_off: bool,
    pub activity_mode: bool,
    pub in_power_save: bool,

    // ── Settings ────────────────────────────────────────────
    pub cell_auto: bool,
    pub cell_on: bool,
    pub off_during_power_save: bool,
    pub off_when_wifi_connected: bool,
    pub mobile_signal_detector_allowed: bool,

    // ── Network demand ──────────────────────────────────────
    pub high_bandwidth_requests: u32,
    pub cellular_requests: u32,

    // ── Signal detector ─────────────────────────────────────
    pub signal_quality: SignalQuality,
    pub detector_started: bool,

    // ── Connectivity ────────────────────────────────────────
    pub wifi_connected: bool,
    pub vowifi_active: bool,
    pub proxy_connected: bool,
}

impl Default for SignalState {
    fn default() -> Self {
        Self {
            booted: false,
            user_unlocked: false,
            in_telephony_call: false,
            in_ecbm: false,
            in_emergency_call: false,
            radio_on_after_emergency_call: false,
            esim_device: false,
            local_edition: false,
            has_active_esim_subscription: false,
            esim_profile_deactivated: false,
            esim_test_mode: false,
            icc_state: IccState::InitialBoot,
            cell_only_mode: false,
            device_enabled: true,
            device_enable_affects_cellular: false,
            thermal_emergency: false,
            device_idle: false,
            doze_cellular_allowlisted: false,
            user_absent_radios_off: false,
            activity_mode: false,
            in_power_save: false,
            cell_auto: true,
            cell_on: true,
            off_during_power_save: true,
            off_when_wifi_connected: true,
            mobile_signal_detector_allowed: true,
            high_bandwidth_requests: 0,
            cellular_requests: 0,
            signal_quality: SignalQuality::Ok,
            detector_started: false,
            wifi_connected: false,
            vowifi_active: false,
            proxy_connected: false,
        }
    }
}

impl SignalState {
    /// ECBM, an emergency call, or the post-emergency radio-on window.
    pub const fn emergency_active(&self) -> bool {
        self.in_ecbm || self.in_emergency_call || self.radio_on_after_emergency_call
    }

    pub const fn psim_loaded(&self) -> bool {
        self.icc_state.is_loaded()
    }

    pub const fn has_network_demand(&self) -> bool {
        self.high_bandwidth_requests > 0 || self.cellular_requests > 0
    }

    /// Wi-Fi connectivity is relevant to the radio decision.
    pub const fn turn_off_when_wifi_connected(&self) -> bool {
        self.off_when_wifi_connected || self.vowifi_active
    }

    pub const fn user_absent_blocks_cellular(&self) -> bool {
        self.device_idle && self.user_absent_radios_off && !self.doze_cellular_allowlisted
    }
}
