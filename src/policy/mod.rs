//! Radio power policy engine.
//!
//! A pure, first-match-wins cascade over a [`SignalState`] snapshot:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  RULES (priority order, see [`rules`])                       │
//! │  ┌────┬──────────────────────────────┬────────┬────────────┐ │
//! │  │ #  │ applies(&SignalState)        │ enable │ Reason     │ │
//! │  ├────┼──────────────────────────────┼────────┼────────────┤ │
//! │  │ 1  │ in telephony call            │  on    │ PHONE_CALL │ │
//! │  │ 2  │ emergency active             │  on    │ EMERGENCY  │ │
//! │  │ …  │ …                            │  …     │ …          │ │
//! │  │ 22 │ (fallthrough)                │  off   │ PROXY_CONN │ │
//! │  └────┴──────────────────────────────┴────────┴────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never touches timers or hardware.  Hysteresis and
//! actuation live in [`crate::hysteresis`] and [`crate::app::service`].

pub mod rules;
pub mod state;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use state::{IccState, SignalQuality, SignalState};

// ---------------------------------------------------------------------------
// Reason
// ---------------------------------------------------------------------------

/// Why the radio was turned on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    OffInitialBoot,
    OffActivityMode,
    OffCellSetting,
    OffEsimDeactivated,
    OffNoSignal,
    OffPowerSave,
    OffProxyConnected,
    OffSimAbsent,
    OffUnstableSignal,
    OffUserAbsent,
    OffDeviceDisabled,
    OffThermalEmergency,
    OffDirectboot,
    OffWifiConnected,
    OnNetworkRequest,
    OnNoCellAuto,
    OnPhoneCall,
    OnProxyDisconnected,
    OnCellOnlyMode,
    OnEsimTestMode,
    OnEmergency,
    #[serde(other)]
    Unknown,
}

impl Reason {
    pub const ALL: [Reason; 22] = [
        Self::OffInitialBoot,
        Self::OffActivityMode,
        Self::OffCellSetting,
        Self::OffEsimDeactivated,
        Self::OffNoSignal,
        Self::OffPowerSave,
        Self::OffProxyConnected,
        Self::OffSimAbsent,
        Self::OffUnstableSignal,
        Self::OffUserAbsent,
        Self::OffDeviceDisabled,
        Self::OffThermalEmergency,
        Self::OffDirectboot,
        Self::OffWifiConnected,
        Self::OnNetworkRequest,
        Self::OnNoCellAuto,
        Self::OnPhoneCall,
        Self::OnProxyDisconnected,
        Self::OnCellOnlyMode,
        Self::OnEsimTestMode,
        Self::OnEmergency,
        Self::Unknown,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::OffInitialBoot => "OFF_INITIAL_BOOT",
            Self::OffActivityMode => "OFF_ACTIVITY_MODE",
            Self::OffCellSetting => "OFF_CELL_SETTING",
            Self::OffEsimDeactivated => "OFF_ESIM_DEACTIVATED",
            Self::OffNoSignal => "OFF_NO_SIGNAL",
            Self::OffPowerSave => "OFF_POWER_SAVE",
            Self::OffProxyConnected => "OFF_PROXY_CONNECTED",
            Self::OffSimAbsent => "OFF_SIM_ABSENT",
            Self::OffUnstableSignal => "OFF_UNSTABLE_SIGNAL",
            Self::OffUserAbsent => "OFF_USER_ABSENT",
            Self::OffDeviceDisabled => "OFF_DEVICE_DISABLED",
            Self::OffThermalEmergency => "OFF_THERMAL_EMERGENCY",
            Self::OffDirectboot => "OFF_DIRECTBOOT",
            Self::OffWifiConnected => "OFF_WIFI_CONNECTED",
            Self::OnNetworkRequest => "ON_NETWORK_REQUEST",
            Self::OnNoCellAuto => "ON_NO_CELL_AUTO",
            Self::OnPhoneCall => "ON_PHONE_CALL",
            Self::OnProxyDisconnected => "ON_PROXY_DISCONNECTED",
            Self::OnCellOnlyMode => "ON_CELL_ONLY_MODE",
            Self::OnEsimTestMode => "ON_ESIM_TEST_MODE",
            Self::OnEmergency => "ON_EMERGENCY",
        }
    }

    /// Parse a reason name.  Unrecognised names map to [`Reason::Unknown`].
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == name)
            .unwrap_or(Self::Unknown)
    }

    /// Disable reasons that leave a pending delayed enable in place.
    pub const fn is_delay_exempt(self) -> bool {
        matches!(self, Self::OffInitialBoot | Self::OnProxyDisconnected)
    }

    /// Whether a decision with this reason arms the delay for the next
    /// proxy-disconnected enable.  `cell_auto` is the setting value at the
    /// time of this decision.
    pub const fn delays_next_enable(self, cell_auto: bool) -> bool {
        match self {
            Self::OffPowerSave | Self::OffThermalEmergency | Self::OffUserAbsent => true,
            Self::OffCellSetting => cell_auto,
            _ => false,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// The external (or internal timer) event that caused an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    ActivityModeUpdate,
    CallStateChangedEmergencyEnded,
    CallStateChangedEmergencyEndedDelayed,
    CellAutoSetting,
    CellOnSetting,
    CellOnlyModeUpdate,
    ConnectionStateChangedPdnDisconnected,
    DeviceEnableChanged,
    DeviceIdleModeChanged,
    EmergencyCallbackModeChanged,
    EmergencyRadioOnTimeout,
    EnableCellularOnBootSetting,
    EsimProfileActivationSetting,
    EsimTestMode,
    ExitCellLinger,
    MobileSignalDetectorSetting,
    NewOutgoingCall,
    NumCellularReqUpdate,
    NumHighBandwidthReqUpdate,
    OnBootCompleted,
    OnUserUnlocked,
    PowerSaveModeChanged,
    ProxyConnectedUpdate,
    SignalStateChanged,
    SimStateChanged,
    SubscriptionPhoneStateChanged,
    SubscriptionsChanged,
    ThermalEmergencyModeUpdate,
    UserAbsentRadiosOffChanged,
    VowifiStateUpdate,
    WifiConnectedUpdate,
    WifiDisconnectedUpdate,
    #[serde(other)]
    Unknown,
}

impl Trigger {
    pub const ALL: [Trigger; 33] = [
        Self::ActivityModeUpdate,
        Self::CallStateChangedEmergencyEnded,
        Self::CallStateChangedEmergencyEndedDelayed,
        Self::CellAutoSetting,
        Self::CellOnSetting,
        Self::CellOnlyModeUpdate,
        Self::ConnectionStateChangedPdnDisconnected,
        Self::DeviceEnableChanged,
        Self::DeviceIdleModeChanged,
        Self::EmergencyCallbackModeChanged,
        Self::EmergencyRadioOnTimeout,
        Self::EnableCellularOnBootSetting,
        Self::EsimProfileActivationSetting,
        Self::EsimTestMode,
        Self::ExitCellLinger,
        Self::MobileSignalDetectorSetting,
        Self::NewOutgoingCall,
        Self::NumCellularReqUpdate,
        Self::NumHighBandwidthReqUpdate,
        Self::OnBootCompleted,
        Self::OnUserUnlocked,
        Self::PowerSaveModeChanged,
        Self::ProxyConnectedUpdate,
        Self::SignalStateChanged,
        Self::SimStateChanged,
        Self::SubscriptionPhoneStateChanged,
        Self::SubscriptionsChanged,
        Self::ThermalEmergencyModeUpdate,
        Self::UserAbsentRadiosOffChanged,
        Self::VowifiStateUpdate,
        Self::WifiConnectedUpdate,
        Self::WifiDisconnectedUpdate,
        Self::Unknown,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::ActivityModeUpdate => "ACTIVITY_MODE_UPDATE",
            Self::CallStateChangedEmergencyEnded => "CALL_STATE_CHANGED_EMERGENCY_ENDED",
            Self::CallStateChangedEmergencyEndedDelayed => {
                "CALL_STATE_CHANGED_EMERGENCY_ENDED_DELAYED"
            }
            Self::CellAutoSetting => "CELL_AUTO_SETTING",
            Self::CellOnSetting => "CELL_ON_SETTING",
            Self::CellOnlyModeUpdate => "CELL_ONLY_MODE_UPDATE",
            Self::ConnectionStateChangedPdnDisconnected => {
                "CONNECTION_STATE_CHANGED_PDN_DISCONNECTED"
            }
            Self::DeviceEnableChanged => "DEVICE_ENABLE_CHANGED",
            Self::DeviceIdleModeChanged => "DEVICE_IDLE_MODE_CHANGED",
            Self::EmergencyCallbackModeChanged => "EMERGENCY_CALLBACK_MODE_CHANGED",
            Self::EmergencyRadioOnTimeout => "EMERGENCY_RADIO_ON_TIMEOUT",
            Self::EnableCellularOnBootSetting => "ENABLE_CELLULAR_ON_BOOT_SETTING",
            Self::EsimProfileActivationSetting => "ESIM_PROFILE_ACTIVATION_SETTING",
            Self::EsimTestMode => "ESIM_TEST_MODE",
            Self::ExitCellLinger => "EXIT_CELL_LINGER",
            Self::MobileSignalDetectorSetting => "MOBILE_SIGNAL_DETECTOR_SETTING",
            Self::NewOutgoingCall => "NEW_OUTGOING_CALL",
            Self::NumCellularReqUpdate => "NUM_CELLULAR_REQ_UPDATE",
            Self::NumHighBandwidthReqUpdate => "NUM_HIGH_BANDWIDTH_REQ_UPDATE",
            Self::OnBootCompleted => "ON_BOOT_COMPLETED",
            Self::OnUserUnlocked => "ON_USER_UNLOCKED",
            Self::PowerSaveModeChanged => "POWER_SAVE_MODE_CHANGED",
            Self::ProxyConnectedUpdate => "PROXY_CONNECTED_UPDATE",
            Self::SignalStateChanged => "SIGNAL_STATE_CHANGED",
            Self::SimStateChanged => "SIM_STATE_CHANGED",
            Self::SubscriptionPhoneStateChanged => "SUBSCRIPTION_PHONE_STATE_CHANGED",
            Self::SubscriptionsChanged => "SUBSCRIPTIONS_CHANGED",
            Self::ThermalEmergencyModeUpdate => "THERMAL_EMERGENCY_MODE_UPDATE",
            Self::UserAbsentRadiosOffChanged => "USER_ABSENT_RADIOS_OFF_CHANGED",
            Self::VowifiStateUpdate => "VOWIFI_STATE_UPDATE",
            Self::WifiConnectedUpdate => "WIFI_CONNECTED_UPDATE",
            Self::WifiDisconnectedUpdate => "WIFI_DISCONNECTED_UPDATE",
        }
    }

    /// Parse a trigger name.  Unrecognised names map to [`Trigger::Unknown`].
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Output of one policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub enable: bool,
    pub reason: Reason,
}

impl Decision {
    pub const fn on(reason: Reason) -> Self {
        Self { enable: true, reason }
    }

    pub const fn off(reason: Reason) -> Self {
        Self {
            enable: false,
            reason,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", if self.enable { "on" } else { "off" }, self.reason)
    }
}

/// Evaluate the cascade against `state`.
///
/// Returns `None` before boot has completed: no decision is produced and
/// callers must not perform any side effect.
pub fn evaluate(state: &SignalState) -> Option<Decision> {
    if !state.booted {
        return None;
    }
    let rule = rules::first_match(state);
    Some(rule.decision())
}
