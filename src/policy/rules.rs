//! The rule table.
//!
//! Each row is a plain `fn` predicate plus the decision it produces.  Rows
//! are scanned top to bottom and the first predicate that holds wins; the
//! last row always holds.  The order is the policy: do not reorder rows.

use super::state::{IccState, SignalQuality, SignalState};
use super::{Decision, Reason};

pub const RULE_COUNT: usize = 22;

/// One row of the cascade.
#[derive(Clone, Copy)]
pub struct Rule {
    pub reason: Reason,
    pub enable: bool,
    pub applies: fn(&SignalState) -> bool,
}

impl Rule {
    pub const fn decision(&self) -> Decision {
        Decision {
            enable: self.enable,
            reason: self.reason,
        }
    }
}

impl core::fmt::Debug for Rule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Rule")
            .field("reason", &self.reason)
            .field("enable", &self.enable)
            .finish_non_exhaustive()
    }
}

const fn on(reason: Reason, applies: fn(&SignalState) -> bool) -> Rule {
    Rule {
        reason,
        enable: true,
        applies,
    }
}

const fn off(reason: Reason, applies: fn(&SignalState) -> bool) -> Rule {
    Rule {
        reason,
        enable: false,
        applies,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Table
// ═══════════════════════════════════════════════════════════════════════════

pub static RULES: [Rule; RULE_COUNT] = [
    on(Reason::OnPhoneCall, in_phone_call),
    on(Reason::OnEmergency, emergency),
    off(Reason::OffDirectboot, locked),
    on(Reason::OnEsimTestMode, esim_test_mode),
    off(Reason::OffEsimDeactivated, esim_deactivated),
    on(Reason::OnCellOnlyMode, cell_only_mode),
    off(Reason::OffDeviceDisabled, device_disabled),
    off(Reason::OffThermalEmergency, thermal_emergency),
    off(Reason::OffUserAbsent, user_absent),
    off(Reason::OffCellSetting, cell_setting_off),
    on(Reason::OnNoCellAuto, no_cell_auto),
    off(Reason::OffInitialBoot, esim_initial_boot),
    off(Reason::OffSimAbsent, esim_without_sim),
    off(Reason::OffSimAbsent, psim_absent),
    off(Reason::OffActivityMode, activity_mode),
    off(Reason::OffPowerSave, power_save),
    on(Reason::OnNetworkRequest, network_request),
    off(Reason::OffNoSignal, no_signal),
    off(Reason::OffUnstableSignal, unstable_signal),
    off(Reason::OffWifiConnected, wifi_instead),
    on(Reason::OnProxyDisconnected, proxy_disconnected),
    off(Reason::OffProxyConnected, always),
];

/// Index of the first row whose predicate holds.
pub fn first_match_index(state: &SignalState) -> usize {
    RULES
        .iter()
        .position(|rule| (rule.applies)(state))
        .unwrap_or(RULE_COUNT - 1)
}

pub fn first_match(state: &SignalState) -> &'static Rule {
    &RULES[first_match_index(state)]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Predicates
// ═══════════════════════════════════════════════════════════════════════════

fn in_phone_call(s: &SignalState) -> bool {
    s.in_telephony_call
}

fn emergency(s: &SignalState) -> bool {
    s.emergency_active()
}

fn locked(s: &SignalState) -> bool {
    !s.user_unlocked
}

fn esim_test_mode(s: &SignalState) -> bool {
    s.esim_device && s.esim_test_mode
}

fn esim_deactivated(s: &SignalState) -> bool {
    s.esim_device && !s.local_edition && s.esim_profile_deactivated
}

fn cell_only_mode(s: &SignalState) -> bool {
    s.cell_only_mode
}

fn device_disabled(s: &SignalState) -> bool {
    s.device_enable_affects_cellular && !s.device_enabled
}

fn thermal_emergency(s: &SignalState) -> bool {
    s.thermal_emergency
}

fn user_absent(s: &SignalState) -> bool {
    s.user_absent_blocks_cellular()
}

fn cell_setting_off(s: &SignalState) -> bool {
    !s.cell_on
}

fn no_cell_auto(s: &SignalState) -> bool {
    !s.cell_auto && s.cell_on
}

fn esim_initial_boot(s: &SignalState) -> bool {
    s.esim_device && s.icc_state == IccState::InitialBoot
}

fn esim_without_sim(s: &SignalState) -> bool {
    s.esim_device && !s.has_active_esim_subscription && !s.psim_loaded()
}

fn psim_absent(s: &SignalState) -> bool {
    !s.esim_device && s.icc_state == IccState::Absent
}

fn activity_mode(s: &SignalState) -> bool {
    s.activity_mode
}

fn power_save(s: &SignalState) -> bool {
    s.off_during_power_save && s.in_power_save
}

fn network_request(s: &SignalState) -> bool {
    s.has_network_demand()
}

fn no_signal(s: &SignalState) -> bool {
    s.detector_started && s.signal_quality == SignalQuality::NoSignal
}

fn unstable_signal(s: &SignalState) -> bool {
    s.detector_started && s.signal_quality == SignalQuality::Unstable
}

fn wifi_instead(s: &SignalState) -> bool {
    !s.proxy_connected && s.turn_off_when_wifi_connected() && s.wifi_connected
}

fn proxy_disconnected(s: &SignalState) -> bool {
    !s.proxy_connected
}

fn always(_: &SignalState) -> bool {
    true
}
