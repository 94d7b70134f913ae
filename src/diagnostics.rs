//! Runtime diagnostics.
//!
//! [`Snapshot`] captures the full mediator state (signals, hysteresis,
//! history, counters) as a serializable value; [`render`] turns it into
//! the human-readable dump.

use core::fmt;

use serde::Serialize;

use crate::app::service::CellMediator;
use crate::config::DeviceProfile;
use crate::history::{self, HistoryEntry};
use crate::hysteresis::{PendingDelay, PendingLinger};
use crate::policy::{Decision, SignalState, Trigger};

/// Counters maintained by the mediator since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeMetrics {
    pub evaluations: u64,
    pub radio_toggles: u64,
    pub confirmation_timeouts: u64,
    pub stale_timer_firings: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HysteresisSnapshot {
    pub linger: Option<PendingLinger>,
    pub delay: Option<PendingDelay>,
    pub should_delay_next_enable: bool,
    pub linger_duration_ms: i64,
    pub linger_window_ms: u64,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LastDecision {
    pub decision: Decision,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub device: DeviceProfile,
    pub signals: SignalState,
    pub radio_on: Option<bool>,
    pub hysteresis: HysteresisSnapshot,
    pub last_decision: Option<LastDecision>,
    pub metrics: RuntimeMetrics,
    pub history: Vec<HistoryEntry>,
    pub history_capacity: usize,
}

pub fn snapshot(mediator: &CellMediator) -> Snapshot {
    let h = mediator.hysteresis();
    Snapshot {
        device: mediator.config().device,
        signals: mediator.state().clone(),
        radio_on: mediator.radio_on(),
        hysteresis: HysteresisSnapshot {
            linger: h.linger().copied(),
            delay: h.delay().copied(),
            should_delay_next_enable: h.should_delay_next_enable(),
            linger_duration_ms: h.linger_duration_ms(),
            linger_window_ms: millis(h.linger_window()),
            delay_ms: millis(h.delay_duration()),
        },
        last_decision: mediator
            .last_decision()
            .map(|(decision, trigger)| LastDecision { decision, trigger }),
        metrics: *mediator.metrics(),
        history: mediator.history().to_vec(),
        history_capacity: mediator.history().capacity(),
    }
}

pub fn render(snap: &Snapshot) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_dump(snap, &mut out);
    out
}

fn write_dump(snap: &Snapshot, out: &mut impl fmt::Write) -> fmt::Result {
    let s = &snap.signals;
    let h = &snap.hysteresis;

    writeln!(out, "======== CellMediator ========")?;
    writeln!(out, "Booted: {}  User unlocked: {}", s.booted, s.user_unlocked)?;
    writeln!(
        out,
        "Radio on: {}",
        match snap.radio_on {
            Some(true) => "on",
            Some(false) => "off",
            None => "unknown",
        }
    )?;
    if let Some(last) = snap.last_decision {
        writeln!(out, "Last decision: {} ({})", last.decision, last.trigger)?;
    }

    writeln!(out, "-- Settings --")?;
    writeln!(out, "  cell_auto={} cell_on={}", s.cell_auto, s.cell_on)?;
    writeln!(
        out,
        "  off_during_power_save={} off_when_wifi_connected={}",
        s.off_during_power_save, s.off_when_wifi_connected
    )?;
    writeln!(
        out,
        "  user_absent_radios_off={} mobile_signal_detector_allowed={}",
        s.user_absent_radios_off, s.mobile_signal_detector_allowed
    )?;

    writeln!(out, "-- Device --")?;
    writeln!(
        out,
        "  esim_device={} local_edition={} active_esim={}",
        snap.device.esim_device, snap.device.local_edition, s.has_active_esim_subscription
    )?;
    writeln!(
        out,
        "  esim_profile_deactivated={} esim_test_mode={} icc_state={}",
        s.esim_profile_deactivated,
        s.esim_test_mode,
        s.icc_state.as_str()
    )?;
    writeln!(
        out,
        "  device_enabled={} affects_cellular={} thermal_emergency={}",
        s.device_enabled, s.device_enable_affects_cellular, s.thermal_emergency
    )?;
    writeln!(
        out,
        "  device_idle={} doze_allowlisted={} activity_mode={} cell_only_mode={} power_save={}",
        s.device_idle, s.doze_cellular_allowlisted, s.activity_mode, s.cell_only_mode, s.in_power_save
    )?;

    writeln!(out, "-- Calls --")?;
    writeln!(
        out,
        "  in_call={} emergency_call={} ecbm={} radio_on_after_emergency={}",
        s.in_telephony_call, s.in_emergency_call, s.in_ecbm, s.radio_on_after_emergency_call
    )?;

    writeln!(out, "-- Connectivity --")?;
    writeln!(
        out,
        "  proxy_connected={} wifi_connected={} vowifi_active={}",
        s.proxy_connected, s.wifi_connected, s.vowifi_active
    )?;
    writeln!(
        out,
        "  high_bandwidth_requests={} cellular_requests={}",
        s.high_bandwidth_requests, s.cellular_requests
    )?;
    writeln!(
        out,
        "  detector_started={} signal_quality={}",
        s.detector_started,
        s.signal_quality.as_str()
    )?;

    writeln!(out, "-- Hysteresis --")?;
    writeln!(
        out,
        "  linger_duration={}ms linger_window={}ms delay={}ms",
        h.linger_duration_ms, h.linger_window_ms, h.delay_ms
    )?;
    match (&h.linger, &h.delay) {
        (Some(l), _) => writeln!(
            out,
            "  LINGERING {}:{} until {}ms",
            l.reason, l.trigger, l.deadline_ms
        )?,
        (None, Some(d)) => writeln!(out, "  DELAYING {} until {}ms", d.trigger, d.deadline_ms)?,
        (None, None) => writeln!(out, "  STEADY")?,
    }
    writeln!(out, "  should_delay_next_enable={}", h.should_delay_next_enable)?;

    let m = &snap.metrics;
    writeln!(out, "-- Metrics --")?;
    writeln!(
        out,
        "  evaluations={} toggles={} confirmation_timeouts={} stale_timers={}",
        m.evaluations, m.radio_toggles, m.confirmation_timeouts, m.stale_timer_firings
    )?;

    history::write_entries(out, &snap.history, snap.history_capacity)
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
