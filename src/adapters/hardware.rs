//! Host hardware adapter: a simulated modem behind the collaborator ports.
//!
//! Stands in for the telephony stack, connectivity package, signal
//! detector and settings store when the daemon runs off-device.  Every
//! outbound call is logged.  With a [`ServiceStateMonitor`] attached, a
//! power toggle is echoed back as the matching service-state change so
//! the worker's confirmation wait completes immediately.

use std::sync::Arc;

use log::info;

use super::confirm::{ServiceState, ServiceStateMonitor};
use super::log_sink::LogEventSink;
use crate::app::events::MediatorEvent;
use crate::app::ports::{
    ConnectivityPackagePort, EventSink, RadioPowerPort, SettingsPort, SignalDetectorPort,
};

pub struct SimulatedModem {
    monitor: Option<Arc<ServiceStateMonitor>>,
    sink: LogEventSink,
    detector_running: bool,
}

impl SimulatedModem {
    /// A modem that never confirms; every toggle runs into the wait bound.
    pub fn new() -> Self {
        Self {
            monitor: None,
            sink: LogEventSink::new(),
            detector_running: false,
        }
    }

    /// A modem that confirms every toggle through `monitor`.
    pub fn confirming(monitor: Arc<ServiceStateMonitor>) -> Self {
        Self {
            monitor: Some(monitor),
            ..Self::new()
        }
    }
}

impl Default for SimulatedModem {
    fn default() -> Self {
        Self::new()
    }
}

// ── RadioPowerPort implementation ─────────────────────────────

impl RadioPowerPort for SimulatedModem {
    fn set_radio_power(&mut self, enable: bool) {
        info!("MODEM | set_radio_power({})", enable);
        if let Some(monitor) = &self.monitor {
            let state = if enable {
                ServiceState::InService
            } else {
                ServiceState::PowerOff
            };
            monitor.on_service_state_changed(state);
        }
    }
}

// ── ConnectivityPackagePort implementation ────────────────────

impl ConnectivityPackagePort for SimulatedModem {
    fn on_cellular_radio_state(&mut self, enable: bool) {
        info!("CONN | cellular radio -> {}", if enable { "on" } else { "off" });
    }
}

// ── SignalDetectorPort implementation ─────────────────────────

impl SignalDetectorPort for SimulatedModem {
    fn start_detector(&mut self) {
        if !self.detector_running {
            info!("DETECTOR | start");
            self.detector_running = true;
        }
    }

    fn stop_detector(&mut self) {
        if self.detector_running {
            info!("DETECTOR | stop");
            self.detector_running = false;
        }
    }
}

// ── SettingsPort implementation ───────────────────────────────

impl SettingsPort for SimulatedModem {
    fn put_enable_cellular_on_boot(&mut self, enabled: bool) {
        info!("SETTINGS | enable_cellular_on_boot={}", enabled);
    }

    fn put_esim_test_mode(&mut self, enabled: bool) {
        info!("SETTINGS | esim_test_mode={}", enabled);
    }
}

// ── EventSink implementation ──────────────────────────────────

impl EventSink for SimulatedModem {
    fn emit(&mut self, event: &MediatorEvent) {
        self.sink.emit(event);
    }
}
