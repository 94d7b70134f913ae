//! Mock platform for integration tests.
//!
//! Implements every port the mediator needs and records each call, so
//! tests can assert on the full outbound sequence.  Timers never fire on
//! their own: tests fire them explicitly with [`MockPlatform::fire`].

use std::time::Duration;

use cellmediator::app::commands::{Message, SettingsSnapshot, Signal};
use cellmediator::app::events::MediatorEvent;
use cellmediator::app::ports::{
    ClockPort, ConnectivityPackagePort, EventSink, RadioConfirmationPort, RadioPowerPort,
    SettingsPort, SignalDetectorPort, TimerPort,
};
use cellmediator::app::service::CellMediator;
use cellmediator::config::MediatorConfig;
use cellmediator::hysteresis::TimerKind;
use cellmediator::policy::{IccState, Reason};

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Connectivity(bool),
    ArmConfirmation,
    RadioPower(bool),
    DetectorStart,
    DetectorStop,
    EnableCellularOnBoot(bool),
    EsimTestMode(bool),
    Wait(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub token: u64,
    pub after: Duration,
    pub window: Duration,
}

// ── MockPlatform ──────────────────────────────────────────────

pub struct MockPlatform {
    pub calls: Vec<Call>,
    pub events: Vec<MediatorEvent>,
    pub armed: [Option<ArmedTimer>; TimerKind::COUNT],
    pub cancelled: Vec<TimerKind>,
    pub now_ms: u64,
    /// What `wait` returns.
    pub confirms: bool,
}

#[allow(dead_code)]
impl MockPlatform {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            events: Vec::new(),
            armed: [None; TimerKind::COUNT],
            cancelled: Vec::new(),
            now_ms: 0,
            confirms: true,
        }
    }

    pub fn clear(&mut self) {
        self.calls.clear();
        self.events.clear();
        self.cancelled.clear();
    }

    /// Every `set_radio_power` argument, in order.
    pub fn radio_commands(&self) -> Vec<bool> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::RadioPower(on) => Some(*on),
                _ => None,
            })
            .collect()
    }

    /// `(enable, reason)` of every toggle event, in order.
    pub fn changes(&self) -> Vec<(bool, Reason)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                MediatorEvent::RadioPowerChanged { enable, reason, .. } => Some((*enable, *reason)),
                _ => None,
            })
            .collect()
    }

    pub fn last_change(&self) -> Option<(bool, Reason)> {
        self.changes().last().copied()
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed[kind.index()].is_some()
    }

    pub fn armed_timer(&self, kind: TimerKind) -> Option<ArmedTimer> {
        self.armed[kind.index()]
    }

    /// The message the alarm service would post for a pending `kind`.
    /// Disarms it, as a real one-shot would.
    pub fn fire(&mut self, kind: TimerKind) -> Message {
        let timer = self.armed[kind.index()]
            .take()
            .unwrap_or_else(|| panic!("{kind:?} timer not armed"));
        self.now_ms += u64::try_from(timer.after.as_millis()).unwrap();
        Message::TimerFired {
            kind,
            token: timer.token,
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioPowerPort for MockPlatform {
    fn set_radio_power(&mut self, enable: bool) {
        self.calls.push(Call::RadioPower(enable));
    }
}

impl ConnectivityPackagePort for MockPlatform {
    fn on_cellular_radio_state(&mut self, enable: bool) {
        self.calls.push(Call::Connectivity(enable));
    }
}

impl SignalDetectorPort for MockPlatform {
    fn start_detector(&mut self) {
        self.calls.push(Call::DetectorStart);
    }

    fn stop_detector(&mut self) {
        self.calls.push(Call::DetectorStop);
    }
}

impl SettingsPort for MockPlatform {
    fn put_enable_cellular_on_boot(&mut self, enabled: bool) {
        self.calls.push(Call::EnableCellularOnBoot(enabled));
    }

    fn put_esim_test_mode(&mut self, enabled: bool) {
        self.calls.push(Call::EsimTestMode(enabled));
    }
}

impl EventSink for MockPlatform {
    fn emit(&mut self, event: &MediatorEvent) {
        self.events.push(event.clone());
    }
}

impl TimerPort for MockPlatform {
    fn schedule(&mut self, kind: TimerKind, token: u64, after: Duration, window: Duration) {
        self.armed[kind.index()] = Some(ArmedTimer {
            token,
            after,
            window,
        });
    }

    fn cancel(&mut self, kind: TimerKind) {
        self.armed[kind.index()] = None;
        self.cancelled.push(kind);
    }
}

impl RadioConfirmationPort for MockPlatform {
    fn arm(&mut self) {
        self.calls.push(Call::ArmConfirmation);
    }

    fn wait(&mut self, timeout: Duration) -> bool {
        self.calls.push(Call::Wait(timeout));
        self.confirms
    }
}

impl ClockPort for MockPlatform {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

// ── Fixtures ──────────────────────────────────────────────────

/// Settings matching the platform defaults.
#[allow(dead_code)]
pub fn default_settings() -> SettingsSnapshot {
    SettingsSnapshot {
        radio_on: Some(true),
        ..SettingsSnapshot::default()
    }
}

/// A mediator that has booted with `proxy_connected`, loaded its SIM and
/// been unlocked, with any boot-time linger or delay run to completion and
/// the mock's log cleared.
#[allow(dead_code)]
pub fn booted(config: MediatorConfig, proxy_connected: bool) -> (CellMediator, MockPlatform) {
    let mut mediator = CellMediator::new(config);
    let mut io = MockPlatform::new();
    mediator.handle(
        Signal::BootCompleted {
            proxy_connected,
            settings: default_settings(),
        },
        &mut io,
    );
    mediator.handle(
        Signal::SimStateChanged {
            icc_state: IccState::Loaded,
        },
        &mut io,
    );
    mediator.handle(Signal::UserUnlocked, &mut io);
    for kind in [TimerKind::Linger, TimerKind::Delay] {
        if io.is_armed(kind) {
            let msg = io.fire(kind);
            mediator.handle(msg, &mut io);
        }
    }
    io.clear();
    (mediator, io)
}

/// Config with lingering switched off.
#[allow(dead_code)]
pub fn no_linger() -> MediatorConfig {
    MediatorConfig {
        cell_linger_duration_ms: -999,
        ..MediatorConfig::default()
    }
}
