//! Fuzz target: signal feed → `CellMediator`
//!
//! Each input line that parses as a `Signal` is handled by a mediator
//! wired to inert ports; timers armed along the way fire immediately
//! after the signal that armed them.  The mediator must never panic and
//! its history must stay within capacity.
//!
//! cargo fuzz run fuzz_signal_feed

#![no_main]

use std::time::Duration;

use cellmediator::app::commands::{Message, Signal};
use cellmediator::app::events::MediatorEvent;
use cellmediator::app::ports::{
    ClockPort, ConnectivityPackagePort, EventSink, RadioConfirmationPort, RadioPowerPort,
    SettingsPort, SignalDetectorPort, TimerPort,
};
use cellmediator::app::service::CellMediator;
use cellmediator::config::MediatorConfig;
use cellmediator::hysteresis::TimerKind;
use libfuzzer_sys::fuzz_target;

#[derive(Default)]
struct Inert {
    now_ms: u64,
    armed: Vec<(TimerKind, u64)>,
}

impl RadioPowerPort for Inert {
    fn set_radio_power(&mut self, _enable: bool) {}
}

impl ConnectivityPackagePort for Inert {
    fn on_cellular_radio_state(&mut self, _enable: bool) {}
}

impl SignalDetectorPort for Inert {
    fn start_detector(&mut self) {}
    fn stop_detector(&mut self) {}
}

impl SettingsPort for Inert {
    fn put_enable_cellular_on_boot(&mut self, _enabled: bool) {}
    fn put_esim_test_mode(&mut self, _enabled: bool) {}
}

impl EventSink for Inert {
    fn emit(&mut self, _event: &MediatorEvent) {}
}

impl TimerPort for Inert {
    fn schedule(&mut self, kind: TimerKind, token: u64, _after: Duration, _window: Duration) {
        self.armed.retain(|(k, _)| *k != kind);
        self.armed.push((kind, token));
    }

    fn cancel(&mut self, kind: TimerKind) {
        self.armed.retain(|(k, _)| *k != kind);
    }
}

impl RadioConfirmationPort for Inert {
    fn arm(&mut self) {}

    fn wait(&mut self, _timeout: Duration) -> bool {
        true
    }
}

impl ClockPort for Inert {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut mediator = CellMediator::new(MediatorConfig::default());
    let mut io = Inert::default();

    for line in text.lines() {
        let Ok(signal) = serde_json::from_str::<Signal>(line) else {
            continue;
        };
        mediator.handle(signal, &mut io);
        io.now_ms += 1_000;

        for (kind, token) in std::mem::take(&mut io.armed) {
            mediator.handle(Message::TimerFired { kind, token }, &mut io);
        }
        assert!(mediator.history().len() <= mediator.history().capacity());
    }
});
