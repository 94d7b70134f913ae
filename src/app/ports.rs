//! Port traits: the boundary between the mediator and the platform.
//!
//! ```text
//!   CellMediator (domain) ──▶ Port trait ──▶ Adapter (modem, settings, log)
//! ```
//!
//! The [`CellMediator`](super::service::CellMediator) consumes these via
//! generics, so the domain core never touches a collaborator directly and
//! runs unchanged against the recording mocks in the integration tests.
//!
//! None of the outbound calls return errors: the hardware toggle is fire
//! and forget, and confirmation arrives separately through
//! [`RadioConfirmationPort`].

use std::time::Duration;

use super::events::MediatorEvent;
use crate::hysteresis::TimerKind;

// ───────────────────────────────────────────────────────────────
// Radio power (domain → modem)
// ───────────────────────────────────────────────────────────────

pub trait RadioPowerPort {
    /// Request the modem to power the radio on or off.  Unconditional:
    /// the mediator does not skip a toggle that matches the believed state.
    fn set_radio_power(&mut self, enable: bool);
}

// ───────────────────────────────────────────────────────────────
// Connectivity package notifier
// ───────────────────────────────────────────────────────────────

pub trait ConnectivityPackagePort {
    /// Tell the connectivity package which state the radio is heading to.
    /// Called before every toggle.
    fn on_cellular_radio_state(&mut self, enable: bool);
}

// ───────────────────────────────────────────────────────────────
// Mobile signal detector
// ───────────────────────────────────────────────────────────────

pub trait SignalDetectorPort {
    fn start_detector(&mut self);
    fn stop_detector(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Settings write-back
// ───────────────────────────────────────────────────────────────

/// The only settings the mediator writes.  Reads arrive as signals.
pub trait SettingsPort {
    fn put_enable_cellular_on_boot(&mut self, enabled: bool);
    fn put_esim_test_mode(&mut self, enabled: bool);
}

// ───────────────────────────────────────────────────────────────
// Event sink (domain → observers)
// ───────────────────────────────────────────────────────────────

pub trait EventSink {
    fn emit(&mut self, event: &MediatorEvent);
}

// ───────────────────────────────────────────────────────────────
// Timers
// ───────────────────────────────────────────────────────────────

/// One-shot timers keyed by kind.
///
/// Scheduling a kind replaces any pending timer of that kind.  When a timer
/// fires the implementation delivers `(kind, token)` back into the worker
/// queue as a [`Message::TimerFired`](super::commands::Message::TimerFired).
/// The firing may land anywhere in `[after, after + window]`.
pub trait TimerPort {
    fn schedule(&mut self, kind: TimerKind, token: u64, after: Duration, window: Duration);
    fn cancel(&mut self, kind: TimerKind);
}

/// Callback out of the alarm thread.
pub trait AlarmDelegate: Send {
    fn on_alarm(&mut self, kind: TimerKind, token: u64);
}

// ───────────────────────────────────────────────────────────────
// Radio power confirmation
// ───────────────────────────────────────────────────────────────

pub trait RadioConfirmationPort {
    /// Forget confirmations that arrived before the toggle about to be
    /// issued.
    fn arm(&mut self);

    /// Block until the modem confirms the change or `timeout` elapses.
    /// Returns `false` on timeout.
    fn wait(&mut self, timeout: Duration) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Monotonic milliseconds; only differences are meaningful.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Bundles
// ───────────────────────────────────────────────────────────────

/// The platform collaborators a caller hands to the worker.
pub trait Collaborators:
    RadioPowerPort + ConnectivityPackagePort + SignalDetectorPort + SettingsPort + EventSink
{
}

impl<T> Collaborators for T where
    T: RadioPowerPort + ConnectivityPackagePort + SignalDetectorPort + SettingsPort + EventSink
{
}

/// Everything [`CellMediator`](super::service::CellMediator) needs.
pub trait MediatorPorts: Collaborators + TimerPort + RadioConfirmationPort + ClockPort {}

impl<T> MediatorPorts for T where T: Collaborators + TimerPort + RadioConfirmationPort + ClockPort {}
