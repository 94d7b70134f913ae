//! Outbound mediator events.
//!
//! The [`CellMediator`](super::service::CellMediator) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  One
//! [`MediatorEvent::RadioPowerChanged`] per applied toggle is the
//! structured event-log record; the rest mark hysteresis transitions.

use serde::Serialize;

use crate::policy::{Reason, Trigger};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MediatorEvent {
    /// Boot completed; evaluation is live from here on.
    Booted { proxy_connected: bool },

    /// The worker issued a radio power toggle.
    RadioPowerChanged {
        enable: bool,
        reason: Reason,
        trigger: Trigger,
        timestamp_ms: u64,
    },

    /// The modem did not confirm a toggle within the wait bound.
    ConfirmationTimedOut { enable: bool, waited_ms: u64 },

    LingerStarted { reason: Reason, trigger: Trigger, deadline_ms: u64 },
    LingerExpired { reason: Reason, trigger: Trigger },
    DelayStarted { trigger: Trigger, deadline_ms: u64 },
}
