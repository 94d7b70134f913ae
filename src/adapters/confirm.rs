//! Radio power confirmation from service-state updates.
//!
//! The modem acknowledges a power change only indirectly: its service
//! state moves into or out of `PowerOff`.  [`ServiceStateMonitor`] sits on
//! the platform's service-state callback and wakes the blocked worker on
//! exactly those transitions; [`ConfirmationWaiter`] is the worker side.
//!
//! ```text
//!  platform callback ──▶ ServiceStateMonitor ──(bounded(1))──▶ ConfirmationWaiter
//!                        PowerOff ⇄ other only                 (worker blocks here)
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::app::ports::RadioConfirmationPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ServiceState {
    InService = 0,
    OutOfService = 1,
    EmergencyOnly = 2,
    PowerOff = 3,
}

impl ServiceState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::InService,
            1 => Self::OutOfService,
            2 => Self::EmergencyOnly,
            _ => Self::PowerOff,
        }
    }

    pub const fn is_power_off(self) -> bool {
        matches!(self, Self::PowerOff)
    }
}

/// Build a connected monitor/waiter pair.  The modem is assumed powered
/// off until told otherwise.
pub fn confirmation_channel() -> (ServiceStateMonitor, ConfirmationWaiter) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (
        ServiceStateMonitor {
            last: AtomicU8::new(ServiceState::PowerOff as u8),
            tx,
        },
        ConfirmationWaiter { rx },
    )
}

/// Platform side.  Shareable across threads behind an `Arc`.
#[derive(Debug)]
pub struct ServiceStateMonitor {
    last: AtomicU8,
    tx: Sender<()>,
}

impl ServiceStateMonitor {
    pub fn on_service_state_changed(&self, state: ServiceState) {
        let previous = ServiceState::from_u8(self.last.swap(state as u8, Ordering::AcqRel));
        if previous.is_power_off() == state.is_power_off() {
            return;
        }
        debug!("Radio power transition {:?} -> {:?}", previous, state);
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => debug!("Confirmation waiter gone"),
        }
    }

    pub fn last_state(&self) -> ServiceState {
        ServiceState::from_u8(self.last.load(Ordering::Acquire))
    }
}

/// Worker side.
#[derive(Debug)]
pub struct ConfirmationWaiter {
    rx: Receiver<()>,
}

impl RadioConfirmationPort for ConfirmationWaiter {
    fn arm(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }

    fn wait(&mut self, timeout: Duration) -> bool {
        self.rx.recv_timeout(timeout).is_ok()
    }
}
