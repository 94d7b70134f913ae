//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each mediator event as one
//! structured log line.  The `RADIO` lines are the toggle event log.

use log::{info, warn};

use crate::app::events::MediatorEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`MediatorEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &MediatorEvent) {
        match event {
            MediatorEvent::Booted { proxy_connected } => {
                info!("BOOT | proxy_connected={}", proxy_connected);
            }
            MediatorEvent::RadioPowerChanged {
                enable,
                reason,
                trigger,
                timestamp_ms,
            } => {
                info!(
                    "RADIO | on={} reason={} trigger={} t={}ms",
                    enable, reason, trigger, timestamp_ms
                );
            }
            MediatorEvent::ConfirmationTimedOut { enable, waited_ms } => {
                warn!("RADIO | on={} unconfirmed after {}ms", enable, waited_ms);
            }
            MediatorEvent::LingerStarted {
                reason,
                trigger,
                deadline_ms,
            } => {
                info!(
                    "LINGER | start reason={} trigger={} until={}ms",
                    reason, trigger, deadline_ms
                );
            }
            MediatorEvent::LingerExpired { reason, trigger } => {
                info!("LINGER | expired reason={} trigger={}", reason, trigger);
            }
            MediatorEvent::DelayStarted {
                trigger,
                deadline_ms,
            } => {
                info!("DELAY | start trigger={} until={}ms", trigger, deadline_ms);
            }
        }
    }
}
