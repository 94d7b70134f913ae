//! Hysteresis controller.
//!
//! Sits between the policy engine and the worker.  Turns each [`Decision`]
//! into a [`FinalAction`], deferring a proxy-connected disable behind a
//! linger timer and deferring a proxy-disconnected enable behind a delay
//! timer after certain disables.
//!
//! ```text
//!             ┌── OFF_PROXY_CONNECTED, linger > 0 ──▶ LINGERING
//!   STEADY ───┤                                        │ fire: re-evaluate
//!     ▲       │                                        │ with EXIT_CELL_LINGER
//!     │       └── ON_PROXY_DISCONNECTED after ────▶ DELAYING
//!     │           power-save/thermal/user-absent/      │ fire: apply
//!     │           cell-setting (cell-auto on)          │ ON_PROXY_DISCONNECTED
//!     └────────────────────────────────────────────────┘
//! ```
//!
//! Timers are identified by a [`TimerKind`] and a token.  Every arm issues a
//! fresh token; a firing whose token no longer matches the pending timer is
//! stale and ignored.

use std::time::Duration;

use log::{debug, info};
use serde::Serialize;

use crate::app::ports::TimerPort;
use crate::config::MediatorConfig;
use crate::policy::{Decision, Reason, Trigger};

/// The timers the mediator owns.  One slot per kind; arming a kind replaces
/// whatever was pending for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Linger,
    Delay,
    EmergencyRadioOn,
}

impl TimerKind {
    pub const COUNT: usize = 3;
    pub const ALL: [TimerKind; Self::COUNT] = [Self::Linger, Self::Delay, Self::EmergencyRadioOn];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linger => "linger",
            Self::Delay => "delay",
            Self::EmergencyRadioOn => "emergency_radio_on",
        }
    }
}

/// A radio power change the worker must execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RadioCommand {
    pub enable: bool,
    pub reason: Reason,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalAction {
    ApplyNow(RadioCommand),
    ScheduleLinger,
    ScheduleDelay,
    /// The transition is already pending.
    NoOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingLinger {
    pub reason: Reason,
    pub trigger: Trigger,
    pub deadline_ms: u64,
    #[serde(skip)]
    token: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingDelay {
    pub trigger: Trigger,
    pub deadline_ms: u64,
    #[serde(skip)]
    token: u64,
}

/// Result of delivering a timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// Cancelled or superseded since it was armed.
    Stale,
    /// Re-evaluate the policy with [`Trigger::ExitCellLinger`].
    LingerExpired { reason: Reason, trigger: Trigger },
    /// Apply the deferred enable as-is.
    DelayExpired(RadioCommand),
}

#[derive(Debug, Clone)]
pub struct HysteresisController {
    linger_duration_ms: i64,
    linger_window: Duration,
    delay_duration: Duration,
    linger: Option<PendingLinger>,
    delay: Option<PendingDelay>,
    should_delay_next_enable: bool,
    next_token: u64,
}

impl HysteresisController {
    pub fn new(config: &MediatorConfig) -> Self {
        Self {
            linger_duration_ms: config.cell_linger_duration_ms,
            linger_window: Duration::from_millis(config.max_acceptable_linger_delay_ms),
            delay_duration: Duration::from_millis(config.cell_delay_ms),
            linger: None,
            delay: None,
            should_delay_next_enable: false,
            next_token: 0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn linger(&self) -> Option<&PendingLinger> {
        self.linger.as_ref()
    }

    pub fn delay(&self) -> Option<&PendingDelay> {
        self.delay.as_ref()
    }

    pub fn is_lingering(&self) -> bool {
        self.linger.is_some()
    }

    pub fn is_delaying(&self) -> bool {
        self.delay.is_some()
    }

    pub fn should_delay_next_enable(&self) -> bool {
        self.should_delay_next_enable
    }

    pub fn linger_duration_ms(&self) -> i64 {
        self.linger_duration_ms
    }

    pub fn linger_window(&self) -> Duration {
        self.linger_window
    }

    pub fn delay_duration(&self) -> Duration {
        self.delay_duration
    }

    /// Takes effect from the next proxy-connected disable.  A value <= 0
    /// disables lingering.
    pub fn set_linger_duration_ms(&mut self, duration_ms: i64) {
        self.linger_duration_ms = duration_ms;
    }

    // ── Arbitration ───────────────────────────────────────────

    /// Map a policy decision onto a final action, arming or cancelling
    /// timers through `timers` as a side effect.
    ///
    /// `cell_auto` is the cell-auto setting at the time of this call.
    pub fn arbitrate<T: TimerPort + ?Sized>(
        &mut self,
        decision: Decision,
        trigger: Trigger,
        cell_auto: bool,
        now_ms: u64,
        timers: &mut T,
    ) -> FinalAction {
        let Decision { enable, reason } = decision;

        if reason == Reason::OnProxyDisconnected && self.should_delay_next_enable && cell_auto {
            return self.delay_enable(trigger, now_ms, timers);
        }

        if self.delay.is_some() && !reason.is_delay_exempt() {
            self.cancel_delay(timers);
        }

        let command = RadioCommand {
            enable,
            reason,
            trigger,
        };
        let action = if enable {
            self.cancel_linger(timers);
            if self.delay.is_some() {
                debug!("Inside cell delay, ignoring {}:{}", reason, trigger);
                FinalAction::NoOp
            } else {
                FinalAction::ApplyNow(command)
            }
        } else if self.lingers_on(reason) && trigger != Trigger::ExitCellLinger {
            if self.linger.is_none() {
                self.start_linger(reason, trigger, now_ms, timers);
                FinalAction::ScheduleLinger
            } else {
                debug!("Already lingering, ignoring {}:{}", reason, trigger);
                FinalAction::NoOp
            }
        } else {
            self.cancel_linger(timers);
            FinalAction::ApplyNow(command)
        };

        self.should_delay_next_enable = reason.delays_next_enable(cell_auto);
        action
    }

    /// Defer the next proxy-disconnected enable by the configured delay.
    /// Clears the should-delay flag.
    pub fn delay_enable<T: TimerPort + ?Sized>(
        &mut self,
        trigger: Trigger,
        now_ms: u64,
        timers: &mut T,
    ) -> FinalAction {
        self.should_delay_next_enable = false;
        self.cancel_linger(timers);
        let token = self.issue_token();
        timers.schedule(TimerKind::Delay, token, self.delay_duration, Duration::ZERO);
        self.delay = Some(PendingDelay {
            trigger,
            deadline_ms: now_ms.saturating_add(duration_ms(self.delay_duration)),
            token,
        });
        info!(
            "Delay cell {}ms for reason: {}:{}",
            self.delay_duration.as_millis(),
            Reason::OnProxyDisconnected,
            trigger
        );
        FinalAction::ScheduleDelay
    }

    /// Deliver a linger or delay firing.
    pub fn on_timer(&mut self, kind: TimerKind, token: u64) -> TimerOutcome {
        match kind {
            TimerKind::Linger => match self.linger {
                Some(linger) if linger.token == token => {
                    self.linger = None;
                    info!("Leaving cell linger state: {}:{}", linger.reason, linger.trigger);
                    TimerOutcome::LingerExpired {
                        reason: linger.reason,
                        trigger: linger.trigger,
                    }
                }
                _ => TimerOutcome::Stale,
            },
            TimerKind::Delay => match self.delay {
                Some(delay) if delay.token == token => {
                    self.delay = None;
                    info!("Leaving cell delay state: {}", delay.trigger);
                    TimerOutcome::DelayExpired(RadioCommand {
                        enable: true,
                        reason: Reason::OnProxyDisconnected,
                        trigger: delay.trigger,
                    })
                }
                _ => TimerOutcome::Stale,
            },
            TimerKind::EmergencyRadioOn => TimerOutcome::Stale,
        }
    }

    // ── Internals ─────────────────────────────────────────────

    fn lingers_on(&self, reason: Reason) -> bool {
        reason == Reason::OffProxyConnected && self.linger_duration_ms > 0
    }

    fn start_linger<T: TimerPort + ?Sized>(
        &mut self,
        reason: Reason,
        trigger: Trigger,
        now_ms: u64,
        timers: &mut T,
    ) {
        let duration = Duration::from_millis(self.linger_duration_ms.unsigned_abs());
        let token = self.issue_token();
        timers.schedule(TimerKind::Linger, token, duration, self.linger_window);
        self.linger = Some(PendingLinger {
            reason,
            trigger,
            deadline_ms: now_ms.saturating_add(duration_ms(duration)),
            token,
        });
        info!(
            "Enter cell linger state for {}ms, reason: {}:{}",
            duration.as_millis(),
            reason,
            trigger
        );
    }

    fn cancel_linger<T: TimerPort + ?Sized>(&mut self, timers: &mut T) {
        if let Some(linger) = self.linger.take() {
            timers.cancel(TimerKind::Linger);
            info!("Cancel cell linger: {}:{}", linger.reason, linger.trigger);
        }
    }

    fn cancel_delay<T: TimerPort + ?Sized>(&mut self, timers: &mut T) {
        if let Some(delay) = self.delay.take() {
            timers.cancel(TimerKind::Delay);
            info!("Cancel cell delay: {}", delay.trigger);
        }
    }

    fn issue_token(&mut self) -> u64 {
        self.next_token = self.next_token.wrapping_add(1);
        self.next_token
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
