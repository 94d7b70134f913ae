//! Alarm scheduler.
//!
//! One-shot, windowed alarms on a dedicated thread.  The mediator arms
//! them through [`AlarmHandle`] (its [`TimerPort`]) and the scheduler
//! reports firings to an [`AlarmDelegate`], which for the worker posts a
//! `TimerFired` message back onto the mediator queue.
//!
//! ```text
//!  CellMediator ──TimerPort──▶ AlarmHandle ──Control──▶ ┌────────────────┐
//!                                                       │ alarm thread   │
//!                                                       │ [Linger]       │
//!  worker queue ◀──TimerFired── AlarmDelegate ◀──fire── │ [Delay]        │
//!                                                       │ [EmergencyOn]  │
//!                                                       └────────────────┘
//! ```
//!
//! An alarm armed with `window` W becomes due at its deadline and fires no
//! later than deadline + W.  Within that window it is batched with the next
//! wakeup the thread has for another reason, mirroring inexact platform
//! alarms.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use crate::app::ports::{AlarmDelegate, TimerPort};
use crate::error::{Result, SchedulerError};
use crate::hysteresis::TimerKind;

// ═══════════════════════════════════════════════════════════════
//  Alarm table
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Alarm {
    token: u64,
    deadline: Instant,
    window: Duration,
}

impl Alarm {
    fn latest(&self) -> Instant {
        self.deadline.checked_add(self.window).unwrap_or(self.deadline)
    }
}

/// One slot per [`TimerKind`].  Arming a kind overwrites its slot.
#[derive(Debug, Default)]
struct AlarmTable {
    slots: [Option<Alarm>; TimerKind::COUNT],
}

impl AlarmTable {
    fn arm(&mut self, kind: TimerKind, alarm: Alarm) {
        self.slots[kind.index()] = Some(alarm);
    }

    fn cancel(&mut self, kind: TimerKind) {
        self.slots[kind.index()] = None;
    }

    /// The latest instant the thread may sleep until.
    fn next_wake(&self) -> Option<Instant> {
        self.slots.iter().flatten().map(Alarm::latest).min()
    }

    /// Remove and return every alarm whose deadline has passed.
    fn take_due(&mut self, now: Instant) -> Vec<(TimerKind, u64)> {
        let mut due = Vec::new();
        for kind in TimerKind::ALL {
            let slot = &mut self.slots[kind.index()];
            if slot.is_some_and(|a| a.deadline <= now) {
                if let Some(alarm) = slot.take() {
                    due.push((kind, alarm.token));
                }
            }
        }
        due
    }
}

// ═══════════════════════════════════════════════════════════════
//  Thread
// ═══════════════════════════════════════════════════════════════

enum Control {
    Arm { kind: TimerKind, alarm: Alarm },
    Cancel(TimerKind),
    Stop,
}

/// Owner of the alarm thread.  Dropping it stops the thread.
pub struct AlarmScheduler {
    tx: Sender<Control>,
    thread: Option<JoinHandle<()>>,
}

impl AlarmScheduler {
    pub fn spawn(delegate: impl AlarmDelegate + 'static) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("cellmediator-alarms".into())
            .spawn(move || run(&rx, delegate))
            .map_err(|_| SchedulerError::SpawnFailed)?;
        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> AlarmHandle {
        AlarmHandle {
            tx: self.tx.clone(),
        }
    }
}

impl Drop for AlarmScheduler {
    fn drop(&mut self) {
        let _ = self.tx.send(Control::Stop);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Alarm thread panicked");
            }
        }
    }
}

fn run(rx: &Receiver<Control>, mut delegate: impl AlarmDelegate) {
    let mut table = AlarmTable::default();
    loop {
        let msg = match table.next_wake() {
            Some(at) => rx.recv_deadline(at),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match msg {
            Ok(Control::Arm { kind, alarm }) => table.arm(kind, alarm),
            Ok(Control::Cancel(kind)) => table.cancel(kind),
            Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        for (kind, token) in table.take_due(Instant::now()) {
            debug!("Alarm {} fired (token {})", kind.as_str(), token);
            delegate.on_alarm(kind, token);
        }
    }
    info!("Alarm thread stopped");
}

// ═══════════════════════════════════════════════════════════════
//  Handle
// ═══════════════════════════════════════════════════════════════

/// Cloneable [`TimerPort`] into a running [`AlarmScheduler`].
#[derive(Clone)]
pub struct AlarmHandle {
    tx: Sender<Control>,
}

impl TimerPort for AlarmHandle {
    fn schedule(&mut self, kind: TimerKind, token: u64, after: Duration, window: Duration) {
        let Some(deadline) = Instant::now().checked_add(after) else {
            warn!("{} alarm {}ms out of range, dropping", kind.as_str(), after.as_millis());
            return;
        };
        let alarm = Alarm {
            token,
            deadline,
            window,
        };
        if self.tx.send(Control::Arm { kind, alarm }).is_err() {
            warn!("Alarm thread gone, dropping {} alarm", kind.as_str());
        }
    }

    fn cancel(&mut self, kind: TimerKind) {
        let _ = self.tx.send(Control::Cancel(kind));
    }
}
