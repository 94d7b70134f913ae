//! Serialized execution worker.
//!
//! One thread owns the [`CellMediator`] and drains a single queue.  Every
//! external signal, every timer firing and every query is a queue entry,
//! so state is only ever touched from this thread.
//!
//! ```text
//!  MediatorHandle ──┐
//!  (any thread)     ├──▶ [ queue ] ──▶ worker thread ──▶ CellMediator
//!  AlarmScheduler ──┘                    │  process() each entry
//!                                        └─ execute() last ApplyNow,
//!                                           blocks on confirmation
//! ```
//!
//! After waking, the worker drains everything already queued and
//! executes only the final radio command of that batch.  While it is
//! blocked in the confirmation wait, further signals pile up and are
//! coalesced on the next pass.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};

use super::commands::{Message, SettingsSnapshot, Signal};
use super::events::MediatorEvent;
use super::ports::{
    AlarmDelegate, ClockPort, Collaborators, ConnectivityPackagePort, EventSink,
    RadioConfirmationPort, RadioPowerPort, SettingsPort, SignalDetectorPort, TimerPort,
};
use super::service::CellMediator;
use crate::adapters::confirm::ConfirmationWaiter;
use crate::adapters::time::MonotonicClock;
use crate::config::MediatorConfig;
use crate::diagnostics::Snapshot;
use crate::error::{Result, WorkerError};
use crate::history::HistoryEntry;
use crate::hysteresis::{RadioCommand, TimerKind};
use crate::policy::{IccState, SignalQuality};
use crate::scheduler::{AlarmHandle, AlarmScheduler};

// ───────────────────────────────────────────────────────────────
// Queue entries
// ───────────────────────────────────────────────────────────────

enum Envelope {
    Message(Message),
    Dump(Sender<String>),
    Snapshot(Sender<Snapshot>),
    History(Sender<Vec<HistoryEntry>>),
    Shutdown,
}

/// Posts alarm firings onto the worker queue.
struct QueueDelegate {
    tx: Sender<Envelope>,
}

impl AlarmDelegate for QueueDelegate {
    fn on_alarm(&mut self, kind: TimerKind, token: u64) {
        let _ = self
            .tx
            .send(Envelope::Message(Message::TimerFired { kind, token }));
    }
}

// ───────────────────────────────────────────────────────────────
// Worker-side port bundle
// ───────────────────────────────────────────────────────────────

struct WorkerIo<C> {
    collaborators: C,
    timers: AlarmHandle,
    confirmation: ConfirmationWaiter,
    clock: MonotonicClock,
}

impl<C: RadioPowerPort> RadioPowerPort for WorkerIo<C> {
    fn set_radio_power(&mut self, enable: bool) {
        self.collaborators.set_radio_power(enable);
    }
}

impl<C: ConnectivityPackagePort> ConnectivityPackagePort for WorkerIo<C> {
    fn on_cellular_radio_state(&mut self, enable: bool) {
        self.collaborators.on_cellular_radio_state(enable);
    }
}

impl<C: SignalDetectorPort> SignalDetectorPort for WorkerIo<C> {
    fn start_detector(&mut self) {
        self.collaborators.start_detector();
    }

    fn stop_detector(&mut self) {
        self.collaborators.stop_detector();
    }
}

impl<C: SettingsPort> SettingsPort for WorkerIo<C> {
    fn put_enable_cellular_on_boot(&mut self, enabled: bool) {
        self.collaborators.put_enable_cellular_on_boot(enabled);
    }

    fn put_esim_test_mode(&mut self, enabled: bool) {
        self.collaborators.put_esim_test_mode(enabled);
    }
}

impl<C: EventSink> EventSink for WorkerIo<C> {
    fn emit(&mut self, event: &MediatorEvent) {
        self.collaborators.emit(event);
    }
}

impl<C> TimerPort for WorkerIo<C> {
    fn schedule(&mut self, kind: TimerKind, token: u64, after: Duration, window: Duration) {
        self.timers.schedule(kind, token, after, window);
    }

    fn cancel(&mut self, kind: TimerKind) {
        self.timers.cancel(kind);
    }
}

impl<C> RadioConfirmationPort for WorkerIo<C> {
    fn arm(&mut self) {
        self.confirmation.arm();
    }

    fn wait(&mut self, timeout: Duration) -> bool {
        self.confirmation.wait(timeout)
    }
}

impl<C> ClockPort for WorkerIo<C> {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

// ───────────────────────────────────────────────────────────────
// Worker
// ───────────────────────────────────────────────────────────────

/// Owner of the worker and alarm threads.
pub struct MediatorWorker {
    handle: MediatorHandle,
    thread: Option<JoinHandle<()>>,
    // Dropped after the worker thread has been joined.
    scheduler: Option<AlarmScheduler>,
}

impl MediatorWorker {
    /// Validate `config` and start the worker.  Confirmations for
    /// `waiter` come from the [`ServiceStateMonitor`] it was created with.
    ///
    /// [`ServiceStateMonitor`]: crate::adapters::confirm::ServiceStateMonitor
    pub fn spawn<C>(
        config: MediatorConfig,
        collaborators: C,
        waiter: ConfirmationWaiter,
    ) -> Result<Self>
    where
        C: Collaborators + Send + 'static,
    {
        config.validate()?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let scheduler = AlarmScheduler::spawn(QueueDelegate { tx: tx.clone() })?;
        let io = WorkerIo {
            collaborators,
            timers: scheduler.handle(),
            confirmation: waiter,
            clock: MonotonicClock::new(),
        };
        let mediator = CellMediator::new(config);

        let thread = thread::Builder::new()
            .name("cellmediator-radio-power".into())
            .spawn(move || run(mediator, io, &rx))
            .map_err(|_| WorkerError::SpawnFailed)?;

        Ok(Self {
            handle: MediatorHandle { tx },
            thread: Some(thread),
            scheduler: Some(scheduler),
        })
    }

    pub fn handle(&self) -> MediatorHandle {
        self.handle.clone()
    }

    /// Stop the worker after it finishes what is already queued.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        let _ = self.handle.tx.send(Envelope::Shutdown);
        let joined = thread.join().map_err(|_| WorkerError::Panicked);
        self.scheduler.take();
        joined?;
        Ok(())
    }
}

impl Drop for MediatorWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Worker shutdown: {}", e);
        }
    }
}

fn run<C: Collaborators>(mut mediator: CellMediator, mut io: WorkerIo<C>, rx: &Receiver<Envelope>) {
    info!("Radio power worker started");
    while let Ok(first) = rx.recv() {
        let mut pending: Option<RadioCommand> = None;
        for envelope in std::iter::once(first).chain(rx.try_iter()) {
            match envelope {
                Envelope::Message(msg) => {
                    if let Some(cmd) = mediator.process(msg, &mut io) {
                        pending = Some(cmd);
                    }
                }
                Envelope::Dump(reply) => {
                    flush(&mut mediator, &mut pending, &mut io);
                    let _ = reply.send(mediator.dump());
                }
                Envelope::Snapshot(reply) => {
                    flush(&mut mediator, &mut pending, &mut io);
                    let _ = reply.send(mediator.snapshot());
                }
                Envelope::History(reply) => {
                    flush(&mut mediator, &mut pending, &mut io);
                    let _ = reply.send(mediator.history().to_vec());
                }
                Envelope::Shutdown => {
                    flush(&mut mediator, &mut pending, &mut io);
                    info!("Radio power worker stopped");
                    return;
                }
            }
        }
        flush(&mut mediator, &mut pending, &mut io);
    }
    info!("Radio power worker queue closed");
}

fn flush<C: Collaborators>(
    mediator: &mut CellMediator,
    pending: &mut Option<RadioCommand>,
    io: &mut WorkerIo<C>,
) {
    if let Some(cmd) = pending.take() {
        mediator.execute(cmd, io);
    }
}

// ───────────────────────────────────────────────────────────────
// Handle
// ───────────────────────────────────────────────────────────────

/// Cloneable entry point for every inbound event.  Each call enqueues and
/// returns immediately.
#[derive(Clone)]
pub struct MediatorHandle {
    tx: Sender<Envelope>,
}

impl MediatorHandle {
    pub fn send(&self, signal: Signal) -> Result<()> {
        self.tx
            .send(Envelope::Message(Message::Signal(signal)))
            .map_err(|_| WorkerError::Disconnected)?;
        Ok(())
    }

    /// Render the dump once everything queued before this call has been
    /// handled.
    pub fn dump(&self) -> Result<String> {
        self.query(Envelope::Dump)
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        self.query(Envelope::Snapshot)
    }

    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.query(Envelope::History)
    }

    fn query<T>(&self, make: impl FnOnce(Sender<T>) -> Envelope) -> Result<T> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.tx
            .send(make(reply_tx))
            .map_err(|_| WorkerError::Disconnected)?;
        let reply = reply_rx.recv().map_err(|_| WorkerError::NoReply)?;
        Ok(reply)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn boot_completed(&self, proxy_connected: bool, settings: SettingsSnapshot) -> Result<()> {
        self.send(Signal::BootCompleted {
            proxy_connected,
            settings,
        })
    }

    pub fn user_unlocked(&self) -> Result<()> {
        self.send(Signal::UserUnlocked)
    }

    // ── Power and device modes ────────────────────────────────

    pub fn power_save_changed(&self, in_power_save: bool) -> Result<()> {
        self.send(Signal::PowerSaveChanged { in_power_save })
    }

    pub fn device_idle_changed(&self, idle: bool, doze_cellular_allowlisted: bool) -> Result<()> {
        self.send(Signal::DeviceIdleChanged {
            idle,
            doze_cellular_allowlisted,
        })
    }

    pub fn activity_mode_changed(&self, enabled: bool) -> Result<()> {
        self.send(Signal::ActivityModeChanged { enabled })
    }

    pub fn cell_only_mode_changed(&self, enabled: bool) -> Result<()> {
        self.send(Signal::CellOnlyModeChanged { enabled })
    }

    pub fn thermal_emergency_changed(&self, enabled: bool, affects_cellular: bool) -> Result<()> {
        self.send(Signal::ThermalEmergencyChanged {
            enabled,
            affects_cellular,
        })
    }

    pub fn user_absent_radios_off_changed(&self, enabled: bool) -> Result<()> {
        self.send(Signal::UserAbsentRadiosOffChanged { enabled })
    }

    pub fn device_enable_changed(&self, enabled: bool, affects_cellular: bool) -> Result<()> {
        self.send(Signal::DeviceEnableChanged {
            enabled,
            affects_cellular,
        })
    }

    // ── Connectivity and demand ───────────────────────────────

    pub fn proxy_connected_changed(&self, connected: bool) -> Result<()> {
        self.send(Signal::ProxyConnectedChanged { connected })
    }

    pub fn wifi_connected_changed(&self, connected: bool) -> Result<()> {
        self.send(Signal::WifiConnectedChanged { connected })
    }

    pub fn high_bandwidth_requests_changed(&self, count: u32) -> Result<()> {
        self.send(Signal::HighBandwidthRequestsChanged { count })
    }

    pub fn cellular_requests_changed(&self, count: u32) -> Result<()> {
        self.send(Signal::CellularRequestsChanged { count })
    }

    pub fn signal_quality_changed(&self, quality: SignalQuality) -> Result<()> {
        self.send(Signal::SignalQualityChanged { quality })
    }

    // ── Settings and broadcasts ───────────────────────────────

    pub fn cell_auto_setting_changed(&self, enabled: bool) -> Result<()> {
        self.send(Signal::CellAutoSettingChanged { enabled })
    }

    pub fn cell_on_setting_changed(&self, enabled: bool) -> Result<()> {
        self.send(Signal::CellOnSettingChanged { enabled })
    }

    pub fn sim_state_changed(&self, icc_state: IccState) -> Result<()> {
        self.send(Signal::SimStateChanged { icc_state })
    }

    pub fn esim_test_mode_changed(&self, enabled: bool) -> Result<()> {
        self.send(Signal::EsimTestModeChanged { enabled })
    }

    pub fn phone_state_changed(&self, in_call: bool) -> Result<()> {
        self.send(Signal::PhoneStateChanged { in_call })
    }
}
