//! Mediator service: the hexagonal core.
//!
//! [`CellMediator`] owns the signal state, the hysteresis controller and
//! the decision history.  It is a plain state machine driven one
//! [`Message`] at a time; the [`worker`](super::worker) gives it a thread
//! and a queue.  All I/O flows through port traits injected at call sites.
//!
//! ```text
//!  Signal / TimerFired ──▶ ┌──────────────────────────────┐ ──▶ RadioPowerPort
//!                          │          CellMediator        │ ──▶ ConnectivityPackagePort
//!                          │ SignalState · policy · hyst. │ ──▶ SignalDetectorPort
//!            TimerPort ◀── └──────────────────────────────┘ ──▶ EventSink
//! ```
//!
//! Handling a message is split in two: [`process`](CellMediator::process)
//! updates state and returns the radio command to apply, if any;
//! [`execute`](CellMediator::execute) performs it.  The split lets the
//! worker coalesce a burst of messages into a single toggle.

use std::time::Duration;

use log::{debug, info, warn};

use crate::config::MediatorConfig;
use crate::diagnostics::{self, RuntimeMetrics, Snapshot};
use crate::history::{DecisionHistory, HistoryEntry};
use crate::hysteresis::{FinalAction, HysteresisController, RadioCommand, TimerKind, TimerOutcome};
use crate::policy::{self, Decision, SignalQuality, SignalState, Trigger};

use super::commands::{Message, SettingsSnapshot, Signal};
use super::events::MediatorEvent;
use super::ports::{MediatorPorts, SettingsPort, SignalDetectorPort, TimerPort};

// ───────────────────────────────────────────────────────────────
// CellMediator
// ───────────────────────────────────────────────────────────────

pub struct CellMediator {
    config: MediatorConfig,
    state: SignalState,
    hysteresis: HysteresisController,
    history: DecisionHistory,
    /// Last commanded radio power, seeded from the boot snapshot.
    radio_on: Option<bool>,
    last_decision: Option<(Decision, Trigger)>,
    emergency_timer: Option<u64>,
    next_emergency_token: u64,
    metrics: RuntimeMetrics,
}

impl CellMediator {
    pub fn new(config: MediatorConfig) -> Self {
        let state = SignalState {
            esim_device: config.device.esim_device,
            local_edition: config.device.local_edition,
            ..SignalState::default()
        };
        Self {
            hysteresis: HysteresisController::new(&config),
            config,
            state,
            history: DecisionHistory::new(),
            radio_on: None,
            last_decision: None,
            emergency_timer: None,
            next_emergency_token: 0,
            metrics: RuntimeMetrics::default(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    pub fn state(&self) -> &SignalState {
        &self.state
    }

    pub fn hysteresis(&self) -> &HysteresisController {
        &self.hysteresis
    }

    pub fn history(&self) -> &DecisionHistory {
        &self.history
    }

    pub fn radio_on(&self) -> Option<bool> {
        self.radio_on
    }

    pub fn last_decision(&self) -> Option<(Decision, Trigger)> {
        self.last_decision
    }

    pub fn metrics(&self) -> &RuntimeMetrics {
        &self.metrics
    }

    pub fn snapshot(&self) -> Snapshot {
        diagnostics::snapshot(self)
    }

    pub fn dump(&self) -> String {
        diagnostics::render(&self.snapshot())
    }

    /// Linger duration override.  Takes effect from the next
    /// proxy-connected disable.
    pub fn set_linger_duration_ms(&mut self, duration_ms: i64) {
        self.hysteresis.set_linger_duration_ms(duration_ms);
    }

    // ── Message handling ──────────────────────────────────────

    /// Process and immediately execute one message.
    pub fn handle(&mut self, msg: impl Into<Message>, io: &mut impl MediatorPorts) {
        if let Some(cmd) = self.process(msg.into(), io) {
            self.execute(cmd, io);
        }
    }

    /// Update state for `msg` and arbitrate.  Returns the radio command to
    /// execute, if the outcome is an immediate toggle.
    pub fn process(&mut self, msg: Message, io: &mut impl MediatorPorts) -> Option<RadioCommand> {
        match msg {
            Message::Signal(signal) => self.on_signal(signal, io),
            Message::TimerFired { kind, token } => self.on_timer(kind, token, io),
        }
    }

    fn on_signal(&mut self, signal: Signal, io: &mut impl MediatorPorts) -> Option<RadioCommand> {
        let s = &mut self.state;
        match signal {
            Signal::BootCompleted {
                proxy_connected,
                settings,
            } => return self.on_boot_completed(proxy_connected, settings, io),

            Signal::UserUnlocked => {
                s.user_unlocked = true;
                if s.booted && !s.proxy_connected && s.cell_auto {
                    self.start_delay(Trigger::OnUserUnlocked, io);
                }
                return self.update_radio_power(Trigger::OnUserUnlocked, io);
            }

            // ── Power and device modes ──
            Signal::PowerSaveChanged { in_power_save } => {
                s.in_power_save = in_power_save;
                return self.update_radio_power(Trigger::PowerSaveModeChanged, io);
            }
            Signal::DeviceIdleChanged {
                idle,
                doze_cellular_allowlisted,
            } => {
                s.device_idle = idle;
                s.doze_cellular_allowlisted = doze_cellular_allowlisted;
                if doze_cellular_allowlisted {
                    debug!("Cellular is doze allowlisted, ignoring idle change");
                } else {
                    return self.update_radio_power(Trigger::DeviceIdleModeChanged, io);
                }
            }
            Signal::ActivityModeChanged { enabled } => {
                if s.activity_mode != enabled {
                    s.activity_mode = enabled;
                    return self.update_radio_power(Trigger::ActivityModeUpdate, io);
                }
            }
            Signal::CellOnlyModeChanged { enabled } => {
                if s.cell_only_mode != enabled {
                    s.cell_only_mode = enabled;
                    return self.update_radio_power(Trigger::CellOnlyModeUpdate, io);
                }
            }
            Signal::ThermalEmergencyChanged {
                enabled,
                affects_cellular,
            } => {
                let thermal = enabled && affects_cellular;
                if s.thermal_emergency != thermal {
                    s.thermal_emergency = thermal;
                    return self.update_radio_power(Trigger::ThermalEmergencyModeUpdate, io);
                }
            }
            Signal::UserAbsentRadiosOffChanged { enabled } => {
                s.user_absent_radios_off = enabled;
                return self.update_radio_power(Trigger::UserAbsentRadiosOffChanged, io);
            }
            Signal::DeviceEnableChanged {
                enabled,
                affects_cellular,
            } => {
                s.device_enabled = enabled;
                s.device_enable_affects_cellular = affects_cellular;
                if affects_cellular {
                    return self.update_radio_power(Trigger::DeviceEnableChanged, io);
                }
            }

            // ── Connectivity and demand ──
            Signal::ProxyConnectedChanged { connected } => {
                s.proxy_connected = connected;
                return self.update_radio_power(Trigger::ProxyConnectedUpdate, io);
            }
            Signal::WifiConnectedChanged { connected } => {
                s.wifi_connected = connected;
                if s.turn_off_when_wifi_connected() {
                    let trigger = if connected {
                        Trigger::WifiConnectedUpdate
                    } else {
                        Trigger::WifiDisconnectedUpdate
                    };
                    return self.update_radio_power(trigger, io);
                }
            }
            Signal::HighBandwidthRequestsChanged { count } => {
                s.high_bandwidth_requests = count;
                return self.update_radio_power(Trigger::NumHighBandwidthReqUpdate, io);
            }
            Signal::CellularRequestsChanged { count } => {
                s.cellular_requests = count;
                return self.update_radio_power(Trigger::NumCellularReqUpdate, io);
            }
            Signal::SignalQualityChanged { quality } => {
                s.signal_quality = quality;
                return self.update_radio_power(Trigger::SignalStateChanged, io);
            }

            // ── Settings observers ──
            Signal::CellAutoSettingChanged { enabled } => {
                s.cell_auto = enabled;
                return self.update_radio_power(Trigger::CellAutoSetting, io);
            }
            Signal::CellOnSettingChanged { enabled } => {
                s.cell_on = enabled;
                return self.update_radio_power(Trigger::CellOnSetting, io);
            }
            Signal::EsimProfileActivationChanged { deactivated } => {
                s.esim_profile_deactivated = deactivated;
                return self.update_radio_power(Trigger::EsimProfileActivationSetting, io);
            }
            Signal::MobileSignalDetectorSettingChanged { allowed } => {
                s.mobile_signal_detector_allowed = allowed;
                self.update_detector_state(self.radio_on, io);
                return self.update_radio_power(Trigger::MobileSignalDetectorSetting, io);
            }
            Signal::EnableCellularOnBootChanged { self_change } => {
                if !self_change {
                    warn!(
                        "{}: enable_cellular_on_boot changed by something else",
                        Trigger::EnableCellularOnBootSetting
                    );
                    self.ensure_cell_on_reboot_behavior(io);
                }
            }
            Signal::VowifiSettingChanged { enabled } => {
                s.vowifi_active = s.has_active_esim_subscription && enabled;
                return self.update_radio_power(Trigger::VowifiStateUpdate, io);
            }

            // ── Broadcasts ──
            Signal::EsimTestModeChanged { enabled } => {
                s.esim_test_mode = enabled;
                io.put_esim_test_mode(enabled);
                return self.update_radio_power(Trigger::EsimTestMode, io);
            }
            Signal::SimStateChanged { icc_state } => {
                s.icc_state = icc_state;
                return self.update_radio_power(Trigger::SimStateChanged, io);
            }
            Signal::CarrierConfigChanged {
                doze_cellular_allowlisted,
            } => {
                s.doze_cellular_allowlisted = doze_cellular_allowlisted;
            }
            Signal::SubscriptionsChanged {
                has_active_esim,
                vowifi_enabled,
            } => {
                let changed = s.has_active_esim_subscription != has_active_esim;
                s.has_active_esim_subscription = has_active_esim;
                s.vowifi_active = has_active_esim && vowifi_enabled;
                if changed {
                    return self.update_radio_power(Trigger::SubscriptionsChanged, io);
                }
            }

            // ── Telephony ──
            Signal::PhoneStateChanged { in_call } => {
                s.in_telephony_call = in_call;
                return self.update_radio_power(Trigger::SubscriptionPhoneStateChanged, io);
            }
            // The telephony stack powers the radio for emergency calls
            // itself; these two only update state.
            Signal::NewOutgoingCall { emergency } => {
                s.in_emergency_call = emergency;
                info!("{}: emergency call {}", Trigger::NewOutgoingCall, emergency);
            }
            Signal::EmergencyCallbackModeChanged { active } => {
                s.in_ecbm = active;
                info!("{}: ECBM {}", Trigger::EmergencyCallbackModeChanged, active);
            }
            Signal::CallStateIdle => {
                if s.in_emergency_call {
                    s.in_emergency_call = false;
                    s.radio_on_after_emergency_call = true;
                    self.start_emergency_timer(io);
                    return self.update_radio_power(Trigger::CallStateChangedEmergencyEnded, io);
                }
            }
            Signal::EmergencyPdnDisconnected => {
                if s.radio_on_after_emergency_call {
                    s.radio_on_after_emergency_call = false;
                    if self.emergency_timer.take().is_some() {
                        io.cancel(TimerKind::EmergencyRadioOn);
                    }
                    return self
                        .update_radio_power(Trigger::ConnectionStateChangedPdnDisconnected, io);
                }
            }
        }
        None
    }

    fn on_boot_completed(
        &mut self,
        proxy_connected: bool,
        settings: SettingsSnapshot,
        io: &mut impl MediatorPorts,
    ) -> Option<RadioCommand> {
        let s = &mut self.state;
        s.proxy_connected = proxy_connected;
        s.cell_auto = settings.cell_auto;
        s.cell_on = settings.cell_on;
        s.esim_profile_deactivated = settings.esim_profile_deactivated;
        s.esim_test_mode = settings.esim_test_mode;
        s.mobile_signal_detector_allowed = settings.mobile_signal_detector_allowed;
        s.off_during_power_save = settings.off_during_power_save;
        s.off_when_wifi_connected = settings.off_when_wifi_connected;
        self.radio_on = settings.radio_on;

        self.ensure_cell_on_reboot_behavior(io);
        self.update_detector_state(settings.radio_on, io);

        self.state.booted = true;
        info!("Boot completed, proxy connected: {}", proxy_connected);
        io.emit(&MediatorEvent::Booted { proxy_connected });
        self.update_radio_power(Trigger::OnBootCompleted, io)
    }

    fn on_timer(
        &mut self,
        kind: TimerKind,
        token: u64,
        io: &mut impl MediatorPorts,
    ) -> Option<RadioCommand> {
        if kind == TimerKind::EmergencyRadioOn {
            if self.emergency_timer != Some(token) {
                self.metrics.stale_timer_firings += 1;
                return None;
            }
            self.emergency_timer = None;
            self.state.radio_on_after_emergency_call = false;
            info!("Emergency radio-on window expired");
            return self.update_radio_power(Trigger::EmergencyRadioOnTimeout, io);
        }

        match self.hysteresis.on_timer(kind, token) {
            TimerOutcome::Stale => {
                debug!("Ignoring stale {} timer", kind.as_str());
                self.metrics.stale_timer_firings += 1;
                None
            }
            TimerOutcome::LingerExpired { reason, trigger } => {
                io.emit(&MediatorEvent::LingerExpired { reason, trigger });
                self.update_radio_power(Trigger::ExitCellLinger, io)
            }
            TimerOutcome::DelayExpired(cmd) => Some(cmd),
        }
    }

    // ── Evaluation ────────────────────────────────────────────

    fn update_radio_power(
        &mut self,
        trigger: Trigger,
        io: &mut impl MediatorPorts,
    ) -> Option<RadioCommand> {
        let Some(decision) = policy::evaluate(&self.state) else {
            debug!("Ignoring {} before boot completed", trigger);
            return None;
        };
        self.metrics.evaluations += 1;
        self.last_decision = Some((decision, trigger));
        debug!("Evaluated {} for {}", decision, trigger);

        let now_ms = io.now_ms();
        match self
            .hysteresis
            .arbitrate(decision, trigger, self.state.cell_auto, now_ms, io)
        {
            FinalAction::ApplyNow(cmd) => Some(cmd),
            FinalAction::ScheduleLinger => {
                if let Some(linger) = self.hysteresis.linger() {
                    io.emit(&MediatorEvent::LingerStarted {
                        reason: linger.reason,
                        trigger: linger.trigger,
                        deadline_ms: linger.deadline_ms,
                    });
                }
                None
            }
            FinalAction::ScheduleDelay => {
                self.emit_delay_started(io);
                None
            }
            FinalAction::NoOp => None,
        }
    }

    fn start_delay(&mut self, trigger: Trigger, io: &mut impl MediatorPorts) {
        let now_ms = io.now_ms();
        self.hysteresis.delay_enable(trigger, now_ms, io);
        self.emit_delay_started(io);
    }

    fn emit_delay_started(&self, io: &mut impl MediatorPorts) {
        if let Some(delay) = self.hysteresis.delay() {
            io.emit(&MediatorEvent::DelayStarted {
                trigger: delay.trigger,
                deadline_ms: delay.deadline_ms,
            });
        }
    }

    fn start_emergency_timer(&mut self, io: &mut impl TimerPort) {
        self.next_emergency_token = self.next_emergency_token.wrapping_add(1);
        let token = self.next_emergency_token;
        io.schedule(
            TimerKind::EmergencyRadioOn,
            token,
            self.config.emergency_radio_on_linger(),
            Duration::ZERO,
        );
        self.emergency_timer = Some(token);
        info!(
            "{}: keeping radio on for {}ms after emergency call",
            Trigger::CallStateChangedEmergencyEndedDelayed,
            self.config.emergency_radio_on_linger_ms
        );
    }

    // ── Execution ─────────────────────────────────────────────

    /// Apply a radio power change.  Blocks for up to the configured
    /// confirmation wait.
    pub fn execute(&mut self, cmd: RadioCommand, io: &mut impl MediatorPorts) {
        let RadioCommand {
            enable,
            reason,
            trigger,
        } = cmd;

        // 1. Connectivity package learns the intended state first
        io.on_cellular_radio_state(enable);

        // 2. Toggle, unconditionally
        io.arm();
        io.set_radio_power(enable);
        self.radio_on = Some(enable);
        self.metrics.radio_toggles += 1;
        info!("{}:{} changed radio power: {}", reason, trigger, enable);

        // 3. History
        let now_ms = io.now_ms();
        self.history
            .record(HistoryEntry::new(reason, trigger, now_ms));

        // 4. Event log record
        io.emit(&MediatorEvent::RadioPowerChanged {
            enable,
            reason,
            trigger,
            timestamp_ms: now_ms,
        });

        // 5. Signal detector follows the radio
        self.update_detector_state(Some(enable), io);

        // 6. Bounded wait for the modem
        let wait = self.config.radio_power_wait();
        if !io.wait(wait) {
            self.metrics.confirmation_timeouts += 1;
            warn!(
                "Timed out after {}ms waiting for radio power {}",
                self.config.radio_power_wait_ms,
                if enable { "on" } else { "off" }
            );
            io.emit(&MediatorEvent::ConfirmationTimedOut {
                enable,
                waited_ms: self.config.radio_power_wait_ms,
            });
        }
    }

    // ── Collaborator upkeep ───────────────────────────────────

    /// Start the detector when the radio is on (or unknown) and the setting
    /// allows it; otherwise stop it and forget the last quality reading.
    fn update_detector_state(&mut self, radio_on: Option<bool>, io: &mut impl SignalDetectorPort) {
        if radio_on != Some(false) && self.state.mobile_signal_detector_allowed {
            io.start_detector();
            self.state.detector_started = true;
        } else {
            io.stop_detector();
            self.state.detector_started = false;
            self.state.signal_quality = SignalQuality::Ok;
        }
    }

    /// Keep the modem from powering up on its own at the next boot while
    /// the mediator is in charge.
    fn ensure_cell_on_reboot_behavior(&self, io: &mut impl SettingsPort) {
        if self.state.cell_auto || !self.state.cell_on {
            io.put_enable_cellular_on_boot(false);
        }
    }
}
