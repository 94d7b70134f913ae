//! Linger and delay behaviour seen through the full mediator.

use std::time::Duration;

use cellmediator::app::commands::{Message, Signal};
use cellmediator::app::events::MediatorEvent;
use cellmediator::app::service::CellMediator;
use cellmediator::config::MediatorConfig;
use cellmediator::hysteresis::TimerKind;
use cellmediator::policy::{Reason, Trigger};

use crate::mock_hw::{MockPlatform, booted, default_settings, no_linger};

fn last_trigger(m: &CellMediator) -> Option<Trigger> {
    m.history().latest().map(|e| e.trigger)
}

// ── Linger ────────────────────────────────────────────────────

#[test]
fn proxy_reconnect_lingers_before_disabling() {
    let (mut m, mut io) = booted(MediatorConfig::default(), false);
    let deadline = io.now_ms + 30_000;
    m.handle(Signal::ProxyConnectedChanged { connected: true }, &mut io);

    assert!(io.radio_commands().is_empty());
    let timer = io.armed_timer(TimerKind::Linger).unwrap();
    assert_eq!(timer.after, Duration::from_secs(30));
    assert_eq!(timer.window, Duration::from_secs(30));
    assert_eq!(
        io.events,
        vec![MediatorEvent::LingerStarted {
            reason: Reason::OffProxyConnected,
            trigger: Trigger::ProxyConnectedUpdate,
            deadline_ms: deadline,
        }]
    );

    let fired = io.fire(TimerKind::Linger);
    m.handle(fired, &mut io);
    assert_eq!(io.radio_commands(), vec![false]);
    assert_eq!(io.last_change(), Some((false, Reason::OffProxyConnected)));
    assert_eq!(last_trigger(&m), Some(Trigger::ExitCellLinger));
    assert!(!m.hysteresis().is_lingering());
}

#[test]
fn repeated_disable_keeps_first_linger() {
    let (mut m, mut io) = booted(MediatorConfig::default(), false);
    m.handle(Signal::ProxyConnectedChanged { connected: true }, &mut io);
    let first = io.armed_timer(TimerKind::Linger).unwrap();

    io.advance(10_000);
    m.handle(Signal::CellularRequestsChanged { count: 0 }, &mut io);
    assert_eq!(io.armed_timer(TimerKind::Linger), Some(first));
    assert_eq!(
        m.hysteresis().linger().map(|l| l.trigger),
        Some(Trigger::ProxyConnectedUpdate)
    );
    assert!(io.radio_commands().is_empty());
}

#[test]
fn non_positive_linger_disables_immediately() {
    for duration in [0, -1, -999] {
        let config = MediatorConfig {
            cell_linger_duration_ms: duration,
            ..MediatorConfig::default()
        };
        let (mut m, mut io) = booted(config, false);
        m.handle(Signal::ProxyConnectedChanged { connected: true }, &mut io);
        assert_eq!(io.radio_commands(), vec![false], "linger {duration}");
        assert!(!io.is_armed(TimerKind::Linger));
    }
}

#[test]
fn disconnect_during_linger_cancels_it() {
    let (mut m, mut io) = booted(MediatorConfig::default(), false);
    m.handle(Signal::ProxyConnectedChanged { connected: true }, &mut io);
    let token = io.armed_timer(TimerKind::Linger).unwrap().token;

    m.handle(Signal::ProxyConnectedChanged { connected: false }, &mut io);
    assert!(io.cancelled.contains(&TimerKind::Linger));
    assert_eq!(io.last_change(), Some((true, Reason::OnProxyDisconnected)));
    assert!(!m.hysteresis().is_lingering());

    m.handle(
        Message::TimerFired {
            kind: TimerKind::Linger,
            token,
        },
        &mut io,
    );
    assert_eq!(io.radio_commands(), vec![true]);
    assert_eq!(m.metrics().stale_timer_firings, 1);
}

#[test]
fn other_disable_during_linger_applies_now() {
    let (mut m, mut io) = booted(MediatorConfig::default(), false);
    m.handle(Signal::ProxyConnectedChanged { connected: true }, &mut io);

    m.handle(Signal::ActivityModeChanged { enabled: true }, &mut io);
    assert!(io.cancelled.contains(&TimerKind::Linger));
    assert_eq!(io.last_change(), Some((false, Reason::OffActivityMode)));
}

#[test]
fn linger_override_applies_to_next_disable() {
    let (mut m, mut io) = booted(MediatorConfig::default(), false);
    m.set_linger_duration_ms(5_000);
    m.handle(Signal::ProxyConnectedChanged { connected: true }, &mut io);
    assert_eq!(
        io.armed_timer(TimerKind::Linger).map(|t| t.after),
        Some(Duration::from_secs(5))
    );

    m.handle(Signal::ProxyConnectedChanged { connected: false }, &mut io);
    m.set_linger_duration_ms(0);
    m.handle(Signal::ProxyConnectedChanged { connected: true }, &mut io);
    assert_eq!(io.last_change(), Some((false, Reason::OffProxyConnected)));
}

// ── Delay ─────────────────────────────────────────────────────

#[test]
fn user_unlock_delays_first_enable() {
    let mut m = CellMediator::new(MediatorConfig::default());
    let mut io = MockPlatform::new();
    m.handle(
        Signal::BootCompleted {
            proxy_connected: false,
            settings: default_settings(),
        },
        &mut io,
    );
    io.clear();

    m.handle(Signal::UserUnlocked, &mut io);
    assert!(io.radio_commands().is_empty());
    assert_eq!(
        io.armed_timer(TimerKind::Delay).map(|t| (t.after, t.window)),
        Some((Duration::from_secs(30), Duration::ZERO))
    );
    assert!(io.events.iter().any(|e| matches!(
        e,
        MediatorEvent::DelayStarted {
            trigger: Trigger::OnUserUnlocked,
            ..
        }
    )));

    let fired = io.fire(TimerKind::Delay);
    m.handle(fired, &mut io);
    assert_eq!(io.last_change(), Some((true, Reason::OnProxyDisconnected)));
    assert_eq!(last_trigger(&m), Some(Trigger::OnUserUnlocked));
}

#[test]
fn leaving_power_save_delays_enable() {
    let (mut m, mut io) = booted(no_linger(), false);

    m.handle(Signal::PowerSaveChanged { in_power_save: true }, &mut io);
    assert_eq!(io.last_change(), Some((false, Reason::OffPowerSave)));
    assert!(m.hysteresis().should_delay_next_enable());

    m.handle(Signal::PowerSaveChanged { in_power_save: false }, &mut io);
    assert_eq!(io.radio_commands(), vec![false]);
    assert!(io.is_armed(TimerKind::Delay));
    assert!(!m.hysteresis().should_delay_next_enable());

    let fired = io.fire(TimerKind::Delay);
    m.handle(fired, &mut io);
    assert_eq!(io.last_change(), Some((true, Reason::OnProxyDisconnected)));
    assert_eq!(last_trigger(&m), Some(Trigger::PowerSaveModeChanged));
}

#[test]
fn leaving_device_idle_delays_enable() {
    let (mut m, mut io) = booted(no_linger(), true);
    m.handle(Signal::UserAbsentRadiosOffChanged { enabled: true }, &mut io);
    m.handle(
        Signal::DeviceIdleChanged {
            idle: true,
            doze_cellular_allowlisted: false,
        },
        &mut io,
    );
    assert_eq!(io.last_change(), Some((false, Reason::OffUserAbsent)));

    m.handle(Signal::ProxyConnectedChanged { connected: false }, &mut io);
    assert_eq!(io.last_change(), Some((false, Reason::OffUserAbsent)));

    io.clear();
    m.handle(
        Signal::DeviceIdleChanged {
            idle: false,
            doze_cellular_allowlisted: false,
        },
        &mut io,
    );
    assert!(io.radio_commands().is_empty());
    assert!(io.is_armed(TimerKind::Delay));

    let fired = io.fire(TimerKind::Delay);
    m.handle(fired, &mut io);
    assert_eq!(io.last_change(), Some((true, Reason::OnProxyDisconnected)));
    assert_eq!(last_trigger(&m), Some(Trigger::DeviceIdleModeChanged));
}

#[test]
fn proxy_reconnect_cancels_delay() {
    let (mut m, mut io) = booted(no_linger(), true);
    m.handle(Signal::UserAbsentRadiosOffChanged { enabled: true }, &mut io);
    m.handle(
        Signal::DeviceIdleChanged {
            idle: true,
            doze_cellular_allowlisted: false,
        },
        &mut io,
    );
    m.handle(Signal::ProxyConnectedChanged { connected: false }, &mut io);
    m.handle(
        Signal::DeviceIdleChanged {
            idle: false,
            doze_cellular_allowlisted: false,
        },
        &mut io,
    );
    let token = io.armed_timer(TimerKind::Delay).unwrap().token;
    io.clear();

    m.handle(Signal::ProxyConnectedChanged { connected: true }, &mut io);
    assert!(io.cancelled.contains(&TimerKind::Delay));
    assert!(!m.hysteresis().is_delaying());
    assert_eq!(io.last_change(), Some((false, Reason::OffProxyConnected)));

    m.handle(
        Message::TimerFired {
            kind: TimerKind::Delay,
            token,
        },
        &mut io,
    );
    assert_eq!(io.radio_commands(), vec![false]);
}

#[test]
fn network_request_during_delay_enables_now() {
    let (mut m, mut io) = booted(no_linger(), false);
    m.handle(Signal::PowerSaveChanged { in_power_save: true }, &mut io);
    m.handle(Signal::PowerSaveChanged { in_power_save: false }, &mut io);
    assert!(io.is_armed(TimerKind::Delay));

    m.handle(Signal::HighBandwidthRequestsChanged { count: 1 }, &mut io);
    assert!(io.cancelled.contains(&TimerKind::Delay));
    assert_eq!(io.last_change(), Some((true, Reason::OnNetworkRequest)));
}

#[test]
fn repeated_disconnect_enable_inside_delay_is_ignored() {
    let (mut m, mut io) = booted(no_linger(), false);
    m.handle(Signal::PowerSaveChanged { in_power_save: true }, &mut io);
    m.handle(Signal::PowerSaveChanged { in_power_save: false }, &mut io);
    let armed = io.armed_timer(TimerKind::Delay);
    io.clear();

    m.handle(Signal::WifiConnectedChanged { connected: false }, &mut io);
    assert!(io.radio_commands().is_empty());
    assert_eq!(io.armed_timer(TimerKind::Delay), armed);
}

#[test]
fn cell_setting_toggle_delays_only_with_cell_auto() {
    let (mut m, mut io) = booted(no_linger(), false);
    m.handle(Signal::CellOnSettingChanged { enabled: false }, &mut io);
    m.handle(Signal::CellOnSettingChanged { enabled: true }, &mut io);
    assert!(io.is_armed(TimerKind::Delay));

    let (mut m, mut io) = booted(no_linger(), false);
    m.handle(Signal::CellAutoSettingChanged { enabled: false }, &mut io);
    m.handle(Signal::CellOnSettingChanged { enabled: false }, &mut io);
    assert_eq!(io.last_change(), Some((false, Reason::OffCellSetting)));
    assert!(!m.hysteresis().should_delay_next_enable());

    m.handle(Signal::CellOnSettingChanged { enabled: true }, &mut io);
    assert!(!io.is_armed(TimerKind::Delay));
    assert_eq!(io.last_change(), Some((true, Reason::OnNoCellAuto)));
}
