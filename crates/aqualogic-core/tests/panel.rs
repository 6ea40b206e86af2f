use aqualogic_core::demo::DemoController;
use aqualogic_core::panel::Panel;
use aqualogic_core::protocol::{
    encode_frame, key_event_frame, FrameType, Key, ProtocolError, ReplayTransport, Transport,
};
use aqualogic_core::state::{DeviceState, StateBit};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

fn keep_alive() -> Vec<u8> {
    encode_frame(FrameType::KeepAlive.tag(), &[])
}

fn leds(on: u32, flashing: u32) -> Vec<u8> {
    let mut data = on.to_le_bytes().to_vec();
    data.extend_from_slice(&flashing.to_le_bytes());
    encode_frame(FrameType::Leds.tag(), &data)
}

fn display(text: &str) -> Vec<u8> {
    let data: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
    encode_frame(FrameType::DisplayUpdate.tag(), &data)
}

/// Feed a byte stream through the panel; returns the number of change
/// notifications and everything the panel wrote
fn run(panel: &Panel, frames: &[Vec<u8>]) -> (usize, Vec<u8>) {
    let mut transport = ReplayTransport::new(frames.concat());
    let written = transport.written();
    let mut notifications = 0;
    let result = panel.process(&mut transport, |_| notifications += 1);
    assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
    let bytes = written.lock().unwrap().clone();
    (notifications, bytes)
}

#[test]
fn test_pool_temp_display() {
    let panel = Panel::new();
    let (notifications, _) = run(&panel, &[display("Pool Temp 82\u{b0}F")]);
    assert_eq!(notifications, 1);
    assert_eq!(panel.pool_temp(), Some(82));
    assert!(!panel.is_metric());
}

#[test]
fn test_salt_level_display() {
    let panel = Panel::new();
    let (notifications, _) = run(&panel, &[display("Salt Level 3.2 g/L")]);
    assert_eq!(notifications, 1);
    assert_eq!(panel.salt_level(), Some(3.2));
    assert!(panel.is_metric());
}

#[test]
fn test_repeated_frames_notify_once() {
    let panel = Panel::new();
    let frame = leds(StateBit::Pool.mask() | StateBit::Lights.mask(), 0);
    let (notifications, _) = run(
        &panel,
        &[frame.clone(), frame, display("Air Temp 70\u{b0}F"), display("Air Temp 70\u{b0}F")],
    );
    assert_eq!(notifications, 2);
    assert_eq!(
        panel.states(),
        vec![StateBit::Pool, StateBit::Lights, StateBit::HeaterAutoMode]
    );
}

#[test]
fn test_corrupted_frame_discarded() {
    let panel = Panel::new();
    let mut bad = leds(StateBit::Spa.mask(), 0);
    bad[6] ^= 0x04;
    let (notifications, _) = run(&panel, &[bad, display("Spa Temp 101\u{b0}F")]);

    assert_eq!(notifications, 1);
    assert!(!panel.get_state(StateBit::Spa));
    assert_eq!(panel.spa_temp(), Some(101));
    let counters = panel.counters();
    assert_eq!(counters.frames_rejected, 1);
    assert_eq!(counters.frames_received, 1);
}

#[test]
fn test_unknown_and_unparseable_frames_ignored() {
    let panel = Panel::new();
    let (notifications, _) = run(
        &panel,
        &[
            encode_frame([0x7f, 0x33], &[1, 2, 3]),
            encode_frame(FrameType::LongDisplayUpdate.tag(), b"whatever"),
            display("Pool Temp hot"),
            display("Salt Level 3.2"),
            display("Gas Heater Broken"),
            display(""),
        ],
    );
    assert_eq!(notifications, 0);
    assert_eq!(panel.snapshot(), DeviceState::new());
}

#[test]
fn test_key_sent_after_keep_alive() {
    let panel = Panel::new();
    panel.send_key(Key::Menu);
    panel.send_key(Key::Aux10);

    let (_, written) = run(&panel, &[leds(0, 0), keep_alive()]);
    assert_eq!(written, key_event_frame(Key::Menu));

    let (_, written) = run(&panel, &[keep_alive(), keep_alive()]);
    assert_eq!(written, key_event_frame(Key::Aux10));
    assert_eq!(panel.counters().frames_sent, 2);
}

#[test]
fn test_state_change_confirmed_stops_retries() {
    let panel = Panel::with_verify_delay(Duration::from_secs(3600));
    panel.set_state(StateBit::Aux1, true).unwrap();

    let (_, written) = run(&panel, &[keep_alive(), leds(StateBit::Aux1.mask(), 0)]);
    assert_eq!(written, key_event_frame(Key::Aux1));

    let summary = panel.run_due_checks(Instant::now() + Duration::from_secs(7200));
    assert_eq!(summary.confirmed, 1);
    assert_eq!(summary.requeued, 0);

    let (_, written) = run(&panel, &[keep_alive(), keep_alive()]);
    assert!(written.is_empty());
}

#[test]
fn test_state_change_gives_up_after_ten_sends() {
    let panel = Panel::with_verify_delay(Duration::ZERO);
    panel.set_state(StateBit::Aux1, true).unwrap();

    let stream: Vec<Vec<u8>> = (0..25).map(|_| keep_alive()).collect();
    let (_, written) = run(&panel, &stream);

    let frame = key_event_frame(Key::Aux1);
    assert_eq!(written.len(), frame.len() * 10);
    assert_eq!(written, frame.repeat(10));
    assert_eq!(panel.queued_commands(), 0);
    assert!(!panel.get_state(StateBit::Aux1));
}

#[test]
fn test_low_speed_filter_asserts_filter_on() {
    let panel = Panel::new();
    panel.set_state(StateBit::FilterLowSpeed, true).unwrap();

    assert!(panel.get_state(StateBit::FilterLowSpeed));
    assert!(panel.get_state(StateBit::Filter));
    assert_eq!(panel.queued_commands(), 1);

    let (_, written) = run(&panel, &[keep_alive()]);
    assert_eq!(written, key_event_frame(Key::Filter));
}

#[test]
fn test_pool_and_spa_share_key() {
    let panel = Panel::new();
    panel.set_state(StateBit::Spa, true).unwrap();
    let (_, written) = run(&panel, &[keep_alive()]);
    assert_eq!(written, key_event_frame(Key::PoolSpa));
}

#[test]
fn test_heater_auto_mode_uses_heater_key() {
    let panel = Panel::with_verify_delay(Duration::from_secs(3600));
    run(&panel, &[leds(0, 0)]);
    assert!(panel.get_state(StateBit::HeaterAutoMode));

    panel.set_state(StateBit::HeaterAutoMode, false).unwrap();
    let (_, written) = run(
        &panel,
        &[keep_alive(), display("Heater1 Manual Off"), leds(0, 0)],
    );
    assert_eq!(written, key_event_frame(Key::Heater1));
    assert!(!panel.get_state(StateBit::HeaterAutoMode));

    let summary = panel.run_due_checks(Instant::now() + Duration::from_secs(7200));
    assert_eq!(summary.confirmed, 1);
}

#[test]
fn test_callback_can_read_panel() {
    let panel = Panel::new();
    let mut seen = Vec::new();
    let mut transport = ReplayTransport::new(
        [display("Pool Temp 80\u{b0}F"), display("Pool Temp 81\u{b0}F")].concat(),
    );
    let _ = panel.process(&mut transport, |p| seen.push(p.pool_temp()));
    assert_eq!(seen, vec![Some(80), Some(81)]);
}

#[test]
fn test_stop_before_processing() {
    let panel = Panel::new();
    panel.stop();
    let mut transport = ReplayTransport::new(keep_alive());
    assert!(panel.process(&mut transport, |_| {}).is_ok());
    assert_eq!(transport.remaining(), keep_alive().len());
}

#[test]
fn test_stop_observed_while_scanning_noise() {
    // A line that never carries a start sequence; asks for a stop partway
    struct Noise {
        panel: Panel,
        read: usize,
    }
    impl Transport for Noise {
        fn read_byte(&mut self) -> Result<u8, ProtocolError> {
            self.read += 1;
            if self.read == 100 {
                self.panel.stop();
            }
            Ok(0x55)
        }
        fn write(&mut self, _data: &[u8]) -> Result<(), ProtocolError> {
            Ok(())
        }
    }

    let panel = Panel::new();
    let mut noise = Noise {
        panel: panel.clone(),
        read: 0,
    };
    let started = Instant::now();
    assert!(panel.process(&mut noise, |_| {}).is_ok());
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(noise.read <= 101);
    assert_eq!(panel.counters().frames_rejected, 0);
}

#[test]
fn test_check_system_message() {
    let panel = Panel::new();
    run(
        &panel,
        &[
            display("Check System Low Salt"),
            leds(StateBit::CheckSystem.mask(), 0),
        ],
    );
    assert_eq!(panel.check_system_msg(), Some("Low Salt".to_string()));
    assert_eq!(panel.status(), "Low Salt");
}

#[test]
fn test_super_chlorinate_remaining() {
    let panel = Panel::new();
    run(&panel, &[display("Super Chlorinate 12\u{ba}30 remaining")]);
    assert_eq!(panel.super_chlorinate_time_remaining(), "00:00");

    run(&panel, &[leds(StateBit::SuperChlorinate.mask(), 0)]);
    assert!(panel.is_super_chlorinate_enabled());
    assert_eq!(panel.super_chlorinate_time_remaining(), "12:30");
}

#[test]
fn test_demo_controller_converges() {
    let panel = Panel::new();
    let mut demo = DemoController::seeded(42);
    panel.set_state(StateBit::Aux2, true).unwrap();
    panel.set_state(StateBit::FilterLowSpeed, true).unwrap();

    let mut calls = 0;
    panel
        .process(&mut demo, |p| {
            calls += 1;
            let state = p.snapshot();
            let done = state.is_set(StateBit::Aux2) && state.is_set(StateBit::FilterLowSpeed);
            if done || calls > 500 {
                p.stop();
            }
        })
        .unwrap();

    let state = panel.snapshot();
    assert!(state.is_set(StateBit::Aux2));
    assert!(state.is_set(StateBit::FilterLowSpeed));
    assert!(state.is_set(StateBit::Filter));
    assert!(state.pump_power().is_some());
}
