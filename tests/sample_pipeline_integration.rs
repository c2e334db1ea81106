//! End-to-end tests of the sample pipeline
//!
//! Device lines go through the reader thread, the channel and the display
//! controller into the readouts and the graph, as the window would see them.

mod common;

use common::builders::ConfigBuilder;
use common::mock_helpers::{fake_port, FakeDevice, FakeOpener};
use common::{assert_float_eq, wait_until};
use freqmeter_rs::app::MeterSession;
use freqmeter_rs::config::AppConfig;
use freqmeter_rs::types::{FrequencyUnit, PeriodUnit};
use std::io::Write;

fn session(config: &AppConfig) -> (FakeDevice, MeterSession<FakeOpener>) {
    let (device, opener) = fake_port();
    let mut session = MeterSession::new(opener, config);
    session.connect();
    assert!(session.acquisition.is_connected(), "{:?}", session.notice());
    (device, session)
}

/// Pump until `n` valid samples were received in total
fn pump_valid(session: &mut MeterSession<FakeOpener>, n: u64) {
    assert!(
        wait_until(|| {
            session.pump();
            session.display.stats().valid_samples >= n
        }),
        "timed out waiting for {} samples",
        n
    );
}

#[test]
fn test_readout_autoranges() {
    let (device, mut session) = session(&ConfigBuilder::new().build());

    device.send_line("999.999");
    pump_valid(&mut session, 1);
    let reading = session.display.displayed();
    assert_eq!(reading.value_text, "999.999");
    assert_eq!(reading.unit, FrequencyUnit::Hz);
    assert_eq!(reading.period_unit, PeriodUnit::Seconds);

    device.send_line("1500");
    pump_valid(&mut session, 2);
    let reading = session.display.displayed();
    assert_eq!(reading.value_text, "1.500");
    assert_eq!(reading.unit, FrequencyUnit::KHz);
    assert_eq!(reading.period_text, "0.666667");
    assert_eq!(reading.period_unit, PeriodUnit::Milliseconds);

    device.send_line("2000000");
    pump_valid(&mut session, 3);
    let reading = session.display.displayed();
    assert_eq!(reading.value_text, "2.000");
    assert_eq!(reading.unit, FrequencyUnit::MHz);
    assert_eq!(reading.period_text, "0.500000");

    // The graph holds Hz, not unit-scaled values
    let graph: Vec<f64> = session.graph.buffer().iter().copied().collect();
    assert_eq!(graph, vec![999.999, 1500.0, 2_000_000.0]);
}

#[test]
fn test_garbage_does_not_touch_readout() {
    let (device, opener) = fake_port();
    // Queued before connecting so the reader sees them back to back
    device.send_raw(b"440\n#?!\n550\n");
    let mut session = MeterSession::new(opener, &ConfigBuilder::new().build());

    session.connect();
    pump_valid(&mut session, 2);

    // Only the two good lines became readings; the one between them was
    // counted as a failure instead of reaching the readout or the graph
    assert_eq!(session.display.stats().valid_samples, 2);
    assert!(session.display.stats().failed_samples >= 1);
    assert_eq!(session.display.displayed().value_text, "550.000");

    let graph: Vec<f64> = session.graph.buffer().iter().copied().collect();
    assert_eq!(graph, vec![440.0, 550.0]);
}

#[test]
fn test_hold_freezes_until_released() {
    let (device, mut session) = session(&ConfigBuilder::new().build());

    device.send_line("100");
    pump_valid(&mut session, 1);

    session.state.hold = true;
    device.send_line("200");
    pump_valid(&mut session, 2);
    assert_eq!(session.display.displayed().value_text, "100.000");
    assert_eq!(
        session.display.last_computed().map(|r| r.value_text.as_str()),
        Some("200.000")
    );
    assert_eq!(session.graph.buffer().len(), 1);

    session.state.hold = false;
    device.send_line("300");
    pump_valid(&mut session, 3);
    assert_eq!(session.display.displayed().value_text, "300.000");
    assert_eq!(session.graph.buffer().latest(), Some(300.0));
}

#[test]
fn test_multiplier_and_fixed_unit() {
    let config = ConfigBuilder::new().multiplier(8).autorange(false).build();
    let (device, mut session) = session(&config);

    device.send_line("250");
    pump_valid(&mut session, 1);
    let reading = session.display.displayed();
    assert_eq!(reading.value_text, "2000.000");
    assert_eq!(reading.unit, FrequencyUnit::Hz);
    assert_float_eq(session.graph.buffer().latest().unwrap(), 2000.0, 1e-9);
}

#[test]
fn test_config_filter_script_applies() {
    let config = ConfigBuilder::new()
        .filter_script("round_to(value, 100.0)")
        .build();
    let (device, mut session) = session(&config);
    assert_eq!(session.filter.name(), "config");

    device.send_line("1234");
    pump_valid(&mut session, 1);
    assert_eq!(session.display.displayed().value_text, "1.200");

    session.state.filter_enabled = false;
    device.send_line("1234");
    pump_valid(&mut session, 2);
    assert_eq!(session.display.displayed().value_text, "1.234");
}

#[test]
fn test_broken_filter_script_is_reported_once() {
    let config = ConfigBuilder::new().filter_script("value * (").build();
    let (device, opener) = fake_port();
    let mut session = MeterSession::new(opener, &config);

    assert!(session.take_notice().is_some());
    assert!(session.take_notice().is_none());
    assert!(session.filter.is_default());

    session.connect();
    device.send_line("42");
    pump_valid(&mut session, 1);
    assert_eq!(session.display.displayed().value_text, "42.000");
}

#[test]
fn test_config_file_drives_session() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[serial]
port = "/dev/ttyFAKE0"
baud = 115200
timeout_ms = 20

[display]
multiplier = 4
speed = "fast"
"#
    )
    .unwrap();

    let config = AppConfig::load(file.path()).unwrap();
    let (device, mut session) = session(&config);

    // Fast mode requested right after connecting
    assert_eq!(device.commands(), vec![b"f\n".to_vec()]);

    device.send_line("500");
    pump_valid(&mut session, 1);
    assert_eq!(session.display.displayed().value_text, "2.000");
    assert_eq!(session.display.displayed().unit, FrequencyUnit::KHz);
}

#[test]
fn test_graph_keeps_latest_window() {
    let (device, mut session) = session(&ConfigBuilder::new().build());

    for i in 1..=130 {
        device.send_line(&i.to_string());
    }
    pump_valid(&mut session, 130);

    let graph: Vec<f64> = session.graph.buffer().iter().copied().collect();
    let expected: Vec<f64> = (11..=130).map(f64::from).collect();
    assert_eq!(graph, expected);
}

#[test]
fn test_samples_queued_at_disconnect_are_dropped() {
    let (device, mut session) = session(&ConfigBuilder::new().build());
    device.send_line("10");
    pump_valid(&mut session, 1);

    device.send_line("777");
    // Give the reader time to queue the line without pumping it
    std::thread::sleep(std::time::Duration::from_millis(100));
    session.disconnect();
    session.pump();

    assert_eq!(session.display.stats().valid_samples, 1);
    assert_eq!(session.display.displayed().value_text, "10.000");
    assert_eq!(session.graph.buffer().latest(), Some(10.0));
}

#[test]
fn test_disconnect_then_reconnect() {
    let (device, mut session) = session(&ConfigBuilder::new().build());
    device.send_line("10");
    pump_valid(&mut session, 1);

    session.disconnect();
    assert!(!session.state.connection_open);

    session.connect();
    assert!(session.state.connection_open);
    // Counters restart with the new connection; the readout keeps its value
    assert_eq!(session.display.stats().valid_samples, 0);
    assert_eq!(session.display.displayed().value_text, "10.000");

    device.send_line("20");
    pump_valid(&mut session, 1);
    assert_eq!(session.display.displayed().value_text, "20.000");
}
