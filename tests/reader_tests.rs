//! End-to-end read-cycle tests driving the assembler against a scripted
//! meter: a full happy cycle, per-register error accounting, the validity
//! flag, identification failures, and the session budget.

mod support;

use chrono::NaiveDate;
use dlms_rs::hdlc::serial_mock::MockSerialPort;
use dlms_rs::obis::catalogue;
use dlms_rs::{ClientConfig, DlmsError, FixedClock, MeterReader, Value};
use std::time::Duration;
use support::*;

fn stamp() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, 2)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn reader_on(
    meter: &ScriptedMeter,
    config: ClientConfig,
) -> MeterReader<MockSerialPort, FixedClock> {
    MeterReader::new(meter.port.clone(), config, FixedClock(stamp()))
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Scripts the identification round.
fn script_identification(meter: &ScriptedMeter) {
    meter.string_object(&catalogue::METER_SERIAL_NUMBER, "M2025001");
    meter.string_object(&catalogue::METER_MANUFACTURER, "ACME");
    meter.string_object(&catalogue::METER_TYPE, "3P4W");
    meter.data_object(&catalogue::MULTIPLICATION_FACTOR, Value::LongUnsigned(1));
}

/// Scripts every register of a cycle with `read_tod_zones = 1`.
fn script_full_cycle(meter: &ScriptedMeter) {
    script_identification(meter);

    meter.register(&catalogue::KWH_IMPORT, Value::DoubleLongUnsigned(20_000), -2, 30);
    meter.register(&catalogue::KWH_EXPORT, Value::DoubleLongUnsigned(0), -2, 30);
    meter.register(&catalogue::KVAH_IMPORT, Value::DoubleLongUnsigned(2_200), -1, 31);
    meter.register(&catalogue::KVAH_EXPORT, Value::DoubleLongUnsigned(0), -1, 31);
    meter.register(&catalogue::KVARH_LAG, Value::DoubleLongUnsigned(50), 0, 32);
    meter.register(&catalogue::KVARH_LEAD, Value::DoubleLongUnsigned(5), 0, 32);

    let at = md_capture_time();
    meter.demand(&catalogue::MD_KW_IMPORT, Value::DoubleLongUnsigned(5_500), -1, 27, at);
    meter.demand(&catalogue::MD_KW_EXPORT, Value::DoubleLongUnsigned(0), -1, 27, at);
    meter.demand(&catalogue::MD_KVA_IMPORT, Value::DoubleLongUnsigned(6_000), -1, 28, at);
    meter.demand(&catalogue::MD_KVA_EXPORT, Value::DoubleLongUnsigned(0), -1, 28, at);

    meter.register(&catalogue::VOLTAGE_R, Value::LongUnsigned(2_301), -1, 35);
    meter.register(&catalogue::VOLTAGE_Y, Value::LongUnsigned(2_298), -1, 35);
    meter.register(&catalogue::VOLTAGE_B, Value::LongUnsigned(2_305), -1, 35);
    meter.register(&catalogue::CURRENT_R, Value::LongUnsigned(52), -1, 33);
    meter.register(&catalogue::CURRENT_Y, Value::LongUnsigned(48), -1, 33);
    meter.register(&catalogue::CURRENT_B, Value::LongUnsigned(55), -1, 33);
    meter.register(&catalogue::CURRENT_NEUTRAL, Value::LongUnsigned(3), -1, 33);
    meter.register(&catalogue::POWER_FACTOR, Value::LongUnsigned(95), -2, 255);
    meter.register(&catalogue::FREQUENCY, Value::LongUnsigned(4_998), -2, 44);

    meter.register(&catalogue::KWH_IMPORT_RATES[0], Value::DoubleLongUnsigned(10_000), -2, 30);
    meter.register(&catalogue::KVAH_IMPORT_RATES[0], Value::DoubleLongUnsigned(11_000), -2, 31);
    meter.demand(&catalogue::MD_KW_IMPORT_RATES[0], Value::DoubleLongUnsigned(1_200), -1, 27, at);
    meter.demand(&catalogue::MD_KVA_IMPORT_RATES[0], Value::DoubleLongUnsigned(1_300), -1, 28, at);
}

fn one_zone_config() -> ClientConfig {
    ClientConfig {
        read_tod_zones: 1,
        ..ClientConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn full_cycle_populates_reading() {
    let meter = ScriptedMeter::new();
    meter.handshake();
    script_full_cycle(&meter);

    let mut reader = reader_on(&meter, one_zone_config());
    let reading = reader.read_cycle().await.unwrap();

    assert_eq!(reading.serial_number, "M2025001");
    assert_eq!(reading.manufacturer, "ACME");
    assert_eq!(reading.meter_type, "3P4W");
    assert_eq!(reading.multiplication_factor, 1.0);

    assert_eq!(reading.kwh_import.value, 200.0);
    assert!(approx(reading.kvah_import.value, 220.0));
    assert!(approx(reading.kvarh_lag.value, 50.0));
    assert!(approx(reading.kvarh_lead.value, 5.0));

    assert_eq!(reading.md_kw_import.value.value, 550.0);
    assert_eq!(
        reading.md_kw_import.capture_time.unwrap().to_string(),
        "2025-10-02 12:30:00"
    );
    assert!(approx(reading.md_kva_import.value.value, 600.0));

    assert!(approx(reading.voltage_r.value, 230.1));
    assert!(approx(reading.current_r.value, 5.2));
    assert!(approx(reading.power_factor.value, 0.95));
    assert!(approx(reading.frequency.value, 49.98));

    assert!(approx(reading.tod_zones[0].kwh.value, 100.0));
    assert!(approx(reading.tod_zones[0].kvah.value, 110.0));
    assert!(approx(reading.tod_zones[0].md_kw.value.value, 120.0));
    assert!(reading.tod_zones[0].md_kw.capture_time.is_some());
    // Zones beyond the configured count stay cleared.
    assert!(reading.tod_zones[1].kwh.is_zero());

    assert!(reading.valid);
    assert_eq!(reading.error_count, 0);
    assert_eq!(reading.timestamp, stamp());

    // Teardown happened: counter reset, wake line released.
    assert_eq!(reader.session().frame_counter(), 0x10);
    assert!(!meter.port.dtr_asserted());
}

#[tokio::test(start_paused = true)]
async fn single_register_failure_is_counted_not_fatal() {
    let meter = ScriptedMeter::new();
    meter.handshake();
    script_identification(&meter);

    meter.register(&catalogue::KWH_IMPORT, Value::DoubleLongUnsigned(20_000), -2, 30);
    // kWh export never answers: three class-check attempts time out.
    meter.silent();
    meter.silent();
    meter.silent();
    meter.register(&catalogue::KVAH_IMPORT, Value::DoubleLongUnsigned(2_200), -1, 31);
    meter.register(&catalogue::KVAH_EXPORT, Value::DoubleLongUnsigned(0), -1, 31);
    meter.register(&catalogue::KVARH_LAG, Value::DoubleLongUnsigned(50), 0, 32);
    meter.register(&catalogue::KVARH_LEAD, Value::DoubleLongUnsigned(5), 0, 32);

    let at = md_capture_time();
    meter.demand(&catalogue::MD_KW_IMPORT, Value::DoubleLongUnsigned(5_500), -1, 27, at);
    meter.demand(&catalogue::MD_KW_EXPORT, Value::DoubleLongUnsigned(0), -1, 27, at);
    meter.demand(&catalogue::MD_KVA_IMPORT, Value::DoubleLongUnsigned(6_000), -1, 28, at);
    meter.demand(&catalogue::MD_KVA_EXPORT, Value::DoubleLongUnsigned(0), -1, 28, at);

    meter.register(&catalogue::VOLTAGE_R, Value::LongUnsigned(2_301), -1, 35);
    meter.register(&catalogue::VOLTAGE_Y, Value::LongUnsigned(2_298), -1, 35);
    meter.register(&catalogue::VOLTAGE_B, Value::LongUnsigned(2_305), -1, 35);
    meter.register(&catalogue::CURRENT_R, Value::LongUnsigned(52), -1, 33);
    meter.register(&catalogue::CURRENT_Y, Value::LongUnsigned(48), -1, 33);
    meter.register(&catalogue::CURRENT_B, Value::LongUnsigned(55), -1, 33);
    meter.register(&catalogue::CURRENT_NEUTRAL, Value::LongUnsigned(3), -1, 33);
    meter.register(&catalogue::POWER_FACTOR, Value::LongUnsigned(95), -2, 255);
    meter.register(&catalogue::FREQUENCY, Value::LongUnsigned(4_998), -2, 44);

    let config = ClientConfig {
        read_tod_zones: 0,
        ..ClientConfig::default()
    };
    let mut reader = reader_on(&meter, config);
    let reading = reader.read_cycle().await.unwrap();

    assert_eq!(reading.error_count, 1);
    assert!(reading.kwh_export.is_zero());
    assert_eq!(reading.kwh_import.value, 200.0);
    assert!(reading.valid);
}

#[tokio::test(start_paused = true)]
async fn all_zero_registers_yield_invalid_reading() {
    let meter = ScriptedMeter::new();
    meter.handshake();
    script_identification(&meter);

    for entry in [
        &catalogue::KWH_IMPORT,
        &catalogue::KWH_EXPORT,
        &catalogue::KVAH_IMPORT,
        &catalogue::KVAH_EXPORT,
        &catalogue::KVARH_LAG,
        &catalogue::KVARH_LEAD,
    ] {
        meter.register(entry, Value::DoubleLongUnsigned(0), 0, 30);
    }
    let at = md_capture_time();
    for entry in [
        &catalogue::MD_KW_IMPORT,
        &catalogue::MD_KW_EXPORT,
        &catalogue::MD_KVA_IMPORT,
        &catalogue::MD_KVA_EXPORT,
    ] {
        meter.demand(entry, Value::DoubleLongUnsigned(0), 0, 27, at);
    }
    for entry in [
        &catalogue::VOLTAGE_R,
        &catalogue::VOLTAGE_Y,
        &catalogue::VOLTAGE_B,
        &catalogue::CURRENT_R,
        &catalogue::CURRENT_Y,
        &catalogue::CURRENT_B,
        &catalogue::CURRENT_NEUTRAL,
        &catalogue::POWER_FACTOR,
        &catalogue::FREQUENCY,
    ] {
        meter.register(entry, Value::LongUnsigned(0), 0, 255);
    }

    let config = ClientConfig {
        read_tod_zones: 0,
        ..ClientConfig::default()
    };
    let mut reader = reader_on(&meter, config);
    let reading = reader.read_cycle().await.unwrap();

    assert!(!reading.valid);
    assert_eq!(reading.error_count, 0);
}

#[tokio::test(start_paused = true)]
async fn identification_failure_aborts_the_cycle() {
    let meter = ScriptedMeter::new();
    meter.handshake();
    // Nothing scripted after the handshake: both identification reads
    // exhaust their retries.

    let mut reader = reader_on(&meter, ClientConfig::default());
    let err = reader.read_cycle().await.unwrap_err();
    assert!(matches!(err, DlmsError::IdentificationFailed));
}

#[tokio::test(start_paused = true)]
async fn handshake_failure_surfaces_as_session_error() {
    let meter = ScriptedMeter::new();
    meter.respond(dm_frame());

    let mut reader = reader_on(&meter, ClientConfig::default());
    let err = reader.read_cycle().await.unwrap_err();
    assert!(matches!(err, DlmsError::HandshakeRejected { .. }));
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_aborts_the_session() {
    let meter = ScriptedMeter::new();
    meter.handshake();

    let config = ClientConfig {
        session_budget: Some(Duration::ZERO),
        ..ClientConfig::default()
    };
    let mut reader = reader_on(&meter, config);
    let err = reader.read_cycle().await.unwrap_err();
    assert!(matches!(err, DlmsError::SessionBudgetExceeded));
}
