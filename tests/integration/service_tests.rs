//! Integration tests for the DeviceService → mode machine → hardware
//! pipeline.
//!
//! The service runs its real mode loops and report timer against mock
//! hardware with millisecond-scale timings.

use std::sync::Arc;
use std::time::Duration;

use flowerpot::app::commands::{DeviceCommand, Inbound};
use flowerpot::app::events::DeviceEvent;
use flowerpot::app::service::{DeviceHardware, DeviceService};
use flowerpot::config::SystemConfig;
use flowerpot::drivers::led_engine::{LedEngine, LedTiming};
use flowerpot::drivers::led_patterns::{COLOUR_EMPTIED, COLOUR_FILLING, COLOUR_HOT, OFF, PIXEL_COUNT};
use flowerpot::drivers::pump::PumpActuator;
use flowerpot::error::{Error, SensorError};
use flowerpot::fsm::Mode;
use flowerpot::fsm::alerts::{Alert, Bound, Metric};
use flowerpot::sensors::water_level::WaterLevel;
use flowerpot::sensors::{PlantReading, TelemetrySampler, share_level};

use crate::mock_hw::{
    COMFORTABLE, FeedbackCall, MockLevel, MockOutputPin, MockProbe, RecordingFeedback,
    RecordingSink, RecordingStrip, wait_until,
};

const SITE: &str = "kitchen";
const WAIT: Duration = Duration::from_secs(3);

struct Rig {
    service: DeviceService,
    level: MockLevel,
    probe: MockProbe,
    pump_pin: MockOutputPin,
    feedback: RecordingFeedback,
    sink: RecordingSink,
}

fn test_config() -> SystemConfig {
    SystemConfig {
        pump_duration_ms: 150,
        level_poll_interval_ms: 10,
        level_settle_ms: 0,
        report_interval_secs: 3600,
        sensor_settle_ms: 0,
        sensor_retry_backoff_ms: 1,
        mode_exit_hold_ms: 20,
        ..SystemConfig::default()
    }
}

fn build(initial: WaterLevel) -> Rig {
    let level = MockLevel::new(initial);
    let probe = MockProbe::new(COMFORTABLE);
    let pump_pin = MockOutputPin::new();
    let feedback = RecordingFeedback::new();
    let sink = RecordingSink::new();

    let config = test_config();
    let shared_level = share_level(level.clone());
    let hw = DeviceHardware {
        pump: PumpActuator::new(pump_pin.clone()),
        level: Arc::clone(&shared_level),
        sampler: TelemetrySampler::new(
            probe.clone(),
            shared_level,
            config.sensor_settle(),
            config.retry_backoff(),
        ),
        feedback: Arc::new(feedback.clone()),
    };
    let service = match DeviceService::new(config, SITE, hw, sink.clone()) {
        Ok(s) => s,
        Err(e) => panic!("service rejected test config: {e}"),
    };
    Rig {
        service,
        level,
        probe,
        pump_pin,
        feedback,
        sink,
    }
}

/// In `Ok`, with the mode change that got it there already emitted.
fn settled_in_ok(rig: &Rig) -> bool {
    wait_until(WAIT, || {
        rig.service.mode() == Mode::Ok && rig.sink.modes().last() == Some(&Mode::Ok)
    })
}

/// Started and settled in `Ok` after the first report.
fn started(initial: WaterLevel) -> Rig {
    let rig = build(initial);
    rig.service.start();
    assert!(
        settled_in_ok(&rig),
        "device never reached Ok, stuck in {:?}",
        rig.service.mode()
    );
    rig
}

fn command(c: DeviceCommand) -> Inbound {
    Inbound::new(SITE, c)
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_reaches_ok_after_first_report() {
    let rig = build(WaterLevel::Half);
    assert_eq!(rig.service.mode(), Mode::Booting);

    rig.service.start();
    assert!(settled_in_ok(&rig));

    assert_eq!(rig.feedback.calls().first(), Some(&FeedbackCall::Boot));
    assert_eq!(rig.sink.modes(), vec![Mode::Ready, Mode::Ok]);
    assert_eq!(rig.sink.count("telemetryReport"), 1);

    let report = rig.sink.find("telemetryReport").unwrap();
    assert_eq!(report.site_id, SITE);
    match report.event {
        DeviceEvent::TelemetryReport(sample) => {
            assert_eq!(sample.water, WaterLevel::Half);
            assert_eq!(sample.moisture, COMFORTABLE.moisture);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn implausible_samples_are_retried_until_one_passes() {
    let rig = build(WaterLevel::Half);
    rig.probe.push(Ok(PlantReading {
        moisture: 150.0,
        ..COMFORTABLE
    }));
    rig.probe.push(Err(SensorError::BusFailed));

    rig.service.start();
    assert!(wait_until(WAIT, || rig.sink.count("telemetryReport") == 1));

    assert_eq!(rig.probe.reads(), 3);
    match rig.sink.find("telemetryReport").unwrap().event {
        DeviceEvent::TelemetryReport(sample) => assert_eq!(sample.moisture, 50.0),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn invalid_config_is_rejected() {
    let config = SystemConfig {
        pump_duration_ms: 10,
        ..test_config()
    };
    let level = share_level(MockLevel::new(WaterLevel::Half));
    let hw = DeviceHardware {
        pump: PumpActuator::new(MockOutputPin::new()),
        level: Arc::clone(&level),
        sampler: TelemetrySampler::new(
            MockProbe::new(COMFORTABLE),
            level,
            Duration::ZERO,
            Duration::ZERO,
        ),
        feedback: Arc::new(RecordingFeedback::new()),
    };
    let result = DeviceService::new(config, SITE, hw, RecordingSink::new());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn boot_sweep_runs_to_completion_before_ok() {
    let strip = RecordingStrip::new();
    let timing = LedTiming {
        boot_step: Duration::from_millis(20),
        boot_hold: Duration::from_millis(40),
        fill_step: Duration::from_millis(2),
        alert_fill_step: Duration::from_millis(1),
        auto_clear: Duration::from_millis(100),
    };
    let engine = Arc::new(LedEngine::start(strip.clone(), timing, 1.0).unwrap());

    let config = test_config();
    let level = share_level(MockLevel::new(WaterLevel::Half));
    let hw = DeviceHardware {
        pump: PumpActuator::new(MockOutputPin::new()),
        level: Arc::clone(&level),
        sampler: TelemetrySampler::new(
            MockProbe::new(COMFORTABLE),
            level,
            config.sensor_settle(),
            config.retry_backoff(),
        ),
        feedback: engine.clone(),
    };
    let sink = RecordingSink::new();
    let service = DeviceService::new(config, SITE, hw, sink.clone()).unwrap();

    service.start();
    assert_eq!(service.mode(), Mode::Ready);
    assert!(wait_until(WAIT, || service.mode() == Mode::Ok));

    let most_lit = strip
        .frames()
        .iter()
        .map(|(pixels, _)| pixels.iter().filter(|p| **p != OFF).count())
        .max();
    assert_eq!(most_lit, Some(PIXEL_COUNT), "boot sweep was cut short");
    assert!(wait_until(WAIT, || engine.snapshot().0 == [OFF; PIXEL_COUNT]));
    service.shutdown();
}

// ── Identity ──────────────────────────────────────────────────

#[test]
fn commands_for_other_sites_are_ignored() {
    let rig = started(WaterLevel::Half);

    rig.service.handle(Inbound::new("greenhouse", DeviceCommand::Water));
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(rig.service.mode(), Mode::Ok);
    assert_eq!(rig.pump_pin.rising_edges(), 0);
    assert_eq!(rig.sink.count("refused"), 0);
}

// ── Watering ──────────────────────────────────────────────────

#[test]
fn water_runs_one_burst_then_returns_to_ok() {
    let rig = started(WaterLevel::Half);

    rig.service.handle(command(DeviceCommand::Water).with_session("s1"));
    assert_eq!(rig.service.mode(), Mode::Watering);
    assert!(wait_until(WAIT, || rig.service.pump_running()));

    assert!(settled_in_ok(&rig));
    assert!(!rig.pump_pin.is_high());
    assert_eq!(rig.pump_pin.rising_edges(), 1);
    assert_eq!(
        rig.sink.modes(),
        vec![Mode::Ready, Mode::Ok, Mode::Watering, Mode::Ok]
    );
}

#[test]
fn refill_is_refused_while_watering() {
    let rig = started(WaterLevel::Half);

    rig.service.handle(command(DeviceCommand::Water));
    rig.service.handle(command(DeviceCommand::Refill).with_session("s2"));

    assert_eq!(rig.service.mode(), Mode::Watering);
    let refused = rig.sink.find("refused").expect("refusal emitted");
    assert_eq!(refused.session_id.as_deref(), Some("s2"));
    assert_eq!(
        refused.event,
        DeviceEvent::Refused {
            request: "refillMode",
            mode: Mode::Watering,
        }
    );

    assert!(wait_until(WAIT, || rig.service.mode() == Mode::Ok));
    assert_eq!(rig.pump_pin.rising_edges(), 1);
}

// ── Filling ───────────────────────────────────────────────────

#[test]
fn refill_mirrors_level_changes_until_full() {
    let rig = started(WaterLevel::Dry);

    rig.service.handle(command(DeviceCommand::Refill).with_session("s1"));
    assert_eq!(rig.service.mode(), Mode::Filling);

    // Unchanged level, no redraws.
    std::thread::sleep(Duration::from_millis(40));
    assert!(rig.feedback.levels().is_empty());

    rig.level.set(WaterLevel::Quarter);
    assert!(wait_until(WAIT, || rig.feedback.levels().len() == 1));
    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(rig.feedback.levels().len(), 1);

    rig.level.set(WaterLevel::Half);
    assert!(wait_until(WAIT, || rig.feedback.levels().len() == 2));
    assert_eq!(rig.service.mode(), Mode::Filling);

    rig.level.set(WaterLevel::Full);
    assert!(wait_until(WAIT, || rig.service.mode() == Mode::Ok));

    assert_eq!(rig.feedback.levels(), vec![2, 3, 5]);
    assert!(rig.feedback.calls().iter().all(|c| match c {
        FeedbackCall::Level { colour, .. } => *colour == COLOUR_FILLING,
        _ => true,
    }));

    assert_eq!(rig.sink.count("refillFull"), 1);
    let full = rig.sink.find("refillFull").unwrap();
    assert_eq!(full.session_id.as_deref(), Some("s1"));

    // Finishing re-arms the report immediately.
    assert!(wait_until(WAIT, || rig.sink.count("telemetryReport") == 2));
}

#[test]
fn alerts_are_ignored_while_filling() {
    let rig = started(WaterLevel::Half);

    rig.service.handle(command(DeviceCommand::Refill));
    rig.service.handle(command(DeviceCommand::Alert(Alert::new(
        Metric::Temperature,
        Bound::Min,
    ))));

    assert_eq!(rig.service.mode(), Mode::Filling);
    assert_eq!(rig.sink.count("alertUser"), 0);

    rig.level.set(WaterLevel::Full);
    assert!(wait_until(WAIT, || rig.service.mode() == Mode::Ok));
    assert!(!rig.sink.modes().contains(&Mode::Cold));
}

// ── Emptying ──────────────────────────────────────────────────

#[test]
fn empty_pumps_until_dry_then_confirms() {
    let rig = started(WaterLevel::Half);

    rig.service.handle(command(DeviceCommand::Empty).with_session("s3"));
    assert_eq!(rig.service.mode(), Mode::Emptying);
    assert!(wait_until(WAIT, || rig.pump_pin.is_high()));
    assert!(wait_until(WAIT, || rig.feedback.levels() == vec![3]));

    rig.level.set(WaterLevel::Quarter);
    assert!(wait_until(WAIT, || rig.feedback.levels().len() == 2));

    rig.level.set(WaterLevel::Dry);
    assert!(wait_until(WAIT, || rig.service.mode() == Mode::Ok));

    assert_eq!(rig.feedback.levels(), vec![3, 2, 0, 5]);
    let confirm = rig
        .feedback
        .calls()
        .into_iter()
        .rev()
        .find(|c| matches!(c, FeedbackCall::Level { .. }));
    assert_eq!(
        confirm,
        Some(FeedbackCall::Level {
            lit: 5,
            colour: COLOUR_EMPTIED,
        })
    );

    assert_eq!(rig.sink.count("waterEmptied"), 1);
    assert_eq!(
        rig.sink.find("waterEmptied").unwrap().session_id.as_deref(),
        Some("s3")
    );
    assert!(!rig.pump_pin.is_high());
    assert!(!rig.service.pump_running());
}

// ── Alerts ────────────────────────────────────────────────────

#[test]
fn repeated_alert_is_reported_once() {
    let rig = started(WaterLevel::Half);
    let hot = command(DeviceCommand::Alert(Alert::new(Metric::Temperature, Bound::Max)));

    rig.service.handle(hot.clone());
    rig.service.handle(hot);

    assert_eq!(rig.service.mode(), Mode::Hot);
    assert_eq!(rig.sink.count("alertUser"), 1);
    let meters = rig
        .feedback
        .calls()
        .into_iter()
        .filter(|c| {
            *c == FeedbackCall::Meter {
                percentage: 100.0,
                colour: COLOUR_HOT,
                auto_alert: true,
            }
        })
        .count();
    assert_eq!(meters, 1);
}

#[test]
fn thirsty_alert_starts_watering() {
    let rig = started(WaterLevel::Half);

    rig.service.handle(command(DeviceCommand::Alert(Alert::new(
        Metric::Moisture,
        Bound::Min,
    ))));

    assert_eq!(rig.sink.count("alertUser"), 1);
    assert_eq!(rig.service.mode(), Mode::Watering);
    assert!(settled_in_ok(&rig));
    assert_eq!(
        rig.sink.modes(),
        vec![Mode::Ready, Mode::Ok, Mode::Thirsty, Mode::Watering, Mode::Ok]
    );
    assert_eq!(rig.pump_pin.rising_edges(), 1);
}

#[test]
fn overfull_tank_alert_has_no_mode() {
    let rig = started(WaterLevel::Half);

    rig.service.handle(command(DeviceCommand::Alert(Alert::new(Metric::Water, Bound::Max))));

    assert_eq!(rig.service.mode(), Mode::Ok);
    assert_eq!(rig.sink.count("alertUser"), 0);
}

#[test]
fn alert_mode_clears_once_readings_recover() {
    let rig = started(WaterLevel::Half);
    rig.probe.set_steady(PlantReading {
        temperature: 40.0,
        ..COMFORTABLE
    });
    rig.service.handle(command(DeviceCommand::Alert(Alert::new(
        Metric::Temperature,
        Bound::Max,
    ))));
    assert_eq!(rig.service.mode(), Mode::Hot);

    rig.service.report_now();
    assert_eq!(rig.service.mode(), Mode::Hot);

    rig.probe.set_steady(COMFORTABLE);
    rig.service.report_now();
    assert_eq!(rig.service.mode(), Mode::Ok);
    assert_eq!(rig.sink.modes().last(), Some(&Mode::Ok));
}

// ── Teardown ──────────────────────────────────────────────────

#[test]
fn shutdown_leaves_hardware_safe() {
    let rig = started(WaterLevel::Half);
    rig.service.handle(command(DeviceCommand::Water));
    assert!(wait_until(WAIT, || rig.pump_pin.is_high()));

    rig.service.shutdown();
    rig.service.shutdown();

    assert!(!rig.pump_pin.is_high());
    assert!(rig.level.released());
    let shutdowns = rig
        .feedback
        .calls()
        .into_iter()
        .filter(|c| *c == FeedbackCall::Shutdown)
        .count();
    assert_eq!(shutdowns, 1);

    rig.service.handle(command(DeviceCommand::Water));
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(rig.pump_pin.rising_edges(), 1);
    assert!(!rig.service.pump_running());
}
