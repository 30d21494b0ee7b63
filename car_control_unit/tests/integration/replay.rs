//! Replay runs over JSON-lines recordings.

use std::io::Write;
use std::path::Path;

use car_common::control::config::{ControlConfig, CycleConfig};
use car_common::control::state::DriveMode;
use car_control_unit::actuation::SimActuator;
use car_control_unit::bridge::ControllerBridge;
use car_control_unit::cycle::{CycleError, CycleRunner, StopReason, TickRecord};
use car_control_unit::sensor::{ReplaySource, SensorError};
use car_control_unit::variant::VariantKind;
use tempfile::NamedTempFile;

fn unpaced() -> CycleConfig {
    CycleConfig {
        period_ms: 0,
        max_ticks: None,
    }
}

fn replay(path: &Path) -> (Vec<TickRecord>, Result<StopReason, CycleError>) {
    let config = ControlConfig::default();
    let bridge = ControllerBridge::start(&config, None).unwrap();
    let source = ReplaySource::open(path).unwrap();
    let mut runner = CycleRunner::new(bridge, source, SimActuator::default(), &unpaced());
    let mut records = Vec::new();
    let result = runner.run(|record| {
        records.push(*record);
        Ok(())
    });
    (records, result.map(|summary| summary.stop))
}

#[test]
fn corridor_recording_replays() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/corridor.jsonl");
    let (records, stop) = replay(&path);
    assert_eq!(stop.unwrap(), StopReason::SourceExhausted);
    assert_eq!(records.len(), 12);
    assert!(records.iter().all(|r| r.report.variant == VariantKind::Interpreted));

    assert_eq!(records[0].report.mode, DriveMode::FarTracking);
    assert_eq!(records[0].report.commands.power, 29);

    // left wall at 37 cm: reverse and steer away to the right
    let avoid = &records[6].report;
    assert_eq!(avoid.distances.left, 37);
    assert_eq!(avoid.mode, DriveMode::Avoidance);
    assert_eq!(avoid.commands.power, -20);
    assert_eq!(avoid.commands.steer, 10);

    // feedback of each tick is what the previous tick applied
    assert_eq!(records[1].feedback.power, 29);
}

#[test]
fn replay_output_is_json_lines() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# header comment").unwrap();
    writeln!(file, r#"{{"front": 163, "left": 163, "right": 163}}"#).unwrap();
    writeln!(file).unwrap();
    writeln!(file, r#"{{"front": 400, "left": 700, "right": 200, "side_angle_factor": 100}}"#)
        .unwrap();

    let (records, stop) = replay(file.path());
    assert_eq!(stop.unwrap(), StopReason::SourceExhausted);
    assert_eq!(records.len(), 2);

    let line = serde_json::to_value(records[1]).unwrap();
    assert_eq!(line["tick"], 2);
    assert_eq!(line["variant"], "interpreted");
    assert_eq!(line["fallback"], false);
    assert_eq!(line["distances"]["left"], 33);
    assert_eq!(line["commands"]["power"], -20);
    assert!(line.get("feedback").is_some());
}

#[test]
fn malformed_line_stops_run_with_line_number() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"front": 163, "left": 163, "right": 163}}"#).unwrap();
    writeln!(file, r#"{{"front": "near"}}"#).unwrap();

    let (records, stop) = replay(file.path());
    assert_eq!(records.len(), 1);
    match stop {
        Err(CycleError::Sensor(SensorError::Parse { line, .. })) => assert_eq!(line, 2),
        other => panic!("expected parse error, got {other:?}"),
    }
}
