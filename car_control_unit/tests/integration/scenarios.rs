//! Reference scenarios on both variants.

use car_common::control::config::ControlConfig;
use car_common::control::native::NativeParams;
use car_common::control::state::{
    Commands, Distances, DriveMode, Feedback, SensorFrame, TickInput,
};
use car_control_unit::actuation::{Actuator, SimActuator};
use car_control_unit::bridge::ControllerBridge;
use car_control_unit::control::law::InterpretedLaw;
use car_control_unit::control::linearize::Linearizer;
use car_control_unit::variant::{ControlLaw, VariantKind};
use car_control_unit::verify::VerificationResult;
use proptest::prelude::*;

use super::{linked_loader, linked_native, native_lock};

fn open_road() -> TickInput {
    // raw 163 at angle factor 100 is 130 cm on every channel
    TickInput {
        frame: SensorFrame {
            front_raw: 163,
            left_raw: 163,
            right_raw: 163,
            side_angle_factor: 100,
        },
        feedback: Feedback::default(),
    }
}

fn wall_on_the_left() -> TickInput {
    // front 218 -> 100 cm; sides at factor 150: left 770 -> 20 cm, right 163 -> 86 cm
    TickInput {
        frame: SensorFrame {
            front_raw: 218,
            left_raw: 770,
            right_raw: 163,
            side_angle_factor: 150,
        },
        feedback: Feedback {
            power: 5,
            steer_angle: 0,
        },
    }
}

fn verified() -> VerificationResult {
    VerificationResult {
        ok: true,
        missing: Default::default(),
        failure: None,
        artifact: "linked".into(),
    }
}

#[test]
fn open_road_accelerates_on_both_variants() {
    let _guard = native_lock();
    let mut interpreted = InterpretedLaw::new(&ControlConfig::default());
    let mut native = linked_native(&NativeParams::DEFAULT);

    for law in [&mut interpreted as &mut dyn ControlLaw, &mut native] {
        let output = law.step(&open_road()).unwrap();
        assert_eq!(
            output.distances,
            Distances {
                front: 130,
                left: 130,
                right: 130
            },
            "{} distances",
            law.kind()
        );
        assert_eq!(output.mode, DriveMode::FarTracking, "{} mode", law.kind());
        assert_eq!(
            output.commands,
            Commands {
                power: 29,
                steer: 0
            },
            "{} commands",
            law.kind()
        );
    }
}

#[test]
fn close_left_wall_reverses_and_steers_right() {
    let _guard = native_lock();
    let mut interpreted = InterpretedLaw::new(&ControlConfig::default());
    let mut native = linked_native(&NativeParams::DEFAULT);

    for law in [&mut interpreted as &mut dyn ControlLaw, &mut native] {
        let output = law.step(&wall_on_the_left()).unwrap();
        assert_eq!(
            output.distances,
            Distances {
                front: 100,
                left: 20,
                right: 86
            },
            "{} distances",
            law.kind()
        );
        assert_eq!(output.mode, DriveMode::Avoidance, "{} mode", law.kind());
        assert_eq!(
            output.commands,
            Commands {
                power: -20,
                steer: 10
            },
            "{} commands",
            law.kind()
        );
    }
}

#[test]
fn exact_avoidance_distances() {
    let mut law = InterpretedLaw::new(&ControlConfig::default());
    let (commands, mode) = law.evaluate(
        Distances {
            front: 100,
            left: 20,
            right: 100,
        },
        5,
    );
    assert_eq!(mode, DriveMode::Avoidance);
    assert_eq!(
        commands,
        Commands {
            power: -20,
            steer: 10
        }
    );
}

#[test]
fn bridge_applies_native_commands_to_actuator() {
    let _guard = native_lock();
    let config = ControlConfig::default();
    let mut bridge = ControllerBridge::start_with(
        &config,
        Some(&verified()),
        linked_loader(car_native::symbol_table()),
    )
    .unwrap();
    let mut actuator = SimActuator::default();

    let input = wall_on_the_left();
    bridge.ingest(input.frame, input.feedback);
    let report = bridge.step(&mut actuator).unwrap();

    assert_eq!(report.variant, VariantKind::Native);
    assert!(!report.fallback);
    assert_eq!(report.mode, DriveMode::Avoidance);
    assert_eq!(bridge.state().commands(), report.commands);
    assert_eq!(bridge.state().distance_left, 20);
    assert_eq!(bridge.state().current_power, 5);
    assert_eq!(actuator.last_commands(), Some(report.commands));
    assert!(actuator.propulsion() < 0);
}

#[test]
fn both_bridges_agree_over_a_drive() {
    let _guard = native_lock();
    let config = ControlConfig::default();
    let mut native = ControllerBridge::start_with(
        &config,
        Some(&verified()),
        linked_loader(car_native::symbol_table()),
    )
    .unwrap();
    let mut interpreted = ControllerBridge::start(&config, None).unwrap();
    let mut native_act = SimActuator::default();
    let mut interpreted_act = SimActuator::default();

    let frames = [open_road(), open_road(), wall_on_the_left(), open_road()];
    for input in frames {
        native.ingest(input.frame, native_act.feedback());
        interpreted.ingest(input.frame, interpreted_act.feedback());
        let a = native.step(&mut native_act).unwrap();
        let b = interpreted.step(&mut interpreted_act).unwrap();
        assert_eq!(a.variant, VariantKind::Native);
        assert_eq!(b.variant, VariantKind::Interpreted);
        assert_eq!(a.commands, b.commands, "tick {}", a.tick);
        assert_eq!(a.mode, b.mode, "tick {}", a.tick);
    }
    assert_eq!(native.state(), interpreted.state());
}

fn close_obstacle_frame() -> impl Strategy<Value = SensorFrame> {
    (0u16..=1023, 0u16..=1023, 0u16..=1023, any::<u8>())
        .prop_map(|(front_raw, left_raw, right_raw, side_angle_factor)| SensorFrame {
            front_raw,
            left_raw,
            right_raw,
            side_angle_factor,
        })
        .prop_filter("closest distance below the near threshold", |frame| {
            Linearizer::default().frame(frame).min() < 50
        })
}

proptest! {
    #[test]
    fn close_obstacle_always_reverses(
        frame in close_obstacle_frame(),
        power in any::<i8>(),
        steer_angle in any::<i8>(),
    ) {
        let config = ControlConfig::default();
        let input = TickInput {
            frame,
            feedback: Feedback { power, steer_angle },
        };
        let _guard = native_lock();
        let mut interpreted = InterpretedLaw::new(&config);
        let mut native = linked_native(&NativeParams::from(&config));

        for law in [&mut interpreted as &mut dyn ControlLaw, &mut native] {
            let output = law.step(&input).unwrap();
            let d = output.distances;
            prop_assert_eq!(output.mode, DriveMode::Avoidance);
            prop_assert_eq!(output.commands.power, config.law.reverse_power as i32);
            let side = if d.right >= d.left { 1 } else { -1 };
            prop_assert_eq!(output.commands.steer, side * config.law.avoid_steer as i32);
        }
    }

    #[test]
    fn avoidance_ignores_distance_magnitudes(
        close in 0u16..50,
        a in 0u16..=2000,
        b in 0u16..=2000,
        slot in 0usize..3,
        power in any::<i8>(),
    ) {
        let mut values = [a, b, close];
        values.swap(2, slot);
        let [front, left, right] = values;
        let mut law = InterpretedLaw::new(&ControlConfig::default());
        let (commands, mode) = law.evaluate(Distances { front, left, right }, power);
        prop_assert_eq!(mode, DriveMode::Avoidance);
        prop_assert_eq!(commands.power, -20);
        prop_assert_eq!(commands.steer.abs(), 10);
    }
}
