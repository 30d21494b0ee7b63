//! Native and interpreted variants agree on every tick.

use car_common::consts::COMMAND_TOLERANCE;
use car_common::control::config::{ControlConfig, SteeringConfig};
use car_common::control::native::NativeParams;
use car_common::control::state::{Feedback, SensorFrame, TickInput};
use car_common::manifest::status;
use car_control_unit::control::law::InterpretedLaw;
use car_control_unit::variant::ControlLaw;
use proptest::prelude::*;

use super::{linked_native, native_lock};

fn frame() -> impl Strategy<Value = SensorFrame> {
    (0u16..=1023, 0u16..=1023, 0u16..=1023, any::<u8>()).prop_map(
        |(front_raw, left_raw, right_raw, side_angle_factor)| SensorFrame {
            front_raw,
            left_raw,
            right_raw,
            side_angle_factor,
        },
    )
}

fn tick() -> impl Strategy<Value = TickInput> {
    (frame(), any::<i8>(), any::<i8>()).prop_map(|(frame, power, steer_angle)| TickInput {
        frame,
        feedback: Feedback { power, steer_angle },
    })
}

fn tuning() -> impl Strategy<Value = ControlConfig> {
    (
        0u16..=300,
        -250i16..=250,
        (-250i16..=250, -250i16..=250, -250i16..=250),
        0i16..=13_000,
        0i16..=100,
        0u16..=400,
    )
        .prop_map(
            |(setpoint, power_gain, (kp, ki, kd), integral_limit, limit, window_cm)| {
                let mut config = ControlConfig::default();
                config.law.setpoint_cm = setpoint;
                config.law.power_gain = power_gain;
                config.steering = SteeringConfig {
                    kp,
                    ki,
                    kd,
                    integral_limit,
                    limit,
                    window_cm,
                };
                config
            },
        )
}

#[test]
fn config_and_native_accept_the_same_offsets() {
    let _guard = native_lock();
    for b in [0, 20, u32::MAX - 770, u32::MAX - 769, u32::MAX] {
        let mut config = ControlConfig::default();
        config.linearization.b = b;
        let params = NativeParams::from(&config);
        let native_ok = unsafe { car_native::car_configure(&params) } == status::OK;
        assert_eq!(config.validate().is_ok(), native_ok, "b = {b}");
    }
    unsafe { car_native::car_configure(&NativeParams::DEFAULT) };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn variants_agree_on_sequences(
        config in tuning(),
        ticks in prop::collection::vec(tick(), 1..24),
    ) {
        prop_assert!(config.validate().is_ok());
        let _guard = native_lock();
        let mut interpreted = InterpretedLaw::new(&config);
        let mut native = linked_native(&NativeParams::from(&config));

        for (n, input) in ticks.iter().enumerate() {
            let a = native.step(input).unwrap();
            let b = interpreted.step(input).unwrap();
            prop_assert_eq!(a.distances, b.distances, "tick {}", n);
            prop_assert_eq!(a.mode, b.mode, "tick {}", n);
            prop_assert!(
                a.commands.max_deviation(&b.commands) <= COMMAND_TOLERANCE,
                "tick {}: native {:?} interpreted {:?}",
                n,
                a.commands,
                b.commands
            );
        }
    }

    #[test]
    fn reset_restores_power_on_behaviour(
        warmup in prop::collection::vec(tick(), 1..8),
        input in tick(),
    ) {
        let config = ControlConfig {
            steering: SteeringConfig {
                ki: 50,
                kd: 80,
                ..SteeringConfig::default()
            },
            ..ControlConfig::default()
        };
        let _guard = native_lock();
        let mut native = linked_native(&NativeParams::from(&config));
        let mut interpreted = InterpretedLaw::new(&config);
        for w in &warmup {
            native.step(w).unwrap();
            interpreted.step(w).unwrap();
        }
        native.reset();
        interpreted.reset();

        let a = native.step(&input).unwrap();
        let b = InterpretedLaw::new(&config).step(&input).unwrap();
        let c = interpreted.step(&input).unwrap();
        prop_assert_eq!(a, b);
        prop_assert_eq!(b, c);
    }
}
