//! Controller bridge.
//!
//! Owns the [`SharedControlState`] and is its only writer. Per tick it
//! selects the native variant when the lifecycle is `VerifiedOk` and the
//! configuration prefers it, otherwise the interpreted law. A failing
//! native call disables the native variant and the same tick is recomputed
//! by the interpreted law, so the actuator always receives exactly one
//! command pair per tick.

pub mod lifecycle;

use std::path::Path;

use car_common::control::config::{BridgeConfig, ControlConfig};
use car_common::control::native::NativeParams;
use car_common::control::state::{
    Commands, Distances, DriveMode, Feedback, LawOutput, SensorFrame, SharedControlState,
    TickInput,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actuation::Actuator;
use crate::control::law::InterpretedLaw;
use crate::native::{NativeError, NativeLaw};
use crate::variant::{ControlLaw, LawError, VariantKind};
use crate::verify::VerificationResult;

use self::lifecycle::{Lifecycle, LifecycleEvent, LifecycleMachine, TransitionResult};

/// Factory that brings up the native variant from a verified artifact.
pub type NativeLoader =
    Box<dyn Fn(&Path, &NativeParams) -> Result<Box<dyn ControlLaw>, NativeError>>;

/// Loader for `car_native` shared libraries.
pub fn dynamic_loader() -> NativeLoader {
    Box::new(|path: &Path, params: &NativeParams| {
        Ok(Box::new(NativeLaw::load(path, params)?) as Box<dyn ControlLaw>)
    })
}

/// Bridge failure.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Startup policy cannot be met.
    #[error("no usable control-law variant: {0}")]
    NoUsableVariant(String),

    /// The interpreted law failed; no variant is left.
    #[error("interpreted control law failed: {0}")]
    Interpreted(#[from] LawError),
}

/// Per-variant tick counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    /// Ticks produced by the native variant.
    pub native_ticks: u64,
    /// Ticks produced by the interpreted variant (including fallbacks).
    pub interpreted_ticks: u64,
    /// Native failures recovered on the interpreted variant.
    pub fallbacks: u64,
}

/// What one tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// 1-based tick number.
    pub tick: u64,
    /// Variant whose commands were applied.
    pub variant: VariantKind,
    /// The native variant failed on this tick.
    pub fallback: bool,
    pub mode: DriveMode,
    pub commands: Commands,
    pub distances: Distances,
}

/// Variant selection, fallback and command application.
pub struct ControllerBridge {
    policy: BridgeConfig,
    params: NativeParams,
    lifecycle: LifecycleMachine,
    native: Option<Box<dyn ControlLaw>>,
    interpreted: InterpretedLaw,
    state: SharedControlState,
    pending: TickInput,
    stats: BridgeStats,
    loader: NativeLoader,
}

impl ControllerBridge {
    /// Start with the dynamic `car_native` loader.
    ///
    /// Without a verification result the lifecycle stays `Unverified` and
    /// the interpreted law runs.
    pub fn start(
        config: &ControlConfig,
        verification: Option<&VerificationResult>,
    ) -> Result<Self, BridgeError> {
        Self::start_with(config, verification, dynamic_loader())
    }

    /// Start with a custom native loader.
    pub fn start_with(
        config: &ControlConfig,
        verification: Option<&VerificationResult>,
        loader: NativeLoader,
    ) -> Result<Self, BridgeError> {
        let mut bridge = Self {
            policy: config.bridge.clone(),
            params: NativeParams::from(config),
            lifecycle: LifecycleMachine::new(),
            native: None,
            interpreted: InterpretedLaw::new(config),
            state: SharedControlState::default(),
            pending: TickInput::default(),
            stats: BridgeStats::default(),
            loader,
        };

        if let Some(result) = verification {
            bridge.reverify(result);
        }

        if bridge.policy.require_native && bridge.selected() != VariantKind::Native {
            return Err(BridgeError::NoUsableVariant(format!(
                "native variant required but lifecycle is {:?}",
                bridge.lifecycle.state()
            )));
        }

        info!(
            lifecycle = ?bridge.lifecycle.state(),
            variant = %bridge.selected(),
            "Controller bridge started"
        );
        Ok(bridge)
    }

    /// Apply a fresh verification result and (re)load the native variant.
    pub fn reverify(&mut self, result: &VerificationResult) -> Lifecycle {
        self.native = None;
        let event = if result.ok {
            match (self.loader)(&result.artifact, &self.params) {
                Ok(law) => {
                    self.native = Some(law);
                    LifecycleEvent::VerificationPassed
                }
                Err(e) => {
                    warn!("Verified artifact failed to load: {e}");
                    LifecycleEvent::VerificationFailed
                }
            }
        } else {
            warn!(
                failure = ?result.failure,
                missing = ?result.missing,
                "Native verification failed, using interpreted control law"
            );
            LifecycleEvent::VerificationFailed
        };
        self.transition(event);
        info!(lifecycle = ?self.lifecycle.state(), "Native lifecycle updated");
        self.lifecycle.state()
    }

    /// Record the input of the next tick.
    pub fn ingest(&mut self, frame: SensorFrame, feedback: Feedback) {
        self.pending = TickInput { frame, feedback };
    }

    /// Run one tick on the pending input and apply the commands.
    pub fn step(&mut self, actuator: &mut dyn Actuator) -> Result<TickReport, BridgeError> {
        let input = self.pending;

        let attempt = match self.selected() {
            VariantKind::Native => self.native.as_mut().map(|native| native.step(&input)),
            VariantKind::Interpreted => None,
        };

        let mut fallback = false;
        let (output, variant) = match attempt {
            Some(Ok(output)) => (output, VariantKind::Native),
            Some(Err(e)) => {
                warn!(
                    tick = self.state.tick + 1,
                    "Native control law failed: {e}; recomputing tick on interpreted"
                );
                self.disable_native();
                fallback = true;
                (self.run_interpreted(&input)?, VariantKind::Interpreted)
            }
            None => (self.run_interpreted(&input)?, VariantKind::Interpreted),
        };

        self.state.commit(&input, &output);
        actuator.set_propulsion(output.commands.power);
        actuator.set_steering(output.commands.steer);

        match variant {
            VariantKind::Native => self.stats.native_ticks += 1,
            VariantKind::Interpreted => self.stats.interpreted_ticks += 1,
        }
        debug!(
            tick = self.state.tick,
            %variant,
            power = output.commands.power,
            steer = output.commands.steer,
            "tick applied"
        );

        Ok(TickReport {
            tick: self.state.tick,
            variant,
            fallback,
            mode: output.mode,
            commands: output.commands,
            distances: output.distances,
        })
    }

    /// Shared control state after the last tick.
    pub fn state(&self) -> &SharedControlState {
        &self.state
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.state()
    }

    /// Variant the next tick will try first.
    pub fn selected(&self) -> VariantKind {
        if self.policy.prefer_native && self.lifecycle.native_allowed() && self.native.is_some() {
            VariantKind::Native
        } else {
            VariantKind::Interpreted
        }
    }

    fn run_interpreted(&mut self, input: &TickInput) -> Result<LawOutput, BridgeError> {
        Ok(self.interpreted.step(input)?)
    }

    fn disable_native(&mut self) {
        self.transition(LifecycleEvent::InvocationFailed);
        self.native = None;
        // The interpreted memory did not follow the native ticks.
        self.interpreted.reset();
        self.stats.fallbacks += 1;
    }

    fn transition(&mut self, event: LifecycleEvent) {
        if let TransitionResult::Rejected(reason) = self.lifecycle.handle_event(event) {
            warn!(?event, "Lifecycle transition rejected: {reason}");
        }
    }
}
