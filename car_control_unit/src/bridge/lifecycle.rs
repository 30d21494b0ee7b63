//! Native variant verification lifecycle.
//!
//! `Unverified → VerifiedOk | VerifiedFailed`. Only verification outcomes
//! and native invocation failures move the lifecycle; the bridge consults it
//! before every variant selection.

/// Trust level of the native variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub enum Lifecycle {
    /// No verification result has been applied yet.
    #[default]
    Unverified,
    /// Artifact verified and loaded; native is selected.
    VerifiedOk,
    /// Verification or an invocation failed; interpreted until re-verified.
    VerifiedFailed,
}

/// Result of a lifecycle transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded; carries the new state.
    Ok(Lifecycle),
    /// Transition rejected; carries the reason.
    Rejected(&'static str),
}

/// Event that can move the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A verification result with `ok = true` and a successfully loaded artifact.
    VerificationPassed,
    /// A verification result with `ok = false`, or the verified artifact failed to load.
    VerificationFailed,
    /// The native variant failed during a tick.
    InvocationFailed,
}

/// Lifecycle holder.
#[derive(Debug, Clone, Default)]
pub struct LifecycleMachine {
    state: Lifecycle,
}

impl LifecycleMachine {
    pub const fn new() -> Self {
        Self {
            state: Lifecycle::Unverified,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> Lifecycle {
        self.state
    }

    /// Native may be selected.
    #[inline]
    pub const fn native_allowed(&self) -> bool {
        matches!(self.state, Lifecycle::VerifiedOk)
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: LifecycleEvent) -> TransitionResult {
        use Lifecycle::*;
        use LifecycleEvent::*;

        let next = match (self.state, event) {
            // Any verification outcome is authoritative.
            (_, VerificationPassed) => VerifiedOk,
            (_, VerificationFailed) => VerifiedFailed,

            // Only a trusted native variant can fail mid-run.
            (VerifiedOk, InvocationFailed) => VerifiedFailed,
            (Unverified, InvocationFailed) => {
                return TransitionResult::Rejected("Unverified: native never selected");
            }
            (VerifiedFailed, InvocationFailed) => {
                return TransitionResult::Rejected("VerifiedFailed: native already disabled");
            }
        };

        self.state = next;
        TransitionResult::Ok(next)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
