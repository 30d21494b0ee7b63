//! Paced control cycle: sense → bridge → actuate.
//!
//! Single-threaded. Each tick reads one frame from the sensor source and
//! actuator feedback, hands both to the bridge, and lets the bridge apply
//! the commands. Ticks are paced against absolute deadlines so sleep jitter
//! does not accumulate; a period of 0 runs unpaced. The `running` flag is
//! checked between ticks only.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use car_common::control::config::CycleConfig;
use car_common::control::state::Feedback;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actuation::Actuator;
use crate::bridge::{BridgeError, BridgeStats, ControllerBridge, TickReport};
use crate::sensor::{SensorError, SensorSource};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-tick timing statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CycleStats {
    /// Total ticks executed.
    pub tick_count: u64,
    /// Last tick duration [ns].
    pub last_tick_ns: u64,
    /// Minimum tick duration [ns].
    pub min_tick_ns: u64,
    /// Maximum tick duration [ns].
    pub max_tick_ns: u64,
    /// Running sum for average computation.
    pub sum_tick_ns: u64,
    /// Ticks that took longer than the period.
    pub overruns: u64,
}

impl CycleStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            tick_count: 0,
            last_tick_ns: 0,
            min_tick_ns: u64::MAX,
            max_tick_ns: 0,
            sum_tick_ns: 0,
            overruns: 0,
        }
    }

    /// Record a tick duration against the period (0 = unpaced).
    #[inline]
    pub fn record(&mut self, duration_ns: u64, period_ns: u64) {
        self.tick_count += 1;
        self.last_tick_ns = duration_ns;
        self.min_tick_ns = self.min_tick_ns.min(duration_ns);
        self.max_tick_ns = self.max_tick_ns.max(duration_ns);
        self.sum_tick_ns = self.sum_tick_ns.saturating_add(duration_ns);
        if period_ns > 0 && duration_ns > period_ns {
            self.overruns += 1;
        }
    }

    /// Average tick time [ns] (returns 0 if no ticks).
    #[inline]
    pub fn avg_tick_ns(&self) -> u64 {
        if self.tick_count == 0 {
            0
        } else {
            self.sum_tick_ns / self.tick_count
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Runner ─────────────────────────────────────────────────────────

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The sensor source failed.
    #[error("sensor error: {0}")]
    Sensor(#[from] SensorError),

    /// The bridge has no variant left.
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// The tick sink failed.
    #[error("output error: {0}")]
    Output(String),
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Sensor source exhausted.
    SourceExhausted,
    /// `max_ticks` reached.
    TickLimit,
    /// Shutdown requested.
    Shutdown,
}

/// One line of replay output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickRecord {
    #[serde(flatten)]
    pub report: TickReport,
    /// Feedback the tick was computed from.
    pub feedback: Feedback,
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stop: StopReason,
    pub cycle: CycleStats,
    pub bridge: BridgeStats,
}

/// Drives the bridge from a sensor source at a fixed period.
pub struct CycleRunner<S, A> {
    bridge: ControllerBridge,
    source: S,
    actuator: A,
    period: Duration,
    max_ticks: Option<u64>,
    running: Arc<AtomicBool>,
    stats: CycleStats,
}

impl<S: SensorSource, A: Actuator> CycleRunner<S, A> {
    pub fn new(bridge: ControllerBridge, source: S, actuator: A, config: &CycleConfig) -> Self {
        Self {
            bridge,
            source,
            actuator,
            period: Duration::from_millis(config.period_ms),
            max_ticks: config.max_ticks,
            running: Arc::new(AtomicBool::new(true)),
            stats: CycleStats::new(),
        }
    }

    /// Shutdown flag; storing `false` stops the run before the next tick.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Run without pacing regardless of the configured period.
    pub fn unpaced(mut self) -> Self {
        self.period = Duration::ZERO;
        self
    }

    pub fn bridge(&self) -> &ControllerBridge {
        &self.bridge
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Run until the source is exhausted, the tick limit is reached or the
    /// shutdown flag is cleared. `on_tick` sees every applied tick.
    pub fn run<F>(&mut self, mut on_tick: F) -> Result<RunSummary, CycleError>
    where
        F: FnMut(&TickRecord) -> Result<(), CycleError>,
    {
        let period_ns = self.period.as_nanos() as u64;
        let mut deadline = Instant::now();
        info!(
            period_ms = self.period.as_millis() as u64,
            max_ticks = ?self.max_ticks,
            "Cycle runner started"
        );

        let stop = loop {
            if !self.running.load(Ordering::SeqCst) {
                break StopReason::Shutdown;
            }
            if self.max_ticks.is_some_and(|max| self.stats.tick_count >= max) {
                break StopReason::TickLimit;
            }
            let Some(frame) = self.source.next_frame()? else {
                break StopReason::SourceExhausted;
            };

            let start = Instant::now();
            let feedback = self.actuator.feedback();
            self.bridge.ingest(frame, feedback);
            let report = self.bridge.step(&mut self.actuator)?;
            let elapsed = start.elapsed().as_nanos() as u64;
            self.stats.record(elapsed, period_ns);
            if period_ns > 0 && elapsed > period_ns {
                warn!(
                    tick = report.tick,
                    elapsed_ns = elapsed,
                    "Tick overran period"
                );
            }

            on_tick(&TickRecord { report, feedback })?;

            if !self.period.is_zero() {
                deadline += self.period;
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                } else {
                    // Behind schedule: restart pacing from now.
                    deadline = now;
                }
            }
        };

        let summary = RunSummary {
            stop,
            cycle: self.stats.clone(),
            bridge: self.bridge.stats(),
        };
        info!(
            ?stop,
            ticks = summary.cycle.tick_count,
            avg_tick_ns = summary.cycle.avg_tick_ns(),
            native = summary.bridge.native_ticks,
            interpreted = summary.bridge.interpreted_ticks,
            fallbacks = summary.bridge.fallbacks,
            "Cycle runner stopped"
        );
        debug!(?summary, "run summary");
        Ok(summary)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
