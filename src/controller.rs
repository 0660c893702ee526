//! Dynamic controller (component G).
//!
//! Periodic feedback loop: sample cache misses across every workload
//! currently labeled `dynamic`, compare the aggregate against the
//! configured water-lines, and step the dynamic tier's budget up or down
//! accordingly, saturating at the static `low`/`high` presets.
//!
//! State machine:
//! `Idle -> Waiting -> Sampling -> Computing -> Waiting -> ...`, with
//! shutdown drainable from any state and a disabling `ResctrlGone` path.

use crate::checkpoint::CheckpointBridge;
use crate::limitset::LimitSet;
use crate::perf;
use crate::tier::{TierModel, TierName, TierPercents, DYNAMIC_STEP};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Tunables driving the controller's cadence and policy.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub adjust_interval: Duration,
    pub perf_duration: Duration,
    pub max_waterline: u64,
    pub min_waterline: u64,
}

/// Direction the dynamic budget moved on a tick, or `Hold` if neither
/// water-line test fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Up,
    Down,
    Hold,
}

/// Decide the step direction for one tick's aggregate miss count. When
/// both tests fire (a pathological water-line configuration where
/// `max_waterline < min_waterline`), pressure-up wins.
pub fn decide_step(total_misses: u64, cfg: &ControllerConfig) -> StepDirection {
    if total_misses > cfg.max_waterline {
        StepDirection::Up
    } else if total_misses < cfg.min_waterline {
        StepDirection::Down
    } else {
        StepDirection::Hold
    }
}

/// Apply one step to a budget pair, saturating at `low`/`high`. Returns
/// the new pair and whether it differs from `current`.
pub fn step_budget(
    current: TierPercents,
    low: TierPercents,
    high: TierPercents,
    direction: StepDirection,
) -> (TierPercents, bool) {
    let stepped = match direction {
        StepDirection::Up => TierPercents {
            l3_pct: (current.l3_pct + DYNAMIC_STEP).min(high.l3_pct),
            mb_pct: (current.mb_pct + DYNAMIC_STEP).min(high.mb_pct),
        },
        StepDirection::Down => TierPercents {
            l3_pct: current.l3_pct.saturating_sub(DYNAMIC_STEP).max(low.l3_pct),
            mb_pct: current.mb_pct.saturating_sub(DYNAMIC_STEP).max(low.mb_pct),
        },
        StepDirection::Hold => current,
    };
    (stepped, stepped != current)
}

/// Drives the dynamic controller's periodic loop. Owns no workload data
/// itself — every tick re-reads a fresh snapshot from the checkpoint
/// bridge.
pub struct DynamicController<C: CheckpointBridge> {
    tier_model: Arc<TierModel>,
    checkpoint: Arc<C>,
    dynamic_limit_set: Arc<LimitSet>,
    cbm_width: u32,
    numa_count: usize,
    cgroup_root: String,
    cfg: ControllerConfig,
    enabled: Arc<AtomicBool>,
}

impl<C: CheckpointBridge + 'static> DynamicController<C> {
    pub fn new(
        tier_model: Arc<TierModel>,
        checkpoint: Arc<C>,
        dynamic_limit_set: Arc<LimitSet>,
        cbm_width: u32,
        numa_count: usize,
        cgroup_root: String,
        cfg: ControllerConfig,
        enabled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tier_model,
            checkpoint,
            dynamic_limit_set,
            cbm_width,
            numa_count,
            cgroup_root,
            cfg,
            enabled,
        }
    }

    /// Run exactly one tick: sample every dynamic-tier workload in
    /// series (perf hardware-counter groups are not over-committed by
    /// parallelizing across siblings), aggregate, decide, and re-emit
    /// schemata if the budget moved. Returns the step direction taken.
    pub fn tick(&self) -> StepDirection {
        let workloads = self.checkpoint.list_by_tier(TierName::Dynamic);
        let mut total_misses: u64 = 0;
        for workload in &workloads {
            let path = workload.cgroup_path(&self.cgroup_root, "perf_event");
            match perf::sample_cgroup(std::path::Path::new(&path), self.cfg.perf_duration) {
                Ok(sample) => total_misses += sample.misses,
                Err(e) => {
                    tracing::warn!(workload = %workload.id, error = %e, "perf sample failed, contributing zero");
                }
            }
        }

        let direction = decide_step(total_misses, &self.cfg);
        let low = self.tier_model.low_preset();
        let high = self.tier_model.high_preset();
        let current = self.tier_model.dynamic_pct();
        let (stepped, changed) = step_budget(current, low, high, direction);

        if changed {
            self.tier_model.set_dynamic_pct(stepped);
            match self.dynamic_limit_set.emit(&self.tier_model, self.cbm_width, self.numa_count) {
                Ok(()) => {
                    tracing::info!(
                        direction = ?direction,
                        l3_pct = stepped.l3_pct,
                        mb_pct = stepped.mb_pct,
                        "dynamic tier budget adjusted"
                    );
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, "schemata re-emit failed, retrying next tick");
                }
                Err(e) => {
                    tracing::error!(error = %e, "dynamic tier resctrl group disappeared, disabling controller");
                    self.enabled.store(false, Ordering::SeqCst);
                }
            }
        }
        direction
    }

    /// Spawn the periodic loop on its own thread. The returned handle's
    /// thread exits once `stop` is set to true and the in-flight tick
    /// (if any) has completed — shutdown never interrupts a sample
    /// mid-flight, so perf FDs are always released through their scoped
    /// `Drop` guards rather than abandoned. The inter-tick wait is polled
    /// in short slices rather than one long sleep, so shutdown doesn't
    /// have to wait out the full `adjust_interval` while the thread is
    /// parked.
    pub fn spawn(self: Arc<Self>, stop: Arc<AtomicBool>) -> JoinHandle<()> {
        const POLL_SLICE: Duration = Duration::from_millis(200);
        std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                if !Self::wait_or_stop(self.cfg.adjust_interval, POLL_SLICE, &stop) {
                    break;
                }
                if !self.enabled.load(Ordering::SeqCst) {
                    continue;
                }
                self.tick();
            }
        })
    }

    /// Sleep for `total`, checking `stop` every `slice`. Returns `false`
    /// (and stops waiting early) as soon as `stop` is set.
    fn wait_or_stop(total: Duration, slice: Duration, stop: &AtomicBool) -> bool {
        let mut remaining = total;
        while remaining > Duration::ZERO {
            if stop.load(Ordering::Relaxed) {
                return false;
            }
            let step = remaining.min(slice);
            std::thread::sleep(step);
            remaining -= step;
        }
        !stop.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(l3: u32, mb: u32) -> TierPercents {
        TierPercents { l3_pct: l3, mb_pct: mb }
    }

    fn cfg(max: u64, min: u64) -> ControllerConfig {
        ControllerConfig {
            adjust_interval: Duration::from_secs(1),
            perf_duration: Duration::from_millis(1),
            max_waterline: max,
            min_waterline: min,
        }
    }

    #[test]
    fn decide_step_up_on_high_misses() {
        assert_eq!(decide_step(1000, &cfg(500, 100)), StepDirection::Up);
    }

    #[test]
    fn decide_step_down_on_low_misses() {
        assert_eq!(decide_step(50, &cfg(500, 100)), StepDirection::Down);
    }

    #[test]
    fn decide_step_hold_in_band() {
        assert_eq!(decide_step(300, &cfg(500, 100)), StepDirection::Hold);
    }

    #[test]
    fn pathological_waterlines_up_wins() {
        // max < min, both tests fire: up wins the tie-break
        assert_eq!(decide_step(1000, &cfg(0, u64::MAX)), StepDirection::Up);
    }

    #[test]
    fn dynamic_up_saturates_in_six_ticks() {
        // low=20, high=50, step=5 -> 6 ticks to saturate
        let low = pct(20, 10);
        let high = pct(50, 50);
        let mut current = low;
        for i in 0..10 {
            let (next, changed) = step_budget(current, low, high, StepDirection::Up);
            if i < 6 {
                assert!(changed, "tick {i} should still be moving");
            }
            current = next;
        }
        assert_eq!(current, high);
    }

    #[test]
    fn dynamic_down_converges_to_low_and_stays() {
        let low = pct(20, 10);
        let high = pct(50, 50);
        let mut current = high;
        for _ in 0..6 {
            let (next, _) = step_budget(current, low, high, StepDirection::Down);
            current = next;
        }
        assert_eq!(current, low);
        let (next, changed) = step_budget(current, low, high, StepDirection::Down);
        assert_eq!(next, low);
        assert!(!changed);
    }

    #[test]
    fn hold_never_changes() {
        let p = pct(30, 30);
        let (next, changed) = step_budget(p, pct(20, 10), pct(50, 50), StepDirection::Hold);
        assert_eq!(next, p);
        assert!(!changed);
    }

    #[test]
    fn wait_or_stop_returns_promptly_on_stop() {
        let stop = Arc::new(AtomicBool::new(false));
        let waiter = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                DynamicController::<crate::checkpoint::Checkpoint>::wait_or_stop(
                    Duration::from_secs(3600),
                    Duration::from_millis(20),
                    &stop,
                )
            })
        };
        std::thread::sleep(Duration::from_millis(50));
        stop.store(true, Ordering::Relaxed);
        let started = std::time::Instant::now();
        let result = waiter.join().unwrap();
        assert!(!result);
        assert!(started.elapsed() < Duration::from_secs(1), "wait_or_stop should not block for the full interval");
    }

    #[test]
    fn wait_or_stop_returns_true_when_interval_elapses_without_stop() {
        let stop = Arc::new(AtomicBool::new(false));
        let result = DynamicController::<crate::checkpoint::Checkpoint>::wait_or_stop(
            Duration::from_millis(10),
            Duration::from_millis(5),
            &stop,
        );
        assert!(result);
    }
}
