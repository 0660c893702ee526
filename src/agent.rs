//! The agent (process-wide state, analogous to the original's `Rubik`
//! struct plus its package-level `enable` bool).
//!
//! Owns the platform singleton, the tier model, one limit set per tier,
//! the checkpoint bridge handle, the dynamic controller (if enabled), and
//! the process-wide `enabled` flag other subsystems query.

use crate::checkpoint::CheckpointBridge;
use crate::controller::DynamicController;
use crate::limitset::LimitSet;
use crate::resctrl;
use crate::tier::{TierModel, TierName};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Singleton describing the resctrl mount this process is managing.
#[derive(Debug, Clone)]
pub struct ResctrlPlatform {
    pub root_dir: PathBuf,
    pub cbm_width: u32,
    pub numa_count: usize,
}

/// Handle to the spawned dynamic controller thread, kept so shutdown can
/// join it.
struct ControllerHandle {
    stop: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

/// Everything the running process needs: the platform, the tier/limit-set
/// wiring, and (if dynamic mode is active) the controller thread.
pub struct CacheLimitAgent<C: CheckpointBridge + 'static> {
    pub platform: ResctrlPlatform,
    pub tier_model: Arc<TierModel>,
    pub limit_sets: HashMap<TierName, Arc<LimitSet>>,
    pub checkpoint: Arc<C>,
    enabled: Arc<AtomicBool>,
    controller: Option<ControllerHandle>,
}

impl<C: CheckpointBridge + 'static> CacheLimitAgent<C> {
    pub fn new(
        platform: ResctrlPlatform,
        tier_model: Arc<TierModel>,
        limit_sets: HashMap<TierName, Arc<LimitSet>>,
        checkpoint: Arc<C>,
        enabled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            platform,
            tier_model,
            limit_sets,
            checkpoint,
            enabled,
            controller: None,
        }
    }

    /// Whether the agent is actively enforcing limits. Queried by the
    /// (out-of-scope) admission endpoint to decide whether to label a new
    /// workload offline.
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn enabled_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.enabled)
    }

    pub fn attach_controller(&mut self, controller: Arc<DynamicController<C>>) {
        let stop = Arc::new(AtomicBool::new(false));
        let join = controller.spawn(Arc::clone(&stop));
        self.controller = Some(ControllerHandle { stop, join });
    }

    /// Signal the controller thread (if any) to stop after its current
    /// tick, join it, then remove every tier's resctrl group directory.
    /// Directory removal is best-effort: a failure is logged, not
    /// propagated, since the process is exiting regardless.
    pub fn shutdown(mut self) {
        self.enabled.store(false, Ordering::SeqCst);
        if let Some(handle) = self.controller.take() {
            handle.stop.store(true, Ordering::Relaxed);
            let _ = handle.join.join();
        }
        for limit_set in self.limit_sets.values() {
            if let Err(e) = resctrl::remove_group(&limit_set.handle) {
                tracing::warn!(tier = ?limit_set.tier, error = %e, "resctrl group removal failed, leaving in place");
            }
        }
    }
}
