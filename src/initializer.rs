//! Initializer (component F).
//!
//! Eight-step startup sequence: validate config, check the resctrl root,
//! probe the platform, create tier groups, emit initial schemata, attach
//! existing workloads, decide dynamic enablement, and flip the
//! process-wide `enabled` flag. Each step is fatal on failure unless
//! noted.

use crate::agent::{CacheLimitAgent, ResctrlPlatform};
use crate::checkpoint::CheckpointBridge;
use crate::config::{validator, CacheConfig, LimitMode};
use crate::controller::{ControllerConfig, DynamicController};
use crate::error::{CacheLimitError, Result};
use crate::limitset::LimitSet;
use crate::mask;
use crate::resctrl;
use crate::tier::{TierModel, TierName, TierPercents};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

const NODE_DIR: &str = "/sys/devices/system/node";

fn merge_presets(l3: crate::config::PercentPreset, mb: crate::config::PercentPreset) -> (TierPercents, TierPercents, TierPercents) {
    (
        TierPercents { l3_pct: l3.low, mb_pct: mb.low },
        TierPercents { l3_pct: l3.mid, mb_pct: mb.mid },
        TierPercents { l3_pct: l3.high, mb_pct: mb.high },
    )
}

/// Compare `/proc/self/ns/pid` against `/proc/1/ns/pid`: if they resolve
/// to the same namespace, this process shares the host's PID namespace,
/// which the perf-on-cgroup path requires.
fn host_pidns_in_use() -> Result<bool> {
    let self_ns = std::fs::read_link("/proc/self/ns/pid").map_err(|e| {
        CacheLimitError::HostPidNsRequired(format!("cannot read /proc/self/ns/pid: {e}"))
    })?;
    let init_ns = std::fs::read_link("/proc/1/ns/pid").map_err(|e| {
        CacheLimitError::HostPidNsRequired(format!("cannot read /proc/1/ns/pid: {e}"))
    })?;
    Ok(self_ns == init_ns)
}

/// Read whitespace/newline-separated PIDs out of a cgroup `tasks` file.
/// Unparseable lines are skipped rather than failing the whole read.
fn read_task_pids(tasks_path: &Path) -> Vec<u32> {
    match std::fs::read_to_string(tasks_path) {
        Ok(text) => text.split_whitespace().filter_map(|s| s.parse::<u32>().ok()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Run the full initialization sequence and return a running agent. On
/// `Ok`, the resctrl groups exist, initial schemata are written, known
/// workloads are attached, and (if applicable) the dynamic controller
/// thread is already spawned.
pub fn initialize<C: CheckpointBridge + 'static>(cfg: &CacheConfig, checkpoint: Arc<C>) -> Result<CacheLimitAgent<C>> {
    // Step 1: validate config.
    validator::validate(cfg)?;

    // Step 2: check resctrl root.
    let root = cfg.default_resctrl_dir.as_path();
    resctrl::check_root_usable(root)?;
    tracing::info!(root = %root.display(), "resctrl root usable");

    // Step 3: probe platform.
    let cbm_width = mask::read_cbm_width(&mask::cbm_mask_path(root))?;
    let numa_count = mask::count_numa_nodes(Path::new(NODE_DIR))?;
    tracing::info!(cbm_width, numa_count, "platform probed");

    // Tier model: merge the L3 and memory-bandwidth presets into per-tier pairs.
    let (low, mid, high) = merge_presets(cfg.l3_percent, cfg.memband_percent);
    let tier_model = Arc::new(TierModel::new(cfg.dir_prefix.clone(), low, mid, high)?);

    // Step 4: create tier groups (idempotent).
    let mut limit_sets: HashMap<TierName, Arc<LimitSet>> = HashMap::new();
    for tier in TierName::ALL {
        let dir_name = tier.dir_name(&cfg.dir_prefix);
        let handle = resctrl::create_group(root, &dir_name)?;
        tracing::info!(tier = ?tier, dir = %handle.dir().display(), "tier group ready");
        limit_sets.insert(tier, Arc::new(LimitSet::new(tier, handle)));
    }

    // Step 5: emit initial schemata for every tier.
    for tier in TierName::ALL {
        limit_sets[&tier].emit(&tier_model, cbm_width, numa_count)?;
    }
    tracing::info!("initial schemata emitted for all tiers");

    // Step 6: attach existing workloads.
    let mut attached = 0usize;
    for workload in checkpoint.list_all() {
        let Some(tier) = workload.tier_label else { continue };
        let Some(limit_set) = limit_sets.get(&tier) else { continue };
        let cpu_tasks = Path::new(&workload.cgroup_path(&cfg.cgroup_root, "cpu")).join("tasks");
        for pid in read_task_pids(&cpu_tasks) {
            // A PID that vanished between read and write is not an error.
            if resctrl::attach_task(&limit_set.handle, pid).is_ok() {
                attached += 1;
            }
        }
    }
    tracing::info!(attached, "existing workloads attached");

    // Host PID namespace check: required for the perf-on-cgroup path.
    if !host_pidns_in_use()? {
        return Err(CacheLimitError::HostPidNsRequired(
            "process does not share the host PID namespace".to_string(),
        ));
    }

    let enabled = Arc::new(AtomicBool::new(false));
    let mut agent = CacheLimitAgent::new(
        ResctrlPlatform { root_dir: root.to_path_buf(), cbm_width, numa_count },
        Arc::clone(&tier_model),
        limit_sets.clone(),
        Arc::clone(&checkpoint),
        Arc::clone(&enabled),
    );

    // Step 7: decide dynamic enablement.
    let dynamic_requested = matches!(cfg.default_limit_mode, LimitMode::Dynamic);
    if dynamic_requested && checkpoint.exists_tier(TierName::Dynamic) && crate::perf::hw_support() {
        let controller = Arc::new(DynamicController::new(
            Arc::clone(&tier_model),
            Arc::clone(&checkpoint),
            Arc::clone(&limit_sets[&TierName::Dynamic]),
            cbm_width,
            numa_count,
            cfg.cgroup_root.clone(),
            ControllerConfig {
                adjust_interval: Duration::from_secs(cfg.adjust_interval_s),
                perf_duration: Duration::from_millis(cfg.perf_duration_ms),
                max_waterline: cfg.max_waterline,
                min_waterline: cfg.min_waterline,
            },
            Arc::clone(&enabled),
        ));
        agent.attach_controller(controller);
        tracing::info!("dynamic controller enabled");
    } else if dynamic_requested {
        tracing::warn!(
            has_dynamic_workloads = checkpoint.exists_tier(TierName::Dynamic),
            hw_support = crate::perf::hw_support(),
            "dynamic mode requested but preconditions unmet, staying static"
        );
    }

    // Step 8: the agent is live.
    enabled.store(true, std::sync::atomic::Ordering::SeqCst);
    tracing::info!("cache-limit agent enabled");

    Ok(agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Checkpoint;
    use crate::config::PercentPreset;
    use std::fs;

    fn base_cfg(root: &Path) -> CacheConfig {
        CacheConfig {
            default_resctrl_dir: root.to_path_buf(),
            default_limit_mode: LimitMode::Static,
            adjust_interval_s: 60,
            perf_duration_ms: 100,
            l3_percent: PercentPreset { low: 20, mid: 30, high: 50 },
            memband_percent: PercentPreset { low: 20, mid: 30, high: 50 },
            max_waterline: 100_000,
            min_waterline: 10_000,
            dir_prefix: "cl_".to_string(),
            cgroup_root: "/sys/fs/cgroup".to_string(),
        }
    }

    #[test]
    fn rejects_missing_resctrl_root() {
        let cfg = base_cfg(Path::new("/path/does/not/exist"));
        let checkpoint = Arc::new(Checkpoint::new());
        let err = initialize(&cfg, checkpoint).unwrap_err();
        assert!(matches!(err, CacheLimitError::ResctrlUnavailable { .. }));
    }

    #[test]
    fn rejects_invalid_config_before_touching_filesystem() {
        let mut cfg = base_cfg(Path::new("/path/does/not/exist"));
        cfg.adjust_interval_s = 1; // out of [10,10000]
        let checkpoint = Arc::new(Checkpoint::new());
        let err = initialize(&cfg, checkpoint).unwrap_err();
        assert!(matches!(err, CacheLimitError::ConfigInvalid(_)));
    }

    #[test]
    fn read_task_pids_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks");
        fs::write(&path, "123\nnotapid\n456\n").unwrap();
        assert_eq!(read_task_pids(&path), vec![123, 456]);
    }

    #[test]
    fn read_task_pids_missing_file_is_empty() {
        assert!(read_task_pids(Path::new("/no/such/file")).is_empty());
    }
}
