//! Checkpoint bridge (component H).
//!
//! Read-only view over the shared workload registry. The core never
//! mutates it and never calls back into it while holding one of its own
//! locks; every query returns a cloned snapshot of the relevant subset so
//! callers can't observe a torn read while the registry mutates
//! concurrently under external ownership.

use crate::tier::TierName;
use crate::workload::Workload;
use std::collections::HashMap;
use std::sync::Mutex;

/// Read-only interface the core consumes. The concrete registry backing
/// it (orchestrator polling, admission webhook, etc.) is out of scope;
/// `Checkpoint` below is the in-process store that backs it for this
/// process.
pub trait CheckpointBridge: Send + Sync {
    /// Snapshot of all workloads currently labeled with `tier`.
    fn list_by_tier(&self, tier: TierName) -> Vec<Workload>;

    /// Whether at least one workload is currently labeled with `tier`.
    fn exists_tier(&self, tier: TierName) -> bool;

    /// Snapshot of every known workload, regardless of label. Used by the
    /// initializer to attach all pre-existing offline workloads.
    fn list_all(&self) -> Vec<Workload>;
}

/// In-process workload registry. Populated by the (out-of-scope)
/// orchestrator-discovery collaborator; the core only reads it.
#[derive(Debug, Default)]
pub struct Checkpoint {
    pods: Mutex<HashMap<String, Workload>>,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self {
            pods: Mutex::new(HashMap::new()),
        }
    }

    /// Insert or replace a workload. Not part of `CheckpointBridge`: the
    /// core never calls this, only the external registry owner does.
    pub fn upsert(&self, workload: Workload) {
        let mut guard = self.pods.lock().expect("checkpoint mutex poisoned");
        guard.insert(workload.id.clone(), workload);
    }

    pub fn remove(&self, id: &str) {
        let mut guard = self.pods.lock().expect("checkpoint mutex poisoned");
        guard.remove(id);
    }

    pub fn len(&self) -> usize {
        self.pods.lock().expect("checkpoint mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CheckpointBridge for Checkpoint {
    fn list_by_tier(&self, tier: TierName) -> Vec<Workload> {
        let guard = self.pods.lock().expect("checkpoint mutex poisoned");
        guard
            .values()
            .filter(|w| w.tier_label == Some(tier))
            .cloned()
            .collect()
    }

    fn exists_tier(&self, tier: TierName) -> bool {
        let guard = self.pods.lock().expect("checkpoint mutex poisoned");
        guard.values().any(|w| w.tier_label == Some(tier))
    }

    fn list_all(&self) -> Vec<Workload> {
        let guard = self.pods.lock().expect("checkpoint mutex poisoned");
        guard.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workload(id: &str, tier: Option<TierName>) -> Workload {
        Workload::new(id, format!("kubepods/pod{id}"), tier)
    }

    #[test]
    fn list_by_tier_filters() {
        let cp = Checkpoint::new();
        cp.upsert(workload("a", Some(TierName::Low)));
        cp.upsert(workload("b", Some(TierName::Dynamic)));
        cp.upsert(workload("c", None));

        let dynamic = cp.list_by_tier(TierName::Dynamic);
        assert_eq!(dynamic.len(), 1);
        assert_eq!(dynamic[0].id, "b");

        assert!(cp.exists_tier(TierName::Dynamic));
        assert!(!cp.exists_tier(TierName::High));
    }

    #[test]
    fn list_all_returns_every_workload() {
        let cp = Checkpoint::new();
        cp.upsert(workload("a", Some(TierName::Low)));
        cp.upsert(workload("b", None));
        assert_eq!(cp.list_all().len(), 2);
    }

    #[test]
    fn remove_drops_workload() {
        let cp = Checkpoint::new();
        cp.upsert(workload("a", Some(TierName::Low)));
        cp.remove("a");
        assert!(cp.is_empty());
    }
}
