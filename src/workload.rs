//! Workload value types (external view).
//!
//! The core never owns workload discovery; it only holds read-only
//! handles into data owned by the external checkpoint (component H).

use crate::tier::TierName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single container within a workload, as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub id: String,
}

/// Read-only view of one workload (pod) known to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub id: String,
    /// Path to the workload's cgroup, relative to the CPU controller's
    /// cgroup root (e.g. `kubepods/besteffort/pod<uid>`).
    pub cgroup_rel_path: String,
    /// Assigned pressure tier, if any. Workloads with no label are not
    /// subject to cache-limit management.
    pub tier_label: Option<TierName>,
    pub containers: HashMap<String, ContainerInfo>,
}

impl Workload {
    pub fn new(id: impl Into<String>, cgroup_rel_path: impl Into<String>, tier_label: Option<TierName>) -> Self {
        Self {
            id: id.into(),
            cgroup_rel_path: cgroup_rel_path.into(),
            tier_label,
            containers: HashMap::new(),
        }
    }

    pub fn add_container(&mut self, container: ContainerInfo) {
        if container.name.is_empty() {
            return;
        }
        self.containers.insert(container.name.clone(), container);
    }

    /// Absolute path to this workload's directory under a given
    /// controller's cgroup root (e.g. `<cgroup_root>/cpu/<rel_path>`).
    pub fn cgroup_path(&self, cgroup_root: &str, controller: &str) -> String {
        format!("{}/{}/{}", cgroup_root.trim_end_matches('/'), controller, self.cgroup_rel_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cgroup_path_join() {
        let w = Workload::new("abcd", "kubepods/podabcd", Some(TierName::Low));
        assert_eq!(
            w.cgroup_path("/sys/fs/cgroup", "perf_event"),
            "/sys/fs/cgroup/perf_event/kubepods/podabcd"
        );
    }

    #[test]
    fn add_container_rejects_empty_name() {
        let mut w = Workload::new("abcd", "kubepods/podabcd", None);
        w.add_container(ContainerInfo { name: String::new(), id: "x".into() });
        assert!(w.containers.is_empty());
        w.add_container(ContainerInfo { name: "app".into(), id: "x".into() });
        assert_eq!(w.containers.len(), 1);
    }
}
