//! Configuration module.
//!
//! Thin TOML loading plus the core's own validation of the values that
//! matter to it (tier ordering, interval/duration bounds). Loading is
//! uninteresting glue; validation is part of the core (component F step 1).

pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Static or dynamic limit mode for the offline tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitMode {
    Static,
    Dynamic,
}

impl Default for LimitMode {
    fn default() -> Self {
        LimitMode::Static
    }
}

/// Low/mid/high percentage preset for one resource (L3 or memory
/// bandwidth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentPreset {
    pub low: u32,
    pub mid: u32,
    pub high: u32,
}

/// Top-level agent configuration, as loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub default_resctrl_dir: PathBuf,
    #[serde(default)]
    pub default_limit_mode: LimitMode,
    pub adjust_interval_s: u64,
    pub perf_duration_ms: u64,
    pub l3_percent: PercentPreset,
    pub memband_percent: PercentPreset,
    /// Cache-miss thresholds the dynamic controller steps against. Not
    /// part of the external config table but required by the
    /// controller's data model, so they load alongside the rest.
    pub max_waterline: u64,
    pub min_waterline: u64,
    /// Prefix used to derive each tier's resctrl group directory name
    /// (e.g. `cl_` -> `cl_low`, `cl_mid`, ...).
    #[serde(default = "default_dir_prefix")]
    pub dir_prefix: String,
    /// Root of the cgroup hierarchy the perf sampler and task-attach step
    /// read from (e.g. `/sys/fs/cgroup`).
    #[serde(default = "default_cgroup_root")]
    pub cgroup_root: String,
}

fn default_dir_prefix() -> String {
    "cl_".to_string()
}

fn default_cgroup_root() -> String {
    "/sys/fs/cgroup".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_mode_defaults_static() {
        assert_eq!(LimitMode::default(), LimitMode::Static);
    }
}
