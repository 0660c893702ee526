//! cachelimitd — node-local LLC/MB cache isolation agent.
//!
//! Programs the Linux resource-control pseudo-filesystem (CAT/MBA) to
//! keep offline workload tiers from starving online tiers of shared
//! cache or memory bandwidth, and in dynamic mode adapts the offline
//! budget in a closed loop driven by hardware cache-miss counters.
//!
//! # Components
//!
//! - **mask**: platform CBM width and percentage-to-bitmask arithmetic.
//! - **resctrl**: resource-control group lifecycle (create, schemata, tasks).
//! - **perf**: cgroup-scoped hardware cache-miss sampling.
//! - **tier**: the four named pressure tiers and their budgets.
//! - **limitset**: per-tier schemata computation and persistence.
//! - **checkpoint**: read-only view of the externally owned workload registry.
//! - **controller**: the dynamic feedback loop.
//! - **initializer**: startup sequence wiring the above together.
//! - **agent**: process-wide state (platform, tiers, enabled flag).

pub mod agent;
pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod error;
pub mod initializer;
pub mod limitset;
pub mod mask;
pub mod perf;
pub mod resctrl;
pub mod tier;
pub mod workload;

pub use error::{CacheLimitError, Result};
