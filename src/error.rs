//! Stable, user-visible error categories for the cache-limit core.
//!
//! Every fallible operation in the core subsystems (mask arithmetic, the
//! resctrl gateway, the perf sampler, the initializer, the dynamic
//! controller) returns one of these. The binary entry point wraps them in
//! `anyhow::Error` for top-level reporting; the core itself never depends
//! on `anyhow`.

use std::path::PathBuf;

/// Error kinds produced by the cache-limit core.
#[derive(Debug, thiserror::Error)]
pub enum CacheLimitError {
    /// Config percentages out of range or non-monotone, mode unknown,
    /// intervals out of range.
    #[error("invalid cache-limit config: {0}")]
    ConfigInvalid(String),

    /// The resctrl filesystem is missing, the schemata file is absent, or
    /// the process lacks permission to write it.
    #[error("resctrl unavailable at {path}: {reason}")]
    ResctrlUnavailable { path: PathBuf, reason: String },

    /// `cbm_mask` is absent or does not parse as hex.
    #[error("invalid cbm_mask at {path}: {reason}")]
    InvalidMask { path: PathBuf, reason: String },

    /// A schemata write to a tier's resctrl group failed or was partial.
    #[error("schemata write to {path} failed: {reason}")]
    SchemataWriteFailed { path: PathBuf, reason: String },

    /// The platform does not expose the hardware event the sampler needs.
    #[error("perf event unsupported on this platform: {0}")]
    PerfUnsupported(String),

    /// The agent is not running in the host PID namespace.
    #[error("agent must run in the host PID namespace: {0}")]
    HostPidNsRequired(String),

    /// Zero NUMA nodes were discovered under the node enumeration path.
    #[error("NUMA probe failed: {0}")]
    NumaProbeFailed(String),

    /// Any other I/O failure encountered while touching the resctrl or
    /// proc/sys filesystems; kept distinct from the named kinds above so
    /// callers can still match on the stable categories.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type used throughout the cache-limit core.
pub type Result<T> = std::result::Result<T, CacheLimitError>;

impl CacheLimitError {
    /// True for errors the dynamic controller treats as transient
    /// (bounded back-off retry next tick) rather than fatal/disabling.
    pub fn is_transient(&self) -> bool {
        matches!(self, CacheLimitError::Io { .. })
    }
}
