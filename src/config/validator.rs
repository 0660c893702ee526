//! Configuration validation.
//!
//! Mirrors the original's `checkCacheCfg`: mode, interval/duration bounds,
//! and tier-percentage monotonicity all fail fast with a `ConfigInvalid`
//! before the initializer touches the filesystem.

use super::CacheConfig;
use crate::error::{CacheLimitError, Result};
use crate::tier::{MAX_PERCENT, MIN_PERCENT};

const MIN_INTERVAL_S: u64 = 10;
const MAX_INTERVAL_S: u64 = 10_000;
const MIN_PERF_DURATION_MS: u64 = 10;
const MAX_PERF_DURATION_MS: u64 = 10_000;

pub fn validate(cfg: &CacheConfig) -> Result<()> {
    if !(MIN_INTERVAL_S..=MAX_INTERVAL_S).contains(&cfg.adjust_interval_s) {
        return Err(CacheLimitError::ConfigInvalid(format!(
            "adjust_interval_s = {} out of range [{MIN_INTERVAL_S},{MAX_INTERVAL_S}]",
            cfg.adjust_interval_s
        )));
    }
    if !(MIN_PERF_DURATION_MS..=MAX_PERF_DURATION_MS).contains(&cfg.perf_duration_ms) {
        return Err(CacheLimitError::ConfigInvalid(format!(
            "perf_duration_ms = {} out of range [{MIN_PERF_DURATION_MS},{MAX_PERF_DURATION_MS}]",
            cfg.perf_duration_ms
        )));
    }

    validate_preset("l3_percent", cfg.l3_percent)?;
    validate_preset("memband_percent", cfg.memband_percent)?;

    if cfg.default_resctrl_dir.as_os_str().is_empty() {
        return Err(CacheLimitError::ConfigInvalid(
            "default_resctrl_dir must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_preset(field: &str, preset: super::PercentPreset) -> Result<()> {
    for (label, v) in [("low", preset.low), ("mid", preset.mid), ("high", preset.high)] {
        if !(MIN_PERCENT..=MAX_PERCENT).contains(&v) {
            return Err(CacheLimitError::ConfigInvalid(format!(
                "{field}.{label} = {v} out of range [{MIN_PERCENT},{MAX_PERCENT}]"
            )));
        }
    }
    if !(preset.low <= preset.mid && preset.mid <= preset.high) {
        return Err(CacheLimitError::ConfigInvalid(format!(
            "{field} must satisfy low<=mid<=high, got low={} mid={} high={}",
            preset.low, preset.mid, preset.high
        )));
    }
    Ok(())
}
