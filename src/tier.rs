//! Tier model (component D).
//!
//! Carries the four named pressure tiers and their percentage budgets.
//! `low`/`mid`/`high` are immutable after config load; `dynamic` is
//! mutated by the controller thread under a mutex.

use crate::error::{CacheLimitError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub const MIN_PERCENT: u32 = 10;
pub const MAX_PERCENT: u32 = 100;
/// Step size, in percentage points, the dynamic controller moves the
/// budget by each tick.
pub const DYNAMIC_STEP: u32 = 5;

/// One of the four named pressure tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierName {
    Low,
    Mid,
    High,
    Dynamic,
}

impl TierName {
    pub const ALL: [TierName; 4] = [TierName::Low, TierName::Mid, TierName::High, TierName::Dynamic];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierName::Low => "low",
            TierName::Mid => "mid",
            TierName::High => "high",
            TierName::Dynamic => "dynamic",
        }
    }

    /// Derived resctrl group directory name for this tier, given the
    /// configured directory-name prefix (e.g. `cl_` -> `cl_low`).
    pub fn dir_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.as_str())
    }
}

/// A percentage pair (L3 cache share, memory-bandwidth share) for one
/// tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPercents {
    pub l3_pct: u32,
    pub mb_pct: u32,
}

/// The set of named tiers with their budgets. `low`/`mid`/`high` never
/// change after construction; `dynamic`'s pair is read and written under
/// an internal mutex.
#[derive(Debug)]
pub struct TierModel {
    pub dir_prefix: String,
    low: TierPercents,
    mid: TierPercents,
    high: TierPercents,
    dynamic: Mutex<TierPercents>,
}

impl TierModel {
    /// Build the model, validating that `low <= mid <= high` holds for
    /// both L3 and memory-bandwidth percentages, and that every value is
    /// in `[10,100]`.
    pub fn new(dir_prefix: String, low: TierPercents, mid: TierPercents, high: TierPercents) -> Result<Self> {
        Self::validate_ordered("l3_pct", low.l3_pct, mid.l3_pct, high.l3_pct)?;
        Self::validate_ordered("mb_pct", low.mb_pct, mid.mb_pct, high.mb_pct)?;
        let dynamic = Mutex::new(low);
        Ok(Self {
            dir_prefix,
            low,
            mid,
            high,
            dynamic,
        })
    }

    fn validate_ordered(field: &str, low: u32, mid: u32, high: u32) -> Result<()> {
        for (label, v) in [("low", low), ("mid", mid), ("high", high)] {
            if !(MIN_PERCENT..=MAX_PERCENT).contains(&v) {
                return Err(CacheLimitError::ConfigInvalid(format!(
                    "{field}.{label} = {v} out of range [{MIN_PERCENT},{MAX_PERCENT}]"
                )));
            }
        }
        if !(low <= mid && mid <= high) {
            return Err(CacheLimitError::ConfigInvalid(format!(
                "{field} must satisfy low<=mid<=high, got low={low} mid={mid} high={high}"
            )));
        }
        Ok(())
    }

    /// Static (immutable) budget for a non-dynamic tier.
    pub fn static_pct(&self, name: TierName) -> TierPercents {
        match name {
            TierName::Low => self.low,
            TierName::Mid => self.mid,
            TierName::High => self.high,
            TierName::Dynamic => self.dynamic_pct(),
        }
    }

    /// Current dynamic-tier budget.
    pub fn dynamic_pct(&self) -> TierPercents {
        *self.dynamic.lock().expect("tier model mutex poisoned")
    }

    pub fn low_preset(&self) -> TierPercents {
        self.low
    }

    pub fn high_preset(&self) -> TierPercents {
        self.high
    }

    /// Replace the dynamic-tier budget. Returns the previous value.
    pub fn set_dynamic_pct(&self, new: TierPercents) -> TierPercents {
        let mut guard = self.dynamic.lock().expect("tier model mutex poisoned");
        let old = *guard;
        *guard = new;
        old
    }
}
