//! Limit set writer (component E).
//!
//! Builds and persists the schemata payload for one tier across all NUMA
//! domains: `L3:0=<hex>;1=<hex>;...` and `MB:0=<pct>;1=<pct>;...`.

use crate::error::{CacheLimitError, Result};
use crate::mask::emit_cbm;
use crate::resctrl::{self, GroupHandle};
use crate::tier::{TierModel, TierName, TierPercents};
use std::path::Path;

/// One resctrl group bound to a tier.
#[derive(Debug)]
pub struct LimitSet {
    pub tier: TierName,
    pub handle: GroupHandle,
}

impl LimitSet {
    pub fn new(tier: TierName, handle: GroupHandle) -> Self {
        Self { tier, handle }
    }

    pub fn group_dir(&self) -> &Path {
        self.handle.dir()
    }

    /// Compute the schemata payload for this tier's current percentages.
    ///
    /// Never called with `numa_count == 0` — that is an init-time
    /// invariant failure.
    pub fn build_schemata(cbm_width: u32, numa_count: usize, pct: TierPercents) -> Result<String> {
        if numa_count == 0 {
            return Err(CacheLimitError::NumaProbeFailed(
                "limit set writer invoked with numa_count = 0".to_string(),
            ));
        }
        let l3_hex = emit_cbm(cbm_width, pct.l3_pct);
        let l3_entries: Vec<String> = (0..numa_count).map(|i| format!("{i}={l3_hex}")).collect();
        let mb_entries: Vec<String> = (0..numa_count).map(|i| format!("{i}={}", pct.mb_pct)).collect();
        Ok(format!("L3:{}\nMB:{}", l3_entries.join(";"), mb_entries.join(";")))
    }

    /// Compute this tier's schemata from the tier model's current
    /// percentages (static for low/mid/high, mutable for dynamic) and
    /// write it atomically to the group's `schemata` file.
    pub fn emit(&self, tier_model: &TierModel, cbm_width: u32, numa_count: usize) -> Result<()> {
        let pct = tier_model.static_pct(self.tier);
        let text = Self::build_schemata(cbm_width, numa_count, pct)?;
        resctrl::write_schemata(&self.handle, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::TierPercents;

    fn pct(l3: u32, mb: u32) -> TierPercents {
        TierPercents { l3_pct: l3, mb_pct: mb }
    }

    #[test]
    fn three_numa_nodes_width11_30pct() {
        // width-11 CBM, l3=30% -> nbits=4 -> "f"
        let text = LimitSet::build_schemata(11, 3, pct(30, 30)).unwrap();
        assert_eq!(text, "L3:0=f;1=f;2=f\nMB:0=30;1=30;2=30");
    }

    #[test]
    fn entries_strictly_increasing_and_exact_count() {
        let text = LimitSet::build_schemata(20, 4, pct(50, 50)).unwrap();
        let l3_line = text.lines().next().unwrap();
        let entries: Vec<&str> = l3_line.trim_start_matches("L3:").split(';').collect();
        assert_eq!(entries.len(), 4);
        for (i, e) in entries.iter().enumerate() {
            assert!(e.starts_with(&format!("{i}=")));
        }
    }

    #[test]
    fn zero_numa_is_invariant_failure() {
        let err = LimitSet::build_schemata(11, 0, pct(30, 30)).unwrap_err();
        assert!(matches!(err, CacheLimitError::NumaProbeFailed(_)));
    }

    #[test]
    fn single_numa_domain() {
        let text = LimitSet::build_schemata(20, 1, pct(100, 100)).unwrap();
        assert_eq!(text, "L3:0=fffff\nMB:0=100");
    }
}
