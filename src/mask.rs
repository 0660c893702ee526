//! Mask arithmetic (component A).
//!
//! Reads the platform's L3 capacity bitmask width and converts percentage
//! budgets into contiguous-bit CBM hex strings for the resctrl schemata.

use crate::error::{CacheLimitError, Result};
use std::path::{Path, PathBuf};

/// Name of the file under `<root>/info/L3/` holding the platform CBM, as
/// ASCII lowercase hex (e.g. `7ff`).
pub const CBM_MASK_FILE: &str = "cbm_mask";

/// Read the platform's L3 CBM mask file and return its width in bits
/// (the popcount of the parsed value).
///
/// Fails with `InvalidMask` if the file is absent or does not parse as
/// hex.
pub fn read_cbm_width(mask_path: &Path) -> Result<u32> {
    let text = std::fs::read_to_string(mask_path).map_err(|e| CacheLimitError::InvalidMask {
        path: mask_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let value = parse_hex(text.trim()).ok_or_else(|| CacheLimitError::InvalidMask {
        path: mask_path.to_path_buf(),
        reason: format!("{:?} is not valid hex", text.trim()),
    })?;
    Ok(value.count_ones())
}

/// Parse an ASCII hex string (no `0x` prefix) into a `u64`.
pub fn parse_hex(text: &str) -> Option<u64> {
    if text.is_empty() {
        return None;
    }
    u64::from_str_radix(text, 16).ok()
}

/// Convert a percentage budget `pct` in `[10,100]` into a contiguous-bit
/// CBM, given the platform's `cbm_width`. Rounds the bit count up
/// (ceiling) so a live tier is never allocated zero cache.
///
/// `nbits = max(1, ceil(cbm_width * pct / 100))`
/// `value = (1 << nbits) - 1`
pub fn pct_to_nbits(cbm_width: u32, pct: u32) -> u32 {
    let numerator = cbm_width as u64 * pct as u64;
    let nbits = (numerator + 99) / 100; // ceiling division
    nbits.max(1) as u32
}

/// Emit the lowercase hex CBM string (no `0x` prefix) for a percentage
/// budget against the given platform width.
pub fn emit_cbm(cbm_width: u32, pct: u32) -> String {
    let nbits = pct_to_nbits(cbm_width, pct);
    let value: u64 = (1u64 << nbits) - 1;
    format!("{:x}", value)
}

/// Count NUMA domains by enumerating `node<N>` entries under the given
/// directory (normally `/sys/devices/system/node`).
///
/// Fails with `NumaProbeFailed` if zero nodes are discovered.
pub fn count_numa_nodes(node_dir: &Path) -> Result<usize> {
    let entries = std::fs::read_dir(node_dir).map_err(|e| CacheLimitError::NumaProbeFailed(
        format!("cannot read {}: {e}", node_dir.display()),
    ))?;
    let count = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|name| name.starts_with("node") && name["node".len()..].parse::<u32>().is_ok())
                .unwrap_or(false)
        })
        .count();
    if count == 0 {
        return Err(CacheLimitError::NumaProbeFailed(format!(
            "no node* entries under {}",
            node_dir.display()
        )));
    }
    Ok(count)
}

/// Path to the platform's L3 cbm_mask file under a resctrl root.
pub fn cbm_mask_path(resctrl_root: &Path) -> PathBuf {
    resctrl_root.join("info").join("L3").join(CBM_MASK_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parse_hex_roundtrip() {
        assert_eq!(parse_hex("7ff"), Some(0x7ff));
        assert_eq!(parse_hex("fffff"), Some(0xfffff));
        assert_eq!(parse_hex("ghi"), None);
        assert_eq!(parse_hex(""), None);
    }

    #[test]
    fn width_from_mask_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbm_mask");
        fs::write(&path, "7ff").unwrap();
        assert_eq!(read_cbm_width(&path).unwrap(), 11);

        fs::write(&path, "fffff").unwrap();
        assert_eq!(read_cbm_width(&path).unwrap(), 20);
    }

    #[test]
    fn width_rejects_non_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbm_mask");
        fs::write(&path, "ghi").unwrap();
        assert!(matches!(
            read_cbm_width(&path),
            Err(CacheLimitError::InvalidMask { .. })
        ));
    }

    #[test]
    fn width_rejects_missing_file() {
        let path = PathBuf::from("/path/does/not/exist/cbm_mask");
        assert!(matches!(
            read_cbm_width(&path),
            Err(CacheLimitError::InvalidMask { .. })
        ));
    }

    #[test]
    fn scenario_width11_10pct() {
        // width 11, 10% -> ceil(11*0.10)=2 bits -> CBM "3"
        assert_eq!(pct_to_nbits(11, 10), 2);
        assert_eq!(emit_cbm(11, 10), "3");
    }

    #[test]
    fn scenario_width20_10pct() {
        // width 20, 10% -> ceil(20*0.10)=2 bits -> CBM "3"
        assert_eq!(pct_to_nbits(20, 10), 2);
        assert_eq!(emit_cbm(20, 10), "3");
    }

    #[test]
    fn scenario_width11_30pct_for_schemata_example() {
        // width 11, 30% -> ceil(11*0.30)=4 bits -> CBM "f"
        assert_eq!(pct_to_nbits(11, 30), 4);
        assert_eq!(emit_cbm(11, 30), "f");
    }

    #[test]
    fn scenario_full_width_100pct() {
        assert_eq!(emit_cbm(20, 100), "fffff");
    }

    #[test]
    fn nbits_never_zero() {
        for width in 1..=64u32 {
            for pct in 10..=100u32 {
                assert!(pct_to_nbits(width, pct) >= 1);
            }
        }
    }

    #[test]
    fn numa_count_from_node_dirs() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            fs::create_dir(dir.path().join(format!("node{i}"))).unwrap();
        }
        fs::create_dir(dir.path().join("not_a_node")).unwrap();
        assert_eq!(count_numa_nodes(dir.path()).unwrap(), 3);
    }

    #[test]
    fn numa_count_zero_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            count_numa_nodes(dir.path()),
            Err(CacheLimitError::NumaProbeFailed(_))
        ));
    }
}
