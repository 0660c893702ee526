//! TOML configuration file parsing.
//!
//! Thin glue: read the file, deserialize, hand off to `validator::validate`.
//! The interesting part is the validation, not the parsing.

use super::CacheConfig;
use anyhow::{Context, Result};
use std::path::Path;

pub fn load(path: &Path) -> Result<CacheConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    parse(&contents).with_context(|| format!("failed to parse config file: {}", path.display()))
}

pub fn parse(contents: &str) -> Result<CacheConfig> {
    let cfg: CacheConfig = ::toml::from_str(contents).context("failed to parse TOML configuration")?;
    crate::config::validator::validate(&cfg).context("configuration validation failed")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let toml = r#"
default_resctrl_dir = "/sys/fs/resctrl"
default_limit_mode = "dynamic"
adjust_interval_s = 60
perf_duration_ms = 100
max_waterline = 100000
min_waterline = 10000

[l3_percent]
low = 20
mid = 30
high = 50

[memband_percent]
low = 20
mid = 30
high = 50
"#;
        let cfg = parse(toml).unwrap();
        assert_eq!(cfg.adjust_interval_s, 60);
        assert_eq!(cfg.l3_percent.high, 50);
        assert_eq!(cfg.dir_prefix, "cl_");
        assert_eq!(cfg.cgroup_root, "/sys/fs/cgroup");
    }

    #[test]
    fn rejects_invalid_tier_ordering() {
        let toml = r#"
default_resctrl_dir = "/sys/fs/resctrl"
adjust_interval_s = 60
perf_duration_ms = 100
max_waterline = 100000
min_waterline = 10000

[l3_percent]
low = 50
mid = 40
high = 60

[memband_percent]
low = 20
mid = 30
high = 50
"#;
        assert!(parse(toml).is_err());
    }
}
