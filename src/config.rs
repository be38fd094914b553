//! Scan configuration.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::detect::DEFAULT_TIME_GAP_SECS;

/// Options controlling file discovery and the anomaly detectors.
///
/// Loaded from a JSON file where present; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Gaps between consecutive files longer than this are reported.
    pub time_gap_threshold_secs: f64,

    /// Regex a file name must match to be scanned.
    pub file_pattern: String,

    /// Number of hosts scanned in parallel.
    pub jobs: usize,

    /// CPU fields summed into the cumulative total used for reboot detection.
    pub cpu_total_fields: Vec<String>,

    pub iowait_field: String,

    /// Record type holding per-CPU counters.
    pub cpu_type: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            time_gap_threshold_secs: DEFAULT_TIME_GAP_SECS,
            file_pattern: r"\.gz$".to_string(),
            jobs: 1,
            cpu_total_fields: ["user", "nice", "system", "idle", "iowait", "irq", "softirq"]
                .iter()
                .map(|f| f.to_string())
                .collect(),
            iowait_field: "iowait".to_string(),
            cpu_type: "cpu".to_string(),
        }
    }
}

impl ScanConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.time_gap_threshold_secs.is_finite() || self.time_gap_threshold_secs < 0.0 {
            bail!(
                "time_gap_threshold_secs must be a non-negative number, got {}",
                self.time_gap_threshold_secs
            );
        }
        if self.jobs == 0 {
            bail!("jobs must be at least 1");
        }
        if self.cpu_total_fields.is_empty() {
            bail!("cpu_total_fields must name at least one field");
        }
        if self.iowait_field.is_empty() || self.cpu_type.is_empty() {
            bail!("iowait_field and cpu_type must not be empty");
        }
        self.file_regex()?;
        Ok(())
    }

    pub fn file_regex(&self) -> Result<Regex> {
        Regex::new(&self.file_pattern)
            .with_context(|| format!("Invalid file pattern '{}'", self.file_pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScanConfig::default();
        assert_eq!(config.time_gap_threshold_secs, 1200.0);
        assert_eq!(config.cpu_total_fields.len(), 7);
        assert!(config.validate().is_ok());
        assert!(config.file_regex().unwrap().is_match("1400000000.gz"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"time_gap_threshold_secs": 60, "jobs": 4}}"#).unwrap();
        let config = ScanConfig::load(file.path()).unwrap();
        assert_eq!(config.time_gap_threshold_secs, 60.0);
        assert_eq!(config.jobs, 4);
        assert_eq!(config.iowait_field, "iowait");
    }

    #[test]
    fn test_load_rejects_unknown_key() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"gap": 60}}"#).unwrap();
        assert!(ScanConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            ScanConfig {
                time_gap_threshold_secs: -1.0,
                ..Default::default()
            },
            ScanConfig {
                time_gap_threshold_secs: f64::NAN,
                ..Default::default()
            },
            ScanConfig {
                jobs: 0,
                ..Default::default()
            },
            ScanConfig {
                cpu_total_fields: Vec::new(),
                ..Default::default()
            },
            ScanConfig {
                file_pattern: "(".to_string(),
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }
}
