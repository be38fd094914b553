//! Anomaly records produced by the detectors.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Cumulative CPU totals dropped on every device at once.
    Reboot,
    /// A monotonically increasing IO-wait counter went backwards.
    DecreasingValue,
    /// Too much time passed between two consecutive files.
    TimeGap,
}

impl AnomalyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyKind::Reboot => "reboot",
            AnomalyKind::DecreasingValue => "decreasing_value",
            AnomalyKind::TimeGap => "time_gap",
        }
    }
}

/// A single detected anomaly.
///
/// `timestamp` is the reboot time, the timestamp of the sample before the
/// drop, or the start of the gap. `magnitude` is the drop in counter units or
/// the gap length in whole minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub kind: AnomalyKind,
    pub source_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_file: Option<String>,
}

impl AnomalyRecord {
    pub fn reboot(source_file: &str, timestamp: f64) -> Self {
        Self {
            kind: AnomalyKind::Reboot,
            source_file: source_file.to_string(),
            device: None,
            timestamp,
            magnitude: None,
            previous_file: None,
        }
    }

    pub fn decreasing_value(source_file: &str, device: &str, timestamp: f64, drop: u64) -> Self {
        Self {
            kind: AnomalyKind::DecreasingValue,
            source_file: source_file.to_string(),
            device: Some(device.to_string()),
            timestamp,
            magnitude: Some(drop),
            previous_file: None,
        }
    }

    pub fn time_gap(source_file: &str, previous_file: &str, gap_start: f64, minutes: u64) -> Self {
        Self {
            kind: AnomalyKind::TimeGap,
            source_file: source_file.to_string(),
            device: None,
            timestamp: gap_start,
            magnitude: Some(minutes),
            previous_file: Some(previous_file.to_string()),
        }
    }
}

impl fmt::Display for AnomalyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AnomalyKind::Reboot => {
                write!(f, "Reboot at {:.6} for {}", self.timestamp, self.source_file)
            }
            AnomalyKind::DecreasingValue => write!(
                f,
                "{} ---> {} iowait decreased by {} at {:.6}",
                self.source_file,
                self.device.as_deref().unwrap_or("?"),
                self.magnitude.unwrap_or_default(),
                self.timestamp
            ),
            AnomalyKind::TimeGap => write!(
                f,
                "{} minute gap starting at {} ({}) beginning in file {}",
                self.magnitude.unwrap_or_default(),
                self.timestamp,
                self.previous_file.as_deref().unwrap_or("?"),
                self.source_file
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reboot_display() {
        let record = AnomalyRecord::reboot("host/1400000000.gz", 1400003600.0);
        assert_eq!(
            format!("{record}"),
            "Reboot at 1400003600.000000 for host/1400000000.gz"
        );
    }

    #[test]
    fn test_decreasing_value_display() {
        let record = AnomalyRecord::decreasing_value("a.gz", "cpu3", 1200.0, 60);
        assert_eq!(
            format!("{record}"),
            "a.gz ---> cpu3 iowait decreased by 60 at 1200.000000"
        );
    }

    #[test]
    fn test_time_gap_display() {
        let record = AnomalyRecord::time_gap("b.gz", "a.gz", 1000.0, 33);
        assert_eq!(
            format!("{record}"),
            "33 minute gap starting at 1000 (a.gz) beginning in file b.gz"
        );
    }

    #[test]
    fn test_json_shape() {
        let record = AnomalyRecord::reboot("a.gz", 5.0);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "reboot");
        assert_eq!(json["source_file"], "a.gz");
        assert!(json.get("device").is_none());
        assert!(json.get("magnitude").is_none());

        let back: AnomalyRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
