//! Detector for collection gaps between consecutive files.

use crate::anomaly::AnomalyRecord;

/// Gap threshold used by the reference deployment, in seconds.
pub const DEFAULT_TIME_GAP_SECS: f64 = 1200.0;

/// Compare the first timestamp of a file with the last one of its predecessor.
///
/// Returns a gap anomaly, measured in whole minutes, when more than
/// `threshold_secs` passed in between.
pub fn check_time_gap(
    source_file: &str,
    previous: Option<(&str, f64)>,
    first_timestamp: f64,
    threshold_secs: f64,
) -> Option<AnomalyRecord> {
    let (previous_file, previous_timestamp) = previous?;
    let gap = first_timestamp - previous_timestamp;
    if gap > threshold_secs {
        let minutes = (gap / 60.0).floor() as u64;
        Some(AnomalyRecord::time_gap(
            source_file,
            previous_file,
            previous_timestamp,
            minutes,
        ))
    } else {
        None
    }
}
