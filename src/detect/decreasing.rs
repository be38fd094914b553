//! Decreasing-value detector for monotonically increasing IO-wait counters.

use super::series::{IowaitSample, IowaitValue};
use crate::anomaly::AnomalyRecord;

/// Compare each IO-wait sample with its successor.
///
/// A drop is reported at the predecessor's timestamp with the size of the
/// drop as magnitude. Pairs involving a flagged sample are skipped, since the
/// counters were reset there.
pub fn find_decreases(source_file: &str, device: &str, samples: &[IowaitSample]) -> Vec<AnomalyRecord> {
    samples
        .windows(2)
        .filter_map(|pair| match (pair[0].value, pair[1].value) {
            (IowaitValue::Value(prev), IowaitValue::Value(next)) if next < prev => Some(
                AnomalyRecord::decreasing_value(source_file, device, pair[0].timestamp, prev - next),
            ),
            _ => None,
        })
        .collect()
}
