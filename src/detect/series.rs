//! Per-file CPU series accumulated for the detectors.

use std::collections::{BTreeMap, VecDeque};

/// An IO-wait sample, or the marker left where a reboot was suspected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IowaitValue {
    Value(u64),
    /// Sample taken across a counter reset; never compared.
    Flagged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IowaitSample {
    pub timestamp: f64,
    pub value: IowaitValue,
}

impl IowaitSample {
    pub fn value(timestamp: f64, value: u64) -> Self {
        Self {
            timestamp,
            value: IowaitValue::Value(value),
        }
    }

    pub fn flagged(timestamp: f64) -> Self {
        Self {
            timestamp,
            value: IowaitValue::Flagged,
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.value == IowaitValue::Flagged
    }
}

/// Cumulative totals and IO-wait samples of one device within one file.
#[derive(Debug, Clone, Default)]
pub struct DeviceSeries {
    /// Sliding window of the last cumulative totals, at most two long.
    pub window: VecDeque<u64>,
    pub iowait: Vec<IowaitSample>,
    /// Most recent cumulative total, kept after the window slides.
    pub last_total: Option<u64>,
    /// Whether the previous file's tail was spliced in front of this series.
    pub spliced: bool,
}

impl DeviceSeries {
    pub fn push_total(&mut self, total: u64) {
        self.window.push_back(total);
        self.last_total = Some(total);
    }

    pub fn last_iowait(&self) -> Option<&IowaitSample> {
        self.iowait.last()
    }
}

/// All device series of one file, plus its first and last timestamp.
#[derive(Debug, Clone, Default)]
pub struct FileSeries {
    pub devices: BTreeMap<String, DeviceSeries>,
    /// First and last timestamp lines seen in the file.
    pub first_timestamp: Option<f64>,
    pub last_timestamp: Option<f64>,
}

impl FileSeries {
    pub fn note_timestamp(&mut self, timestamp: f64) {
        if self.first_timestamp.is_none() {
            self.first_timestamp = Some(timestamp);
        }
        self.last_timestamp = Some(timestamp);
    }
}
