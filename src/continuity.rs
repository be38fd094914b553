//! Host-scoped carry-over of counter tails between consecutive files.
//!
//! Cumulative counters only make sense as a continuous series, but a host's
//! history is split across many files. At the end of each file the last
//! cumulative total and IO-wait sample of every CPU device are stored here;
//! the next file splices them in front of its own series, once per device,
//! before the first reboot check for that device.

use std::collections::HashMap;

use crate::detect::{DeviceSeries, FileSeries, IowaitSample};

/// Last values of one device from the previous file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceTail {
    pub total: u64,
    pub iowait: IowaitSample,
}

#[derive(Debug, Clone, Default)]
pub struct ContinuityState {
    tails: HashMap<String, DeviceTail>,
    previous_file: Option<String>,
    previous_timestamp: Option<f64>,
}

impl ContinuityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name and last timestamp of the previous file.
    pub fn previous(&self) -> Option<(&str, f64)> {
        match (&self.previous_file, self.previous_timestamp) {
            (Some(file), Some(ts)) => Some((file.as_str(), ts)),
            _ => None,
        }
    }

    pub fn tail(&self, device: &str) -> Option<&DeviceTail> {
        self.tails.get(device)
    }

    /// Start a fresh series for `device`, spliced onto the stored tail.
    pub fn splice(&self, device: &str) -> DeviceSeries {
        let mut series = DeviceSeries::default();
        if let Some(tail) = self.tail(device) {
            series.push_total(tail.total);
            series.iowait.push(tail.iowait);
            series.spliced = true;
        }
        series
    }

    /// Remember the tails of a finished file.
    ///
    /// Devices missing from the file keep their older tail. A file without
    /// any timestamp leaves the state untouched.
    pub fn record_file_end(&mut self, file: &str, series: &FileSeries) {
        let Some(last_timestamp) = series.last_timestamp else {
            return;
        };
        for (device, dev) in &series.devices {
            if let (Some(total), Some(iowait)) = (dev.last_total, dev.last_iowait()) {
                self.tails.insert(
                    device.clone(),
                    DeviceTail {
                        total,
                        iowait: *iowait,
                    },
                );
            }
        }
        self.previous_file = Some(file.to_string());
        self.previous_timestamp = Some(last_timestamp);
    }
}
