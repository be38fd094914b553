//! Reboot heuristic.
//!
//! A reboot resets every CPU's cumulative counters at once. Each device keeps a
//! two-sample window of its cumulative total; a device whose window decreases
//! votes for a reboot. Votes only count within one sample period: each device
//! votes at most once, and a new timestamp starts a fresh period. Once the
//! voters cover every distinct device known for the host, a reboot is
//! confirmed.

use std::collections::{BTreeSet, VecDeque};

/// Result of pushing a new total through a device's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootCheck {
    /// The total did not decrease.
    Steady,
    /// The total decreased, but not every device has done so yet.
    Contributing,
    /// This device completed the quorum.
    Confirmed,
}

impl RebootCheck {
    /// True if the device's counters reset at this sample.
    pub fn is_reset(self) -> bool {
        self != RebootCheck::Steady
    }
}

/// Devices that voted for a reboot in the current sample period.
#[derive(Debug, Clone, Default)]
pub struct RebootDetector {
    voters: BTreeSet<String>,
}

impl RebootDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn votes(&self) -> usize {
        self.voters.len()
    }

    /// Drop the votes of the previous sample period.
    pub fn start_period(&mut self) {
        self.voters.clear();
    }

    /// Evaluate `device`'s window that just received a new total.
    ///
    /// With two totals in the window the older one is compared against the
    /// newer one and then dropped.
    pub fn observe(
        &mut self,
        device: &str,
        window: &mut VecDeque<u64>,
        device_count: usize,
    ) -> RebootCheck {
        if window.len() < 2 {
            return RebootCheck::Steady;
        }
        let decreased = window[0] > window[1];
        while window.len() > 1 {
            window.pop_front();
        }
        if !decreased {
            return RebootCheck::Steady;
        }

        self.voters.insert(device.to_string());
        if self.voters.len() >= device_count {
            self.voters.clear();
            RebootCheck::Confirmed
        } else {
            RebootCheck::Contributing
        }
    }
}
