//! Anomaly detectors.
//!
//! - [`reboot`] - quorum of cumulative CPU totals decreasing together
//! - [`decreasing`] - IO-wait counters going backwards
//! - [`time_gap`] - missing data between consecutive files
//!
//! [`CpuAccumulator`] sits behind the file parser and builds the per-device
//! series the detectors work on.

pub mod decreasing;
pub mod reboot;
mod series;
pub mod time_gap;

use std::collections::BTreeSet;

use tracing::info;

use crate::anomaly::AnomalyRecord;
use crate::config::ScanConfig;
use crate::continuity::ContinuityState;
use crate::fault::LineFault;
use crate::parser::RecordConsumer;
use crate::record::DecodedRecord;

pub use decreasing::find_decreases;
pub use reboot::{RebootCheck, RebootDetector};
pub use series::{DeviceSeries, FileSeries, IowaitSample, IowaitValue};
pub use time_gap::{check_time_gap, DEFAULT_TIME_GAP_SECS};

/// Builds the CPU series of one file and runs the reboot check per sample.
pub struct CpuAccumulator<'a> {
    file: &'a str,
    config: &'a ScanConfig,
    continuity: &'a ContinuityState,
    reboot: &'a mut RebootDetector,
    devices: &'a mut BTreeSet<String>,
    series: FileSeries,
    reboots: Vec<AnomalyRecord>,
}

impl<'a> CpuAccumulator<'a> {
    pub fn new(
        file: &'a str,
        config: &'a ScanConfig,
        continuity: &'a ContinuityState,
        reboot: &'a mut RebootDetector,
        devices: &'a mut BTreeSet<String>,
    ) -> Self {
        reboot.start_period();
        Self {
            file,
            config,
            continuity,
            reboot,
            devices,
            series: FileSeries::default(),
            reboots: Vec::new(),
        }
    }

    /// The file's series and the reboots confirmed while reading it.
    pub fn finish(self) -> (FileSeries, Vec<AnomalyRecord>) {
        (self.series, self.reboots)
    }
}

impl RecordConsumer for CpuAccumulator<'_> {
    fn on_timestamp(&mut self, timestamp: f64) {
        self.series.note_timestamp(timestamp);
        self.reboot.start_period();
    }

    fn on_record(
        &mut self,
        timestamp: Option<f64>,
        record: &DecodedRecord,
    ) -> Result<(), LineFault> {
        if record.type_name != self.config.cpu_type {
            return Ok(());
        }
        let missing_field = |field: String| LineFault::MissingField {
            type_name: record.type_name.clone(),
            field,
        };
        let timestamp = timestamp.ok_or_else(|| LineFault::MissingTimestamp {
            type_name: record.type_name.clone(),
        })?;
        let total = record
            .sum_of(self.config.cpu_total_fields.as_slice())
            .map_err(missing_field)?;
        let iowait = record
            .get(&self.config.iowait_field)
            .ok_or_else(|| missing_field(self.config.iowait_field.clone()))?;

        let device = format!("{}{}", record.type_name, record.device);
        self.devices.insert(device.clone());

        let continuity = self.continuity;
        let series = self
            .series
            .devices
            .entry(device.clone())
            .or_insert_with(|| continuity.splice(&device));
        series.push_total(total);

        let check = self
            .reboot
            .observe(&device, &mut series.window, self.devices.len());
        if check == RebootCheck::Confirmed {
            info!("Reboot at {:.6} for {}", timestamp, self.file);
            self.reboots
                .push(AnomalyRecord::reboot(self.file, timestamp));
        }

        series.iowait.push(if check.is_reset() {
            IowaitSample::flagged(timestamp)
        } else {
            IowaitSample::value(timestamp, iowait)
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyKind;
    use crate::schema::Schema;
    use std::sync::Arc;

    struct Harness {
        config: ScanConfig,
        continuity: ContinuityState,
        reboot: RebootDetector,
        devices: BTreeSet<String>,
        decoder: crate::record::RecordDecoder,
    }

    impl Harness {
        fn new() -> Self {
            let mut decoder = crate::record::RecordDecoder::new();
            let schema =
                Schema::new("user,E nice,E system,E idle,E iowait,E irq,E softirq,E").unwrap();
            decoder.insert_schema("cpu", Arc::new(schema));
            Self {
                config: ScanConfig::default(),
                continuity: ContinuityState::new(),
                reboot: RebootDetector::new(),
                devices: BTreeSet::new(),
                decoder,
            }
        }

        /// Feed `(timestamp, line)` pairs as one file; consecutive equal
        /// timestamps share one timestamp line.
        fn run_file(&mut self, file: &str, lines: &[(f64, &str)]) -> (FileSeries, Vec<AnomalyRecord>) {
            let mut acc = CpuAccumulator::new(
                file,
                &self.config,
                &self.continuity,
                &mut self.reboot,
                &mut self.devices,
            );
            let mut current = None;
            for &(ts, line) in lines {
                if current != Some(ts) {
                    acc.on_timestamp(ts);
                    current = Some(ts);
                }
                let record = self.decoder.decode(line).unwrap();
                acc.on_record(Some(ts), &record).unwrap();
            }
            let (series, reboots) = acc.finish();
            self.continuity.record_file_end(file, &series);
            (series, reboots)
        }
    }

    #[test]
    fn test_totals_and_iowait_are_collected() {
        let mut h = Harness::new();
        let (series, reboots) = h.run_file(
            "a.gz",
            &[(10.0, "cpu 0 1 1 1 1 5 1 1"), (20.0, "cpu 0 2 2 2 2 6 2 2")],
        );
        assert!(reboots.is_empty());
        let dev = &series.devices["cpu0"];
        assert_eq!(dev.last_total, Some(18));
        assert_eq!(dev.window, [18]);
        assert_eq!(
            dev.iowait,
            [IowaitSample::value(10.0, 5), IowaitSample::value(20.0, 6)]
        );
    }

    #[test]
    fn test_reboot_needs_every_device() {
        let mut h = Harness::new();
        let (_, reboots) = h.run_file(
            "a.gz",
            &[
                (10.0, "cpu 0 100 0 0 100 10 0 0"),
                (10.0, "cpu 1 100 0 0 100 10 0 0"),
                (20.0, "cpu 0 1 0 0 1 1 0 0"),
                (20.0, "cpu 1 1 0 0 1 1 0 0"),
            ],
        );
        assert_eq!(reboots.len(), 1);
        assert_eq!(reboots[0].kind, AnomalyKind::Reboot);
        assert_eq!(reboots[0].timestamp, 20.0);
        assert_eq!(h.reboot.votes(), 0);
    }

    #[test]
    fn test_single_device_drop_only_flags_sample() {
        let mut h = Harness::new();
        let (series, reboots) = h.run_file(
            "a.gz",
            &[
                (10.0, "cpu 0 100 0 0 100 10 0 0"),
                (10.0, "cpu 1 100 0 0 100 10 0 0"),
                (20.0, "cpu 0 1 0 0 1 1 0 0"),
                (20.0, "cpu 1 200 0 0 200 20 0 0"),
            ],
        );
        assert!(reboots.is_empty());
        assert_eq!(h.reboot.votes(), 1);
        assert!(series.devices["cpu0"].iowait[1].is_flagged());
        assert!(!series.devices["cpu1"].iowait[1].is_flagged());
    }

    #[test]
    fn test_previous_tail_is_spliced_before_check() {
        let mut h = Harness::new();
        h.run_file("a.gz", &[(10.0, "cpu 0 500 0 0 0 7 0 0")]);
        let (series, reboots) = h.run_file("b.gz", &[(20.0, "cpu 0 480 0 0 0 0 0 0")]);

        // A single known device, so its reset alone is a reboot.
        assert_eq!(reboots.len(), 1);
        let dev = &series.devices["cpu0"];
        assert!(dev.spliced);
        assert_eq!(
            dev.iowait,
            [IowaitSample::value(10.0, 7), IowaitSample::flagged(20.0)]
        );
        assert!(find_decreases("b.gz", "cpu0", &dev.iowait).is_empty());
    }

    #[test]
    fn test_repeated_drops_of_one_device_are_not_a_reboot() {
        let mut h = Harness::new();
        let (series, reboots) = h.run_file(
            "a.gz",
            &[
                (10.0, "cpu 0 100 0 0 100 10 0 0"),
                (10.0, "cpu 1 100 0 0 100 10 0 0"),
                (20.0, "cpu 0 50 0 0 50 5 0 0"),
                (20.0, "cpu 1 200 0 0 200 20 0 0"),
                (30.0, "cpu 0 10 0 0 10 1 0 0"),
                (30.0, "cpu 1 300 0 0 300 30 0 0"),
            ],
        );
        assert!(reboots.is_empty());
        assert!(series.devices["cpu0"].iowait[2].is_flagged());
        assert!(series.devices["cpu1"].iowait.iter().all(|s| !s.is_flagged()));
    }

    #[test]
    fn test_drops_in_different_periods_are_not_a_reboot() {
        let mut h = Harness::new();
        let (_, reboots) = h.run_file(
            "a.gz",
            &[
                (10.0, "cpu 0 100 0 0 100 10 0 0"),
                (10.0, "cpu 1 100 0 0 100 10 0 0"),
                (20.0, "cpu 0 50 0 0 50 5 0 0"),
                (20.0, "cpu 1 200 0 0 200 20 0 0"),
            ],
        );
        assert!(reboots.is_empty());

        let (_, reboots) = h.run_file(
            "b.gz",
            &[
                (5000.0, "cpu 0 60 0 0 60 6 0 0"),
                (5000.0, "cpu 1 100 0 0 100 10 0 0"),
            ],
        );
        assert!(reboots.is_empty());
        assert_eq!(h.reboot.votes(), 1);
    }

    #[test]
    fn test_other_types_are_ignored() {
        let mut h = Harness::new();
        let schema = Schema::new("MemUsed").unwrap();
        h.decoder.insert_schema("mem", Arc::new(schema));
        let (series, _) = h.run_file("a.gz", &[(10.0, "mem 0 5")]);
        assert!(series.devices.is_empty());
        assert_eq!(series.first_timestamp, Some(10.0));
    }

    #[test]
    fn test_missing_timestamp_and_field() {
        let mut h = Harness::new();
        let schema = Schema::new("user idle").unwrap();
        h.decoder.insert_schema("cpu", Arc::new(schema));
        let record = h.decoder.decode("cpu 0 1 2").unwrap();
        let mut acc = CpuAccumulator::new(
            "a.gz",
            &h.config,
            &h.continuity,
            &mut h.reboot,
            &mut h.devices,
        );
        assert!(matches!(
            acc.on_record(None, &record),
            Err(LineFault::MissingTimestamp { .. })
        ));
        assert!(matches!(
            acc.on_record(Some(1.0), &record),
            Err(LineFault::MissingField { field, .. }) if field == "nice"
        ));
    }
}
