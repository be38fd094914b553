//! Host-scoped processing of consecutive stats files.

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::anomaly::AnomalyRecord;
use crate::config::ScanConfig;
use crate::continuity::ContinuityState;
use crate::detect::{check_time_gap, find_decreases, CpuAccumulator, RebootDetector};
use crate::parser::{FileParser, ProcdumpSink};
use crate::scan::open_log;
use crate::schema::SchemaCatalog;
use crate::summary::FileReport;

/// State shared by all files of one host, fed in chronological order.
///
/// Schemas, counter tails, the reboot vote count and the set of known CPU
/// devices all carry over from one file to the next. Separate hosts need
/// separate runs.
#[derive(Debug)]
pub struct HostRun {
    config: ScanConfig,
    catalog: SchemaCatalog,
    continuity: ContinuityState,
    reboot: RebootDetector,
    devices: BTreeSet<String>,
    hostname: Option<String>,
    tool_version: Option<String>,
    anomalies: Vec<AnomalyRecord>,
}

impl HostRun {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            catalog: SchemaCatalog::new(),
            continuity: ContinuityState::new(),
            reboot: RebootDetector::new(),
            devices: BTreeSet::new(),
            hostname: None,
            tool_version: None,
            anomalies: Vec::new(),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn tool_version(&self) -> Option<&str> {
        self.tool_version.as_deref()
    }

    /// Every anomaly found so far, in detection order.
    pub fn anomalies(&self) -> &[AnomalyRecord] {
        &self.anomalies
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Open `path` (gunzipping `*.gz`) and process it.
    pub fn process_path(&mut self, path: &Path) -> Result<FileReport> {
        let reader = open_log(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.process_reader(&name, reader))
    }

    pub fn process_reader<R: BufRead>(&mut self, name: &str, reader: R) -> FileReport {
        self.process_reader_with(name, reader, None)
    }

    /// Process one file, handing `%procdump` marks to `procdump` if given.
    pub fn process_reader_with<R: BufRead>(
        &mut self,
        name: &str,
        reader: R,
        procdump: Option<&mut dyn ProcdumpSink>,
    ) -> FileReport {
        debug!("Processing {}", name);

        let mut accumulator = CpuAccumulator::new(
            name,
            &self.config,
            &self.continuity,
            &mut self.reboot,
            &mut self.devices,
        );
        let mut parser = FileParser::new(name, &mut self.catalog);
        if let Some(sink) = procdump {
            parser = parser.with_procdump(sink);
        }
        let outcome = parser.parse(reader, &mut accumulator);
        let (series, reboots) = accumulator.finish();

        let mut anomalies = Vec::new();
        if let Some(first) = series.first_timestamp {
            if let Some(gap) = check_time_gap(
                name,
                self.continuity.previous(),
                first,
                self.config.time_gap_threshold_secs,
            ) {
                info!("{}", gap);
                anomalies.push(gap);
            }
        }
        anomalies.extend(reboots);
        for (device, dev) in &series.devices {
            for decrease in find_decreases(name, device, &dev.iowait) {
                warn!("{}", decrease);
                anomalies.push(decrease);
            }
        }

        self.continuity.record_file_end(name, &series);
        if outcome.hostname.is_some() {
            self.hostname.clone_from(&outcome.hostname);
        }
        if outcome.tool_version.is_some() {
            self.tool_version.clone_from(&outcome.tool_version);
        }
        self.anomalies.extend(anomalies.iter().cloned());

        FileReport {
            file: name.to_string(),
            hostname: outcome.hostname,
            tool_version: outcome.tool_version,
            state: outcome.state,
            records: outcome.records,
            timestamps: outcome.timestamps,
            faults: outcome.issues,
            rotations: outcome.rotations,
            header_error: outcome.header_error,
            aborted: outcome.aborted,
            anomalies,
        }
    }
}
