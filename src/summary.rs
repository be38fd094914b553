//! Per-file and per-host reports.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::anomaly::AnomalyRecord;
use crate::fault::LineIssue;
use crate::parser::ParserState;

/// What processing one stats file produced.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub file: String,
    pub hostname: Option<String>,
    pub tool_version: Option<String>,
    pub state: ParserState,
    pub records: usize,
    /// Timestamp lines seen in the body.
    pub timestamps: usize,
    pub faults: Vec<LineIssue>,
    pub rotations: Vec<f64>,
    pub header_error: bool,
    pub aborted: bool,
    pub anomalies: Vec<AnomalyRecord>,
}

impl FileReport {
    pub fn fault_count(&self) -> usize {
        self.faults.len()
    }

    /// No faults, no header error and the whole file was read.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty() && !self.header_error && !self.aborted
    }
}

/// All file reports of one host directory.
#[derive(Debug, Clone)]
pub struct HostReport {
    pub dir: PathBuf,
    /// Last `$hostname` seen, if any file declared one.
    pub hostname: Option<String>,
    pub files: Vec<FileReport>,
    pub elapsed: Duration,
    /// The scan stopped early on request.
    pub cancelled: bool,
}

impl HostReport {
    /// Name used when reporting: the declared hostname or the directory name.
    pub fn host(&self) -> String {
        match &self.hostname {
            Some(name) => name.clone(),
            None => self
                .dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.dir.display().to_string()),
        }
    }

    pub fn records(&self) -> usize {
        self.files.iter().map(|f| f.records).sum()
    }

    pub fn fault_count(&self) -> usize {
        self.files.iter().map(FileReport::fault_count).sum()
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &AnomalyRecord> {
        self.files.iter().flat_map(|f| f.anomalies.iter())
    }

    pub fn anomaly_count(&self) -> usize {
        self.files.iter().map(|f| f.anomalies.len()).sum()
    }
}

impl fmt::Display for HostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} files, {} records, {} faults, {} anomalies in {:.2?}",
            self.host(),
            self.files.len(),
            self.records(),
            self.fault_count(),
            self.anomaly_count(),
            self.elapsed
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}
