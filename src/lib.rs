//! tacc-audit library - parsing and anomaly detection for tacc_stats logs.
//!
//! tacc_stats writes one text file per host per collection period. Each file
//! declares schemas for the record types it carries and then lists
//! timestamped per-device counter samples. This library reads a host's files
//! in order, keeps counter state across file boundaries and reports
//! reboots, decreasing IO-wait counters and collection gaps.
//!
//! # Modules
//!
//! - [`schema`] - schema descriptors, normalisation and the run-wide catalog
//! - [`parser`] - per-file parser feeding a [`parser::RecordConsumer`]
//! - [`detect`] - reboot, decreasing-value and time-gap detectors
//! - [`run`] - host-scoped processing of consecutive files
//! - [`scan`] - directory discovery and parallel host scans
//! - [`report`] - text and JSON-lines anomaly sinks
//!
//! # Example
//!
//! ```no_run
//! use tacc_audit::{scan_host, ScanConfig};
//! use std::path::Path;
//!
//! let report = scan_host(Path::new("./c401-101"), &ScanConfig::default(), None)
//!     .expect("Failed to scan host");
//! for anomaly in report.anomalies() {
//!     println!("{anomaly}");
//! }
//! ```

pub mod anomaly;
pub mod config;
pub mod continuity;
pub mod detect;
pub mod fault;
pub mod parser;
pub mod record;
pub mod report;
pub mod run;
pub mod scan;
pub mod schema;
pub mod summary;

// Re-export for convenience
pub use anomaly::{AnomalyKind, AnomalyRecord};
pub use config::ScanConfig;
pub use fault::{LineFault, LineIssue};
pub use parser::{FileParser, ParserState};
pub use report::{JsonLinesReporter, Reporter, TextReporter};
pub use run::HostRun;
pub use scan::{discover_files, open_log, scan_host, scan_hosts};
pub use schema::{schema_fixup, Schema, SchemaCatalog};
pub use summary::{FileReport, HostReport};
