//! Anomaly output sinks.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::anomaly::AnomalyRecord;

/// Destination for the anomalies of one host.
pub trait Reporter {
    fn report(&mut self, host: &str, batch: &[AnomalyRecord]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Flat-file output: the host name followed by one line per anomaly.
pub struct TextReporter<W: Write> {
    out: W,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn report(&mut self, host: &str, batch: &[AnomalyRecord]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "{host}").context("Failed to write report")?;
        for anomaly in batch {
            writeln!(self.out, "{anomaly}").context("Failed to write report")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush report")
    }
}

#[derive(Serialize)]
struct HostAnomaly<'a> {
    host: &'a str,
    #[serde(flatten)]
    anomaly: &'a AnomalyRecord,
}

/// One JSON object per line, tagged with the host.
pub struct JsonLinesReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonLinesReporter<W> {
    fn report(&mut self, host: &str, batch: &[AnomalyRecord]) -> Result<()> {
        for anomaly in batch {
            serde_json::to_writer(&mut self.out, &HostAnomaly { host, anomaly })
                .context("Failed to write report")?;
            writeln!(self.out).context("Failed to write report")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush report")
    }
}

impl Reporter for Vec<AnomalyRecord> {
    fn report(&mut self, _host: &str, batch: &[AnomalyRecord]) -> Result<()> {
        self.extend_from_slice(batch);
        Ok(())
    }
}
