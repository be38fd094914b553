//! Host directory discovery and parallel scanning.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use flate2::read::GzDecoder;
use regex::Regex;
use tracing::{debug, error, info, warn};
use workerpool::thunk::{Thunk, ThunkWorker};
use workerpool::Pool;

use crate::config::ScanConfig;
use crate::run::HostRun;
use crate::summary::HostReport;

/// Files directly inside `dir` whose name matches `pattern`, sorted by name.
///
/// Stats files are named after the epoch second they were started at, so the
/// name order is the chronological order.
pub fn discover_files(dir: &Path, pattern: &Regex) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read directory {}", dir.display()))?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if pattern.is_match(&name.to_string_lossy()) {
            files.push(entry.path());
        } else {
            debug!("Skipping {}", entry.path().display());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Open a stats file, transparently decompressing `*.gz`.
pub fn open_log(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::with_capacity(256 * 1024, file);

    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    if name.ends_with(".gz") {
        let decoder = GzDecoder::new(reader);
        Ok(Box::new(BufReader::with_capacity(256 * 1024, decoder)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Run one [`HostRun`] over every stats file of `dir`, in order.
///
/// If `cancel` becomes set the scan stops before the next file and the
/// reports produced so far are returned.
pub fn scan_host(dir: &Path, config: &ScanConfig, cancel: Option<&AtomicBool>) -> Result<HostReport> {
    let start = Instant::now();
    let files = discover_files(dir, &config.file_regex()?)?;
    info!("Scanning {} files in {}", files.len(), dir.display());

    let mut run = HostRun::new(config.clone());
    let mut reports = Vec::with_capacity(files.len());
    let mut cancelled = false;
    for path in &files {
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            warn!("Scan of {} cancelled", dir.display());
            cancelled = true;
            break;
        }
        match run.process_path(path) {
            Ok(report) => reports.push(report),
            // An unopenable file is skipped like an unreadable one.
            Err(e) => error!("{:#}", e),
        }
    }

    Ok(HostReport {
        dir: dir.to_path_buf(),
        hostname: run.hostname().map(str::to_string),
        files: reports,
        elapsed: start.elapsed(),
        cancelled,
    })
}

/// Scan several host directories on a pool of `config.jobs` threads.
///
/// Every host gets its own [`HostRun`]. Results come back in the order of
/// `dirs`.
pub fn scan_hosts(
    dirs: &[PathBuf],
    config: &ScanConfig,
    cancel: Option<Arc<AtomicBool>>,
) -> Vec<(PathBuf, Result<HostReport>)> {
    let results = Arc::new(Mutex::new(Vec::with_capacity(dirs.len())));
    let pool = Pool::<ThunkWorker<()>>::new(config.jobs.max(1));

    for (index, dir) in dirs.iter().enumerate() {
        let dir = dir.clone();
        let config = config.clone();
        let cancel = cancel.clone();
        let results = results.clone();
        pool.execute(Thunk::of(move || {
            let report = scan_host(&dir, &config, cancel.as_deref());
            if let Ok(mut results) = results.lock() {
                results.push((index, dir, report));
            }
        }));
    }
    pool.join();

    let finished = match results.lock() {
        Ok(mut results) => std::mem::take(&mut *results),
        Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    };
    in_input_order(dirs, finished)
}

/// Order finished host results like `dirs`.
///
/// A host whose job never reported back (its worker panicked) gets an error.
fn in_input_order(
    dirs: &[PathBuf],
    finished: Vec<(usize, PathBuf, Result<HostReport>)>,
) -> Vec<(PathBuf, Result<HostReport>)> {
    let mut slots: Vec<Option<Result<HostReport>>> = dirs.iter().map(|_| None).collect();
    for (index, _, report) in finished {
        slots[index] = Some(report);
    }
    dirs.iter()
        .zip(slots)
        .map(|(dir, report)| {
            let report = report.unwrap_or_else(|| {
                error!("Scan of {} did not complete", dir.display());
                Err(anyhow!("Scan of {} did not complete", dir.display()))
            });
            (dir.clone(), report)
        })
        .collect()
}
