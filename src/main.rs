use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use tacc_audit::{scan_hosts, JsonLinesReporter, Reporter, ScanConfig, TextReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Scan tacc_stats host directories for reboots, counter drops and gaps
#[derive(Debug, Parser)]
#[command(name = "tacc-audit")]
#[command(version)]
struct Command {
    /// Host directories, each holding one host's stats files
    #[arg(required = true)]
    dirs: Vec<PathBuf>,
    /// JSON config file; command line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Report gaps between files longer than this many seconds
    #[arg(long)]
    gap_threshold: Option<f64>,
    /// Regex selecting the stats files inside each directory
    #[arg(long)]
    pattern: Option<String>,
    /// Number of hosts scanned in parallel
    #[arg(short, long)]
    jobs: Option<usize>,
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,
    /// Write anomalies here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(opts: &Command) -> Result<ScanConfig> {
    let mut config = match &opts.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    if let Some(threshold) = opts.gap_threshold {
        config.time_gap_threshold_secs = threshold;
    }
    if let Some(pattern) = &opts.pattern {
        config.file_pattern = pattern.clone();
    }
    if let Some(jobs) = opts.jobs {
        config.jobs = jobs;
    }
    config.validate()?;
    Ok(config)
}

fn open_output(opts: &Command) -> Result<Box<dyn Write>> {
    match &opts.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

fn main() -> Result<()> {
    let opts = Command::parse();
    init_logging(opts.verbose);

    let config = load_config(&opts)?;
    debug!("Using {:?}", config);
    for dir in &opts.dirs {
        if !dir.is_dir() {
            bail!("Not a directory: {}", dir.display());
        }
    }

    let out = open_output(&opts)?;
    let mut reporter: Box<dyn Reporter> = match opts.format {
        Format::Text => Box::new(TextReporter::new(out)),
        Format::Json => Box::new(JsonLinesReporter::new(out)),
    };

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))
            .context("Error setting Ctrl-C handler")?;
    }

    let mut failed = 0;
    for (dir, result) in scan_hosts(&opts.dirs, &config, Some(cancel)) {
        match result {
            Ok(host) => {
                let anomalies: Vec<_> = host.anomalies().cloned().collect();
                reporter.report(&host.host(), &anomalies)?;
                eprintln!("{}", host);
            }
            Err(e) => {
                error!("{}: {:#}", dir.display(), e);
                failed += 1;
            }
        }
    }
    reporter.flush()?;

    if failed > 0 {
        bail!("{} of {} host directories could not be scanned", failed, opts.dirs.len());
    }
    Ok(())
}
