//! End-to-end scans of synthetic host directories.

mod common;

use std::sync::atomic::AtomicBool;

use common::{sample, stats_text, write_gz};
use tacc_audit::{scan_host, scan_hosts, AnomalyKind, LineFault, ScanConfig};
use tempfile::TempDir;

#[test]
fn test_clean_host_has_no_anomalies() {
    let dir = TempDir::new().unwrap();
    let mut body = String::new();
    for i in 0..5 {
        body.push_str(&sample(1_400_000_000 + i * 600, &[(10 * i, i), (10 * i, i)]));
    }
    write_gz(dir.path(), "1400000000.gz", &stats_text("c401-101", &body));

    let report = scan_host(dir.path(), &ScanConfig::default(), None).unwrap();
    assert_eq!(report.files.len(), 1);
    assert!(report.files[0].is_clean());
    assert_eq!(report.records(), 10);
    assert_eq!(report.anomaly_count(), 0);
    assert_eq!(report.host(), "c401-101");
}

#[test]
fn test_gap_between_files() {
    let dir = TempDir::new().unwrap();
    write_gz(
        dir.path(),
        "1000.gz",
        &stats_text("h", &sample(1000, &[(1, 1)])),
    );
    write_gz(
        dir.path(),
        "3000.gz",
        &stats_text("h", &sample(3000, &[(2, 2)])),
    );

    let report = scan_host(dir.path(), &ScanConfig::default(), None).unwrap();
    let anomalies: Vec<_> = report.anomalies().collect();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].kind, AnomalyKind::TimeGap);
    assert_eq!(anomalies[0].magnitude, Some(33));
    assert_eq!(
        anomalies[0].to_string(),
        "33 minute gap starting at 1000 (1000.gz) beginning in file 3000.gz"
    );
}

#[test]
fn test_reboot_across_files_is_not_a_decrease() {
    let dir = TempDir::new().unwrap();
    write_gz(
        dir.path(),
        "1000.gz",
        &stats_text("h", &sample(1000, &[(500, 40), (500, 40)])),
    );
    write_gz(
        dir.path(),
        "1600.gz",
        &stats_text("h", &sample(1600, &[(1, 1), (1, 1)])),
    );

    let report = scan_host(dir.path(), &ScanConfig::default(), None).unwrap();
    let kinds: Vec<_> = report.anomalies().map(|a| a.kind).collect();
    assert_eq!(kinds, [AnomalyKind::Reboot]);
    assert_eq!(report.files[1].anomalies[0].source_file, "1600.gz");
}

#[test]
fn test_header_error_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    write_gz(
        dir.path(),
        "1000.gz",
        &stats_text("h", &sample(1000, &[(1, 1)])),
    );
    write_gz(dir.path(), "1300.gz", "$hostname h\n1300 1\ncpu 0 1 2\n");
    write_gz(
        dir.path(),
        "1600.gz",
        &stats_text("h", &sample(1600, &[(2, 2)])),
    );

    let report = scan_host(dir.path(), &ScanConfig::default(), None).unwrap();
    assert_eq!(report.files.len(), 3);
    assert!(report.files[1].header_error);
    assert_eq!(report.files[1].faults[0].fault, LineFault::HeaderError);
    assert_eq!(report.anomaly_count(), 0);
}

#[test]
fn test_pattern_selects_files() {
    let dir = TempDir::new().unwrap();
    write_gz(dir.path(), "1000.gz", &stats_text("h", &sample(1000, &[(1, 1)])));
    std::fs::write(dir.path().join("README"), "not a stats file").unwrap();

    let report = scan_host(dir.path(), &ScanConfig::default(), None).unwrap();
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].file, "1000.gz");
}

#[test]
fn test_hosts_are_independent_and_ordered() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    write_gz(a.path(), "1000.gz", &stats_text("a", &sample(1000, &[(500, 10)])));
    // Host b alone would never see a reboot: its only total is small.
    write_gz(b.path(), "1600.gz", &stats_text("b", &sample(1600, &[(1, 1)])));
    let missing = a.path().join("missing");

    let config = ScanConfig {
        jobs: 3,
        ..Default::default()
    };
    let dirs = vec![b.path().to_path_buf(), missing.clone(), a.path().to_path_buf()];
    let results = scan_hosts(&dirs, &config, None);

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, dirs[0]);
    assert_eq!(results[1].0, missing);
    assert!(results[1].1.is_err());
    assert_eq!(results[2].0, dirs[2]);

    let b_report = results[0].1.as_ref().unwrap();
    assert_eq!(b_report.hostname.as_deref(), Some("b"));
    assert_eq!(b_report.anomaly_count(), 0);
}

#[test]
fn test_cancelled_before_first_file() {
    let dir = TempDir::new().unwrap();
    write_gz(dir.path(), "1000.gz", &stats_text("h", &sample(1000, &[(1, 1)])));
    let cancel = AtomicBool::new(true);

    let report = scan_host(dir.path(), &ScanConfig::default(), Some(&cancel)).unwrap();
    assert!(report.cancelled);
    assert!(report.files.is_empty());
}
