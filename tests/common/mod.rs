//! Helpers for writing synthetic tacc_stats host directories.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

pub const CPU_SCHEMA: &str = "!cpu user,E,U=cs nice,E,U=cs system,E,U=cs idle,E,U=cs \
                              iowait,E,U=cs irq,E,U=cs softirq,E,U=cs";

/// A stats file with the usual header and the given body.
pub fn stats_text(hostname: &str, body: &str) -> String {
    format!("$tacc_stats 2.0.1\n$hostname {hostname}\n{CPU_SCHEMA}\n{body}")
}

/// Write `text` gzip-compressed to `dir/name`.
pub fn write_gz(dir: &Path, name: &str, text: &str) {
    let file = File::create(dir.join(name)).expect("Failed to create stats file");
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(text.as_bytes())
        .expect("Failed to write stats file");
    encoder.finish().expect("Failed to finish gzip stream");
}

/// One timestamp line followed by a cpu line per `(user, iowait)` pair.
pub fn sample(timestamp: u64, cpus: &[(u64, u64)]) -> String {
    let mut text = format!("{timestamp} 1234\n");
    for (dev, (user, iowait)) in cpus.iter().enumerate() {
        text.push_str(&format!("cpu {dev} {user} 0 0 1000 {iowait} 0 0\n"));
    }
    text
}
