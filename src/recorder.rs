use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::drivers::pipeline::{TelemetrySample, CHANNEL_LABELS};

/// Append-only CSV log of every accepted sample.
///
/// The destination opens once at startup and failure to open it is fatal to
/// the pipeline. Every appended row is flushed before the call returns, so
/// an abrupt exit never loses a record the pipeline already acknowledged.
pub struct SampleLogWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    rows: u64,
}

impl SampleLogWriter {
    /// Creates the log file (and any missing parent directory) and writes
    /// the fixed header row.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "Time,{}", CHANNEL_LABELS.join(","))?;
        writer.flush()?;
        info!("logging samples to {}", path.display());
        Ok(Self {
            writer,
            path,
            rows: 0,
        })
    }

    /// Timestamped destination under `dir`, e.g. `logs/blackbox_log_1700000000.csv`.
    pub fn create_in_dir(dir: impl AsRef<Path>) -> io::Result<Self> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self::create(dir.as_ref().join(format!("blackbox_log_{stamp}.csv")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Appends one record and flushes it to disk before returning.
    pub fn append(&mut self, sample: &TelemetrySample) -> io::Result<()> {
        write!(self.writer, "{:.4}", sample.elapsed_secs)?;
        for value in sample.channel_values() {
            write!(self.writer, ",{value:.6}")?;
        }
        writeln!(self.writer)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample() -> TelemetrySample {
        TelemetrySample {
            elapsed_secs: 0.5,
            raw: [1.0, 2.0, 3.0, 0.1, 0.2, 0.3],
            derived: [5.0, 0.25],
        }
    }

    #[test]
    fn header_is_written_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        SampleLogWriter::create(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().next(),
            Some("Time,AccX,AccY,AccZ,GyroX,GyroY,GyroZ,AccMag,GyroMag")
        );
    }

    #[test]
    fn rows_are_durable_before_append_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut writer = SampleLogWriter::create(&path).unwrap();
        writer.append(&sample()).unwrap();
        // Read back while the writer is still alive: no drop, no finish.
        let content = fs::read_to_string(&path).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "0.5000,1.000000,2.000000,3.000000,0.100000,0.200000,0.300000,5.000000,0.250000"
        );
        assert_eq!(writer.rows_written(), 1);
    }

    #[test]
    fn missing_parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/log.csv");
        SampleLogWriter::create(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn timestamped_default_lands_in_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SampleLogWriter::create_in_dir(dir.path()).unwrap();
        let name = writer.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("blackbox_log_"));
        assert!(name.ends_with(".csv"));
        assert!(writer.path().exists());
    }
}
