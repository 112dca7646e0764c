//! DUT console capture
//!
//! Append-only, timestamped record of console traffic for a single session.
//! One file per DUT session; kept as plain text so CI artifacts are greppable.

use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Record direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From the DUT console
    Received,
    /// Harness input to the DUT
    Sent,
    /// Harness annotation
    Info,
}

impl Direction {
    fn tag(self) -> &'static str {
        match self {
            Self::Received => "RX",
            Self::Sent => "TX",
            Self::Info => "##",
        }
    }
}

/// A single console record
#[derive(Debug, Clone)]
pub struct ConsoleRecord {
    /// Capture time
    pub timestamp: DateTime<Local>,
    /// Record direction
    pub direction: Direction,
    /// Captured bytes
    pub data: Vec<u8>,
}

impl ConsoleRecord {
    /// Create a record stamped now
    pub fn new(direction: Direction, data: Vec<u8>) -> Self {
        Self {
            timestamp: Local::now(),
            direction,
            data,
        }
    }

    /// Format as a log line
    pub fn to_text(&self) -> String {
        format!(
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.direction.tag(),
            String::from_utf8_lossy(&self.data).trim_end_matches(['\r', '\n'])
        )
    }
}

/// Console capture writer
pub struct ConsoleLog {
    file: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    lines_logged: usize,
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLog {
    /// Create a capture that is not writing to disk yet
    pub fn new() -> Self {
        Self {
            file: None,
            path: None,
            lines_logged: 0,
        }
    }

    /// Start writing to a file
    pub fn start(&mut self, path: PathBuf) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        self.file = Some(BufWriter::new(file));
        self.path = Some(path);
        self.lines_logged = 0;

        Ok(())
    }

    /// Stop writing and flush
    pub fn stop(&mut self) {
        if let Some(ref mut file) = self.file {
            let _ = file.flush();
        }
        self.file = None;
    }

    /// Is capture active
    pub fn is_logging(&self) -> bool {
        self.file.is_some()
    }

    /// Capture file path
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Record console traffic
    pub fn log(&mut self, direction: Direction, data: &[u8]) {
        let Some(ref mut file) = self.file else {
            return;
        };

        let record = ConsoleRecord::new(direction, data.to_vec());
        let _ = writeln!(file, "{}", record.to_text());
        self.lines_logged += 1;

        // Flush periodically
        if self.lines_logged % 100 == 0 {
            let _ = file.flush();
        }
    }

    /// Record received data
    pub fn log_rx(&mut self, data: &[u8]) {
        self.log(Direction::Received, data);
    }

    /// Record sent data
    pub fn log_tx(&mut self, data: &[u8]) {
        self.log(Direction::Sent, data);
    }

    /// Record a harness annotation
    pub fn log_info(&mut self, message: &str) {
        self.log(Direction::Info, message.as_bytes());
    }

    /// Lines written so far
    pub fn lines_logged(&self) -> usize {
        self.lines_logged
    }

    /// Flush to disk
    pub fn flush(&mut self) {
        if let Some(ref mut file) = self.file {
            let _ = file.flush();
        }
    }
}

impl Drop for ConsoleLog {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Generate a capture filename with timestamp
pub fn generate_log_filename(prefix: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.txt", prefix, timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_text() {
        let record = ConsoleRecord::new(Direction::Received, b"Hello world!\r\n".to_vec());
        let text = record.to_text();
        assert!(text.contains("RX"));
        assert!(text.contains("Hello world!"));
        assert!(!text.ends_with('\r'));
    }

    #[test]
    fn test_capture_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");

        let mut log = ConsoleLog::new();
        log.start(path.clone()).unwrap();
        log.log_rx(b"Hello world!\n");
        log.log_info("boot check passed");
        log.stop();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("RX Hello world!"));
        assert!(content.contains("## boot check passed"));
    }

    #[test]
    fn test_inactive_capture_ignores_records() {
        let mut log = ConsoleLog::new();
        log.log_rx(b"dropped");
        assert_eq!(log.lines_logged(), 0);
    }

    #[test]
    fn test_filename_generation() {
        let name = generate_log_filename("dut");
        assert!(name.starts_with("dut_"));
        assert!(name.ends_with(".txt"));
    }
}
