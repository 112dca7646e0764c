//! Child process transport implementation
//!
//! Runs a firmware build as a local child process (a Linux host build, or a
//! QEMU invocation) with stdout captured as the console and stdin as console
//! input. The child is killed on disconnect and on drop.

use super::{TransportError, TransportStats, TransportTrait, TransportType};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::broadcast;

/// Poll interval for the non-blocking receive contract
const READ_POLL: Duration = Duration::from_millis(10);

/// Child process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Program to run
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory (defaults to the current directory)
    pub cwd: Option<String>,
    /// Merge stderr into the console stream
    pub capture_stderr: bool,
}

impl ProcessConfig {
    /// Create a new process configuration
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: None,
            capture_stderr: true,
        }
    }

    /// Add arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set working directory
    #[must_use]
    pub fn cwd(mut self, dir: &str) -> Self {
        self.cwd = Some(dir.to_string());
        self
    }

    /// Set stderr capture
    #[must_use]
    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }
}

/// Child process transport
pub struct ProcessTransport {
    config: ProcessConfig,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    stdin: Option<ChildStdin>,
    stats: Arc<RwLock<TransportStats>>,
    connected_at: Option<Instant>,
    tx: broadcast::Sender<Bytes>,
}

impl ProcessTransport {
    /// Create a new process transport
    pub fn new(config: ProcessConfig) -> Self {
        let (tx, _) = broadcast::channel(1024);

        Self {
            config,
            child: None,
            stdout: None,
            stderr: None,
            stdin: None,
            stats: Arc::new(RwLock::new(TransportStats::default())),
            connected_at: None,
            tx,
        }
    }

    fn record_received(&self, buffer: Vec<u8>) -> Bytes {
        let bytes = Bytes::from(buffer);

        let mut stats = self.stats.write();
        stats.bytes_received += bytes.len() as u64;
        drop(stats);

        let _ = self.tx.send(bytes.clone());
        bytes
    }
}

#[async_trait]
impl TransportTrait for ProcessTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut command = tokio::process::Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if self.config.capture_stderr {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        if let Some(ref dir) = self.config.cwd {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            TransportError::SpawnFailed(self.config.program.clone(), e.to_string())
        })?;

        self.stdout = child.stdout.take();
        self.stderr = child.stderr.take();
        self.stdin = child.stdin.take();
        self.child = Some(child);
        self.connected_at = Some(Instant::now());
        *self.stats.write() = TransportStats::default();

        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.stdin = None;
        self.stdout = None;
        self.stderr = None;
        if let Some(mut child) = self.child.take() {
            child.kill().await.ok();
        }
        self.connected_at = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.child.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let stdin = self.stdin.as_mut().ok_or(TransportError::Disconnected)?;

        stdin.write_all(data).await.map_err(TransportError::IoError)?;
        stdin.flush().await.map_err(TransportError::IoError)?;

        let mut stats = self.stats.write();
        stats.bytes_sent += data.len() as u64;

        Ok(data.len())
    }

    async fn receive(&mut self) -> Result<Bytes, TransportError> {
        if self.child.is_none() {
            return Err(TransportError::Disconnected);
        }

        let mut buffer = vec![0u8; 4096];

        // ChildStdout has no try_read; a short read deadline gives the same
        // non-blocking contract as the other transports.
        if let Some(stdout) = self.stdout.as_mut() {
            match tokio::time::timeout(READ_POLL, stdout.read(&mut buffer)).await {
                Err(_) => {}
                Ok(Ok(0)) => {
                    // stdout closed; drain any remaining stderr before
                    // reporting the stream gone
                    self.stdout = None;
                }
                Ok(Ok(n)) => {
                    buffer.truncate(n);
                    return Ok(self.record_received(buffer));
                }
                Ok(Err(e)) => return Err(TransportError::IoError(e)),
            }
        }

        if let Some(stderr) = self.stderr.as_mut() {
            match tokio::time::timeout(READ_POLL, stderr.read(&mut buffer)).await {
                Err(_) => {}
                Ok(Ok(0)) => self.stderr = None,
                Ok(Ok(n)) => {
                    buffer.truncate(n);
                    return Ok(self.record_received(buffer));
                }
                Ok(Err(e)) => return Err(TransportError::IoError(e)),
            }
        }

        if self.stdout.is_none() && self.stderr.is_none() {
            return Err(TransportError::Disconnected);
        }

        Ok(Bytes::new())
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Process
    }

    fn connection_info(&self) -> String {
        if self.config.args.is_empty() {
            self.config.program.clone()
        } else {
            format!("{} {}", self.config.program, self.config.args.join(" "))
        }
    }

    fn stats(&self) -> TransportStats {
        let mut stats = self.stats.read().clone();
        if let Some(connected_at) = self.connected_at {
            stats.uptime_secs = connected_at.elapsed().as_secs();
        }
        stats
    }

    fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_failure() {
        let mut transport = ProcessTransport::new(ProcessConfig::new("/nonexistent/firmware"));
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::SpawnFailed(_, _)));
    }

    #[tokio::test]
    async fn test_process_console_output() {
        let config = ProcessConfig::new("sh").args(["-c", "printf 'Hello world!\\n'"]);
        let mut transport = ProcessTransport::new(config);
        transport.connect().await.unwrap();

        let mut collected = Vec::new();
        for _ in 0..500 {
            match transport.receive().await {
                Ok(bytes) => collected.extend_from_slice(&bytes),
                Err(TransportError::Disconnected) => break,
                Err(e) => panic!("receive failed: {e}"),
            }
            if String::from_utf8_lossy(&collected).contains("Hello world!") {
                break;
            }
        }

        assert!(String::from_utf8_lossy(&collected).contains("Hello world!"));
        transport.disconnect().await.unwrap();
    }

    #[test]
    fn test_connection_info() {
        let config = ProcessConfig::new("qemu-system-xtensa").args(["-nographic"]);
        let transport = ProcessTransport::new(config);
        assert_eq!(transport.connection_info(), "qemu-system-xtensa -nographic");
    }
}
