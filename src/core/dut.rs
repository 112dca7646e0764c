//! DUT session management
//!
//! A `Dut` represents one launched device under test: a transport feeding a
//! background receive loop, a rolling console buffer for expectation
//! matching, and an optional console capture file. One session per test
//! case; nothing is shared between cases.

use crate::core::console_log::ConsoleLog;
use crate::core::expect::{self, ExpectError, ExpectMatch, ExpectPattern};
use crate::core::transport::{create_transport, Transport, TransportError, TransportTrait};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// Cap on the rolling console buffer
const BUFFER_LIMIT: usize = 65536;
/// Buffer size kept after a trim
const BUFFER_KEEP: usize = 32768;

/// DUT session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutState {
    /// Not launched
    Idle,
    /// Launch in progress
    Launching,
    /// Console live
    Running,
    /// Console closed
    Closed,
    /// Transport error occurred
    Error,
}

/// DUT session events
#[derive(Debug, Clone)]
pub enum DutEvent {
    /// Console data received
    DataReceived(Bytes),
    /// Data sent to the DUT
    DataSent(Bytes),
    /// State changed
    StateChanged(DutState),
    /// Error occurred
    Error(String),
}

/// DUT session configuration
#[derive(Debug, Clone)]
pub struct DutConfig {
    /// Session name (for logs and capture filenames)
    pub name: String,
    /// Default deadline for expectations
    pub expect_timeout: Duration,
    /// Console capture file (none = no capture)
    pub log_path: Option<PathBuf>,
}

impl DutConfig {
    /// Create a session configuration
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            expect_timeout: Duration::from_secs(30),
            log_path: None,
        }
    }

    /// Set the default expectation deadline
    #[must_use]
    pub fn expect_timeout(mut self, timeout: Duration) -> Self {
        self.expect_timeout = timeout;
        self
    }

    /// Capture the console to a file
    #[must_use]
    pub fn log_path(mut self, path: PathBuf) -> Self {
        self.log_path = Some(path);
        self
    }
}

/// Internal commands for session control
enum DutCommand {
    Write(Bytes),
    Close,
}

/// Active DUT session
pub struct Dut {
    id: Uuid,
    name: String,
    state: Arc<RwLock<DutState>>,
    event_tx: broadcast::Sender<DutEvent>,
    cmd_tx: mpsc::Sender<DutCommand>,
    buffer: Arc<RwLock<Vec<u8>>>,
    console_log: Arc<Mutex<ConsoleLog>>,
    expect_timeout: Duration,
}

impl Dut {
    /// Launch a DUT from a transport configuration
    pub async fn launch(transport: Transport, config: DutConfig) -> Result<Self, TransportError> {
        let transport = create_transport(transport)?;
        Self::launch_with_transport(transport, config).await
    }

    /// Launch a DUT over an already-built transport (used for simulated
    /// devices and custom consoles)
    pub async fn launch_with_transport(
        mut transport: Box<dyn TransportTrait>,
        config: DutConfig,
    ) -> Result<Self, TransportError> {
        let id = Uuid::new_v4();
        let state = Arc::new(RwLock::new(DutState::Launching));
        let (event_tx, _) = broadcast::channel(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(256);

        transport.connect().await?;
        tracing::info!(dut = %config.name, info = %transport.connection_info(), "DUT console up");

        *state.write() = DutState::Running;
        let _ = event_tx.send(DutEvent::StateChanged(DutState::Running));

        let mut console_log = ConsoleLog::new();
        if let Some(ref path) = config.log_path {
            console_log.start(path.clone()).map_err(TransportError::IoError)?;
        }
        let console_log = Arc::new(Mutex::new(console_log));

        let transport = Arc::new(tokio::sync::Mutex::new(transport));
        let buffer = Arc::new(RwLock::new(Vec::with_capacity(8192)));

        let dut = Self {
            id,
            name: config.name,
            state: state.clone(),
            event_tx: event_tx.clone(),
            cmd_tx,
            buffer: buffer.clone(),
            console_log: console_log.clone(),
            expect_timeout: config.expect_timeout,
        };

        // Spawn receive loop
        let rx_state = state.clone();
        let rx_transport = transport.clone();
        let rx_event_tx = event_tx.clone();
        let rx_buffer = buffer;
        let rx_console_log = console_log.clone();

        tokio::spawn(async move {
            loop {
                if *rx_state.read() != DutState::Running {
                    break;
                }

                let received = {
                    let mut transport = rx_transport.lock().await;
                    transport.receive().await
                };

                match received {
                    Ok(bytes) if !bytes.is_empty() => {
                        {
                            let mut buffer = rx_buffer.write();
                            buffer.extend_from_slice(&bytes);

                            if buffer.len() > BUFFER_LIMIT {
                                let drain_len = buffer.len() - BUFFER_KEEP;
                                buffer.drain(0..drain_len);
                            }
                        }

                        rx_console_log.lock().log_rx(&bytes);
                        let _ = rx_event_tx.send(DutEvent::DataReceived(bytes));
                    }
                    Ok(_) => {
                        // No data, continue
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                    Err(TransportError::Disconnected) => {
                        *rx_state.write() = DutState::Closed;
                        let _ = rx_event_tx.send(DutEvent::StateChanged(DutState::Closed));
                        break;
                    }
                    Err(e) => {
                        *rx_state.write() = DutState::Error;
                        let _ = rx_event_tx.send(DutEvent::Error(e.to_string()));
                        break;
                    }
                }
            }

            rx_console_log.lock().flush();
        });

        // Spawn command handler
        let cmd_state = state;
        let cmd_transport = transport;
        let cmd_event_tx = event_tx;

        tokio::spawn(async move {
            let mut cmd_rx = cmd_rx;
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    DutCommand::Write(data) => {
                        let mut transport = cmd_transport.lock().await;
                        match transport.send(&data).await {
                            Ok(_) => {
                                console_log.lock().log_tx(&data);
                                let _ = cmd_event_tx.send(DutEvent::DataSent(data));
                            }
                            Err(e) => {
                                let _ = cmd_event_tx.send(DutEvent::Error(e.to_string()));
                            }
                        }
                    }
                    DutCommand::Close => {
                        let mut transport = cmd_transport.lock().await;
                        let _ = transport.disconnect().await;
                        *cmd_state.write() = DutState::Closed;
                        let _ = cmd_event_tx.send(DutEvent::StateChanged(DutState::Closed));
                        break;
                    }
                }
            }
        });

        Ok(dut)
    }

    /// Get session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get session name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current state
    pub fn state(&self) -> DutState {
        *self.state.read()
    }

    /// Check if the console is live
    pub fn is_running(&self) -> bool {
        *self.state.read() == DutState::Running
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<DutEvent> {
        self.event_tx.subscribe()
    }

    /// Wait for a pattern on the console, using the session's default
    /// deadline.
    ///
    /// A match consumes the console buffer through the end of the matched
    /// region, so sequential expectations observe the stream in order.
    pub async fn expect(
        &self,
        pattern: impl Into<ExpectPattern>,
    ) -> Result<ExpectMatch, ExpectError> {
        let pattern = pattern.into();
        self.expect_with_timeout(pattern, self.expect_timeout).await
    }

    /// Wait for exact text on the console
    pub async fn expect_exact(&self, text: &str) -> Result<ExpectMatch, ExpectError> {
        self.expect(ExpectPattern::Text(text.to_string())).await
    }

    /// Wait for a pattern with an explicit deadline
    pub async fn expect_with_timeout(
        &self,
        pattern: ExpectPattern,
        timeout: Duration,
    ) -> Result<ExpectMatch, ExpectError> {
        let started = Instant::now();
        // Subscribe before the first scan so data arriving in between is not
        // missed.
        let mut events = self.event_tx.subscribe();

        loop {
            if let Some(found) = self.scan_and_consume(&pattern)? {
                tracing::debug!(dut = %self.name, matched = %found.matched, "expect matched");
                return Ok(found);
            }

            if self.state() != DutState::Running {
                return Err(ExpectError::StreamClosed(pattern.describe()));
            }

            let remaining = timeout
                .checked_sub(started.elapsed())
                .ok_or_else(|| self.timeout_error(&pattern, started))?;

            match tokio::time::timeout(remaining, events.recv()).await {
                Err(_) => return Err(self.timeout_error(&pattern, started)),
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    // Final scan in case the match landed with the last chunk
                    if let Some(found) = self.scan_and_consume(&pattern)? {
                        return Ok(found);
                    }
                    return Err(ExpectError::StreamClosed(pattern.describe()));
                }
                Ok(Err(broadcast::error::RecvError::Lagged(_))) | Ok(Ok(_)) => {
                    // Buffer re-scanned at the top of the loop
                }
            }
        }
    }

    fn scan_and_consume(&self, pattern: &ExpectPattern) -> Result<Option<ExpectMatch>, ExpectError> {
        let mut buffer = self.buffer.write();
        match expect::scan(&buffer, pattern)? {
            Some((found, consumed)) => {
                // Offsets come from a lossy UTF-8 view, which can run past
                // the raw buffer when invalid bytes were replaced
                let consumed = consumed.min(buffer.len());
                buffer.drain(0..consumed);
                Ok(Some(found))
            }
            None => Ok(None),
        }
    }

    fn timeout_error(&self, pattern: &ExpectPattern, started: Instant) -> ExpectError {
        ExpectError::Timeout {
            pattern: pattern.describe(),
            waited: started.elapsed(),
            tail: expect::tail_of(&self.buffer.read()),
        }
    }

    /// Record the firmware's minimum-free-heap report as a diagnostic
    /// metric. Expects the standard `Minimum free heap size: <n> bytes`
    /// console line.
    pub async fn log_minimum_free_heap_size(&self) -> Result<u64, ExpectError> {
        let found = self
            .expect(ExpectPattern::Regex(
                r"Minimum free heap size: (\d+) bytes".to_string(),
            ))
            .await?;

        // The capture is all digits; parse can only fail on overflow
        let heap: u64 = found
            .group(1)
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| ExpectError::InvalidPattern("heap size out of range".to_string()))?;

        tracing::info!(dut = %self.name, min_free_heap = heap, "Minimum free heap size: {} bytes", heap);
        self.console_log
            .lock()
            .log_info(&format!("minimum free heap: {heap} bytes"));

        Ok(heap)
    }

    /// Send console input to the DUT
    pub async fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        if !self.is_running() {
            return Err(TransportError::Disconnected);
        }

        self.cmd_tx
            .send(DutCommand::Write(Bytes::copy_from_slice(data)))
            .await
            .map_err(|e| TransportError::SendError(e.to_string()))?;

        Ok(())
    }

    /// Close the session
    pub async fn close(&self) -> Result<(), TransportError> {
        self.cmd_tx
            .send(DutCommand::Close)
            .await
            .map_err(|e| TransportError::SendError(e.to_string()))?;
        Ok(())
    }

    /// Clear the console buffer
    pub fn clear_buffer(&self) {
        self.buffer.write().clear();
    }
}
