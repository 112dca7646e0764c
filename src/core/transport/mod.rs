//! Transport layer for DUT console streams
//!
//! Supports:
//! - Serial ports (devkits and production hardware)
//! - Child processes (Linux host builds, QEMU invocations)
//! - Raw TCP connections (QEMU `-serial tcp:` consoles)

mod process;
mod serial;
mod tcp;

pub use process::{ProcessConfig, ProcessTransport};
pub use serial::{list_ports, SerialConfig, SerialFlowControl, SerialParity, SerialTransport};
pub use tcp::{TcpConfig, TcpTransport};

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;

/// Transport type enumeration
#[derive(Debug, Clone)]
pub enum Transport {
    /// Serial port connection
    Serial(SerialConfig),
    /// Spawned child process
    Process(ProcessConfig),
    /// Raw TCP connection
    Tcp(TcpConfig),
}

/// Transport type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// Serial port
    Serial,
    /// Child process
    Process,
    /// Raw TCP
    Tcp,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "Serial"),
            Self::Process => write!(f, "Process"),
            Self::Tcp => write!(f, "TCP"),
        }
    }
}

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection timeout
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Spawn failed
    #[error("Failed to spawn {0}: {1}")]
    SpawnFailed(String, String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// Disconnected
    #[error("Disconnected")]
    Disconnected,

    /// Send error
    #[error("Send error: {0}")]
    SendError(String),
}

/// Transport statistics
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    /// Bytes sent
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
    /// Connection uptime in seconds
    pub uptime_secs: u64,
}

/// Transport trait for all console stream types
#[async_trait]
pub trait TransportTrait: Send + Sync {
    /// Connect to the target
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Disconnect from the target
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send data
    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Receive data (non-blocking, returns immediately with available data)
    async fn receive(&mut self) -> Result<Bytes, TransportError>;

    /// Get transport type
    fn transport_type(&self) -> TransportType;

    /// Get connection info string
    fn connection_info(&self) -> String;

    /// Get statistics
    fn stats(&self) -> TransportStats;

    /// Subscribe to data events
    fn subscribe(&self) -> broadcast::Receiver<Bytes>;
}

/// Create a transport instance from configuration
pub fn create_transport(config: Transport) -> Result<Box<dyn TransportTrait>, TransportError> {
    match config {
        Transport::Serial(cfg) => {
            let transport = SerialTransport::new(cfg)?;
            Ok(Box::new(transport))
        }
        Transport::Process(cfg) => {
            let transport = ProcessTransport::new(cfg);
            Ok(Box::new(transport))
        }
        Transport::Tcp(cfg) => {
            let transport = TcpTransport::new(cfg);
            Ok(Box::new(transport))
        }
    }
}
