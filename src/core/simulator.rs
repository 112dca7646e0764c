//! Virtual DUT simulator
//!
//! A scriptable mock device for testing and dry runs. The script is a fixed
//! sequence of console emissions with optional delays, which is all a boot
//! console needs; input from the harness is accepted and discarded.

use super::transport::{TransportError, TransportStats, TransportTrait, TransportType};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// One step of a boot script
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit a console line (newline appended)
    Line(String),
    /// Emit raw bytes as-is
    Raw(Vec<u8>),
    /// Pause before the next emission
    Delay(Duration),
}

/// Scripted boot console
#[derive(Debug, Clone, Default)]
pub struct BootScript {
    steps: Vec<ScriptStep>,
    /// Close the stream after the script runs out (otherwise stay open silent)
    close_at_end: bool,
}

impl BootScript {
    /// Create an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a console line
    #[must_use]
    pub fn line(mut self, text: &str) -> Self {
        self.steps.push(ScriptStep::Line(text.to_string()));
        self
    }

    /// Append raw bytes
    #[must_use]
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.steps.push(ScriptStep::Raw(bytes.to_vec()));
        self
    }

    /// Append a delay
    #[must_use]
    pub fn delay(mut self, duration: Duration) -> Self {
        self.steps.push(ScriptStep::Delay(duration));
        self
    }

    /// Close the stream once the script is exhausted
    #[must_use]
    pub fn close_at_end(mut self, close: bool) -> Self {
        self.close_at_end = close;
        self
    }

    /// Script steps
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// Boot banner of a hello-world firmware, as the second-stage bootloader
    /// and app print it. `sha256` is the full digest of the ELF; the banner
    /// reports its first 16 hex characters, which is what real bootloaders
    /// have room for.
    pub fn hello_world(sha256: &str) -> Self {
        let reported = &sha256[..sha256.len().min(16)];
        Self::new()
            .line("ESP-ROM:esp32-20160930")
            .line(&format!("ELF file SHA256:  {reported}"))
            .line("Hello world!")
            .line("This is esp32 chip with 2 CPU core(s), WiFi/BT/BLE")
            .line("4MB external flash")
            .line("Minimum free heap size: 304092 bytes")
            .line("Restarting in 10 seconds...")
    }
}

/// Transport that replays a [`BootScript`]
pub struct SimulatedDut {
    script: VecDeque<ScriptStep>,
    close_at_end: bool,
    connected: bool,
    stats: Arc<RwLock<TransportStats>>,
    tx: broadcast::Sender<Bytes>,
}

impl SimulatedDut {
    /// Create a simulated DUT from a script
    pub fn new(script: BootScript) -> Self {
        let (tx, _) = broadcast::channel(1024);

        Self {
            script: script.steps.into(),
            close_at_end: script.close_at_end,
            connected: false,
            stats: Arc::new(RwLock::new(TransportStats::default())),
            tx,
        }
    }
}

#[async_trait]
impl TransportTrait for SimulatedDut {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        *self.stats.write() = TransportStats::default();
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        // Input is accepted and discarded
        let mut stats = self.stats.write();
        stats.bytes_sent += data.len() as u64;
        Ok(data.len())
    }

    async fn receive(&mut self) -> Result<Bytes, TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }

        loop {
            match self.script.pop_front() {
                Some(ScriptStep::Line(text)) => {
                    let mut bytes = text.into_bytes();
                    bytes.extend_from_slice(b"\r\n");
                    let bytes = Bytes::from(bytes);

                    let mut stats = self.stats.write();
                    stats.bytes_received += bytes.len() as u64;
                    drop(stats);

                    let _ = self.tx.send(bytes.clone());
                    return Ok(bytes);
                }
                Some(ScriptStep::Raw(data)) => {
                    let bytes = Bytes::from(data);

                    let mut stats = self.stats.write();
                    stats.bytes_received += bytes.len() as u64;
                    drop(stats);

                    let _ = self.tx.send(bytes.clone());
                    return Ok(bytes);
                }
                Some(ScriptStep::Delay(duration)) => {
                    tokio::time::sleep(duration).await;
                }
                None => {
                    if self.close_at_end {
                        return Err(TransportError::Disconnected);
                    }
                    // Script exhausted; behave like a silent device
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    return Ok(Bytes::new());
                }
            }
        }
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Process
    }

    fn connection_info(&self) -> String {
        "simulated".to_string()
    }

    fn stats(&self) -> TransportStats {
        self.stats.read().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_replay_order() {
        let script = BootScript::new().line("first").line("second").close_at_end(true);
        let mut dut = SimulatedDut::new(script);
        dut.connect().await.unwrap();

        assert_eq!(&dut.receive().await.unwrap()[..], b"first\r\n");
        assert_eq!(&dut.receive().await.unwrap()[..], b"second\r\n");
        assert!(matches!(
            dut.receive().await,
            Err(TransportError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_silent_after_script() {
        let script = BootScript::new().line("only");
        let mut dut = SimulatedDut::new(script);
        dut.connect().await.unwrap();

        dut.receive().await.unwrap();
        assert!(dut.receive().await.unwrap().is_empty());
    }

    #[test]
    fn test_hello_world_script_reports_prefix() {
        let digest = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        let script = BootScript::hello_world(digest);
        let has_report = script.steps().iter().any(|s| {
            matches!(s, ScriptStep::Line(l) if l.contains("ELF file SHA256:  2cf24dba5fb0a30e"))
        });
        assert!(has_report);
    }
}
