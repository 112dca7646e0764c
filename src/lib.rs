//! # Bootprobe Core Library
//!
//! A firmware boot verification harness with support for:
//! - Serial-attached hardware
//! - Host process builds
//! - QEMU emulator consoles (direct process or TCP serial)
//!
//! ## Features
//!
//! - Expectation matching over live console streams
//! - ELF SHA-256 digest verification against the firmware's boot report
//! - Minimum-free-heap metric capture
//! - Declarative test selection metadata
//! - Scripted virtual DUTs for dry runs and self-tests
//! - Console capture with timestamps
//! - CLI with CI-friendly exit codes
//!
//! ## Example
//!
//! ```rust,no_run
//! use bootprobe_core::{Dut, DutConfig, ProcessConfig, Transport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ProcessConfig::new("build/hello_world.elf");
//!     let dut = Dut::launch(Transport::Process(config), DutConfig::new("hello")).await?;
//!
//!     dut.expect("Hello world!").await?;
//!
//!     dut.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::HarnessConfig;
pub use crate::core::app::App;
pub use crate::core::console_log::{ConsoleLog, ConsoleRecord, Direction};
pub use crate::core::digest::{sha256_hex, sha256_hex_bytes, verify_elf_sha256, DigestError};
pub use crate::core::dut::{Dut, DutConfig, DutEvent, DutState};
pub use crate::core::expect::{ExpectError, ExpectMatch, ExpectPattern};
pub use crate::core::marks::{CaseMeta, CaseRegistry, Env, Selection, Target};
pub use crate::core::runner::{BootReport, HarnessError};
pub use crate::core::simulator::{BootScript, SimulatedDut};
pub use crate::core::transport::{
    ProcessConfig, SerialConfig, SerialFlowControl, SerialParity, TcpConfig, Transport,
    TransportType,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
