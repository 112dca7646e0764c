//! Core module containing the main functionality of Bootprobe
//!
//! This module provides:
//! - Transport layer for DUT consoles (serial, child process, TCP)
//! - DUT session management with expectation matching
//! - ELF digest verification
//! - Console capture
//! - Test selection metadata
//! - Smoke check flows
//! - Virtual DUT simulation

pub mod app;
pub mod console_log;
pub mod digest;
pub mod dut;
pub mod expect;
pub mod marks;
pub mod runner;
pub mod simulator;
pub mod transport;
