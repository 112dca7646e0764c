//! CLI Module
//!
//! Exit codes for CI automation.

pub mod exit_codes;

pub use exit_codes::{exit_code_description, CliResult, ExitCodes};
