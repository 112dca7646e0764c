//! CLI Exit Codes
//!
//! Standard exit codes for CI automation.

use crate::core::digest::DigestError;
use crate::core::expect::ExpectError;
use crate::core::runner::HarnessError;
use crate::core::transport::TransportError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Connection or launch failed
    pub const CONNECTION_FAILED: u8 = 3;

    /// Expectation timeout
    pub const TIMEOUT: u8 = 4;

    /// File not found
    pub const FILE_NOT_FOUND: u8 = 6;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 7;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// Port not found
    pub const PORT_NOT_FOUND: u8 = 14;

    /// Expected console pattern not found
    pub const PATTERN_NOT_FOUND: u8 = 16;

    /// Digest verification failed
    pub const VALIDATION_FAILED: u8 = 17;

    /// Internal error
    pub const INTERNAL_ERROR: u8 = 127;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    pub fn success() -> Self {
        Self::Success(None)
    }

    pub fn success_with_message(msg: impl Into<String>) -> Self {
        Self::Success(Some(msg.into()))
    }

    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) => Some(msg),
            Self::Error(_, msg) => Some(msg),
            _ => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<std::io::Error> for CliResult {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let code = match err.kind() {
            ErrorKind::NotFound => ExitCodes::FILE_NOT_FOUND,
            ErrorKind::PermissionDenied => ExitCodes::PERMISSION_DENIED,
            ErrorKind::ConnectionRefused => ExitCodes::CONNECTION_FAILED,
            ErrorKind::TimedOut => ExitCodes::TIMEOUT,
            _ => ExitCodes::ERROR,
        };

        Self::Error(code, err.to_string())
    }
}

impl From<TransportError> for CliResult {
    fn from(err: TransportError) -> Self {
        let code = match &err {
            TransportError::PortNotFound(_) => ExitCodes::PORT_NOT_FOUND,
            TransportError::PermissionDenied(_) => ExitCodes::PERMISSION_DENIED,
            TransportError::Timeout(_) => ExitCodes::TIMEOUT,
            TransportError::ConnectionFailed(_) | TransportError::SpawnFailed(_, _) => {
                ExitCodes::CONNECTION_FAILED
            }
            _ => ExitCodes::ERROR,
        };

        Self::Error(code, err.to_string())
    }
}

impl From<ExpectError> for CliResult {
    fn from(err: ExpectError) -> Self {
        let code = match &err {
            ExpectError::Timeout { .. } => ExitCodes::TIMEOUT,
            ExpectError::StreamClosed(_) => ExitCodes::PATTERN_NOT_FOUND,
            ExpectError::InvalidPattern(_) => ExitCodes::INVALID_ARGS,
        };

        Self::Error(code, err.to_string())
    }
}

impl From<DigestError> for CliResult {
    fn from(err: DigestError) -> Self {
        let code = match &err {
            DigestError::Mismatch { .. } => ExitCodes::VALIDATION_FAILED,
            DigestError::Io(_) => ExitCodes::FILE_NOT_FOUND,
        };

        Self::Error(code, err.to_string())
    }
}

impl From<HarnessError> for CliResult {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::Expect(e) => e.into(),
            HarnessError::Digest(e) => e.into(),
        }
    }
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        3 => "Connection or launch failed",
        4 => "Expectation timeout",
        6 => "File not found",
        7 => "Permission denied",
        8 => "Configuration error",
        14 => "Port not found",
        16 => "Pattern not found",
        17 => "Digest verification failed",
        127 => "Internal error",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);

        let error = CliResult::error(3, "Connection failed");
        assert!(!error.is_success());
        assert_eq!(error.code(), 3);
        assert_eq!(error.message(), Some("Connection failed"));
    }

    #[test]
    fn test_from_io_error() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let result = CliResult::from(err);
        assert_eq!(result.code(), ExitCodes::FILE_NOT_FOUND);
    }

    #[test]
    fn test_digest_mismatch_maps_to_validation_failed() {
        let err = DigestError::Mismatch {
            expected: "aa".to_string(),
            reported: "bb".to_string(),
        };
        let result = CliResult::from(err);
        assert_eq!(result.code(), ExitCodes::VALIDATION_FAILED);
    }

    #[test]
    fn test_timeout_maps_to_timeout_code() {
        let err = ExpectError::Timeout {
            pattern: "text \"Hello\"".to_string(),
            waited: std::time::Duration::from_secs(30),
            tail: String::new(),
        };
        let result = CliResult::from(err);
        assert_eq!(result.code(), ExitCodes::TIMEOUT);
    }
}
