//! ELF artifact digest verification
//!
//! Firmware built with the second-stage bootloader embeds the SHA-256 of its
//! own ELF file and prints the leading hex characters at boot. Comparing that
//! report against the artifact on disk catches stale or mismatched builds
//! before a test run trusts the console output.

use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

/// Length of a SHA-256 digest rendered as lowercase hex
pub const SHA256_HEX_LEN: usize = 64;

/// Digest verification errors
#[derive(Error, Debug)]
pub enum DigestError {
    /// Reported prefix does not match the artifact digest
    #[error("ELF file SHA256 mismatch: expected {expected}, reported {reported}")]
    Mismatch {
        /// Full digest computed from the artifact
        expected: String,
        /// Prefix reported by the running firmware
        reported: String,
    },

    /// Artifact could not be read
    #[error("Failed to read ELF file: {0}")]
    Io(#[from] std::io::Error),
}

/// Compute the SHA-256 of a file and return it as lowercase hex.
pub fn sha256_hex(path: &Path) -> Result<String, DigestError> {
    let bytes = std::fs::read(path)?;
    Ok(sha256_hex_bytes(&bytes))
}

/// SHA-256 of a byte slice as lowercase hex.
pub fn sha256_hex_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Verify that the digest prefix reported by a running firmware matches the
/// ELF artifact it was built from.
///
/// The firmware only has room to print the first several hex characters, so
/// this is a prefix comparison, not full-digest equality. The comparison is
/// exact and case-sensitive; the computed digest is lowercase hex.
pub fn verify_elf_sha256(elf_file: &Path, reported: &str) -> Result<(), DigestError> {
    let expected = sha256_hex(elf_file)?;

    tracing::info!(elf = %elf_file.display(), "ELF file SHA256: {}", expected);
    tracing::info!("ELF file SHA256 (reported by the app): {}", reported);

    if !expected.starts_with(reported) {
        return Err(DigestError::Mismatch {
            expected,
            reported: reported.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // sha256("hello")
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn write_artifact(data: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_sha256_hex_bytes() {
        assert_eq!(sha256_hex_bytes(b"hello"), HELLO_SHA256);
    }

    #[test]
    fn test_verify_full_digest() {
        let file = write_artifact(b"hello");
        assert!(verify_elf_sha256(file.path(), HELLO_SHA256).is_ok());
    }

    #[test]
    fn test_verify_every_prefix_length() {
        let file = write_artifact(b"hello");
        for k in 0..=SHA256_HEX_LEN {
            assert!(
                verify_elf_sha256(file.path(), &HELLO_SHA256[..k]).is_ok(),
                "prefix of length {} should match",
                k
            );
        }
    }

    #[test]
    fn test_verify_empty_prefix_trivially_succeeds() {
        let file = write_artifact(b"hello");
        assert!(verify_elf_sha256(file.path(), "").is_ok());
    }

    #[test]
    fn test_verify_mismatch() {
        let file = write_artifact(b"hello");
        let err = verify_elf_sha256(file.path(), "ffffffff").unwrap_err();
        match err {
            DigestError::Mismatch { expected, reported } => {
                assert_eq!(expected, HELLO_SHA256);
                assert_eq!(reported, "ffffffff");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mismatch_message_names_both_digests() {
        let file = write_artifact(b"hello");
        let err = verify_elf_sha256(file.path(), "ffffffff").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(HELLO_SHA256));
        assert!(msg.contains("ffffffff"));
    }

    #[test]
    fn test_verify_is_case_sensitive() {
        let file = write_artifact(b"hello");
        let upper = HELLO_SHA256[..8].to_uppercase();
        assert!(verify_elf_sha256(file.path(), &upper).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = verify_elf_sha256(Path::new("/nonexistent/app.elf"), "2cf2").unwrap_err();
        assert!(matches!(err, DigestError::Io(_)));
    }
}
