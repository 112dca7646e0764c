//! Smoke check flows
//!
//! The boot checks themselves, expressed over a live [`Dut`] session. Both
//! the CLI runner and the test suite call these; each check is fatal on the
//! first failed expectation and never retries.

use crate::core::app::App;
use crate::core::digest::{verify_elf_sha256, DigestError};
use crate::core::dut::Dut;
use crate::core::expect::{ExpectError, ExpectPattern};
use thiserror::Error;

/// Console pattern the bootloader prints with the embedded ELF digest
const SHA256_REPORT: &str = r"ELF file SHA256:\s+([a-f0-9]+)";

/// Harness check errors
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Expected console output did not appear
    #[error(transparent)]
    Expect(#[from] ExpectError),

    /// ELF digest verification failed
    #[error(transparent)]
    Digest(#[from] DigestError),
}

/// Boot check result
#[derive(Debug, Clone, Default)]
pub struct BootReport {
    /// Digest prefix the firmware reported, when the flow captures one
    pub sha256_reported: Option<String>,
    /// Minimum free heap in bytes, when the flow records it
    pub min_free_heap: Option<u64>,
}

/// Hello-world smoke check on hardware: expect the banner, then record the
/// minimum free heap metric.
pub async fn hello_world(dut: &Dut) -> Result<BootReport, HarnessError> {
    dut.expect("Hello world!").await?;
    let heap = dut.log_minimum_free_heap_size().await?;

    Ok(BootReport {
        sha256_reported: None,
        min_free_heap: Some(heap),
    })
}

/// Hello-world smoke check on a host build: banner only. Host builds have no
/// heap metric worth recording.
pub async fn hello_world_host_app(dut: &Dut) -> Result<BootReport, HarnessError> {
    dut.expect("Hello world!").await?;
    Ok(BootReport::default())
}

/// Hello-world smoke check under QEMU: capture the digest prefix the
/// bootloader reports, verify it against the ELF on disk, then expect the
/// banner.
pub async fn hello_world_qemu(dut: &Dut, app: &App) -> Result<BootReport, HarnessError> {
    let found = dut
        .expect(ExpectPattern::Regex(SHA256_REPORT.to_string()))
        .await?;
    let reported = found
        .group(1)
        .unwrap_or_default()
        .to_string();

    verify_elf_sha256(app.elf_file(), &reported)?;

    dut.expect("Hello world!").await?;

    Ok(BootReport {
        sha256_reported: Some(reported),
        min_free_heap: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::digest::sha256_hex_bytes;
    use crate::core::dut::DutConfig;
    use crate::core::marks::Target;
    use crate::core::simulator::{BootScript, SimulatedDut};
    use std::io::Write;
    use std::time::Duration;

    async fn launch(script: BootScript) -> Dut {
        Dut::launch_with_transport(
            Box::new(SimulatedDut::new(script)),
            DutConfig::new("smoke").expect_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hello_world_flow() {
        let digest = sha256_hex_bytes(b"fake elf");
        let dut = launch(BootScript::hello_world(&digest)).await;

        let report = hello_world(&dut).await.unwrap();
        assert_eq!(report.min_free_heap, Some(304092));
        dut.close().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_qemu_flow_verifies_reported_digest() {
        let elf = {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(b"fake elf contents").unwrap();
            file.flush().unwrap();
            file
        };
        let digest = sha256_hex_bytes(b"fake elf contents");

        let dut = launch(BootScript::hello_world(&digest)).await;
        let app = App::new(elf.path(), Target::Esp32);

        let report = hello_world_qemu(&dut, &app).await.unwrap();
        assert_eq!(report.sha256_reported.as_deref(), Some(&digest[..16]));
        dut.close().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_qemu_flow_rejects_stale_artifact() {
        let elf = {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(b"the build on disk").unwrap();
            file.flush().unwrap();
            file
        };
        // Firmware reports a digest from a different build
        let other_digest = sha256_hex_bytes(b"some older build");

        let dut = launch(BootScript::hello_world(&other_digest)).await;
        let app = App::new(elf.path(), Target::Esp32);

        let err = hello_world_qemu(&dut, &app).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Digest(DigestError::Mismatch { .. })
        ));
        dut.close().await.unwrap();
    }
}
