//! Hello-world smoke suite
//!
//! The registered smoke cases run here against a scripted virtual DUT, so
//! the suite exercises the same flows the CLI drives on real targets.

use bootprobe_core::core::runner;
use bootprobe_core::{
    App, BootScript, CaseRegistry, DigestError, Dut, DutConfig, Env, ExpectError, HarnessError,
    Selection, SimulatedDut, Target,
};
use std::io::Write;
use std::time::Duration;

fn fake_elf(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

async fn launch(script: BootScript, name: &str) -> Dut {
    Dut::launch_with_transport(
        Box::new(SimulatedDut::new(script)),
        DutConfig::new(name).expect_timeout(Duration::from_secs(5)),
    )
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hello_world() {
    let elf = fake_elf(b"generic build");
    let digest = bootprobe_core::sha256_hex(elf.path()).unwrap();

    let dut = launch(BootScript::hello_world(&digest), "hello_world").await;

    dut.expect("Hello world!").await.unwrap();
    let heap = dut.log_minimum_free_heap_size().await.unwrap();
    assert!(heap > 0);

    dut.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hello_world_linux() {
    // Host builds print the banner without the bootloader preamble
    let script = BootScript::new().line("Hello world!");
    let dut = launch(script, "hello_world_linux").await;

    dut.expect("Hello world!").await.unwrap();

    dut.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hello_world_macos() {
    let script = BootScript::new().line("Hello world!");
    let dut = launch(script, "hello_world_macos").await;

    dut.expect("Hello world!").await.unwrap();

    dut.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hello_world_host() {
    let elf = fake_elf(b"qemu build");
    let digest = bootprobe_core::sha256_hex(elf.path()).unwrap();

    let dut = launch(BootScript::hello_world(&digest), "hello_world_host").await;
    let app = App::new(elf.path(), Target::Esp32);

    let report = runner::hello_world_qemu(&dut, &app).await.unwrap();
    assert_eq!(report.sha256_reported.as_deref(), Some(&digest[..16]));

    dut.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hello_world_host_stale_artifact_fails() {
    let elf = fake_elf(b"build on disk");
    let stale_digest = bootprobe_core::sha256_hex_bytes(b"stale build in flash");

    let dut = launch(BootScript::hello_world(&stale_digest), "hello_world_host").await;
    let app = App::new(elf.path(), Target::Esp32);

    let err = runner::hello_world_qemu(&dut, &app).await.unwrap_err();
    match err {
        HarnessError::Digest(DigestError::Mismatch { expected, reported }) => {
            assert!(expected.starts_with(&bootprobe_core::sha256_hex(elf.path()).unwrap()[..8]));
            assert_eq!(reported, &stale_digest[..16]);
        }
        other => panic!("unexpected error: {other}"),
    }

    dut.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_banner_times_out() {
    // A console that never prints the banner fails the case with a timeout
    let script = BootScript::new().line("bootloader only, app never starts");
    let dut = Dut::launch_with_transport(
        Box::new(SimulatedDut::new(script)),
        DutConfig::new("silent").expect_timeout(Duration::from_millis(300)),
    )
    .await
    .unwrap();

    let err = dut.expect("Hello world!").await.unwrap_err();
    assert!(matches!(err, ExpectError::Timeout { .. }));

    dut.close().await.unwrap();
}

#[test]
fn test_suite_matches_registry() {
    // Every registered case has a test here
    let registry = CaseRegistry::builtin();
    for id in [
        "hello_world",
        "hello_world_linux",
        "hello_world_macos",
        "hello_world_host",
    ] {
        assert!(registry.get(id).is_some(), "case {id} not registered");
    }
}

#[test]
fn test_host_cases_select_for_linux() {
    let registry = CaseRegistry::builtin();
    let selection = Selection {
        env: Some(Env::LinuxHost),
        ..Default::default()
    };
    let ids: Vec<_> = registry.select(&selection).iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, ["hello_world_linux", "hello_world_macos"]);
}
