//! Bootprobe - Firmware boot verification harness
//!
//! Launches a firmware build on hardware, as a host process, or under QEMU,
//! checks the boot console for expected output, and verifies the ELF digest
//! the firmware reports.

use bootprobe_core::core::runner;
use bootprobe_core::core::transport::list_ports;
use bootprobe_core::{
    App, CaseRegistry, CliResult, Dut, DutConfig, Env, ExitCodes, HarnessConfig, ProcessConfig,
    Selection, SerialConfig, Target, TcpConfig, Transport,
};
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// CLI output format
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format for scripting
    Json,
}

/// Bootprobe CLI
#[derive(Parser, Debug)]
#[command(
    name = "bootprobe",
    author = "Bootprobe Team",
    version,
    about = "Firmware boot verification harness",
    long_about = None
)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hello-world smoke test on serial-attached hardware
    Serial {
        /// Serial port name (e.g., /dev/ttyUSB0, COM3)
        #[arg(short, long)]
        port: String,

        /// Baud rate
        #[arg(short, long)]
        baud: Option<u32>,

        /// Expectation timeout (seconds)
        #[arg(long)]
        timeout: Option<u64>,

        /// Console capture file
        #[arg(short = 'l', long)]
        log: Option<PathBuf>,
    },

    /// Hello-world smoke test against a host build
    App {
        /// Host binary to run
        #[arg(short, long)]
        command: String,

        /// Arguments passed to the binary
        #[arg(last = true)]
        args: Vec<String>,

        /// Expectation timeout (seconds)
        #[arg(long)]
        timeout: Option<u64>,

        /// Console capture file
        #[arg(short = 'l', long)]
        log: Option<PathBuf>,
    },

    /// Boot under QEMU and verify the reported ELF digest
    Qemu {
        /// ELF file of the build under test
        #[arg(short, long)]
        elf: PathBuf,

        /// Flash image handed to the emulator
        #[arg(long)]
        flash_image: Option<PathBuf>,

        /// Emulator binary (default from config)
        #[arg(long)]
        qemu_bin: Option<String>,

        /// Emulated machine
        #[arg(long, default_value = "esp32")]
        machine: String,

        /// Connect to an already-running emulator serial console on this
        /// TCP port instead of spawning one
        #[arg(long)]
        tcp: Option<u16>,

        /// Expectation timeout (seconds)
        #[arg(long)]
        timeout: Option<u64>,

        /// Console capture file
        #[arg(short = 'l', long)]
        log: Option<PathBuf>,
    },

    /// Verify an ELF digest against a reported prefix, without a DUT
    Verify {
        /// ELF file of the build under test
        #[arg(short, long)]
        elf: PathBuf,

        /// Digest prefix reported by the firmware (lowercase hex)
        #[arg(short, long)]
        reported: String,
    },

    /// List registered smoke cases
    ListCases {
        /// Restrict to a chip target
        #[arg(short, long)]
        target: Option<Target>,

        /// Restrict to an execution environment
        #[arg(short, long)]
        env: Option<Env>,

        /// Require a mark
        #[arg(short, long)]
        mark: Option<String>,
    },

    /// List available serial ports
    ListPorts,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        tracing::Level::ERROR
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return ExitCode::from(ExitCodes::CONFIG_ERROR);
        }
    };

    let result = run(cli, &config).await;

    match result.message() {
        Some(msg) if result.is_success() => println!("{msg}"),
        Some(msg) => eprintln!("Error: {msg}"),
        None => {}
    }

    result.to_exit_code()
}

async fn run(cli: Cli, config: &HarnessConfig) -> CliResult {
    match cli.command {
        Commands::Serial {
            port,
            baud,
            timeout,
            log,
        } => {
            let serial = SerialConfig::new(&port, baud.unwrap_or(config.baud_rate));
            let dut_config = session_config("serial", config, timeout, log);

            let dut = match Dut::launch(Transport::Serial(serial), dut_config).await {
                Ok(dut) => dut,
                Err(e) => return e.into(),
            };

            let outcome = runner::hello_world(&dut).await;
            let _ = dut.close().await;

            match outcome {
                Ok(report) => CliResult::success_with_message(format!(
                    "hello_world passed (min free heap: {} bytes)",
                    report.min_free_heap.unwrap_or_default()
                )),
                Err(e) => e.into(),
            }
        }

        Commands::App {
            command,
            args,
            timeout,
            log,
        } => {
            let process = ProcessConfig::new(&command).args(args);
            let dut_config = session_config("host_app", config, timeout, log);

            let dut = match Dut::launch(Transport::Process(process), dut_config).await {
                Ok(dut) => dut,
                Err(e) => return e.into(),
            };

            let outcome = runner::hello_world_host_app(&dut).await;
            let _ = dut.close().await;

            match outcome {
                Ok(_) => CliResult::success_with_message("hello_world passed"),
                Err(e) => e.into(),
            }
        }

        Commands::Qemu {
            elf,
            flash_image,
            qemu_bin,
            machine,
            tcp,
            timeout,
            log,
        } => {
            let app = App::new(elf, Target::Esp32);
            if !app.exists() {
                return CliResult::error(
                    ExitCodes::FILE_NOT_FOUND,
                    format!("ELF file not found: {}", app.elf_file().display()),
                );
            }

            let transport = if let Some(port) = tcp {
                Transport::Tcp(TcpConfig::new("localhost", port))
            } else {
                let binary = qemu_bin.unwrap_or_else(|| config.qemu.binary.clone());
                let mut qemu_args = vec!["-nographic".to_string(), "-machine".to_string(), machine];
                if let Some(image) = flash_image {
                    qemu_args.push("-drive".to_string());
                    qemu_args.push(format!("file={},if=mtd,format=raw", image.display()));
                }
                qemu_args.extend(config.qemu.extra_args.iter().cloned());
                Transport::Process(ProcessConfig::new(&binary).args(qemu_args))
            };

            let dut_config = session_config("qemu", config, timeout, log);

            let dut = match Dut::launch(transport, dut_config).await {
                Ok(dut) => dut,
                Err(e) => return e.into(),
            };

            let outcome = runner::hello_world_qemu(&dut, &app).await;
            let _ = dut.close().await;

            match outcome {
                Ok(report) => CliResult::success_with_message(format!(
                    "hello_world_host passed (reported SHA256 prefix: {})",
                    report.sha256_reported.unwrap_or_default()
                )),
                Err(e) => e.into(),
            }
        }

        Commands::Verify { elf, reported } => {
            match bootprobe_core::verify_elf_sha256(&elf, &reported) {
                Ok(()) => CliResult::success_with_message("digest prefix matches"),
                Err(e) => e.into(),
            }
        }

        Commands::ListCases { target, env, mark } => {
            let registry = CaseRegistry::builtin();
            let selection = Selection { target, env, mark };
            let cases = registry.select(&selection);

            match cli.format {
                OutputFormat::Json => match serde_json::to_string_pretty(&cases) {
                    Ok(json) => CliResult::success_with_message(json),
                    Err(e) => CliResult::error(ExitCodes::INTERNAL_ERROR, e.to_string()),
                },
                OutputFormat::Text => {
                    let mut out = String::new();
                    for case in &cases {
                        let targets: Vec<_> = case.targets.iter().map(Target::as_str).collect();
                        let envs: Vec<_> = case.envs.iter().map(Env::as_str).collect();
                        let marks: Vec<_> = case.marks.iter().map(String::as_str).collect();
                        out.push_str(&format!(
                            "{}\n  targets: {}\n  envs: {}\n  marks: {}\n",
                            case.id,
                            join_or_dash(&targets),
                            join_or_dash(&envs),
                            join_or_dash(&marks),
                        ));
                    }
                    out.push_str(&format!("{} case(s)", cases.len()));
                    CliResult::success_with_message(out)
                }
            }
        }

        Commands::ListPorts => match list_ports() {
            Ok(ports) if ports.is_empty() => {
                CliResult::success_with_message("No serial ports found")
            }
            Ok(ports) => {
                let names: Vec<_> = ports.into_iter().map(|p| p.port_name).collect();
                CliResult::success_with_message(names.join("\n"))
            }
            Err(e) => e.into(),
        },
    }
}

fn load_config() -> anyhow::Result<HarnessConfig> {
    bootprobe_core::config::init_directories()
        .context("failed to create harness directories")?;
    HarnessConfig::load()
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .context("failed to load config.toml")
}

fn join_or_dash(items: &[&str]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn session_config(
    name: &str,
    config: &HarnessConfig,
    timeout: Option<u64>,
    log: Option<PathBuf>,
) -> DutConfig {
    let mut dut_config = DutConfig::new(name).expect_timeout(
        timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.expect_timeout()),
    );
    if let Some(path) = log {
        dut_config = dut_config.log_path(path);
    }
    dut_config
}
