//! Configuration module
//!
//! Handles harness settings loaded from the platform config directory.

mod settings;

pub use settings::{HarnessConfig, QemuSettings};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the harness configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("io", "bootprobe", "Bootprobe")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the harness data directory
pub fn data_dir() -> Option<PathBuf> {
    ProjectDirs::from("io", "bootprobe", "Bootprobe")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the console capture directory
pub fn log_dir() -> Option<PathBuf> {
    data_dir().map(|d| d.join("logs"))
}

/// Initialize harness directories
pub fn init_directories() -> std::io::Result<()> {
    if let Some(dir) = config_dir() {
        std::fs::create_dir_all(&dir)?;
    }
    if let Some(dir) = log_dir() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(())
}
