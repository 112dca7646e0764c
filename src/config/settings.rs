//! Harness settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Default expectation deadline in seconds
    pub expect_timeout_secs: u64,
    /// Default serial baud rate
    pub baud_rate: u32,
    /// Console capture directory (defaults to the platform data dir)
    pub log_dir: Option<PathBuf>,
    /// QEMU settings
    pub qemu: QemuSettings,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            expect_timeout_secs: 30,
            baud_rate: 115200,
            log_dir: None,
            qemu: QemuSettings::default(),
        }
    }
}

/// QEMU launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QemuSettings {
    /// Emulator binary
    pub binary: String,
    /// TCP port the emulator serial console is exposed on
    pub serial_port: u16,
    /// Extra arguments appended to every launch
    pub extra_args: Vec<String>,
}

impl Default for QemuSettings {
    fn default() -> Self {
        Self {
            binary: "qemu-system-xtensa".to_string(),
            serial_port: 5555,
            extra_args: Vec::new(),
        }
    }
}

impl HarnessConfig {
    /// Load config from file, falling back to defaults when absent
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = super::config_dir()
            .ok_or("Could not determine config directory")?
            .join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = super::config_dir()
            .ok_or("Could not determine config directory")?
            .join("config.toml");

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Default expectation deadline
    pub fn expect_timeout(&self) -> Duration {
        Duration::from_secs(self.expect_timeout_secs)
    }

    /// Console capture directory
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir.clone().or_else(super::log_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.expect_timeout(), Duration::from_secs(30));
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.qemu.binary, "qemu-system-xtensa");
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = HarnessConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: HarnessConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.qemu.serial_port, config.qemu.serial_port);
    }
}
