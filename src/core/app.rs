//! Built firmware artifact under test
//!
//! The app is produced by an external build step before the harness runs; it
//! is read, never mutated.

use crate::core::marks::Target;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Handle to a built firmware application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    /// Path to the ELF file
    pub elf_file: PathBuf,
    /// Application name (for logs and capture filenames)
    pub name: String,
    /// Target chip the build is for
    pub target: Target,
}

impl App {
    /// Create an app handle from an ELF path
    pub fn new(elf_file: impl Into<PathBuf>, target: Target) -> Self {
        let elf_file = elf_file.into();
        let name = elf_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app".to_string());

        Self {
            elf_file,
            name,
            target,
        }
    }

    /// Set the application name
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Path to the ELF artifact
    pub fn elf_file(&self) -> &Path {
        &self.elf_file
    }

    /// Whether the artifact exists on disk
    pub fn exists(&self) -> bool {
        self.elf_file.is_file()
    }

    /// Artifact size in bytes, for the launch log line
    pub fn size(&self) -> std::io::Result<u64> {
        Ok(std::fs::metadata(&self.elf_file)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_elf_path() {
        let app = App::new("/build/hello_world.elf", Target::Esp32);
        assert_eq!(app.name, "hello_world");
        assert_eq!(app.elf_file(), Path::new("/build/hello_world.elf"));
    }

    #[test]
    fn test_explicit_name() {
        let app = App::new("/build/out.elf", Target::Esp32c3).name("mixer");
        assert_eq!(app.name, "mixer");
    }

    #[test]
    fn test_missing_artifact() {
        let app = App::new("/nonexistent/app.elf", Target::Esp32);
        assert!(!app.exists());
        assert!(app.size().is_err());
    }
}
