//! Test selection metadata
//!
//! Each smoke case carries declarative tags: the chip targets it applies to,
//! the execution environments it can run in, and free-form marks. Selection
//! is pure data filtering; no behavior is attached to a mark.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Chip target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// ESP32
    Esp32,
    /// ESP32-S2
    Esp32s2,
    /// ESP32-S3
    Esp32s3,
    /// ESP32-C3
    Esp32c3,
    /// ESP32-C6
    Esp32c6,
    /// ESP32-H2 (preview)
    Esp32h2,
    /// ESP32-P4 (preview)
    Esp32p4,
}

impl Target {
    /// Targets with full support
    pub fn supported() -> &'static [Target] {
        &[
            Target::Esp32,
            Target::Esp32s2,
            Target::Esp32s3,
            Target::Esp32c3,
            Target::Esp32c6,
        ]
    }

    /// Preview targets
    pub fn preview() -> &'static [Target] {
        &[Target::Esp32h2, Target::Esp32p4]
    }

    /// Lowercase identifier as used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Esp32 => "esp32",
            Target::Esp32s2 => "esp32s2",
            Target::Esp32s3 => "esp32s3",
            Target::Esp32c3 => "esp32c3",
            Target::Esp32c6 => "esp32c6",
            Target::Esp32h2 => "esp32h2",
            Target::Esp32p4 => "esp32p4",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "esp32" => Ok(Target::Esp32),
            "esp32s2" => Ok(Target::Esp32s2),
            "esp32s3" => Ok(Target::Esp32s3),
            "esp32c3" => Ok(Target::Esp32c3),
            "esp32c6" => Ok(Target::Esp32c6),
            "esp32h2" => Ok(Target::Esp32h2),
            "esp32p4" => Ok(Target::Esp32p4),
            other => Err(format!("unknown target: {other}")),
        }
    }
}

/// Execution environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Env {
    /// Real hardware attached over a serial port
    Hardware,
    /// Native Linux host build
    LinuxHost,
    /// Shell-launched host build
    ShellHost,
    /// QEMU emulator
    Qemu,
}

impl Env {
    /// Lowercase identifier as used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Env::Hardware => "hardware",
            Env::LinuxHost => "linux_host",
            Env::ShellHost => "shell_host",
            Env::Qemu => "qemu",
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Env {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hardware" => Ok(Env::Hardware),
            "linux_host" | "linux" => Ok(Env::LinuxHost),
            "shell_host" | "shell" => Ok(Env::ShellHost),
            "qemu" => Ok(Env::Qemu),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Free-form mark on a case
pub type Mark = String;

/// Declarative metadata for one smoke case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseMeta {
    /// Case identifier
    pub id: String,
    /// Chip targets the case applies to
    pub targets: BTreeSet<Target>,
    /// Environments the case can run in
    pub envs: BTreeSet<Env>,
    /// Free-form marks
    pub marks: BTreeSet<Mark>,
}

impl CaseMeta {
    /// Create case metadata
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            targets: BTreeSet::new(),
            envs: BTreeSet::new(),
            marks: BTreeSet::new(),
        }
    }

    /// Add targets
    #[must_use]
    pub fn targets(mut self, targets: &[Target]) -> Self {
        self.targets.extend(targets.iter().copied());
        self
    }

    /// Add environments
    #[must_use]
    pub fn envs(mut self, envs: &[Env]) -> Self {
        self.envs.extend(envs.iter().copied());
        self
    }

    /// Add a mark
    #[must_use]
    pub fn mark(mut self, mark: &str) -> Self {
        self.marks.insert(mark.to_string());
        self
    }
}

/// Selection filter applied by the runner
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Restrict to a target
    pub target: Option<Target>,
    /// Restrict to an environment
    pub env: Option<Env>,
    /// Require a mark
    pub mark: Option<Mark>,
}

impl Selection {
    /// Does a case pass this filter
    pub fn matches(&self, case: &CaseMeta) -> bool {
        if let Some(target) = self.target {
            if !case.targets.contains(&target) {
                return false;
            }
        }
        if let Some(env) = self.env {
            if !case.envs.contains(&env) {
                return false;
            }
        }
        if let Some(ref mark) = self.mark {
            if !case.marks.contains(mark) {
                return false;
            }
        }
        true
    }
}

/// Table of registered smoke cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRegistry {
    cases: Vec<CaseMeta>,
}

impl CaseRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self { cases: Vec::new() }
    }

    /// Registry of the built-in hello-world smoke cases
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(
            CaseMeta::new("hello_world")
                .targets(Target::supported())
                .targets(Target::preview())
                .envs(&[Env::Hardware])
                .mark("generic"),
        );

        registry.register(
            CaseMeta::new("hello_world_linux")
                .envs(&[Env::LinuxHost])
                .mark("host_test"),
        );

        registry.register(
            CaseMeta::new("hello_world_macos")
                .envs(&[Env::LinuxHost, Env::ShellHost])
                .mark("host_test"),
        );

        registry.register(
            CaseMeta::new("hello_world_host")
                .targets(&[Target::Esp32])
                .envs(&[Env::Qemu])
                .mark("host_test"),
        );

        registry
    }

    /// Register a case
    pub fn register(&mut self, case: CaseMeta) {
        self.cases.push(case);
    }

    /// All registered cases
    pub fn all(&self) -> &[CaseMeta] {
        &self.cases
    }

    /// Cases passing a selection filter
    pub fn select(&self, selection: &Selection) -> Vec<&CaseMeta> {
        self.cases.iter().filter(|c| selection.matches(c)).collect()
    }

    /// Look up a case by id
    pub fn get(&self, id: &str) -> Option<&CaseMeta> {
        self.cases.iter().find(|c| c.id == id)
    }
}

impl Default for CaseRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_contents() {
        let registry = CaseRegistry::builtin();
        assert_eq!(registry.all().len(), 4);
        assert!(registry.get("hello_world").is_some());
        assert!(registry.get("hello_world_host").is_some());
    }

    #[test]
    fn test_select_by_env() {
        let registry = CaseRegistry::builtin();
        let selection = Selection {
            env: Some(Env::Qemu),
            ..Default::default()
        };
        let cases = registry.select(&selection);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "hello_world_host");
    }

    #[test]
    fn test_select_by_target_and_mark() {
        let registry = CaseRegistry::builtin();
        let selection = Selection {
            target: Some(Target::Esp32h2),
            mark: Some("generic".to_string()),
            ..Default::default()
        };
        let cases = registry.select(&selection);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "hello_world");
    }

    #[test]
    fn test_empty_selection_matches_all() {
        let registry = CaseRegistry::builtin();
        assert_eq!(registry.select(&Selection::default()).len(), 4);
    }

    #[test]
    fn test_target_parse_roundtrip() {
        for target in Target::supported().iter().chain(Target::preview()) {
            let parsed: Target = target.as_str().parse().unwrap();
            assert_eq!(parsed, *target);
        }
        assert!("esp1234".parse::<Target>().is_err());
    }
}
