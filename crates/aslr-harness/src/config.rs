//! Harness configuration.
//!
//! The runner is located through the environment the same way the guest
//! build scripts expect it: `ASLR_RUNNER` names the runner directly,
//! otherwise `OSV_BASE` points at a source tree whose `scripts/run.py`
//! boots images.

use std::path::{Path, PathBuf};

/// Marker the guest prints right before its address report.
pub const DEFAULT_MARKER: &str = "ADDRESS_LIST:";

/// Flag telling the runner to execute an image and exit.
pub const DEFAULT_EXECUTE_FLAG: &str = "-e";

/// Image that prints the address report.
pub const DEFAULT_IMAGE: &str = "tests/misc-aslr.so";

/// Environment variable naming the runner program.
pub const RUNNER_ENV: &str = "ASLR_RUNNER";

/// Environment variable overriding the image.
pub const IMAGE_ENV: &str = "ASLR_IMAGE";

/// Environment variable pointing at the guest source tree.
pub const BASE_ENV: &str = "OSV_BASE";

/// How to invoke the runner for one boot.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Runner program.
    pub program: PathBuf,
    /// Flag placed before the image argument.
    pub execute_flag: String,
    /// Image passed to the runner.
    pub image: String,
    /// Extra environment variables set for the runner.
    pub envs: Vec<(String, String)>,
}

impl RunnerConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            execute_flag: DEFAULT_EXECUTE_FLAG.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            envs: Vec::new(),
        }
    }
}

/// Complete configuration for one ASLR check.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub runner: RunnerConfig,
    pub marker: String,
}

impl HarnessConfig {
    /// Configuration with default flag, image and marker for `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            runner: RunnerConfig::new(program),
            marker: DEFAULT_MARKER.to_string(),
        }
    }

    /// Build a configuration from the process environment.
    ///
    /// Returns `None` when neither `ASLR_RUNNER` nor `OSV_BASE` is set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let program = match lookup(RUNNER_ENV) {
            Some(runner) => PathBuf::from(runner),
            None => default_runner(Path::new(&lookup(BASE_ENV)?)),
        };

        let mut config = Self::new(program);
        if let Some(image) = lookup(IMAGE_ENV) {
            config.runner.image = image;
        }
        Some(config)
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.runner.image = image.into();
        self
    }

    pub fn with_execute_flag(mut self, flag: impl Into<String>) -> Self {
        self.runner.execute_flag = flag.into();
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Set an environment variable for every runner invocation.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.runner.envs.push((key.into(), value.into()));
        self
    }
}

/// Runner script inside a guest source tree.
pub fn default_runner(base: &Path) -> PathBuf {
    base.join("scripts").join("run.py")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = HarnessConfig::new("/bin/runner");
        assert_eq!(config.runner.program, PathBuf::from("/bin/runner"));
        assert_eq!(config.runner.execute_flag, "-e");
        assert_eq!(config.runner.image, "tests/misc-aslr.so");
        assert_eq!(config.marker, "ADDRESS_LIST:");
        assert!(config.runner.envs.is_empty());
    }

    #[test]
    fn runner_from_base_tree() {
        let config = HarnessConfig::from_lookup(lookup(&[("OSV_BASE", "/src/osv")])).unwrap();
        assert_eq!(
            config.runner.program,
            PathBuf::from("/src/osv/scripts/run.py")
        );
    }

    #[test]
    fn explicit_runner_wins_over_base() {
        let config = HarnessConfig::from_lookup(lookup(&[
            ("OSV_BASE", "/src/osv"),
            ("ASLR_RUNNER", "/opt/boot"),
            ("ASLR_IMAGE", "tests/other.so"),
        ]))
        .unwrap();
        assert_eq!(config.runner.program, PathBuf::from("/opt/boot"));
        assert_eq!(config.runner.image, "tests/other.so");
    }

    #[test]
    fn unconfigured_environment() {
        assert!(HarnessConfig::from_lookup(lookup(&[])).is_none());
        assert!(HarnessConfig::from_lookup(lookup(&[("ASLR_IMAGE", "x.so")])).is_none());
    }

    #[test]
    fn builders() {
        let config = HarnessConfig::new("sim")
            .with_image("a.so")
            .with_execute_flag("--exec")
            .with_marker("ADDRS:")
            .with_env("SEED", "1");
        assert_eq!(config.runner.image, "a.so");
        assert_eq!(config.runner.execute_flag, "--exec");
        assert_eq!(config.marker, "ADDRS:");
        assert_eq!(
            config.runner.envs,
            vec![("SEED".to_string(), "1".to_string())]
        );
    }
}
