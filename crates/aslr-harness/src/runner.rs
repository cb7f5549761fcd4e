//! Runner invocation: boot a guest once and capture its console.

use std::process::Command;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::RunnerConfig;
use crate::error::HarnessError;

/// How much trailing output error messages carry.
pub const OUTPUT_TAIL_BYTES: usize = 1000;

/// Last `max` bytes of `output`, moved forward to a char boundary.
pub fn output_tail(output: &str, max: usize) -> &str {
    let mut start = output.len().saturating_sub(max);
    while !output.is_char_boundary(start) {
        start += 1;
    }
    &output[start..]
}

/// Captured standard output of one guest boot.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stdout: String,
}

impl RunOutput {
    pub fn new(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
        }
    }

    /// Count occurrences of a pattern in the output
    pub fn count_pattern(&self, pattern: &str) -> usize {
        self.stdout.matches(pattern).count()
    }
}

/// Something that boots the guest image and returns its console output.
pub trait Runner {
    fn run(&self) -> Result<RunOutput, HarnessError>;
}

/// Runs an external runner program as `<program> <execute-flag> <image>`.
///
/// Only stdout is captured; the runner's stderr passes straight through.
/// The call blocks until the runner exits.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    config: RunnerConfig,
}

impl CommandRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    fn program_name(&self) -> String {
        self.config.program.display().to_string()
    }
}

impl Runner for CommandRunner {
    fn run(&self) -> Result<RunOutput, HarnessError> {
        let start = Instant::now();
        info!(
            program = %self.config.program.display(),
            image = %self.config.image,
            "booting guest"
        );

        let output = Command::new(&self.config.program)
            .arg(&self.config.execute_flag)
            .arg(&self.config.image)
            .envs(self.config.envs.iter().map(|(k, v)| (k, v)))
            .stderr(std::process::Stdio::inherit())
            .output()
            .map_err(|source| HarnessError::Spawn {
                program: self.program_name(),
                source,
            })?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(HarnessError::RunnerFailed {
                program: self.program_name(),
                status: output.status,
                output_tail: output_tail(&stdout, OUTPUT_TAIL_BYTES).to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)?;
        debug!(
            bytes = stdout.len(),
            elapsed = ?start.elapsed(),
            "captured runner output"
        );

        Ok(RunOutput { stdout })
    }
}
