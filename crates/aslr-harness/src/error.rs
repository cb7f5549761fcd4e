//! Error types for the ASLR harness.

use std::process::ExitStatus;

/// Coarse classification of a [`HarnessError`].
///
/// Launch and protocol errors mean the check could not be carried out at
/// all. An invariant error means it ran and found two runs sharing an
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The runner could not be started or exited unsuccessfully.
    Launch,
    /// The runner's output did not follow the console protocol.
    Protocol,
    /// Two runs reported the same address for a key.
    Invariant,
}

/// Errors that can occur while running the ASLR check.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The runner process could not be spawned.
    #[error("failed to spawn runner `{program}`: {source}")]
    Spawn {
        /// Program that was being executed.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The runner exited with a non-zero status or was killed by a signal.
    #[error("runner `{program}` failed with {status}\nrunner output (tail):\n{output_tail}")]
    RunnerFailed {
        /// Program that was executed.
        program: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// End of the captured stdout.
        output_tail: String,
    },

    /// The runner's standard output was not valid UTF-8.
    #[error("runner output is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The marker never appeared in the runner's output.
    #[error(
        "marker `{marker}` not found in runner output ({output_len} bytes)\n\
         runner output (tail):\n{output_tail}"
    )]
    MarkerNotFound {
        /// Marker that was searched for.
        marker: String,
        /// Length of the searched output.
        output_len: usize,
        /// End of the searched output.
        output_tail: String,
    },

    /// The text after the marker is not a JSON object of strings.
    #[error("malformed address report: {0}")]
    MalformedReport(#[from] serde_json::Error),

    /// A report value is not a hexadecimal address.
    #[error("invalid address for `{key}`: {value:?}")]
    InvalidAddress {
        /// Key whose value failed to decode.
        key: String,
        /// Raw value text.
        value: String,
    },

    /// A key of the first report is absent from the second.
    #[error("key `{key}` missing from second report")]
    MissingKey {
        /// The missing key.
        key: String,
    },

    /// At least one key was placed at the same address in both runs.
    #[error("address collision for {}", keys.join(", "))]
    AddressCollision {
        /// Keys whose addresses were equal.
        keys: Vec<String>,
    },
}

impl HarnessError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Spawn { .. } | Self::RunnerFailed { .. } => ErrorKind::Launch,
            Self::InvalidUtf8(_)
            | Self::MarkerNotFound { .. }
            | Self::MalformedReport(_)
            | Self::InvalidAddress { .. }
            | Self::MissingKey { .. } => ErrorKind::Protocol,
            Self::AddressCollision { .. } => ErrorKind::Invariant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_message_lists_keys() {
        let err = HarnessError::AddressCollision {
            keys: vec!["heap".to_string(), "kernel".to_string()],
        };
        assert_eq!(err.to_string(), "address collision for heap, kernel");
        assert_eq!(err.kind(), ErrorKind::Invariant);
    }

    #[test]
    fn protocol_errors_are_classified() {
        let err = HarnessError::MarkerNotFound {
            marker: "ADDRESS_LIST:".to_string(),
            output_len: 12,
            output_tail: "panic at boot".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().ends_with("runner output (tail):\npanic at boot"));

        let err = HarnessError::MissingKey {
            key: "heap".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn spawn_error_is_launch() {
        let err = HarnessError::Spawn {
            program: "run.py".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.kind(), ErrorKind::Launch);
    }
}
