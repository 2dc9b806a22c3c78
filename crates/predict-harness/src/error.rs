//! Harness errors with a category per failure kind.
//!
//! Every error ends the scenario it occurs in. The category decides how it is
//! reported and which sysexits.h-style code the CLI exits with.

use std::io;
use std::path::PathBuf;

use serde_json::{Value, json};
use thiserror::Error;

use crate::rpc::RpcFailure;
use crate::verify::Mismatch;
use predict_harness_proto::FailureClass;

/// The machine could not provide something the scenario needs.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("Failed to allocate a local port: {0}")]
    PortAllocation(#[source] io::Error),

    #[error("Server binary not found at {}", .0.display())]
    BinaryNotFound(PathBuf),

    #[error("Fixture '{name}' not found at {}", .path.display())]
    FixtureNotFound { name: &'static str, path: PathBuf },

    #[error("Failed to launch {}: {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open server log {}: {source}", .path.display())]
    ServerLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid server address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Unknown scenario '{0}'")]
    UnknownScenario(String),

    #[error("Port {0} was still bound after the server was stopped")]
    PortNotReleased(u16),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("Transport failure: {0}")]
    Transport(RpcFailure),

    #[error("Server rejected the model: {0}")]
    ModelRejected(RpcFailure),

    #[error("Unexpected RPC status: {0}")]
    UnexpectedStatus(RpcFailure),

    #[error("Response mismatch: {0}")]
    Mismatch(#[from] Mismatch),

    #[error(
        "Expected Predict to fail with FAILED_PRECONDITION, but it returned outputs [{}]",
        .outputs.join(", ")
    )]
    UnexpectedSuccess { outputs: Vec<String> },
}

impl From<RpcFailure> for HarnessError {
    fn from(failure: RpcFailure) -> Self {
        match failure.class() {
            FailureClass::Transport => HarnessError::Transport(failure),
            FailureClass::FailedPrecondition => HarnessError::ModelRejected(failure),
            FailureClass::Other => HarnessError::UnexpectedStatus(failure),
        }
    }
}

/// Error category for reporting and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Port, binary, fixture or process spawn problems
    Environment,
    /// Connection refused, unavailable, deadline exceeded
    Transport,
    /// Server reported the model as unloadable
    Model,
    /// A response arrived but did not match expectations
    Assertion,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Environment => "environment",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Model => "model",
            ErrorCategory::Assertion => "assertion",
        }
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "environment" => Ok(ErrorCategory::Environment),
            "transport" => Ok(ErrorCategory::Transport),
            "model" => Ok(ErrorCategory::Model),
            "assertion" => Ok(ErrorCategory::Assertion),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl HarnessError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarnessError::Environment(_) => ErrorCategory::Environment,
            HarnessError::Transport(_) => ErrorCategory::Transport,
            HarnessError::ModelRejected(_) => ErrorCategory::Model,
            HarnessError::UnexpectedStatus(_)
            | HarnessError::Mismatch(_)
            | HarnessError::UnexpectedSuccess { .. } => ErrorCategory::Assertion,
        }
    }

    /// The RPC failure behind this error, if it came from a Predict call.
    pub fn rpc_failure(&self) -> Option<&RpcFailure> {
        match self {
            HarnessError::Transport(f)
            | HarnessError::ModelRejected(f)
            | HarnessError::UnexpectedStatus(f) => Some(f),
            _ => None,
        }
    }

    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> String {
        match self {
            HarnessError::Environment(EnvironmentError::BinaryNotFound(_)) => {
                "Build the model server or point PREDICT_HARNESS_SERVER_BIN at it.".to_string()
            }
            HarnessError::Environment(EnvironmentError::FixtureNotFound { .. }) => {
                "Set PREDICT_HARNESS_TESTDATA / PREDICT_HARNESS_SAVED_MODEL, or TEST_SRCDIR."
                    .to_string()
            }
            HarnessError::Environment(EnvironmentError::UnknownScenario(_)) => {
                "Run 'predict-harness list' to see the available scenarios.".to_string()
            }
            HarnessError::Environment(EnvironmentError::PortNotReleased(_)) => {
                "A server process may have outlived the scenario. Check for stray model servers."
                    .to_string()
            }
            HarnessError::Environment(_) => {
                "Check that the local network stack and filesystem are usable.".to_string()
            }
            HarnessError::Transport(_) => {
                "The server did not answer in time. Check its log, or raise PREDICT_HARNESS_SETTLE_MS."
                    .to_string()
            }
            HarnessError::ModelRejected(_) => {
                "The server could not load the model. Check the model path and format flag."
                    .to_string()
            }
            HarnessError::UnexpectedStatus(_) => {
                "The server answered with an unexpected status. Check the request against the model signature."
                    .to_string()
            }
            HarnessError::Mismatch(_) => {
                "The served computation returned a different result than expected.".to_string()
            }
            HarnessError::UnexpectedSuccess { .. } => {
                "The malformed model was served. Check that the bad fixture is really malformed."
                    .to_string()
            }
        }
    }

    /// Converts to UNIX sysexits.h-compliant exit code.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Environment => 78, // EX_CONFIG
            ErrorCategory::Transport => 75,   // EX_TEMPFAIL
            ErrorCategory::Model => 65,       // EX_DATAERR
            ErrorCategory::Assertion => 1,
        }
    }

    /// Returns structured JSON representation of this error.
    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "message": self.to_string(),
            "category": self.category().as_str(),
            "suggestion": self.suggestion(),
        });
        if let Some(failure) = self.rpc_failure() {
            value["status"] = json!({
                "code": failure.code_name(),
                "message": failure.message,
            });
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use predict_harness_proto::Code;

    #[test]
    fn test_rpc_failure_routes_by_class() {
        let err: HarnessError = RpcFailure::new(Code::Unavailable, "connection refused").into();
        assert!(matches!(err, HarnessError::Transport(_)));
        assert_eq!(err.category(), ErrorCategory::Transport);

        let err: HarnessError = RpcFailure::new(Code::FailedPrecondition, "bad export").into();
        assert!(matches!(err, HarnessError::ModelRejected(_)));
        assert_eq!(err.category(), ErrorCategory::Model);

        let err: HarnessError = RpcFailure::new(Code::NotFound, "no servable").into();
        assert!(matches!(err, HarnessError::UnexpectedStatus(_)));
        assert_eq!(err.category(), ErrorCategory::Assertion);
    }

    #[test]
    fn test_binary_not_found_display() {
        let err: HarnessError =
            EnvironmentError::BinaryNotFound(PathBuf::from("/opt/server")).into();
        assert_eq!(err.to_string(), "Server binary not found at /opt/server");
        assert_eq!(err.category(), ErrorCategory::Environment);
        assert_eq!(err.exit_code(), 78);
        assert!(err.suggestion().contains("PREDICT_HARNESS_SERVER_BIN"));
    }

    #[test]
    fn test_port_not_released_is_environment() {
        let err: HarnessError = EnvironmentError::PortNotReleased(8500).into();
        assert_eq!(err.to_string(), "Port 8500 was still bound after the server was stopped");
        assert_eq!(err.exit_code(), 78);
        assert!(err.suggestion().contains("stray"));
    }

    #[test]
    fn test_unexpected_success_lists_outputs() {
        let err = HarnessError::UnexpectedSuccess {
            outputs: vec!["y".to_string()],
        };
        assert!(err.to_string().contains("[y]"));
        assert_eq!(err.category(), ErrorCategory::Assertion);
    }

    #[test]
    fn test_to_json_includes_status_for_rpc_errors() {
        let err: HarnessError = RpcFailure::new(Code::FailedPrecondition, "bad export").into();
        let json = err.to_json();
        assert_eq!(json["category"], "model");
        assert_eq!(json["status"]["code"], "FAILED_PRECONDITION");
        assert_eq!(json["status"]["message"], "bad export");
    }

    #[test]
    fn test_to_json_omits_status_for_environment_errors() {
        let err: HarnessError = EnvironmentError::PortAllocation(io::Error::other("no sockets")).into();
        let json = err.to_json();
        assert_eq!(json["category"], "environment");
        assert!(json.get("status").is_none());
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!(
            "transport".parse::<ErrorCategory>(),
            Ok(ErrorCategory::Transport)
        );
        assert_eq!(
            "assertion".parse::<ErrorCategory>(),
            Ok(ErrorCategory::Assertion)
        );
        assert!("unknown".parse::<ErrorCategory>().is_err());
    }
}
