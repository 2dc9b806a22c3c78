use std::collections::BTreeMap;

use serde::Serialize;

use predict_harness_proto::Code;
use predict_harness_proto::FailureClass;
use predict_harness_proto::PredictResponse;
use predict_harness_proto::Status;
use predict_harness_proto::classify;
use predict_harness_proto::status::code_name;

use super::tensor::Tensor;

/// Outputs of a successful Predict call.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InferenceResponse {
    outputs: BTreeMap<String, Tensor>,
}

impl InferenceResponse {
    pub fn new(outputs: BTreeMap<String, Tensor>) -> Self {
        Self { outputs }
    }

    pub fn from_proto(proto: PredictResponse) -> Self {
        Self {
            outputs: proto
                .outputs
                .into_iter()
                .map(|(name, tensor)| (name, Tensor::from_proto(tensor)))
                .collect(),
        }
    }

    pub fn output(&self, name: &str) -> Option<&Tensor> {
        self.outputs.get(name)
    }

    pub fn outputs(&self) -> &BTreeMap<String, Tensor> {
        &self.outputs
    }

    pub fn output_names(&self) -> Vec<String> {
        self.outputs.keys().cloned().collect()
    }
}

/// A failed Predict call: gRPC status code plus server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcFailure {
    pub code: Code,
    pub message: String,
}

impl RpcFailure {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(Code::DeadlineExceeded, message)
    }

    pub fn class(&self) -> FailureClass {
        classify(self.code)
    }

    pub fn code_name(&self) -> &'static str {
        code_name(self.code)
    }

    pub fn is_failed_precondition(&self) -> bool {
        self.code == Code::FailedPrecondition
    }

    pub fn is_transport(&self) -> bool {
        self.class() == FailureClass::Transport
    }
}

impl From<Status> for RpcFailure {
    fn from(status: Status) -> Self {
        Self::new(status.code(), status.message())
    }
}

impl std::fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code_name())
        } else {
            write!(f, "{}: {}", self.code_name(), self.message)
        }
    }
}
