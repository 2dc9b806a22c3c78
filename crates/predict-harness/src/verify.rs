//! Response and failure checks for the `half_plus_two` workload.
//!
//! The fixture model computes `y = 0.5 * x + 2`; the canonical request sends
//! `x = [2.0]` and expects exactly one `DT_FLOAT` value `3.0` under `y`.

use thiserror::Error;
use tracing::debug;

use crate::error::HarnessError;
use crate::rpc::ElementType;
use crate::rpc::InferenceRequest;
use crate::rpc::InferenceResponse;
use crate::rpc::Predictor;
use crate::rpc::RpcFailure;
use crate::rpc::Tensor;
use crate::rpc::TensorValues;

pub const INPUT_NAME: &str = "x";
pub const OUTPUT_NAME: &str = "y";
pub const INPUT_VALUE: f32 = 2.0;
pub const EXPECTED_VALUE: f32 = 3.0;

/// What a successful response must contain.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    output: String,
    dtype: ElementType,
    value: f32,
}

impl Expectation {
    /// A single float value under `output`.
    pub fn scalar_float(output: impl Into<String>, value: f32) -> Self {
        Self {
            output: output.into(),
            dtype: ElementType::Float,
            value,
        }
    }

    pub fn half_plus_two() -> Self {
        Self::scalar_float(OUTPUT_NAME, EXPECTED_VALUE)
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Mismatch {
    #[error("output '{name}' missing, response has [{}]", .available.join(", "))]
    MissingOutput {
        name: String,
        available: Vec<String>,
    },

    #[error("output '{name}' has type {actual}, expected {expected}")]
    WrongType {
        name: String,
        expected: ElementType,
        actual: ElementType,
    },

    #[error("output '{name}' has {actual} values, expected {expected}")]
    WrongCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("output '{name}' is {actual}, expected {expected}")]
    WrongValue {
        name: String,
        expected: f32,
        actual: f32,
    },

    #[error("identical requests returned different outputs: {first:?} then {second:?}")]
    NotDeterministic {
        first: Box<InferenceResponse>,
        second: Box<InferenceResponse>,
    },
}

/// The canonical request: `x = [2.0]`, optionally naming `y` as the only output.
pub fn canonical_request(model_name: &str, specify_output: bool) -> InferenceRequest {
    let request =
        InferenceRequest::new(model_name).with_input(INPUT_NAME, Tensor::floats(vec![INPUT_VALUE]));
    if specify_output {
        request.with_output(OUTPUT_NAME)
    } else {
        request
    }
}

/// Checks name, element type, value count and value, in that order.
pub fn verify_response(response: &InferenceResponse, expected: &Expectation) -> Result<(), Mismatch> {
    let name = expected.output.clone();
    let Some(tensor) = response.output(&expected.output) else {
        return Err(Mismatch::MissingOutput {
            name,
            available: response.output_names(),
        });
    };

    if tensor.dtype() != expected.dtype {
        return Err(Mismatch::WrongType {
            name,
            expected: expected.dtype,
            actual: tensor.dtype(),
        });
    }

    let count = tensor.values().len();
    if count != 1 {
        return Err(Mismatch::WrongCount {
            name,
            expected: 1,
            actual: count,
        });
    }

    match tensor.values() {
        TensorValues::Float(values) if values[0] == expected.value => Ok(()),
        TensorValues::Float(values) => Err(Mismatch::WrongValue {
            name,
            expected: expected.value,
            actual: values[0],
        }),
        // dtype was checked against Float above
        other => Err(Mismatch::WrongCount {
            name,
            expected: 1,
            actual: other.len(),
        }),
    }
}

/// Checks that a call against a malformed model was refused as
/// `FAILED_PRECONDITION`, returning that failure.
pub fn verify_rejected(
    result: Result<InferenceResponse, RpcFailure>,
) -> Result<RpcFailure, HarnessError> {
    match result {
        Ok(response) => Err(HarnessError::UnexpectedSuccess {
            outputs: response.output_names(),
        }),
        Err(failure) if failure.is_failed_precondition() => Ok(failure),
        Err(failure) => Err(failure.into()),
    }
}

/// Sends the canonical request and verifies the response against `expected`.
pub async fn verify_predict(
    predictor: &dyn Predictor,
    model_name: &str,
    specify_output: bool,
    expected: &Expectation,
) -> Result<InferenceResponse, HarnessError> {
    let request = canonical_request(model_name, specify_output);
    let response = predictor.predict(&request).await?;
    verify_response(&response, expected)?;
    debug!(specify_output, "Predict response verified");
    Ok(response)
}

/// Sends the canonical request and expects a `FAILED_PRECONDITION` refusal.
pub async fn verify_bad_model(
    predictor: &dyn Predictor,
    model_name: &str,
) -> Result<RpcFailure, HarnessError> {
    let request = canonical_request(model_name, true);
    let failure = verify_rejected(predictor.predict(&request).await)?;
    debug!(status = %failure, "Predict refused as expected");
    Ok(failure)
}

/// Sends `request` twice and requires identical outputs.
pub async fn verify_deterministic(
    predictor: &dyn Predictor,
    request: &InferenceRequest,
) -> Result<(), HarnessError> {
    let first = predictor.predict(request).await?;
    let second = predictor.predict(request).await?;
    if first != second {
        return Err(Mismatch::NotDeterministic {
            first: Box::new(first),
            second: Box::new(second),
        }
        .into());
    }
    Ok(())
}
