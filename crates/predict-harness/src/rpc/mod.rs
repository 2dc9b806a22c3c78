//! Predict client: domain request/response types, the `Predictor` seam and
//! its gRPC and in-memory implementations.

mod mock;
mod predictor;
mod request;
mod response;
mod tensor;

pub use mock::MockPredictor;
pub use predictor::GrpcPredictor;
pub use predictor::Predictor;
pub use request::InferenceRequest;
pub use response::InferenceResponse;
pub use response::RpcFailure;
pub use tensor::ElementType;
pub use tensor::Tensor;
pub use tensor::TensorValues;
