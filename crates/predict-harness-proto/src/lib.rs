#![deny(clippy::all)]

//! Wire types and client for the `tensorflow.serving.PredictionService` API.
//!
//! Messages are declared with `prost` derives using the field tags of the
//! TensorFlow protos, so no protoc step is needed at build time.

mod client;
mod predict;
pub mod status;
mod tensor;

pub use client::PREDICT_PATH;
pub use client::PredictionServiceClient;
pub use predict::ModelSpec;
pub use predict::PredictRequest;
pub use predict::PredictResponse;
pub use status::FailureClass;
pub use status::classify;
pub use tensor::DataType;
pub use tensor::TensorProto;
pub use tensor::TensorShapeProto;
pub use tensor::tensor_shape_proto;

pub use tonic::Code;
pub use tonic::Status;
