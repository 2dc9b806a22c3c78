//! `tensorflow_serving/apis/{model,predict}.proto` subset.

use crate::tensor::TensorProto;

/// Identifies the servable a request is routed to.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModelSpec {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// `google.protobuf.Int64Value`; `None` selects the latest version.
    #[prost(message, optional, tag = "2")]
    pub version: ::core::option::Option<i64>,
    #[prost(string, tag = "3")]
    pub signature_name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PredictRequest {
    #[prost(message, optional, tag = "1")]
    pub model_spec: ::core::option::Option<ModelSpec>,
    #[prost(map = "string, message", tag = "2")]
    pub inputs: ::std::collections::HashMap<::prost::alloc::string::String, TensorProto>,
    /// Output names to return. Empty means every output of the signature.
    #[prost(string, repeated, tag = "3")]
    pub output_filter: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PredictResponse {
    #[prost(map = "string, message", tag = "1")]
    pub outputs: ::std::collections::HashMap<::prost::alloc::string::String, TensorProto>,
}
