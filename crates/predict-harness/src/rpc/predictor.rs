use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::Endpoint;
use tracing::debug;

use predict_harness_proto::PredictionServiceClient;

use super::request::InferenceRequest;
use super::response::InferenceResponse;
use super::response::RpcFailure;
use crate::error::EnvironmentError;

/// One Predict call: either outputs or a status failure, never both.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, request: &InferenceRequest) -> Result<InferenceResponse, RpcFailure>;
}

/// Plaintext gRPC predictor for a local server.
///
/// Each call opens its own channel. A refused connection is reported as
/// `UNAVAILABLE`, and a call that outlives `timeout` as `DEADLINE_EXCEEDED`.
#[derive(Debug, Clone)]
pub struct GrpcPredictor {
    address: String,
    endpoint: Endpoint,
    timeout: Duration,
}

impl GrpcPredictor {
    /// `address` is `host:port`, without scheme.
    pub fn new(address: impl Into<String>, timeout: Duration) -> Result<Self, EnvironmentError> {
        let address = address.into();
        let endpoint = Endpoint::from_shared(format!("http://{}", address))
            .map_err(|e| EnvironmentError::InvalidAddress {
                address: address.clone(),
                reason: error_chain(&e),
            })?
            .connect_timeout(timeout)
            .timeout(timeout);

        Ok(Self {
            address,
            endpoint,
            timeout,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Predictor for GrpcPredictor {
    async fn predict(&self, request: &InferenceRequest) -> Result<InferenceResponse, RpcFailure> {
        debug!(address = %self.address, model = request.model_name(), "Sending Predict request");

        let call = async {
            let channel = self.endpoint.connect().await.map_err(|e| {
                RpcFailure::unavailable(format!(
                    "failed to connect to {}: {}",
                    self.address,
                    error_chain(&e)
                ))
            })?;
            let mut client = PredictionServiceClient::new(channel);

            let mut grpc_request = tonic::Request::new(request.to_proto());
            grpc_request.set_timeout(self.timeout);
            let response = client.predict(grpc_request).await?;
            Ok::<_, RpcFailure>(response.into_inner())
        };

        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                RpcFailure::deadline_exceeded(format!(
                    "no reply from {} within {:?}",
                    self.address, self.timeout
                ))
            })??;

        Ok(InferenceResponse::from_proto(response))
    }
}

/// `err` followed by each of its sources, joined with `: `.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::Tensor;
    use std::net::TcpListener;

    fn closed_port() -> u16 {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_new_rejects_malformed_address() {
        let err = GrpcPredictor::new("local host:not-a-port", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, EnvironmentError::InvalidAddress { .. }));
    }

    #[test]
    fn test_new_keeps_address_and_timeout() {
        let predictor = GrpcPredictor::new("localhost:8500", Duration::from_secs(5)).unwrap();
        assert_eq!(predictor.address(), "localhost:8500");
        assert_eq!(predictor.timeout(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_failure() {
        let address = format!("127.0.0.1:{}", closed_port());
        let predictor = GrpcPredictor::new(address, Duration::from_secs(2)).unwrap();
        let request = InferenceRequest::new("default").with_input("x", Tensor::floats(vec![2.0]));

        let failure = predictor.predict(&request).await.unwrap_err();
        assert!(failure.is_transport(), "unexpected failure: {}", failure);
        assert!(!failure.is_failed_precondition());
    }

    #[test]
    fn test_error_chain_joins_sources() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "transport error")
            }
        }
        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(std::io::Error::other("connection refused"));
        assert_eq!(error_chain(&err), "transport error: connection refused");
    }
}
