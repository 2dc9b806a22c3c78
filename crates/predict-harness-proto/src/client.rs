use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;

use crate::predict::PredictRequest;
use crate::predict::PredictResponse;

pub const PREDICT_PATH: &str = "/tensorflow.serving.PredictionService/Predict";

/// Unary client for `tensorflow.serving.PredictionService`.
///
/// Only `Predict` is exposed; the harness never calls the other methods of
/// the service.
#[derive(Debug, Clone)]
pub struct PredictionServiceClient {
    inner: tonic::client::Grpc<Channel>,
}

impl PredictionServiceClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn predict(
        &mut self,
        request: impl tonic::IntoRequest<PredictRequest>,
    ) -> Result<tonic::Response<PredictResponse>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unavailable(format!("service was not ready: {}", e)))?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static(PREDICT_PATH);
        self.inner.unary(request.into_request(), path, codec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::ModelSpec;
    use std::net::TcpListener;
    use std::time::Duration;
    use tonic::transport::Endpoint;

    #[test]
    fn test_predict_path_is_valid_uri_path() {
        let path = PathAndQuery::from_static(PREDICT_PATH);
        assert_eq!(path.path(), "/tensorflow.serving.PredictionService/Predict");
    }

    #[tokio::test]
    async fn test_predict_against_closed_port_fails() {
        let port = {
            let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
            listener.local_addr().unwrap().port()
        };
        let channel = Endpoint::from_shared(format!("http://127.0.0.1:{}", port))
            .unwrap()
            .connect_timeout(Duration::from_millis(500))
            .connect_lazy();
        let mut client = PredictionServiceClient::new(channel);

        let request = PredictRequest {
            model_spec: Some(ModelSpec {
                name: "default".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = client.predict(request).await;
        assert!(result.is_err());
    }
}
