use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use predict_harness_common::mutex_lock_or_recover;
use predict_harness_proto::Code;

use super::predictor::Predictor;
use super::request::InferenceRequest;
use super::response::InferenceResponse;
use super::response::RpcFailure;
use super::tensor::Tensor;
use super::tensor::TensorValues;

type PredictResult = Result<InferenceResponse, RpcFailure>;
type Responder = dyn Fn(&InferenceRequest) -> PredictResult + Send + Sync;

/// An in-memory `Predictor` for tests.
///
/// Answers come from queued results first, then from the configured
/// responder. Every request is recorded.
///
/// ```ignore
/// let mock = MockPredictor::half_plus_two();
/// let response = mock.predict(&request).await?;
/// assert_eq!(mock.call_count(), 1);
/// ```
#[derive(Clone)]
pub struct MockPredictor {
    responder: Arc<Responder>,
    queued: Arc<Mutex<VecDeque<PredictResult>>>,
    calls: Arc<Mutex<Vec<InferenceRequest>>>,
}

impl MockPredictor {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&InferenceRequest) -> PredictResult + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serves fixed `outputs`, honoring the request's output filter the way
    /// the model server does: unknown filter names are `INVALID_ARGUMENT`.
    pub fn serving(outputs: BTreeMap<String, Tensor>) -> Self {
        Self::new(move |request| filter_outputs(&outputs, request))
    }

    /// Emulates the `half_plus_two` fixture: `y = 0.5 * x + 2` on float input `x`.
    pub fn half_plus_two() -> Self {
        Self::new(|request| {
            let x = match request.input("x").map(Tensor::values) {
                Some(TensorValues::Float(values)) => values.clone(),
                Some(_) => {
                    return Err(RpcFailure::new(
                        Code::InvalidArgument,
                        "input 'x' must be DT_FLOAT",
                    ));
                }
                None => {
                    return Err(RpcFailure::new(
                        Code::InvalidArgument,
                        "input tensor alias not found in signature: x",
                    ));
                }
            };
            let y = x.iter().map(|v| 0.5 * v + 2.0).collect();
            let outputs = BTreeMap::from([("y".to_string(), Tensor::floats(y))]);
            filter_outputs(&outputs, request)
        })
    }

    /// Fails every call with `failure`.
    pub fn failing(failure: RpcFailure) -> Self {
        Self::new(move |_| Err(failure.clone()))
    }

    /// Queues a one-off result returned before the responder is consulted.
    pub fn push_result(&self, result: PredictResult) {
        mutex_lock_or_recover(&self.queued).push_back(result);
    }

    pub fn calls(&self) -> Vec<InferenceRequest> {
        mutex_lock_or_recover(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        mutex_lock_or_recover(&self.calls).len()
    }
}

#[async_trait]
impl Predictor for MockPredictor {
    async fn predict(&self, request: &InferenceRequest) -> PredictResult {
        mutex_lock_or_recover(&self.calls).push(request.clone());
        if let Some(result) = mutex_lock_or_recover(&self.queued).pop_front() {
            return result;
        }
        (self.responder)(request)
    }
}

fn filter_outputs(outputs: &BTreeMap<String, Tensor>, request: &InferenceRequest) -> PredictResult {
    let Some(filter) = request.output_filter() else {
        return Ok(InferenceResponse::new(outputs.clone()));
    };
    let mut selected = BTreeMap::new();
    for name in filter {
        let Some(tensor) = outputs.get(name) else {
            return Err(RpcFailure::new(
                Code::InvalidArgument,
                format!("output tensor alias not found in signature: {}", name),
            ));
        };
        selected.insert(name.clone(), tensor.clone());
    }
    Ok(InferenceResponse::new(selected))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(specify_output: bool) -> InferenceRequest {
        let request = InferenceRequest::new("default").with_input("x", Tensor::floats(vec![2.0]));
        if specify_output {
            request.with_output("y")
        } else {
            request
        }
    }

    #[tokio::test]
    async fn test_half_plus_two_computes_y() {
        let mock = MockPredictor::half_plus_two();
        let response = mock.predict(&request(true)).await.unwrap();
        assert_eq!(
            response.output("y").unwrap().values(),
            &TensorValues::Float(vec![3.0])
        );
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_filter_name_is_invalid_argument() {
        let mock = MockPredictor::half_plus_two();
        let failure = mock
            .predict(&request(false).with_output("z"))
            .await
            .unwrap_err();
        assert_eq!(failure.code, Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_serving_without_filter_returns_all_outputs() {
        let outputs = BTreeMap::from([
            ("y".to_string(), Tensor::floats(vec![3.0])),
            ("z".to_string(), Tensor::floats(vec![1.0])),
        ]);
        let mock = MockPredictor::serving(outputs);
        let response = mock.predict(&request(false)).await.unwrap();
        assert_eq!(response.output_names(), vec!["y".to_string(), "z".to_string()]);

        let response = mock.predict(&request(true)).await.unwrap();
        assert_eq!(response.output_names(), vec!["y".to_string()]);
    }

    #[tokio::test]
    async fn test_queued_result_takes_precedence() {
        let mock = MockPredictor::half_plus_two();
        mock.push_result(Err(RpcFailure::unavailable("restarting")));

        assert!(mock.predict(&request(true)).await.is_err());
        assert!(mock.predict(&request(true)).await.is_ok());
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let mock = MockPredictor::failing(RpcFailure::new(Code::FailedPrecondition, "bad model"));
        let failure = mock.predict(&request(true)).await.unwrap_err();
        assert!(failure.is_failed_precondition());
    }
}
