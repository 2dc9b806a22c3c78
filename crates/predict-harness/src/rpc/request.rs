use std::collections::BTreeMap;
use std::collections::BTreeSet;

use predict_harness_proto::ModelSpec;
use predict_harness_proto::PredictRequest;

use super::tensor::Tensor;

/// A Predict request, built once and then only read.
///
/// ```ignore
/// let request = InferenceRequest::new("default")
///     .with_input("x", Tensor::floats(vec![2.0]))
///     .with_output("y");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    model_name: String,
    inputs: BTreeMap<String, Tensor>,
    output_filter: BTreeSet<String>,
}

impl InferenceRequest {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            inputs: BTreeMap::new(),
            output_filter: BTreeSet::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, tensor: Tensor) -> Self {
        self.inputs.insert(name.into(), tensor);
        self
    }

    /// Restricts the response to `name`. May be called repeatedly.
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.output_filter.insert(name.into());
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn input(&self, name: &str) -> Option<&Tensor> {
        self.inputs.get(name)
    }

    /// Requested outputs, or `None` when the server should return all of them.
    pub fn output_filter(&self) -> Option<&BTreeSet<String>> {
        if self.output_filter.is_empty() {
            None
        } else {
            Some(&self.output_filter)
        }
    }

    pub fn to_proto(&self) -> PredictRequest {
        PredictRequest {
            model_spec: Some(ModelSpec {
                name: self.model_name.clone(),
                ..Default::default()
            }),
            inputs: self
                .inputs
                .iter()
                .map(|(name, tensor)| (name.clone(), tensor.to_proto()))
                .collect(),
            output_filter: self.output_filter.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use predict_harness_proto::DataType;

    #[test]
    fn test_request_without_filter() {
        let request = InferenceRequest::new("default").with_input("x", Tensor::floats(vec![2.0]));
        assert_eq!(request.model_name(), "default");
        assert!(request.output_filter().is_none());
        assert!(request.input("x").is_some());
        assert!(request.input("z").is_none());
    }

    #[test]
    fn test_request_with_filter() {
        let request = InferenceRequest::new("default")
            .with_input("x", Tensor::floats(vec![2.0]))
            .with_output("y")
            .with_output("y");
        let filter = request.output_filter().unwrap();
        assert_eq!(filter.len(), 1);
        assert!(filter.contains("y"));
    }

    #[test]
    fn test_to_proto_matches_canonical_request() {
        let proto = InferenceRequest::new("default")
            .with_input("x", Tensor::floats(vec![2.0]))
            .with_output("y")
            .to_proto();

        assert_eq!(proto.model_spec.as_ref().unwrap().name, "default");
        assert_eq!(proto.model_spec.as_ref().unwrap().version, None);
        assert_eq!(proto.output_filter, vec!["y".to_string()]);

        let x = proto.inputs.get("x").unwrap();
        assert_eq!(x.dtype(), DataType::DtFloat);
        assert_eq!(x.float_val, vec![2.0]);
        assert_eq!(x.tensor_shape.as_ref().unwrap().dims(), vec![1]);
    }

    #[test]
    fn test_to_proto_without_filter_sends_empty_filter() {
        let proto = InferenceRequest::new("default")
            .with_input("x", Tensor::floats(vec![2.0]))
            .to_proto();
        assert!(proto.output_filter.is_empty());
    }
}
