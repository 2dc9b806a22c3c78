use serde::Serialize;

use predict_harness_proto::DataType;
use predict_harness_proto::TensorProto;
use predict_harness_proto::TensorShapeProto;

/// Element type of a tensor as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Float,
    Double,
    Int32,
    Int64,
    String,
    Bool,
    /// Any other `DataType` wire value, kept verbatim.
    Other(i32),
}

impl ElementType {
    pub fn from_wire(value: i32) -> Self {
        match DataType::try_from(value) {
            Ok(DataType::DtFloat) => ElementType::Float,
            Ok(DataType::DtDouble) => ElementType::Double,
            Ok(DataType::DtInt32) => ElementType::Int32,
            Ok(DataType::DtInt64) => ElementType::Int64,
            Ok(DataType::DtString) => ElementType::String,
            Ok(DataType::DtBool) => ElementType::Bool,
            _ => ElementType::Other(value),
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            ElementType::Float => DataType::DtFloat as i32,
            ElementType::Double => DataType::DtDouble as i32,
            ElementType::Int32 => DataType::DtInt32 as i32,
            ElementType::Int64 => DataType::DtInt64 as i32,
            ElementType::String => DataType::DtString as i32,
            ElementType::Bool => DataType::DtBool as i32,
            ElementType::Other(value) => value,
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match DataType::try_from(self.to_wire()) {
            Ok(dtype) => write!(f, "{}", dtype.as_str_name()),
            Err(_) => write!(f, "DT_UNKNOWN({})", self.to_wire()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum TensorValues {
    Float(Vec<f32>),
    Double(Vec<f64>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    String(Vec<Vec<u8>>),
    Bool(Vec<bool>),
    /// Values of an element type the harness does not decode.
    Unsupported,
}

impl TensorValues {
    pub fn len(&self) -> usize {
        match self {
            TensorValues::Float(v) => v.len(),
            TensorValues::Double(v) => v.len(),
            TensorValues::Int32(v) => v.len(),
            TensorValues::Int64(v) => v.len(),
            TensorValues::String(v) => v.len(),
            TensorValues::Bool(v) => v.len(),
            TensorValues::Unsupported => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element_type(&self) -> ElementType {
        match self {
            TensorValues::Float(_) => ElementType::Float,
            TensorValues::Double(_) => ElementType::Double,
            TensorValues::Int32(_) => ElementType::Int32,
            TensorValues::Int64(_) => ElementType::Int64,
            TensorValues::String(_) => ElementType::String,
            TensorValues::Bool(_) => ElementType::Bool,
            TensorValues::Unsupported => ElementType::Other(DataType::DtInvalid as i32),
        }
    }
}

/// A typed tensor: element type, shape and flattened values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tensor {
    dtype: ElementType,
    shape: Vec<i64>,
    values: TensorValues,
}

impl Tensor {
    pub fn new(shape: Vec<i64>, values: TensorValues) -> Self {
        Self {
            dtype: values.element_type(),
            shape,
            values,
        }
    }

    /// Rank-1 float tensor holding `values`.
    pub fn floats(values: Vec<f32>) -> Self {
        let len = values.len() as i64;
        Self::new(vec![len], TensorValues::Float(values))
    }

    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    pub fn values(&self) -> &TensorValues {
        &self.values
    }

    pub fn to_proto(&self) -> TensorProto {
        let mut proto = TensorProto {
            dtype: self.dtype.to_wire(),
            tensor_shape: Some(TensorShapeProto::from_dims(&self.shape)),
            ..Default::default()
        };
        match &self.values {
            TensorValues::Float(v) => proto.float_val = v.clone(),
            TensorValues::Double(v) => proto.double_val = v.clone(),
            TensorValues::Int32(v) => proto.int_val = v.clone(),
            TensorValues::Int64(v) => proto.int64_val = v.clone(),
            TensorValues::String(v) => proto.string_val = v.clone(),
            TensorValues::Bool(v) => proto.bool_val = v.clone(),
            TensorValues::Unsupported => {}
        }
        proto
    }

    /// Decodes a wire tensor. Values are read from the typed `*_val` field
    /// matching `dtype`, or from `tensor_content` when that field is empty.
    pub fn from_proto(proto: TensorProto) -> Self {
        let dtype = ElementType::from_wire(proto.dtype);
        let shape = proto
            .tensor_shape
            .as_ref()
            .map(TensorShapeProto::dims)
            .unwrap_or_default();
        let content = proto.tensor_content;
        let values = match dtype {
            ElementType::Float => {
                TensorValues::Float(or_content(proto.float_val, &content, f32::from_le_bytes))
            }
            ElementType::Double => {
                TensorValues::Double(or_content(proto.double_val, &content, f64::from_le_bytes))
            }
            ElementType::Int32 => {
                TensorValues::Int32(or_content(proto.int_val, &content, i32::from_le_bytes))
            }
            ElementType::Int64 => {
                TensorValues::Int64(or_content(proto.int64_val, &content, i64::from_le_bytes))
            }
            ElementType::Bool => TensorValues::Bool(or_content(proto.bool_val, &content, |b: [u8; 1]| {
                b[0] != 0
            })),
            ElementType::String => TensorValues::String(proto.string_val),
            ElementType::Other(_) => TensorValues::Unsupported,
        };
        Self {
            dtype,
            shape,
            values,
        }
    }
}

fn or_content<T, const N: usize>(typed: Vec<T>, content: &[u8], decode: fn([u8; N]) -> T) -> Vec<T> {
    if !typed.is_empty() || content.is_empty() {
        return typed;
    }
    content
        .chunks_exact(N)
        .map(|chunk| {
            let mut buf = [0u8; N];
            buf.copy_from_slice(chunk);
            decode(buf)
        })
        .collect()
}
