//! Dense tensors for constant values
//!
//! `Tensor` is the in-memory form of a constant: a shape plus a typed element buffer.
//! Initializers are decoded into tensors on demand, the executor computes on them and
//! folded results are encoded back into `TensorProto` initializers.

mod convert;

pub use convert::{dims_to_shape, read_external_data};

use crate::error::{OptimizerError, Result};
use crate::numeric::Numeric;
use crate::proto::tensor_proto::DataType;
use half::{bf16, f16};

/// Element buffer of a tensor, one variant per supported ONNX element type
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Float(Vec<f32>),
    Double(Vec<f64>),
    Float16(Vec<f16>),
    Bfloat16(Vec<bf16>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Uint64(Vec<u64>),
    Bool(Vec<bool>),
}

/// Rust element types that map onto a `TensorData` variant
pub trait Element: Clone + Send + Sync + 'static {
    /// ONNX element type of this Rust type
    const DATA_TYPE: DataType;

    /// Wrap a vector into the matching variant
    fn wrap(values: Vec<Self>) -> TensorData;

    /// Borrow the vector if `data` is the matching variant
    fn unwrap(data: &TensorData) -> Option<&[Self]>;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DATA_TYPE: DataType = DataType::$variant;

                fn wrap(values: Vec<Self>) -> TensorData {
                    TensorData::$variant(values)
                }

                fn unwrap(data: &TensorData) -> Option<&[Self]> {
                    match data {
                        TensorData::$variant(values) => Some(values),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_element! {
    f32 => Float,
    f64 => Double,
    f16 => Float16,
    bf16 => Bfloat16,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    bool => Bool,
}

/// Intermediate representation used by `cast`
enum CastSource {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Uint(Vec<u64>),
    Bool(Vec<bool>),
}

impl CastSource {
    fn into_numeric<T: Numeric>(self) -> Vec<T> {
        match self {
            CastSource::Float(values) => values.into_iter().map(T::from_f64).collect(),
            CastSource::Int(values) => values.into_iter().map(T::from_i64).collect(),
            // Reinterpreting as i64 keeps `as` semantics for integer targets
            CastSource::Uint(values) if T::IS_FLOAT => values.into_iter().map(|v| T::from_f64(v as f64)).collect(),
            CastSource::Uint(values) => values.into_iter().map(|v| T::from_i64(v as i64)).collect(),
            CastSource::Bool(values) => values
                .into_iter()
                .map(|b| if b { T::one() } else { T::zero() })
                .collect(),
        }
    }

    fn into_bool(self) -> Vec<bool> {
        match self {
            CastSource::Float(values) => values.into_iter().map(|v| v != 0.0).collect(),
            CastSource::Int(values) => values.into_iter().map(|v| v != 0).collect(),
            CastSource::Uint(values) => values.into_iter().map(|v| v != 0).collect(),
            CastSource::Bool(values) => values,
        }
    }
}

fn cast_source<T: Numeric>(values: &[T]) -> CastSource {
    if T::IS_FLOAT {
        CastSource::Float(values.iter().map(|v| v.to_f64()).collect())
    } else {
        CastSource::Int(values.iter().map(|v| v.to_i64()).collect())
    }
}

impl TensorData {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            TensorData::Float(v) => v.len(),
            TensorData::Double(v) => v.len(),
            TensorData::Float16(v) => v.len(),
            TensorData::Bfloat16(v) => v.len(),
            TensorData::Int8(v) => v.len(),
            TensorData::Int16(v) => v.len(),
            TensorData::Int32(v) => v.len(),
            TensorData::Int64(v) => v.len(),
            TensorData::Uint8(v) => v.len(),
            TensorData::Uint16(v) => v.len(),
            TensorData::Uint32(v) => v.len(),
            TensorData::Uint64(v) => v.len(),
            TensorData::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// ONNX element type of this buffer
    pub fn data_type(&self) -> DataType {
        match self {
            TensorData::Float(_) => DataType::Float,
            TensorData::Double(_) => DataType::Double,
            TensorData::Float16(_) => DataType::Float16,
            TensorData::Bfloat16(_) => DataType::Bfloat16,
            TensorData::Int8(_) => DataType::Int8,
            TensorData::Int16(_) => DataType::Int16,
            TensorData::Int32(_) => DataType::Int32,
            TensorData::Int64(_) => DataType::Int64,
            TensorData::Uint8(_) => DataType::Uint8,
            TensorData::Uint16(_) => DataType::Uint16,
            TensorData::Uint32(_) => DataType::Uint32,
            TensorData::Uint64(_) => DataType::Uint64,
            TensorData::Bool(_) => DataType::Bool,
        }
    }

    /// Whether the elements are floating point values
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            TensorData::Float(_) | TensorData::Double(_) | TensorData::Float16(_) | TensorData::Bfloat16(_)
        )
    }

    /// Convert every element to `to`, with `as`-cast semantics between numeric types
    pub fn cast(&self, to: DataType) -> Result<TensorData> {
        if self.data_type() == to {
            return Ok(self.clone());
        }

        let source = match self {
            TensorData::Float(v) => cast_source(v),
            TensorData::Double(v) => cast_source(v),
            TensorData::Float16(v) => cast_source(v),
            TensorData::Bfloat16(v) => cast_source(v),
            TensorData::Int8(v) => cast_source(v),
            TensorData::Int16(v) => cast_source(v),
            TensorData::Int32(v) => cast_source(v),
            TensorData::Int64(v) => cast_source(v),
            TensorData::Uint8(v) => cast_source(v),
            TensorData::Uint16(v) => cast_source(v),
            TensorData::Uint32(v) => cast_source(v),
            TensorData::Uint64(v) => CastSource::Uint(v.clone()),
            TensorData::Bool(v) => CastSource::Bool(v.clone()),
        };

        let data = match to {
            DataType::Float => TensorData::Float(source.into_numeric()),
            DataType::Double => TensorData::Double(source.into_numeric()),
            DataType::Float16 => TensorData::Float16(source.into_numeric()),
            DataType::Bfloat16 => TensorData::Bfloat16(source.into_numeric()),
            DataType::Int8 => TensorData::Int8(source.into_numeric()),
            DataType::Int16 => TensorData::Int16(source.into_numeric()),
            DataType::Int32 => TensorData::Int32(source.into_numeric()),
            DataType::Int64 => TensorData::Int64(source.into_numeric()),
            DataType::Uint8 => TensorData::Uint8(source.into_numeric()),
            DataType::Uint16 => TensorData::Uint16(source.into_numeric()),
            DataType::Uint32 => TensorData::Uint32(source.into_numeric()),
            DataType::Uint64 => TensorData::Uint64(source.into_numeric()),
            DataType::Bool => TensorData::Bool(source.into_bool()),
            other => return Err(OptimizerError::UnsupportedDataType(format!("cast to {:?}", other))),
        };

        Ok(data)
    }

    /// Buffer of `len` copies of the first element of `self`
    pub fn splat(&self, len: usize) -> Result<TensorData> {
        if self.is_empty() {
            return Err(OptimizerError::ExecutionError(
                "cannot broadcast an empty value".to_string(),
            ));
        }
        Ok(map_any!(self, v => vec![v[0].clone(); len]))
    }

    /// Gather elements by flat index
    pub fn take(&self, indices: &[usize]) -> TensorData {
        map_any!(self, v => indices.iter().map(|&i| v[i].clone()).collect())
    }
}

/// A dense tensor: shape plus row-major element buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: TensorData,
}

impl Tensor {
    /// Create a tensor, checking that the buffer matches the shape
    pub fn new(shape: Vec<usize>, data: TensorData) -> Result<Self> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| OptimizerError::ShapeMismatch(format!("shape {:?} overflows the element count", shape)))?;
        if expected != data.len() {
            return Err(OptimizerError::ShapeMismatch(format!(
                "shape {:?} needs {} elements, buffer has {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Create a tensor from a typed vector
    pub fn from_vec<T: Element>(shape: Vec<usize>, values: Vec<T>) -> Result<Self> {
        Self::new(shape, T::wrap(values))
    }

    /// Create a rank-0 tensor
    pub fn scalar<T: Element>(value: T) -> Self {
        Self {
            shape: Vec::new(),
            data: T::wrap(vec![value]),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn into_data(self) -> TensorData {
        self.data
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Borrow the elements as `T`, `None` if the element type differs
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::unwrap(&self.data)
    }

    /// Same data with a new shape of equal element count
    pub fn reshape(self, shape: Vec<usize>) -> Result<Self> {
        Self::new(shape, self.data)
    }

    /// Read an integer tensor (shape, axes, indices...) as `i64` values
    pub fn to_i64_vec(&self) -> Result<Vec<i64>> {
        let values = match &self.data {
            TensorData::Int64(v) => v.clone(),
            TensorData::Int32(v) => v.iter().map(|&x| x as i64).collect(),
            TensorData::Int16(v) => v.iter().map(|&x| x as i64).collect(),
            TensorData::Int8(v) => v.iter().map(|&x| x as i64).collect(),
            TensorData::Uint8(v) => v.iter().map(|&x| x as i64).collect(),
            TensorData::Uint16(v) => v.iter().map(|&x| x as i64).collect(),
            TensorData::Uint32(v) => v.iter().map(|&x| x as i64).collect(),
            TensorData::Uint64(v) => v.iter().map(|&x| x as i64).collect(),
            other => {
                return Err(OptimizerError::ExecutionError(format!(
                    "expected an integer tensor, got {:?}",
                    other.data_type()
                )))
            }
        };
        Ok(values)
    }

    /// Read the only element of a one-element tensor as `i64`
    pub fn scalar_i64(&self) -> Result<i64> {
        match self.to_i64_vec()?.as_slice() {
            [value] => Ok(*value),
            values => Err(OptimizerError::ShapeMismatch(format!(
                "expected a single value, got {} elements",
                values.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_element_count() {
        assert!(Tensor::from_vec(vec![2, 2], vec![1.0f32, 2.0, 3.0, 4.0]).is_ok());
        let err = Tensor::from_vec(vec![2, 3], vec![1.0f32, 2.0]).unwrap_err();
        assert!(matches!(err, OptimizerError::ShapeMismatch(_)));
    }

    #[test]
    fn test_scalar() {
        let t = Tensor::scalar(5i64);
        assert_eq!(t.rank(), 0);
        assert_eq!(t.len(), 1);
        assert_eq!(t.data_type(), DataType::Int64);
        assert_eq!(t.scalar_i64().unwrap(), 5);
    }

    #[test]
    fn test_as_slice_type_check() {
        let t = Tensor::from_vec(vec![3], vec![1i32, 2, 3]).unwrap();
        assert_eq!(t.as_slice::<i32>(), Some(&[1, 2, 3][..]));
        assert_eq!(t.as_slice::<f32>(), None);
    }

    #[test]
    fn test_cast_float_to_int_truncates() {
        let data = TensorData::Float(vec![1.9, -1.9, 0.0]);
        assert_eq!(data.cast(DataType::Int32).unwrap(), TensorData::Int32(vec![1, -1, 0]));
    }

    #[test]
    fn test_cast_bool_roundtrip() {
        let data = TensorData::Int64(vec![0, 3, -2]);
        let as_bool = data.cast(DataType::Bool).unwrap();
        assert_eq!(as_bool, TensorData::Bool(vec![false, true, true]));
        assert_eq!(as_bool.cast(DataType::Float).unwrap(), TensorData::Float(vec![0.0, 1.0, 1.0]));
    }

    #[test]
    fn test_new_rejects_overflowing_shape() {
        let err = Tensor::new(vec![usize::MAX, 2], TensorData::Float(vec![])).unwrap_err();
        assert!(matches!(err, OptimizerError::ShapeMismatch(_)));
        assert!(Tensor::new(vec![usize::MAX, 0], TensorData::Float(vec![])).is_ok());
    }

    #[test]
    fn test_cast_large_uint64() {
        let data = TensorData::Uint64(vec![u64::MAX, 1 << 63, 7]);
        assert_eq!(
            data.cast(DataType::Double).unwrap(),
            TensorData::Double(vec![u64::MAX as f64, 9_223_372_036_854_775_808.0, 7.0])
        );
        assert_eq!(
            data.cast(DataType::Uint32).unwrap(),
            TensorData::Uint32(vec![u32::MAX, 0, 7])
        );
        assert_eq!(data.cast(DataType::Bool).unwrap(), TensorData::Bool(vec![true, true, true]));
    }

    #[test]
    fn test_cast_half_precision() {
        let data = TensorData::Float(vec![1.5, -2.0, 65504.0]);
        let halves = data.cast(DataType::Float16).unwrap();
        assert_eq!(
            halves,
            TensorData::Float16(vec![f16::from_f32(1.5), f16::from_f32(-2.0), f16::MAX])
        );
        assert_eq!(halves.cast(DataType::Int32).unwrap(), TensorData::Int32(vec![1, -2, 65504]));
        assert_eq!(
            halves.cast(DataType::Bfloat16).unwrap().cast(DataType::Float).unwrap(),
            TensorData::Float(vec![1.5, -2.0, 65536.0])
        );
    }

    #[test]
    fn test_cast_unsupported_target() {
        let data = TensorData::Float(vec![1.0]);
        assert!(matches!(
            data.cast(DataType::String),
            Err(OptimizerError::UnsupportedDataType(_))
        ));
    }

    #[test]
    fn test_to_i64_vec_rejects_floats() {
        let t = Tensor::from_vec(vec![1], vec![1.0f32]).unwrap();
        assert!(t.to_i64_vec().is_err());
    }
}
