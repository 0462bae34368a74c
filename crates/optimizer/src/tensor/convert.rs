// Conversion between `Tensor` and ONNX `TensorProto` / `ValueInfoProto`
//
// Values are read from the typed repeated fields or from little-endian `raw_data`,
// and always written back as `raw_data`.

use super::{Tensor, TensorData};
use crate::error::{OptimizerError, Result};
use crate::numeric::Numeric;
use crate::proto::tensor_proto::{DataLocation, DataType};
use crate::proto::tensor_shape_proto::{dimension, Dimension};
use crate::proto::{type_proto, TensorProto, TensorShapeProto, TypeProto, ValueInfoProto};
use half::{bf16, f16};
use std::path::Path;

/// Convert ONNX `dims` into a shape, rejecting negative extents
pub fn dims_to_shape(dims: &[i64]) -> Result<Vec<usize>> {
    dims.iter()
        .map(|&d| {
            usize::try_from(d).map_err(|_| OptimizerError::InvalidModel(format!("negative dimension {} in {:?}", d, dims)))
        })
        .collect()
}

/// Read the bytes of a tensor stored outside the model file
///
/// The `location` entry is resolved relative to `base_dir`; `offset` and `length`
/// select a byte range of that file.
pub fn read_external_data(tensor: &TensorProto, base_dir: &Path) -> Result<Vec<u8>> {
    let mut location = None;
    let mut offset: Option<usize> = None;
    let mut length: Option<usize> = None;

    for entry in &tensor.external_data {
        match entry.key.as_str() {
            "location" => location = Some(entry.value.clone()),
            "offset" => offset = entry.value.parse().ok(),
            "length" => length = entry.value.parse().ok(),
            _ => {}
        }
    }

    let location = location.ok_or_else(|| {
        OptimizerError::InvalidModel(format!(
            "External data for tensor '{}' missing 'location' key",
            tensor.name
        ))
    })?;

    let external_path = base_dir.join(&location);
    let file_data = std::fs::read(&external_path)?;

    let start = offset.unwrap_or(0);
    let end = match length {
        Some(len) => start.saturating_add(len),
        None => file_data.len(),
    };

    file_data.get(start..end).map(<[u8]>::to_vec).ok_or_else(|| {
        OptimizerError::InvalidModel(format!(
            "External data range {}..{} for tensor '{}' exceeds {} ({} bytes)",
            start,
            end,
            tensor.name,
            external_path.display(),
            file_data.len()
        ))
    })
}

fn decode_raw<T: Numeric>(raw: &[u8], name: &str) -> Result<Vec<T>> {
    if raw.len() % T::BYTE_WIDTH != 0 {
        return Err(OptimizerError::ParseError(format!(
            "raw_data of tensor '{}' has {} bytes, not a multiple of {}",
            name,
            raw.len(),
            T::BYTE_WIDTH
        )));
    }
    Ok(raw.chunks_exact(T::BYTE_WIDTH).map(T::read_le).collect())
}

fn encode_raw<T: Numeric>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::BYTE_WIDTH);
    for value in values {
        value.write_le(&mut out);
    }
    out
}

/// Narrow the `int32_data` / `uint64_data` storage of small types
fn narrow<S: Numeric, T: Numeric>(values: &[S]) -> Vec<T> {
    values.iter().map(|v| T::from_i64(v.to_i64())).collect()
}

impl Tensor {
    /// Decode a `TensorProto` whose data is stored inline
    pub fn from_proto(proto: &TensorProto) -> Result<Self> {
        Self::from_proto_in(proto, None)
    }

    /// Decode a `TensorProto`, resolving external data relative to `base_dir`
    pub fn from_proto_in(proto: &TensorProto, base_dir: Option<&Path>) -> Result<Self> {
        let shape = dims_to_shape(&proto.dims)?;
        let data_type = DataType::try_from(proto.data_type).map_err(|_| {
            OptimizerError::UnsupportedDataType(format!("{} (tensor '{}')", proto.data_type, proto.name))
        })?;

        let location = DataLocation::try_from(proto.data_location).unwrap_or(DataLocation::Default);
        let external;
        let raw: &[u8] = if location == DataLocation::External {
            let dir = base_dir.ok_or_else(|| {
                OptimizerError::InvalidModel(format!(
                    "tensor '{}' uses external data but the model directory is unknown",
                    proto.name
                ))
            })?;
            external = read_external_data(proto, dir)?;
            &external
        } else {
            &proto.raw_data
        };

        let name = proto.name.as_str();
        let has_raw = !raw.is_empty();

        let data = match data_type {
            DataType::Float if has_raw => TensorData::Float(decode_raw(raw, name)?),
            DataType::Float => TensorData::Float(proto.float_data.clone()),
            DataType::Double if has_raw => TensorData::Double(decode_raw(raw, name)?),
            DataType::Double => TensorData::Double(proto.double_data.clone()),
            // Typed half precision values are bit patterns in int32_data
            DataType::Float16 if has_raw => TensorData::Float16(decode_raw(raw, name)?),
            DataType::Float16 => TensorData::Float16(proto.int32_data.iter().map(|&v| f16::from_bits(v as u16)).collect()),
            DataType::Bfloat16 if has_raw => TensorData::Bfloat16(decode_raw(raw, name)?),
            DataType::Bfloat16 => TensorData::Bfloat16(proto.int32_data.iter().map(|&v| bf16::from_bits(v as u16)).collect()),
            DataType::Int64 if has_raw => TensorData::Int64(decode_raw(raw, name)?),
            DataType::Int64 => TensorData::Int64(proto.int64_data.clone()),
            DataType::Int32 if has_raw => TensorData::Int32(decode_raw(raw, name)?),
            DataType::Int32 => TensorData::Int32(proto.int32_data.clone()),
            DataType::Int16 if has_raw => TensorData::Int16(decode_raw(raw, name)?),
            DataType::Int16 => TensorData::Int16(narrow(&proto.int32_data)),
            DataType::Int8 if has_raw => TensorData::Int8(decode_raw(raw, name)?),
            DataType::Int8 => TensorData::Int8(narrow(&proto.int32_data)),
            DataType::Uint8 if has_raw => TensorData::Uint8(decode_raw(raw, name)?),
            DataType::Uint8 => TensorData::Uint8(narrow(&proto.int32_data)),
            DataType::Uint16 if has_raw => TensorData::Uint16(decode_raw(raw, name)?),
            DataType::Uint16 => TensorData::Uint16(narrow(&proto.int32_data)),
            DataType::Uint32 if has_raw => TensorData::Uint32(decode_raw(raw, name)?),
            DataType::Uint32 => TensorData::Uint32(narrow(&proto.uint64_data)),
            DataType::Uint64 if has_raw => TensorData::Uint64(decode_raw(raw, name)?),
            DataType::Uint64 => TensorData::Uint64(proto.uint64_data.clone()),
            DataType::Bool if has_raw => TensorData::Bool(raw.iter().map(|&b| b != 0).collect()),
            DataType::Bool => TensorData::Bool(proto.int32_data.iter().map(|&v| v != 0).collect()),
            other => {
                return Err(OptimizerError::UnsupportedDataType(format!(
                    "{:?} (tensor '{}')",
                    other, proto.name
                )))
            }
        };

        Self::new(shape, data).map_err(|err| match err {
            OptimizerError::ShapeMismatch(msg) => {
                OptimizerError::ParseError(format!("tensor '{}': {}", proto.name, msg))
            }
            other => other,
        })
    }

    /// Encode as an initializer named `name`, data in little-endian `raw_data`
    pub fn to_proto(&self, name: &str) -> TensorProto {
        let raw_data = match self.data() {
            TensorData::Float(v) => encode_raw(v),
            TensorData::Double(v) => encode_raw(v),
            TensorData::Float16(v) => encode_raw(v),
            TensorData::Bfloat16(v) => encode_raw(v),
            TensorData::Int8(v) => encode_raw(v),
            TensorData::Int16(v) => encode_raw(v),
            TensorData::Int32(v) => encode_raw(v),
            TensorData::Int64(v) => encode_raw(v),
            TensorData::Uint8(v) => encode_raw(v),
            TensorData::Uint16(v) => encode_raw(v),
            TensorData::Uint32(v) => encode_raw(v),
            TensorData::Uint64(v) => encode_raw(v),
            TensorData::Bool(v) => v.iter().map(|&b| b as u8).collect(),
        };

        TensorProto {
            name: name.to_string(),
            dims: self.shape().iter().map(|&d| d as i64).collect(),
            data_type: self.data_type() as i32,
            raw_data,
            ..Default::default()
        }
    }

    /// Graph-level value info describing this tensor's element type and shape
    pub fn value_info(&self, name: &str) -> ValueInfoProto {
        let dims = self
            .shape()
            .iter()
            .map(|&d| Dimension {
                value: Some(dimension::Value::DimValue(d as i64)),
                ..Default::default()
            })
            .collect();

        ValueInfoProto {
            name: name.to_string(),
            r#type: Some(TypeProto {
                value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                    elem_type: self.data_type() as i32,
                    shape: Some(TensorShapeProto { dim: dims }),
                })),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
