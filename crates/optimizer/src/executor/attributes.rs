//! Node attribute access
//!
//! Readers return `None` for absent attributes so each operator can apply the
//! default its definition prescribes. The `*_attr` constructors build attributes
//! for nodes created in code.

use crate::error::{OptimizerError, Result};
use crate::graph::ir::GraphNode;
use crate::proto::attribute_proto::AttributeType;
use crate::proto::AttributeProto;
use crate::tensor::Tensor;

pub fn int(node: &GraphNode, name: &str) -> Option<i64> {
    node.get_attribute(name).map(|attr| attr.i)
}

pub fn int_or(node: &GraphNode, name: &str, default: i64) -> i64 {
    int(node, name).unwrap_or(default)
}

pub fn ints(node: &GraphNode, name: &str) -> Option<Vec<i64>> {
    node.get_attribute(name).map(|attr| attr.ints.clone())
}

pub fn float(node: &GraphNode, name: &str) -> Option<f32> {
    node.get_attribute(name).map(|attr| attr.f)
}

pub fn floats(node: &GraphNode, name: &str) -> Option<Vec<f32>> {
    node.get_attribute(name).map(|attr| attr.floats.clone())
}

/// Decode a tensor-valued attribute
pub fn tensor(node: &GraphNode, name: &str) -> Result<Option<Tensor>> {
    match node.get_attribute(name) {
        None => Ok(None),
        Some(attr) => {
            let proto = attr.t.as_ref().ok_or_else(|| {
                OptimizerError::InvalidAttribute(format!("{}.{} is not a tensor", node.op_type, name))
            })?;
            Tensor::from_proto(proto).map(Some)
        }
    }
}

/// Read a required integer attribute
pub fn required_int(node: &GraphNode, name: &str) -> Result<i64> {
    int(node, name).ok_or_else(|| OptimizerError::MissingAttribute(format!("{}.{}", node.op_type, name)))
}

pub fn int_attr(name: &str, value: i64) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        r#type: AttributeType::Int as i32,
        i: value,
        ..Default::default()
    }
}

pub fn ints_attr(name: &str, values: &[i64]) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        r#type: AttributeType::Ints as i32,
        ints: values.to_vec(),
        ..Default::default()
    }
}

pub fn float_attr(name: &str, value: f32) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        r#type: AttributeType::Float as i32,
        f: value,
        ..Default::default()
    }
}

pub fn tensor_attr(name: &str, value: &Tensor) -> AttributeProto {
    AttributeProto {
        name: name.to_string(),
        r#type: AttributeType::Tensor as i32,
        t: Some(value.to_proto("")),
        ..Default::default()
    }
}
