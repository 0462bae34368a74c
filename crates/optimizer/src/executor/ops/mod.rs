//! Operator kernels of the reference executor
//!
//! - `broadcast`: NumPy broadcasting of shapes and indices
//! - `elementwise`: binary, variadic, comparison and logical operators, Where
//! - `unary`: element-wise math and Cast
//! - `shape`: constants, shape queries and data movement (Reshape, Slice, Gather...)
//! - `matmul`: matrix multiplication with batch broadcasting

mod broadcast;
mod elementwise;
mod matmul;
mod shape;
mod unary;

use super::OpInputs;
use crate::error::{OptimizerError, Result};
use crate::graph::ir::GraphNode;
use crate::tensor::Tensor;

pub(crate) const SUPPORTED_OPS: &[&str] = &[
    // elementwise
    "Add", "Sub", "Mul", "Div", "Pow", "Mod", "Max", "Min", "Sum", "Mean", "Equal", "Less", "LessOrEqual", "Greater",
    "GreaterOrEqual", "And", "Or", "Xor", "Where",
    // unary
    "Neg", "Abs", "Relu", "Sqrt", "Exp", "Log", "Sigmoid", "Tanh", "Reciprocal", "Floor", "Ceil", "Sin", "Cos", "Not",
    "Identity", "Cast",
    // shape
    "Constant", "ConstantOfShape", "Shape", "Size", "Reshape", "Flatten", "Unsqueeze", "Squeeze", "Concat", "Gather",
    "Slice", "Transpose", "Expand", "Range",
    // matrix
    "MatMul",
];

/// Run one operator, producing its single output
pub(crate) fn execute(node: &GraphNode, inputs: &OpInputs<'_>) -> Result<Tensor> {
    match node.op_type.as_str() {
        "Add" | "Sub" | "Mul" | "Div" | "Pow" | "Mod" => {
            elementwise::arithmetic(node, inputs.required(0)?, inputs.required(1)?)
        }
        "Max" | "Min" | "Sum" | "Mean" => elementwise::variadic(&node.op_type, &inputs.all_required()?),
        "Equal" | "Less" | "LessOrEqual" | "Greater" | "GreaterOrEqual" => {
            elementwise::compare(&node.op_type, inputs.required(0)?, inputs.required(1)?)
        }
        "And" | "Or" | "Xor" => elementwise::logical(&node.op_type, inputs.required(0)?, inputs.required(1)?),
        "Where" => elementwise::select(inputs.required(0)?, inputs.required(1)?, inputs.required(2)?),

        "Cast" => unary::cast(node, inputs.required(0)?),
        "Identity" => Ok(inputs.required(0)?.clone()),
        "Not" => unary::not(inputs.required(0)?),
        "Neg" | "Abs" | "Relu" | "Sqrt" | "Exp" | "Log" | "Sigmoid" | "Tanh" | "Reciprocal" | "Floor" | "Ceil"
        | "Sin" | "Cos" => unary::math(&node.op_type, inputs.required(0)?),

        "Constant" => shape::constant(node),
        "ConstantOfShape" => shape::constant_of_shape(node, inputs.required(0)?),
        "Shape" => shape::shape(node, inputs.required(0)?),
        "Size" => Ok(Tensor::scalar(inputs.required(0)?.len() as i64)),
        "Reshape" => shape::reshape(node, inputs.required(0)?, inputs.required(1)?),
        "Flatten" => shape::flatten(node, inputs.required(0)?),
        "Unsqueeze" => shape::unsqueeze(node, inputs.required(0)?, inputs.optional(1)),
        "Squeeze" => shape::squeeze(node, inputs.required(0)?, inputs.optional(1)),
        "Concat" => shape::concat(node, &inputs.all_required()?),
        "Gather" => shape::gather(node, inputs.required(0)?, inputs.required(1)?),
        "Slice" => shape::slice(node, inputs),
        "Transpose" => shape::transpose(node, inputs.required(0)?),
        "Expand" => shape::expand(inputs.required(0)?, inputs.required(1)?),
        "Range" => shape::range(inputs.required(0)?, inputs.required(1)?, inputs.required(2)?),

        "MatMul" => matmul::matmul(inputs.required(0)?, inputs.required(1)?),

        other => Err(OptimizerError::UnsupportedOp(other.to_string())),
    }
}

/// Error for an operator applied to element types it doesn't accept
pub(crate) fn type_error(op_type: &str, tensors: &[&Tensor]) -> OptimizerError {
    let types: Vec<String> = tensors.iter().map(|t| format!("{:?}", t.data_type())).collect();
    OptimizerError::ExecutionError(format!("{} does not support inputs of type ({})", op_type, types.join(", ")))
}

/// Resolve a possibly negative axis against `rank`
pub(crate) fn normalize_axis(axis: i64, rank: usize, op_type: &str) -> Result<usize> {
    let rank_i = rank as i64;
    let resolved = if axis < 0 { axis + rank_i } else { axis };
    if resolved < 0 || resolved >= rank_i {
        return Err(OptimizerError::InvalidAttribute(format!(
            "{}: axis {} out of range for rank {}",
            op_type, axis, rank
        )));
    }
    Ok(resolved as usize)
}

/// Row-major strides of `shape`
pub(crate) fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Flat source indices for every combination of per-axis source coordinates
///
/// Output order is row-major over the axes as listed.
pub(crate) fn cartesian_indices(per_axis: &[Vec<usize>], strides: &[usize]) -> Vec<usize> {
    let mut indices = vec![0usize];
    for (coords, &stride) in per_axis.iter().zip(strides) {
        let mut next = Vec::with_capacity(indices.len() * coords.len());
        for &base in &indices {
            for &coord in coords {
                next.push(base + coord * stride);
            }
        }
        indices = next;
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides() {
        assert_eq!(strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(strides(&[]), Vec::<usize>::new());
    }

    #[test]
    fn test_normalize_axis() {
        assert_eq!(normalize_axis(-1, 3, "Op").unwrap(), 2);
        assert_eq!(normalize_axis(0, 3, "Op").unwrap(), 0);
        assert!(normalize_axis(3, 3, "Op").is_err());
        assert!(normalize_axis(-4, 3, "Op").is_err());
    }

    #[test]
    fn test_cartesian_indices() {
        // rows 0 and 1 of a [3, 2] matrix, reversed columns
        let indices = cartesian_indices(&[vec![0, 1], vec![1, 0]], &[2, 1]);
        assert_eq!(indices, vec![1, 0, 3, 2]);
    }

    #[test]
    fn test_supported_ops_dispatch() {
        // every listed op must be routed somewhere other than the fallback arm
        for op in SUPPORTED_OPS {
            let node = GraphNode::new(*op, Vec::<String>::new(), ["y"]);
            let inputs = OpInputs::new(op, &[]);
            let result = execute(&node, &inputs);
            assert!(
                !matches!(result, Err(OptimizerError::UnsupportedOp(_))),
                "{} fell through to UnsupportedOp",
                op
            );
        }
    }
}
