//! Element-wise unary operators and Cast

use super::type_error;
use crate::error::{OptimizerError, Result};
use crate::executor::attributes;
use crate::graph::ir::GraphNode;
use crate::numeric::Numeric;
use crate::proto::tensor_proto::DataType;
use crate::tensor::{Tensor, TensorData};

fn neg<T: Numeric>(v: &[T]) -> Vec<T> {
    v.iter().map(|&x| T::zero().sub(x)).collect()
}

fn abs<T: Numeric>(v: &[T]) -> Vec<T> {
    v.iter().map(|&x| if x < T::zero() { T::zero().sub(x) } else { x }).collect()
}

fn relu<T: Numeric>(v: &[T]) -> Vec<T> {
    v.iter().map(|&x| if x > T::zero() { x } else { T::zero() }).collect()
}

fn float_map<T: Numeric>(v: &[T], f: fn(f64) -> f64) -> Vec<T> {
    v.iter().map(|&x| T::from_f64(f(x.to_f64()))).collect()
}

fn float_fn(op_type: &str) -> Option<fn(f64) -> f64> {
    let f: fn(f64) -> f64 = match op_type {
        "Sqrt" => f64::sqrt,
        "Exp" => f64::exp,
        "Log" => f64::ln,
        "Sigmoid" => |x| 1.0 / (1.0 + (-x).exp()),
        "Tanh" => f64::tanh,
        "Reciprocal" => |x| 1.0 / x,
        "Floor" => f64::floor,
        "Ceil" => f64::ceil,
        "Sin" => f64::sin,
        "Cos" => f64::cos,
        _ => return None,
    };
    Some(f)
}

/// Neg, Abs, Relu and the floating point math functions
pub(crate) fn math(op_type: &str, input: &Tensor) -> Result<Tensor> {
    let data = match op_type {
        "Neg" => map_signed!(input.data(), v => neg(v), _ => return Err(type_error(op_type, &[input]))),
        "Abs" => map_numeric!(input.data(), v => abs(v), _ => return Err(type_error(op_type, &[input]))),
        "Relu" => map_signed!(input.data(), v => relu(v), _ => return Err(type_error(op_type, &[input]))),
        other => {
            let f = float_fn(other).ok_or_else(|| OptimizerError::UnsupportedOp(other.to_string()))?;
            map_float!(input.data(), v => float_map(v, f), _ => return Err(type_error(op_type, &[input])))
        }
    };
    Tensor::new(input.shape().to_vec(), data)
}

/// Logical not
pub(crate) fn not(input: &Tensor) -> Result<Tensor> {
    let TensorData::Bool(v) = input.data() else {
        return Err(type_error("Not", &[input]));
    };
    Tensor::from_vec(input.shape().to_vec(), v.iter().map(|b| !b).collect())
}

/// Cast to the element type named by the `to` attribute
pub(crate) fn cast(node: &GraphNode, input: &Tensor) -> Result<Tensor> {
    let to = attributes::required_int(node, "to")?;
    let to = i32::try_from(to)
        .ok()
        .and_then(|code| DataType::try_from(code).ok())
        .ok_or_else(|| OptimizerError::InvalidAttribute(format!("Cast.to = {}", to)))?;

    Tensor::new(input.shape().to_vec(), input.data().cast(to)?)
}
