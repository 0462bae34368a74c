//! Element-wise binary and variadic operators with broadcasting

use super::broadcast::{broadcast_all, broadcast_indices, zip_broadcast};
use super::type_error;
use crate::error::{OptimizerError, Result};
use crate::executor::attributes;
use crate::graph::ir::GraphNode;
use crate::numeric::Numeric;
use crate::tensor::{Tensor, TensorData};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Mod { fmod: bool },
    Max,
    Min,
}

fn floor_mod<T: Numeric>(a: T, b: T) -> Option<T> {
    let r = a.checked_rem(b)?;
    if r != T::zero() && ((r < T::zero()) != (b < T::zero())) {
        Some(r.add(b))
    } else {
        Some(r)
    }
}

fn apply<T: Numeric>(op: Arith, a: T, b: T) -> Result<T> {
    let value = match op {
        Arith::Add => Some(a.add(b)),
        Arith::Sub => Some(a.sub(b)),
        Arith::Mul => Some(a.mul(b)),
        Arith::Div => a.checked_div(b),
        Arith::Pow => Some(T::from_f64(a.to_f64().powf(b.to_f64()))),
        Arith::Mod { fmod: true } => a.checked_rem(b),
        Arith::Mod { fmod: false } => floor_mod(a, b),
        Arith::Max => Some(if b > a { b } else { a }),
        Arith::Min => Some(if b < a { b } else { a }),
    };
    value.ok_or_else(|| OptimizerError::ExecutionError("integer division by zero".to_string()))
}

fn arith_kernel<T: Numeric>(op: Arith, a: &[T], a_shape: &[usize], b: &[T], b_shape: &[usize]) -> Result<(Vec<usize>, Vec<T>)> {
    zip_broadcast(a, a_shape, b, b_shape, |x, y| apply(op, x, y))
}

fn binary_arith(op_type: &str, op: Arith, a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let mut out_shape = Vec::new();
    let data = zip_numeric!(a.data(), b.data(), x, y => {
        let (shape, values) = arith_kernel(op, x, a.shape(), y, b.shape())?;
        out_shape = shape;
        values
    }, _ => return Err(type_error(op_type, &[a, b])));
    Tensor::new(out_shape, data)
}

/// Add, Sub, Mul, Div, Pow, Mod
pub(crate) fn arithmetic(node: &GraphNode, a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let op = match node.op_type.as_str() {
        "Add" => Arith::Add,
        "Sub" => Arith::Sub,
        "Mul" => Arith::Mul,
        "Div" => Arith::Div,
        "Pow" => Arith::Pow,
        "Mod" => {
            let fmod = attributes::int_or(node, "fmod", 0) != 0;
            if !fmod && a.data().is_float() {
                return Err(OptimizerError::InvalidAttribute(
                    "Mod on floating point inputs requires fmod=1".to_string(),
                ));
            }
            Arith::Mod { fmod }
        }
        other => return Err(OptimizerError::UnsupportedOp(other.to_string())),
    };

    // Pow may take an exponent of another type
    if op == Arith::Pow && a.data_type() != b.data_type() {
        let exponent = Tensor::new(b.shape().to_vec(), b.data().cast(a.data_type())?)?;
        return binary_arith(&node.op_type, op, a, &exponent);
    }

    binary_arith(&node.op_type, op, a, b)
}

/// Max, Min, Sum, Mean over one or more inputs
pub(crate) fn variadic(op_type: &str, inputs: &[&Tensor]) -> Result<Tensor> {
    let (first, rest) = inputs
        .split_first()
        .ok_or_else(|| OptimizerError::ExecutionError(format!("{} requires at least one input", op_type)))?;

    let op = match op_type {
        "Max" => Arith::Max,
        "Min" => Arith::Min,
        "Sum" | "Mean" => Arith::Add,
        other => return Err(OptimizerError::UnsupportedOp(other.to_string())),
    };

    let mut acc = (*first).clone();
    for input in rest {
        acc = binary_arith(op_type, op, &acc, input)?;
    }

    if op_type == "Mean" {
        let count = inputs.len() as i64;
        let shape = acc.shape().to_vec();
        let data = map_numeric!(acc.data(), v => v
            .iter()
            .map(|&x| apply(Arith::Div, x, Numeric::from_i64(count)))
            .collect::<Result<Vec<_>>>()?,
            _ => return Err(type_error(op_type, inputs)));
        acc = Tensor::new(shape, data)?;
    }

    Ok(acc)
}

fn compare_kernel<T: Copy + PartialOrd>(
    op_type: &str,
    a: &[T],
    a_shape: &[usize],
    b: &[T],
    b_shape: &[usize],
) -> Result<(Vec<usize>, Vec<bool>)> {
    let predicate: fn(&T, &T) -> bool = match op_type {
        "Equal" => |x, y| x == y,
        "Less" => |x, y| x < y,
        "LessOrEqual" => |x, y| x <= y,
        "Greater" => |x, y| x > y,
        "GreaterOrEqual" => |x, y| x >= y,
        other => return Err(OptimizerError::UnsupportedOp(other.to_string())),
    };
    zip_broadcast(a, a_shape, b, b_shape, |x, y| Ok(predicate(&x, &y)))
}

/// Equal, Less, LessOrEqual, Greater, GreaterOrEqual
pub(crate) fn compare(op_type: &str, a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let mut out_shape = Vec::new();
    let data = zip_compare!(a.data(), b.data(), x, y => {
        let (shape, values) = compare_kernel(op_type, x, a.shape(), y, b.shape())?;
        out_shape = shape;
        values
    }, _ => return Err(type_error(op_type, &[a, b])));
    Tensor::new(out_shape, data)
}

/// And, Or, Xor
pub(crate) fn logical(op_type: &str, a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let (TensorData::Bool(x), TensorData::Bool(y)) = (a.data(), b.data()) else {
        return Err(type_error(op_type, &[a, b]));
    };

    let f: fn(bool, bool) -> bool = match op_type {
        "And" => |p, q| p && q,
        "Or" => |p, q| p || q,
        "Xor" => |p, q| p != q,
        other => return Err(OptimizerError::UnsupportedOp(other.to_string())),
    };

    let (shape, values) = zip_broadcast(x, a.shape(), y, b.shape(), |p, q| Ok(f(p, q)))?;
    Tensor::from_vec(shape, values)
}

/// Where(condition, x, y)
pub(crate) fn select(condition: &Tensor, x: &Tensor, y: &Tensor) -> Result<Tensor> {
    let TensorData::Bool(cond) = condition.data() else {
        return Err(type_error("Where", &[condition, x, y]));
    };

    let out_shape = broadcast_all([condition.shape(), x.shape(), y.shape()])?;
    let cond_idx = broadcast_indices(condition.shape(), &out_shape);
    let x_idx = broadcast_indices(x.shape(), &out_shape);
    let y_idx = broadcast_indices(y.shape(), &out_shape);

    let data = zip_any!(x.data(), y.data(), a, b => {
        cond_idx
            .iter()
            .zip(x_idx.iter().zip(&y_idx))
            .map(|(&c, (&i, &j))| if cond[c] { a[i].clone() } else { b[j].clone() })
            .collect()
    }, _ => return Err(type_error("Where", &[condition, x, y])));

    Tensor::new(out_shape, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::attributes::int_attr;

    fn node(op: &str) -> GraphNode {
        GraphNode::new(op, ["a", "b"], ["c"])
    }

    fn vec_f32(values: &[f32]) -> Tensor {
        Tensor::from_vec(vec![values.len()], values.to_vec()).unwrap()
    }

    #[test]
    fn test_add_broadcast_row() {
        let a = Tensor::from_vec(vec![2, 2], vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
        let b = vec_f32(&[10.0, 20.0]);
        let out = arithmetic(&node("Add"), &a, &b).unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.as_slice::<f32>().unwrap(), &[11.0, 22.0, 13.0, 24.0]);
    }

    #[test]
    fn test_mismatched_types_rejected() {
        let a = Tensor::scalar(1.0f32);
        let b = Tensor::scalar(1i64);
        assert!(matches!(arithmetic(&node("Add"), &a, &b), Err(OptimizerError::ExecutionError(_))));
    }

    #[test]
    fn test_integer_division() {
        let a = Tensor::from_vec(vec![2], vec![7i64, -7]).unwrap();
        let b = Tensor::scalar(2i64);
        let out = arithmetic(&node("Div"), &a, &b).unwrap();
        assert_eq!(out.to_i64_vec().unwrap(), vec![3, -3]);

        let zero = Tensor::scalar(0i64);
        assert!(matches!(arithmetic(&node("Div"), &a, &zero), Err(OptimizerError::ExecutionError(_))));
    }

    #[test]
    fn test_mod_sign_follows_divisor() {
        let a = Tensor::from_vec(vec![4], vec![-4i32, 7, 5, -7]).unwrap();
        let b = Tensor::from_vec(vec![4], vec![3i32, -3, 2, -2]).unwrap();

        let out = arithmetic(&node("Mod"), &a, &b).unwrap();
        assert_eq!(out.as_slice::<i32>().unwrap(), &[2, -2, 1, -1]);

        let fmod = node("Mod").with_attribute(int_attr("fmod", 1));
        let out = arithmetic(&fmod, &a, &b).unwrap();
        assert_eq!(out.as_slice::<i32>().unwrap(), &[-1, 1, 1, -1]);

        let floats = vec_f32(&[1.5]);
        assert!(arithmetic(&node("Mod"), &floats, &floats).is_err());
    }

    #[test]
    fn test_pow_with_integer_exponent() {
        let base = vec_f32(&[2.0, 3.0]);
        let exponent = Tensor::scalar(2i64);
        let out = arithmetic(&node("Pow"), &base, &exponent).unwrap();
        assert_eq!(out.as_slice::<f32>().unwrap(), &[4.0, 9.0]);
    }

    #[test]
    fn test_variadic() {
        let a = vec_f32(&[1.0, 5.0]);
        let b = vec_f32(&[4.0, 2.0]);
        let c = Tensor::scalar(3.0f32);

        let max = variadic("Max", &[&a, &b, &c]).unwrap();
        assert_eq!(max.as_slice::<f32>().unwrap(), &[4.0, 5.0]);

        let min = variadic("Min", &[&a, &b]).unwrap();
        assert_eq!(min.as_slice::<f32>().unwrap(), &[1.0, 2.0]);

        let sum = variadic("Sum", &[&a]).unwrap();
        assert_eq!(sum, a);

        let mean = variadic("Mean", &[&a, &b]).unwrap();
        assert_eq!(mean.as_slice::<f32>().unwrap(), &[2.5, 3.5]);

        assert!(variadic("Sum", &[]).is_err());
    }

    #[test]
    fn test_compare() {
        let a = Tensor::from_vec(vec![3], vec![1i64, 2, 3]).unwrap();
        let b = Tensor::scalar(2i64);

        let less = compare("Less", &a, &b).unwrap();
        assert_eq!(less.as_slice::<bool>().unwrap(), &[true, false, false]);

        let equal = compare("Equal", &a, &b).unwrap();
        assert_eq!(equal.as_slice::<bool>().unwrap(), &[false, true, false]);

        let ge = compare("GreaterOrEqual", &a, &b).unwrap();
        assert_eq!(ge.as_slice::<bool>().unwrap(), &[false, true, true]);
    }

    #[test]
    fn test_logical() {
        let a = Tensor::from_vec(vec![2], vec![true, false]).unwrap();
        let b = Tensor::scalar(true);
        assert_eq!(logical("And", &a, &b).unwrap().as_slice::<bool>().unwrap(), &[true, false]);
        assert_eq!(logical("Xor", &a, &b).unwrap().as_slice::<bool>().unwrap(), &[false, true]);
        assert!(logical("Or", &Tensor::scalar(1i32), &b).is_err());
    }

    #[test]
    fn test_where_broadcast() {
        let cond = Tensor::from_vec(vec![2, 1], vec![true, false]).unwrap();
        let x = Tensor::from_vec(vec![3], vec![1i64, 2, 3]).unwrap();
        let y = Tensor::scalar(0i64);

        let out = select(&cond, &x, &y).unwrap();
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.to_i64_vec().unwrap(), vec![1, 2, 3, 0, 0, 0]);
    }
}
