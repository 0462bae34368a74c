//! Matrix multiplication with N-dimensional support
//!
//! Implements ONNX MatMul semantics:
//! - A: shape [..., M, K]
//! - B: shape [..., K, N]
//! - Output: shape [..., M, N]
//!
//! A 1-D `A` is treated as [1, K] and a 1-D `B` as [K, 1]; the inserted dimension
//! is removed from the result. Batch dimensions are broadcast according to NumPy
//! rules.

use super::broadcast::{broadcast_shapes, compute_broadcast_index};
use super::type_error;
use crate::error::{OptimizerError, Result};
use crate::numeric::Numeric;
use crate::tensor::Tensor;

/// Batched matrix multiplication on row-major buffers
fn matmul_nd_broadcast<T: Numeric>(a: &[T], a_shape: &[usize], b: &[T], b_shape: &[usize]) -> Result<(Vec<usize>, Vec<T>)> {
    if a_shape.is_empty() || b_shape.is_empty() {
        return Err(OptimizerError::ShapeMismatch(
            "MatMul does not accept scalar inputs".to_string(),
        ));
    }

    // promote 1-D operands to matrices
    let a_vector = a_shape.len() == 1;
    let b_vector = b_shape.len() == 1;
    let a_shape: Vec<usize> = if a_vector { vec![1, a_shape[0]] } else { a_shape.to_vec() };
    let b_shape: Vec<usize> = if b_vector { vec![b_shape[0], 1] } else { b_shape.to_vec() };

    let a_rank = a_shape.len();
    let b_rank = b_shape.len();
    let m = a_shape[a_rank - 2];
    let k = a_shape[a_rank - 1];
    let n = b_shape[b_rank - 1];

    if k != b_shape[b_rank - 2] {
        return Err(OptimizerError::ShapeMismatch(format!(
            "MatMul dimension mismatch: K dimensions don't match ({} vs {})",
            k,
            b_shape[b_rank - 2]
        )));
    }

    // Compute broadcast batch shape
    let a_batch = &a_shape[..a_rank - 2];
    let b_batch = &b_shape[..b_rank - 2];
    let batch_shape = broadcast_shapes(a_batch, b_batch)?;
    let batch_size: usize = batch_shape.iter().product();

    let mut result = vec![T::zero(); batch_size * m * n];

    for batch_idx in 0..batch_size {
        let a_offset = compute_broadcast_index(batch_idx, &batch_shape, a_batch) * m * k;
        let b_offset = compute_broadcast_index(batch_idx, &batch_shape, b_batch) * k * n;
        let out_offset = batch_idx * m * n;

        // C[i,j] = sum_k A[i,k] * B[k,j]
        for i in 0..m {
            for j in 0..n {
                let mut sum = T::zero();
                for kk in 0..k {
                    sum = sum.add(a[a_offset + i * k + kk].mul(b[b_offset + kk * n + j]));
                }
                result[out_offset + i * n + j] = sum;
            }
        }
    }

    let mut output_shape = batch_shape;
    if !a_vector {
        output_shape.push(m);
    }
    if !b_vector {
        output_shape.push(n);
    }

    Ok((output_shape, result))
}

pub(crate) fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let mut out_shape = Vec::new();
    let data = zip_numeric!(a.data(), b.data(), x, y => {
        let (shape, values) = matmul_nd_broadcast(x, a.shape(), y, b.shape())?;
        out_shape = shape;
        values
    }, _ => return Err(type_error("MatMul", &[a, b])));
    Tensor::new(out_shape, data)
}
