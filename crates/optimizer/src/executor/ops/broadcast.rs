//! NumPy-style broadcasting

use crate::error::{OptimizerError, Result};

/// Broadcast two shapes according to NumPy broadcasting rules
pub(crate) fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let max_rank = a.len().max(b.len());
    let mut result = Vec::with_capacity(max_rank);

    for i in 0..max_rank {
        let a_dim = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let b_dim = if i < b.len() { b[b.len() - 1 - i] } else { 1 };

        if a_dim == b_dim || b_dim == 1 {
            result.push(a_dim);
        } else if a_dim == 1 {
            result.push(b_dim);
        } else {
            return Err(OptimizerError::ShapeMismatch(format!(
                "Cannot broadcast shapes {:?} and {:?}",
                a, b
            )));
        }
    }

    result.reverse();
    Ok(result)
}

/// Broadcast any number of shapes
pub(crate) fn broadcast_all<'a>(shapes: impl IntoIterator<Item = &'a [usize]>) -> Result<Vec<usize>> {
    shapes
        .into_iter()
        .try_fold(Vec::new(), |acc, shape| broadcast_shapes(&acc, shape))
}

/// Compute the linear index in source array given broadcast index
pub(crate) fn compute_broadcast_index(linear_idx: usize, broadcast_shape: &[usize], source_shape: &[usize]) -> usize {
    if source_shape.is_empty() {
        return 0;
    }

    let mut result = 0;
    let mut stride = 1;
    let mut src_stride = 1;
    let rank_diff = broadcast_shape.len().saturating_sub(source_shape.len());

    for i in (0..broadcast_shape.len()).rev() {
        let coord = (linear_idx / stride) % broadcast_shape[i];

        if i >= rank_diff {
            let src_dim = source_shape[i - rank_diff];
            // size-1 source dimensions repeat
            if src_dim != 1 {
                result += coord * src_stride;
            }
            src_stride *= src_dim;
        }

        stride *= broadcast_shape[i];
    }

    result
}

/// Source index of every element of `out_shape` when `source_shape` is broadcast to it
pub(crate) fn broadcast_indices(source_shape: &[usize], out_shape: &[usize]) -> Vec<usize> {
    let count: usize = out_shape.iter().product();
    (0..count)
        .map(|i| compute_broadcast_index(i, out_shape, source_shape))
        .collect()
}

/// Apply `f` to broadcast pairs of elements
pub(crate) fn zip_broadcast<T: Copy, R>(
    a: &[T],
    a_shape: &[usize],
    b: &[T],
    b_shape: &[usize],
    f: impl Fn(T, T) -> Result<R>,
) -> Result<(Vec<usize>, Vec<R>)> {
    let out_shape = broadcast_shapes(a_shape, b_shape)?;

    let values = if a_shape == b_shape {
        a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect::<Result<Vec<_>>>()?
    } else {
        let count: usize = out_shape.iter().product();
        (0..count)
            .map(|i| {
                let x = a[compute_broadcast_index(i, &out_shape, a_shape)];
                let y = b[compute_broadcast_index(i, &out_shape, b_shape)];
                f(x, y)
            })
            .collect::<Result<Vec<_>>>()?
    };

    Ok((out_shape, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_broadcast_shapes() {
        assert_eq!(broadcast_shapes(&[2, 3], &[3]).unwrap(), vec![2, 3]);
        assert_eq!(broadcast_shapes(&[4, 1, 5], &[3, 1]).unwrap(), vec![4, 3, 5]);
        assert_eq!(broadcast_shapes(&[], &[2]).unwrap(), vec![2]);
        assert_eq!(broadcast_shapes(&[0, 1], &[1, 3]).unwrap(), vec![0, 3]);
        assert!(broadcast_shapes(&[2, 3], &[4]).is_err());
    }

    #[test]
    fn test_broadcast_indices_row_and_column() {
        // [2, 1] -> [2, 3]
        assert_eq!(broadcast_indices(&[2, 1], &[2, 3]), vec![0, 0, 0, 1, 1, 1]);
        // [3] -> [2, 3]
        assert_eq!(broadcast_indices(&[3], &[2, 3]), vec![0, 1, 2, 0, 1, 2]);
        // scalar
        assert_eq!(broadcast_indices(&[], &[2]), vec![0, 0]);
    }

    #[test]
    fn test_zip_broadcast() {
        let (shape, values) = zip_broadcast(&[1, 2], &[2, 1], &[10, 20, 30], &[3], |a, b| Ok(a + b)).unwrap();
        assert_eq!(shape, vec![2, 3]);
        assert_eq!(values, vec![11, 21, 31, 12, 22, 32]);
    }

    fn shape_strategy() -> impl Strategy<Value = Vec<usize>> {
        prop::collection::vec(1usize..4, 0..4)
    }

    proptest! {
        #[test]
        fn prop_broadcast_with_self_is_identity(shape in shape_strategy()) {
            prop_assert_eq!(broadcast_shapes(&shape, &shape).unwrap(), shape.clone());
            let count: usize = shape.iter().product();
            prop_assert_eq!(broadcast_indices(&shape, &shape), (0..count).collect::<Vec<_>>());
        }

        #[test]
        fn prop_broadcast_indices_in_bounds(source in shape_strategy(), extra in shape_strategy()) {
            // prepend extra dims and widen size-1 dims
            let mut out = extra.clone();
            out.extend(source.iter().map(|&d| if d == 1 { 3 } else { d }));
            let source_len: usize = source.iter().product();

            prop_assert_eq!(broadcast_shapes(&source, &out).unwrap(), out.clone());
            for index in broadcast_indices(&source, &out) {
                prop_assert!(index < source_len);
            }
        }
    }
}
