//! Constant producers, shape queries and data movement
//!
//! Data movement operators only compute source indices; the element copy is a
//! single `TensorData::take` regardless of element type.

use super::broadcast::{broadcast_indices, broadcast_shapes};
use super::{cartesian_indices, normalize_axis, strides, type_error};
use crate::error::{OptimizerError, Result};
use crate::executor::attributes;
use crate::executor::OpInputs;
use crate::graph::ir::GraphNode;
use crate::numeric::Numeric;
use crate::tensor::{Element, Tensor};

fn to_dims(values: &[i64], op_type: &str) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|&v| {
            usize::try_from(v)
                .map_err(|_| OptimizerError::ExecutionError(format!("{}: invalid dimension {}", op_type, v)))
        })
        .collect()
}

fn shape_tensor(dims: &[usize]) -> Result<Tensor> {
    Tensor::from_vec(vec![dims.len()], dims.iter().map(|&d| d as i64).collect())
}

/// Constant: the value comes from exactly one attribute
pub(crate) fn constant(node: &GraphNode) -> Result<Tensor> {
    if let Some(value) = attributes::tensor(node, "value")? {
        return Ok(value);
    }
    if let Some(value) = node.get_attribute("value_float") {
        return Ok(Tensor::scalar(value.f));
    }
    if let Some(values) = attributes::floats(node, "value_floats") {
        return Tensor::from_vec(vec![values.len()], values);
    }
    if let Some(value) = attributes::int(node, "value_int") {
        return Ok(Tensor::scalar(value));
    }
    if let Some(values) = attributes::ints(node, "value_ints") {
        return Tensor::from_vec(vec![values.len()], values);
    }

    for unsupported in ["sparse_value", "value_string", "value_strings"] {
        if node.get_attribute(unsupported).is_some() {
            return Err(OptimizerError::UnsupportedDataType(format!("Constant.{}", unsupported)));
        }
    }

    Err(OptimizerError::MissingAttribute("Constant.value".to_string()))
}

/// ConstantOfShape: fill a shape with the `value` attribute (float 0 by default)
pub(crate) fn constant_of_shape(node: &GraphNode, shape: &Tensor) -> Result<Tensor> {
    let dims = to_dims(&shape.to_i64_vec()?, "ConstantOfShape")?;
    let value = attributes::tensor(node, "value")?.unwrap_or_else(|| Tensor::scalar(0.0f32));

    let count = dims.iter().product();
    let data = value.data().splat(count)?;
    Tensor::new(dims, data)
}

/// Shape, optionally restricted to dimensions `start..end`
pub(crate) fn shape(node: &GraphNode, input: &Tensor) -> Result<Tensor> {
    let rank = input.rank() as i64;
    let clamp = |v: i64| (if v < 0 { (v + rank).max(0) } else { v.min(rank) }) as usize;

    let start = clamp(attributes::int_or(node, "start", 0));
    let end = clamp(attributes::int_or(node, "end", rank));
    shape_tensor(&input.shape()[start.min(end)..end])
}

/// Reshape with 0 (copy dimension) and -1 (infer dimension) entries
pub(crate) fn reshape(node: &GraphNode, data: &Tensor, shape: &Tensor) -> Result<Tensor> {
    let requested = shape.to_i64_vec()?;
    let allow_zero = attributes::int_or(node, "allowzero", 0) != 0;

    let mut dims = Vec::with_capacity(requested.len());
    let mut inferred = None;
    for (axis, &value) in requested.iter().enumerate() {
        match value {
            -1 => {
                if inferred.replace(axis).is_some() {
                    return Err(OptimizerError::ExecutionError(
                        "Reshape: more than one -1 in target shape".to_string(),
                    ));
                }
                dims.push(1);
            }
            0 if !allow_zero => {
                let dim = data.shape().get(axis).copied().ok_or_else(|| {
                    OptimizerError::ShapeMismatch(format!("Reshape: no input dimension {} to copy", axis))
                })?;
                dims.push(dim);
            }
            v if v >= 0 => dims.push(v as usize),
            v => {
                return Err(OptimizerError::ExecutionError(format!(
                    "Reshape: invalid dimension {}",
                    v
                )))
            }
        }
    }

    if let Some(axis) = inferred {
        let known: usize = dims.iter().product();
        if known == 0 || data.len() % known != 0 {
            return Err(OptimizerError::ShapeMismatch(format!(
                "Reshape: cannot infer dimension of {:?} for {} elements",
                requested,
                data.len()
            )));
        }
        dims[axis] = data.len() / known;
    }

    data.clone().reshape(dims)
}

/// Flatten into 2-D around `axis`
pub(crate) fn flatten(node: &GraphNode, input: &Tensor) -> Result<Tensor> {
    let rank = input.rank();
    let axis = attributes::int_or(node, "axis", 1);
    // axis == rank is valid here
    let axis = if axis == rank as i64 { rank } else { normalize_axis(axis, rank, "Flatten")? };

    let outer: usize = input.shape()[..axis].iter().product();
    let inner: usize = input.shape()[axis..].iter().product();
    input.clone().reshape(vec![outer, inner])
}

/// Axes from the second input (opset 13+) or the `axes` attribute
fn axes_of(node: &GraphNode, axes: Option<&Tensor>) -> Result<Option<Vec<i64>>> {
    match axes {
        Some(tensor) => tensor.to_i64_vec().map(Some),
        None => Ok(attributes::ints(node, "axes")),
    }
}

pub(crate) fn unsqueeze(node: &GraphNode, input: &Tensor, axes: Option<&Tensor>) -> Result<Tensor> {
    let axes = axes_of(node, axes)?.ok_or_else(|| OptimizerError::MissingAttribute("Unsqueeze.axes".to_string()))?;
    let out_rank = input.rank() + axes.len();

    let mut resolved = axes
        .iter()
        .map(|&axis| normalize_axis(axis, out_rank, "Unsqueeze"))
        .collect::<Result<Vec<_>>>()?;
    resolved.sort_unstable();
    if resolved.windows(2).any(|w| w[0] == w[1]) {
        return Err(OptimizerError::InvalidAttribute(format!("Unsqueeze: repeated axis in {:?}", axes)));
    }

    let mut source = input.shape().iter();
    let dims = (0..out_rank)
        .map(|axis| {
            if resolved.binary_search(&axis).is_ok() {
                1
            } else {
                source.next().copied().unwrap_or(1)
            }
        })
        .collect();

    input.clone().reshape(dims)
}

pub(crate) fn squeeze(node: &GraphNode, input: &Tensor, axes: Option<&Tensor>) -> Result<Tensor> {
    let rank = input.rank();
    let dims = match axes_of(node, axes)? {
        None => input.shape().iter().copied().filter(|&d| d != 1).collect(),
        Some(axes) => {
            let resolved = axes
                .iter()
                .map(|&axis| normalize_axis(axis, rank, "Squeeze"))
                .collect::<Result<Vec<_>>>()?;
            if let Some(&axis) = resolved.iter().find(|&&axis| input.shape()[axis] != 1) {
                return Err(OptimizerError::ShapeMismatch(format!(
                    "Squeeze: dimension {} of {:?} is not 1",
                    axis,
                    input.shape()
                )));
            }
            input
                .shape()
                .iter()
                .enumerate()
                .filter(|(axis, _)| !resolved.contains(axis))
                .map(|(_, &d)| d)
                .collect()
        }
    };

    input.clone().reshape(dims)
}

fn concat_like<T: Element>(_witness: &[T], inputs: &[&Tensor], axis: usize) -> Result<Vec<T>> {
    let slices = inputs
        .iter()
        .map(|t| t.as_slice::<T>().ok_or_else(|| type_error("Concat", inputs)))
        .collect::<Result<Vec<_>>>()?;

    let outer: usize = inputs[0].shape()[..axis].iter().product();
    let chunks: Vec<usize> = inputs.iter().map(|t| t.shape()[axis..].iter().product()).collect();

    let mut out = Vec::with_capacity(slices.iter().map(|s| s.len()).sum());
    for block in 0..outer {
        for (slice, &chunk) in slices.iter().zip(&chunks) {
            out.extend_from_slice(&slice[block * chunk..(block + 1) * chunk]);
        }
    }
    Ok(out)
}

/// Concatenate along `axis`; all other dimensions must agree
pub(crate) fn concat(node: &GraphNode, inputs: &[&Tensor]) -> Result<Tensor> {
    let first = inputs
        .first()
        .ok_or_else(|| OptimizerError::ExecutionError("Concat requires at least one input".to_string()))?;
    let rank = first.rank();
    let axis = normalize_axis(attributes::required_int(node, "axis")?, rank, "Concat")?;

    let mut dims = first.shape().to_vec();
    dims[axis] = 0;
    for input in inputs {
        let compatible = input.rank() == rank
            && input
                .shape()
                .iter()
                .zip(first.shape())
                .enumerate()
                .all(|(i, (a, b))| i == axis || a == b);
        if !compatible {
            return Err(OptimizerError::ShapeMismatch(format!(
                "Concat: {:?} does not match {:?} outside axis {}",
                input.shape(),
                first.shape(),
                axis
            )));
        }
        dims[axis] += input.shape()[axis];
    }

    let data = map_any!(first.data(), v => concat_like(v, inputs, axis)?);
    Tensor::new(dims, data)
}

/// Gather slices along `axis` by (possibly negative) indices
pub(crate) fn gather(node: &GraphNode, data: &Tensor, indices: &Tensor) -> Result<Tensor> {
    let rank = data.rank();
    let axis = normalize_axis(attributes::int_or(node, "axis", 0), rank, "Gather")?;
    let axis_dim = data.shape()[axis] as i64;

    let picked = indices
        .to_i64_vec()?
        .into_iter()
        .map(|index| {
            let resolved = if index < 0 { index + axis_dim } else { index };
            if resolved < 0 || resolved >= axis_dim {
                return Err(OptimizerError::ExecutionError(format!(
                    "Gather: index {} out of bounds for dimension {}",
                    index, axis_dim
                )));
            }
            Ok(resolved as usize)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut per_axis: Vec<Vec<usize>> = data.shape().iter().map(|&d| (0..d).collect()).collect();
    per_axis[axis] = picked;

    let mut dims = data.shape()[..axis].to_vec();
    dims.extend_from_slice(indices.shape());
    dims.extend_from_slice(&data.shape()[axis + 1..]);

    let source = cartesian_indices(&per_axis, &strides(data.shape()));
    Tensor::new(dims, data.data().take(&source))
}

/// Source coordinates selected by one axis of a Slice
fn slice_axis(dim: usize, start: i64, end: i64, step: i64) -> Result<Vec<usize>> {
    if step == 0 {
        return Err(OptimizerError::ExecutionError("Slice: step cannot be 0".to_string()));
    }

    let dim = dim as i64;
    let resolve = |v: i64| if v < 0 { v.saturating_add(dim) } else { v };
    let mut coords = Vec::new();

    if step > 0 {
        let start = resolve(start).clamp(0, dim);
        let end = resolve(end).clamp(0, dim);
        let mut i = start;
        while i < end {
            coords.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else {
        let start = resolve(start).clamp(-1, dim - 1);
        let end = resolve(end).clamp(-1, dim - 1);
        let mut i = start;
        while i > end {
            coords.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }

    Ok(coords)
}

/// Slice with starts/ends/axes/steps inputs (opset 10+) or attributes (opset 1-9)
pub(crate) fn slice(node: &GraphNode, inputs: &OpInputs<'_>) -> Result<Tensor> {
    let data = inputs.required(0)?;
    let rank = data.rank();

    let (starts, ends, axes, steps) = if inputs.len() > 1 {
        let optional = |index: usize| inputs.optional(index).map(Tensor::to_i64_vec).transpose();
        (
            inputs.required(1)?.to_i64_vec()?,
            inputs.required(2)?.to_i64_vec()?,
            optional(3)?,
            optional(4)?,
        )
    } else {
        (
            attributes::ints(node, "starts").ok_or_else(|| OptimizerError::MissingAttribute("Slice.starts".into()))?,
            attributes::ints(node, "ends").ok_or_else(|| OptimizerError::MissingAttribute("Slice.ends".into()))?,
            attributes::ints(node, "axes"),
            None,
        )
    };

    let axes = axes.unwrap_or_else(|| (0..starts.len() as i64).collect());
    let steps = steps.unwrap_or_else(|| vec![1; starts.len()]);
    if ends.len() != starts.len() || axes.len() != starts.len() || steps.len() != starts.len() {
        return Err(OptimizerError::ShapeMismatch(
            "Slice: starts, ends, axes and steps must have the same length".to_string(),
        ));
    }

    let mut per_axis: Vec<Vec<usize>> = data.shape().iter().map(|&d| (0..d).collect()).collect();
    for i in 0..starts.len() {
        let axis = normalize_axis(axes[i], rank, "Slice")?;
        per_axis[axis] = slice_axis(data.shape()[axis], starts[i], ends[i], steps[i])?;
    }

    let dims = per_axis.iter().map(Vec::len).collect();
    let source = cartesian_indices(&per_axis, &strides(data.shape()));
    Tensor::new(dims, data.data().take(&source))
}

/// Permute dimensions; reverses them when `perm` is absent
pub(crate) fn transpose(node: &GraphNode, input: &Tensor) -> Result<Tensor> {
    let rank = input.rank();
    let perm = match attributes::ints(node, "perm") {
        Some(perm) => perm
            .iter()
            .map(|&axis| normalize_axis(axis, rank, "Transpose"))
            .collect::<Result<Vec<_>>>()?,
        None => (0..rank).rev().collect(),
    };

    let mut seen = vec![false; rank];
    for &axis in &perm {
        if std::mem::replace(&mut seen[axis], true) {
            return Err(OptimizerError::InvalidAttribute(format!("Transpose: invalid perm {:?}", perm)));
        }
    }
    if perm.len() != rank {
        return Err(OptimizerError::InvalidAttribute(format!(
            "Transpose: perm {:?} does not match rank {}",
            perm, rank
        )));
    }

    let in_strides = strides(input.shape());
    let per_axis: Vec<Vec<usize>> = perm.iter().map(|&axis| (0..input.shape()[axis]).collect()).collect();
    let axis_strides: Vec<usize> = perm.iter().map(|&axis| in_strides[axis]).collect();
    let dims = perm.iter().map(|&axis| input.shape()[axis]).collect();

    let source = cartesian_indices(&per_axis, &axis_strides);
    Tensor::new(dims, input.data().take(&source))
}

/// Broadcast to a target shape
pub(crate) fn expand(input: &Tensor, shape: &Tensor) -> Result<Tensor> {
    let target = to_dims(&shape.to_i64_vec()?, "Expand")?;
    let dims = broadcast_shapes(input.shape(), &target)?;
    let source = broadcast_indices(input.shape(), &dims);
    Tensor::new(dims, input.data().take(&source))
}

fn range_typed<T: Numeric + Element>(start: &[T], limit: &[T], delta: &Tensor) -> Result<Vec<T>> {
    let delta = delta.as_slice::<T>().ok_or_else(|| {
        OptimizerError::ExecutionError("Range: start, limit and delta must share one type".to_string())
    })?;
    let (&[start], &[limit], &[delta]) = (start, limit, delta) else {
        return Err(OptimizerError::ShapeMismatch("Range inputs must be scalars".to_string()));
    };

    if delta == T::zero() {
        return Err(OptimizerError::ExecutionError("Range: delta cannot be 0".to_string()));
    }
    let count = ((limit.to_f64() - start.to_f64()) / delta.to_f64()).ceil().max(0.0) as usize;
    Ok((0..count)
        .map(|i| start.add(T::from_i64(i as i64).mul(delta)))
        .collect())
}

/// Range(start, limit, delta) of scalars of one numeric type
pub(crate) fn range(start: &Tensor, limit: &Tensor, delta: &Tensor) -> Result<Tensor> {
    let data = zip_numeric!(start.data(), limit.data(), s, l => range_typed(s, l, delta)?,
        _ => return Err(type_error("Range", &[start, limit, delta])));
    Tensor::new(vec![data.len()], data)
}
