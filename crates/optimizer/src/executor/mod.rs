//! Single-node execution
//!
//! Constant folding evaluates one node at a time on concrete tensors through the
//! [`NodeExecutor`] trait. [`ReferenceExecutor`] is the built-in CPU implementation
//! covering the arithmetic, comparison and shape-manipulation operators that
//! typically appear in constant subgraphs.

pub mod attributes;
mod ops;

use crate::error::{OptimizerError, Result};
use crate::graph::ir::GraphNode;
use crate::tensor::Tensor;

/// Executes a single ONNX node on concrete input values
///
/// `inputs` holds one entry per declared input of `node`; `None` marks an omitted
/// optional input. Implementations return one tensor per declared output.
pub trait NodeExecutor: Send + Sync {
    fn run_node(&self, node: &GraphNode, inputs: &[Option<&Tensor>]) -> Result<Vec<Tensor>>;
}

/// Operator inputs with access by position
pub(crate) struct OpInputs<'a> {
    op_type: &'a str,
    values: &'a [Option<&'a Tensor>],
}

impl<'a> OpInputs<'a> {
    pub(crate) fn new(op_type: &'a str, values: &'a [Option<&'a Tensor>]) -> Self {
        Self { op_type, values }
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    /// Input at `index`, which must be present
    pub(crate) fn required(&self, index: usize) -> Result<&'a Tensor> {
        self.optional(index).ok_or_else(|| {
            OptimizerError::ExecutionError(format!("{} requires input {}", self.op_type, index))
        })
    }

    /// Input at `index`, `None` if omitted or beyond the declared inputs
    pub(crate) fn optional(&self, index: usize) -> Option<&'a Tensor> {
        self.values.get(index).copied().flatten()
    }

    /// All inputs, each of which must be present
    pub(crate) fn all_required(&self) -> Result<Vec<&'a Tensor>> {
        (0..self.values.len()).map(|index| self.required(index)).collect()
    }
}

/// Pure-CPU executor for the default ONNX domain
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceExecutor;

impl ReferenceExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Check whether an operator type is implemented
    pub fn supports(op_type: &str) -> bool {
        ops::SUPPORTED_OPS.contains(&op_type)
    }
}

impl NodeExecutor for ReferenceExecutor {
    fn run_node(&self, node: &GraphNode, inputs: &[Option<&Tensor>]) -> Result<Vec<Tensor>> {
        if !matches!(node.domain.as_str(), "" | "ai.onnx") {
            return Err(OptimizerError::UnsupportedOp(format!("{}::{}", node.domain, node.op_type)));
        }

        let inputs = OpInputs::new(&node.op_type, inputs);
        let output = ops::execute(node, &inputs)?;
        Ok(vec![output])
    }
}
