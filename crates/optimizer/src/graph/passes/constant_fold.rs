// Constant Folding
//
// Evaluates every node whose inputs are all known constants, records its outputs
// as new constants and removes the node.
//
// For example:
// - Add(2, 3) -> s, Mul(s, 4) -> r  becomes  s = 5, r = 20 and no nodes
// - Reshape(constant_tensor, constant_shape) -> constant(reshaped)
//
// Outputs of a folded node become constants before later nodes are visited, so a
// chain of dependent nodes folds in a single run.

use super::OptimizationPass;
use crate::error::{OptimizerError, Result};
use crate::executor::{NodeExecutor, ReferenceExecutor};
use crate::graph::ir::{GraphNode, OnnxGraph};
use crate::graph::registry::CONSTANT_FOLDING;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Order in which nodes are visited for folding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldOrder {
    /// Node list order as stored in the model
    Sequential,
    /// Producers before consumers, regardless of storage order
    #[default]
    Topological,
}

impl fmt::Display for FoldOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoldOrder::Sequential => write!(f, "sequential"),
            FoldOrder::Topological => write!(f, "topological"),
        }
    }
}

impl FromStr for FoldOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(FoldOrder::Sequential),
            "topological" => Ok(FoldOrder::Topological),
            other => Err(format!(
                "unknown fold order '{}' (expected 'sequential' or 'topological')",
                other
            )),
        }
    }
}

/// Constant Folding pass
///
/// Evaluates operations with all-constant inputs through a [`NodeExecutor`].
/// Executor failures abort the pass.
pub struct ConstantFolding {
    executor: Arc<dyn NodeExecutor>,
    order: FoldOrder,
    expose_folded_as_inputs: bool,
}

impl ConstantFolding {
    /// Create a pass backed by the [`ReferenceExecutor`]
    pub fn new() -> Self {
        Self {
            executor: Arc::new(ReferenceExecutor::new()),
            order: FoldOrder::default(),
            expose_folded_as_inputs: true,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn NodeExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_order(mut self, order: FoldOrder) -> Self {
        self.order = order;
        self
    }

    /// Also list folded outputs as graph inputs (on by default)
    pub fn with_expose_folded_as_inputs(mut self, expose: bool) -> Self {
        self.expose_folded_as_inputs = expose;
        self
    }

    /// Check if all inputs to a node are constants
    ///
    /// Omitted optional inputs don't count; a node without inputs is foldable.
    fn all_inputs_constant(graph: &OnnxGraph, node: &GraphNode) -> bool {
        node.present_inputs().all(|name| graph.is_constant(name))
    }

    fn visit_order(&self, graph: &OnnxGraph) -> Result<Vec<usize>> {
        match self.order {
            FoldOrder::Sequential => Ok((0..graph.node_count()).collect()),
            FoldOrder::Topological => graph.topological_order(),
        }
    }

    /// Execute one node on its constant inputs
    fn evaluate(&self, graph: &OnnxGraph, node: &GraphNode) -> Result<Vec<Tensor>> {
        let values = node
            .input_names
            .iter()
            .map(|name| {
                if name.is_empty() {
                    Ok(None)
                } else {
                    graph.constant(name).map(Some)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let inputs: Vec<Option<&Tensor>> = values.iter().map(Option::as_ref).collect();

        let outputs = self.executor.run_node(node, &inputs)?;
        if outputs.len() != node.output_names.len() {
            return Err(OptimizerError::ExecutionError(format!(
                "executor returned {} outputs, node declares {}",
                outputs.len(),
                node.output_names.len()
            )));
        }

        Ok(outputs)
    }
}

impl Default for ConstantFolding {
    fn default() -> Self {
        Self::new()
    }
}

impl OptimizationPass for ConstantFolding {
    fn name(&self) -> &str {
        CONSTANT_FOLDING
    }

    fn run(&self, graph: &mut OnnxGraph) -> Result<bool> {
        let mut folded = Vec::new();

        for position in self.visit_order(graph)? {
            let node = &graph.nodes()[position];
            if !Self::all_inputs_constant(graph, node) {
                continue;
            }

            let node = node.clone();
            debug!("Folding {} {}", node.display_name(), node.op_type);

            let outputs = self
                .evaluate(graph, &node)
                .map_err(|e| e.in_node(node.display_name(), &node.op_type))?;

            for (name, value) in node.output_names.iter().zip(outputs) {
                if name.is_empty() {
                    continue;
                }
                if self.expose_folded_as_inputs {
                    graph.add_input(value.value_info(name));
                }
                graph.add_constant(name, value);
            }

            folded.push(position);
        }

        if !folded.is_empty() {
            debug!("Folded {} nodes", folded.len());
        }

        graph.remove_nodes(&folded);
        Ok(!folded.is_empty())
    }
}
