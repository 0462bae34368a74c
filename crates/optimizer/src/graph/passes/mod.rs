// Optimization passes for OnnxGraph
//
// Each pass is a self-contained rewrite of the graph. Passes are created by name
// through the registry and sequenced by the driver.

mod constant_fold;

pub use constant_fold::{ConstantFolding, FoldOrder};

use super::ir::OnnxGraph;
use crate::error::Result;

/// Optimization pass trait
///
/// Each optimization pass implements this trait to provide a
/// composable transformation on the graph.
pub trait OptimizationPass {
    /// Get the name of this pass (for logging/debugging)
    fn name(&self) -> &str;

    /// Run the optimization pass on the graph
    ///
    /// Returns `true` if the graph was modified, `false` otherwise.
    fn run(&self, graph: &mut OnnxGraph) -> Result<bool>;
}
