// Graph module for the ONNX optimizer
//
// This module provides the in-memory graph model the optimizer rewrites, the
// optimization passes, the registry that names them and the driver that applies
// them in sequence.

pub mod ir;
pub mod optimizer;
pub mod passes;
pub mod registry;

// Re-exports for convenience
pub use ir::{GraphNode, GraphStatistics, OnnxGraph};
pub use optimizer::{optimize_graph, GraphOptimizer, OptimizationStats, PassStats};
pub use passes::{ConstantFolding, FoldOrder, OptimizationPass};
pub use registry::{available_passes, PassOptions, CONSTANT_FOLDING};
