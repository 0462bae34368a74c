//! # ONNX Optimizer Core
//!
//! Graph model, constant folding pass and reference single-node executor for
//! ONNX models.
//!
//! ## Pipeline
//!
//! 1. Decode the `ModelProto` ([`model::load_model`])
//! 2. Build an [`OnnxGraph`] from its graph
//! 3. Apply the requested passes in order ([`GraphOptimizer`])
//! 4. Write the rewritten graph back and encode the model ([`model::save_model`])
//!
//! ## Example
//!
//! ```no_run
//! use onnx_optimizer_core::{FoldOrder, Optimizer};
//!
//! let report = Optimizer::new()
//!     .with_fold_order(FoldOrder::Topological)
//!     .optimize_file("model.onnx", "model.folded.onnx")?;
//! println!("{}", report.stats);
//! # Ok::<(), onnx_optimizer_core::OptimizerError>(())
//! ```

#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod model;
pub mod numeric;
pub mod pipeline;
pub mod proto;
pub mod tensor;

pub use config::{ConfigError, MergedConfig, OptimizerConfig};
pub use error::{OptimizerError, Result};
pub use executor::{NodeExecutor, ReferenceExecutor};
pub use graph::{
    available_passes, optimize_graph, ConstantFolding, FoldOrder, GraphNode, GraphOptimizer, OnnxGraph,
    OptimizationPass, OptimizationStats, PassOptions, PassStats, CONSTANT_FOLDING,
};
pub use model::{load_model, save_model};
pub use pipeline::{OptimizationReport, Optimizer};
pub use tensor::{Tensor, TensorData};
