//! Load, optimize and save in one call
//!
//! [`Optimizer`] bundles the pass list and pass settings. It converts a
//! `ModelProto` into an [`OnnxGraph`], runs the driver and writes the rewritten
//! graph back into the model. Everything outside `graph.node`,
//! `graph.initializer` and `graph.input` is carried through unchanged.

use crate::error::{OptimizerError, Result};
use crate::executor::NodeExecutor;
use crate::graph::optimizer::{GraphOptimizer, OptimizationStats};
use crate::graph::passes::FoldOrder;
use crate::graph::registry::{PassOptions, CONSTANT_FOLDING};
use crate::graph::OnnxGraph;
use crate::model::{load_model, save_model};
use crate::proto::ModelProto;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Model optimizer
pub struct Optimizer {
    /// Pass names, applied in order
    passes: Vec<String>,

    /// Settings handed to each pass
    options: PassOptions,

    /// Log per-pass statistics
    verbose: bool,
}

impl Optimizer {
    /// Create an optimizer running the constant folding pass with default settings
    pub fn new() -> Self {
        Self {
            passes: vec![CONSTANT_FOLDING.to_string()],
            options: PassOptions::default(),
            verbose: false,
        }
    }

    /// Replace the pass list
    pub fn with_passes<I, S>(mut self, passes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.passes = passes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the node visit order used by constant folding
    pub fn with_fold_order(mut self, order: FoldOrder) -> Self {
        self.options.fold_order = order;
        self
    }

    /// Also register folded constants as graph inputs
    pub fn with_expose_folded_as_inputs(mut self, expose: bool) -> Self {
        self.options.expose_folded_as_inputs = expose;
        self
    }

    /// Use a custom single-node executor
    pub fn with_executor(mut self, executor: Arc<dyn NodeExecutor>) -> Self {
        self.options.executor = executor;
        self
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn passes(&self) -> &[String] {
        &self.passes
    }

    /// Optimize an in-memory model
    ///
    /// `model_dir` is the directory external tensor data is resolved against.
    /// Pass names are validated before the graph is touched.
    pub fn optimize_model(
        &self,
        mut model: ModelProto,
        model_dir: Option<&Path>,
    ) -> Result<(ModelProto, OptimizationStats)> {
        let optimizer = GraphOptimizer::from_names(&self.passes, &self.options)?.with_verbose(self.verbose);

        let onnx_graph = model
            .graph
            .take()
            .ok_or_else(|| OptimizerError::InvalidModel("ONNX model has no graph".to_string()))?;

        let mut graph = OnnxGraph::from_onnx_with_path(onnx_graph, model_dir);
        let stats = optimizer.optimize(&mut graph)?;

        model.graph = Some(graph.to_onnx());
        Ok((model, stats))
    }

    /// Optimize the model at `input_path` and write the result to `output_path`
    ///
    /// The output file is only written when loading and optimization both succeed.
    pub fn optimize_file(
        &self,
        input_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<OptimizationReport> {
        let start = Instant::now();
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        // Validate before reading a potentially large file
        GraphOptimizer::from_names(&self.passes, &self.options)?;

        info!("Loading {}", input_path.display());
        let load_start = Instant::now();
        let model = load_model(input_path)?;
        let load_time = load_start.elapsed();

        let model_dir = input_path.parent();
        let (model, stats) = self.optimize_model(model, model_dir)?;

        info!("Saving {}", output_path.display());
        let save_start = Instant::now();
        save_model(&model, output_path)?;
        let save_time = save_start.elapsed();

        Ok(OptimizationReport {
            input: input_path.to_path_buf(),
            output: output_path.to_path_buf(),
            stats,
            load_time,
            save_time,
            total_time: start.elapsed(),
        })
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of optimizing a model file
#[derive(Debug, Clone)]
pub struct OptimizationReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub stats: OptimizationStats,
    pub load_time: Duration,
    pub save_time: Duration,
    pub total_time: Duration,
}

impl std::fmt::Display for OptimizationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Input:  {}", self.input.display())?;
        writeln!(f, "Output: {}", self.output.display())?;
        write!(f, "{}", self.stats)?;
        write!(
            f,
            "  Load: {:?} | Save: {:?} | Total: {:?}",
            self.load_time, self.save_time, self.total_time
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphNode;
    use crate::proto::{GraphProto, StringStringEntryProto};
    use crate::tensor::Tensor;

    fn add_model() -> ModelProto {
        let add = GraphNode::new("Add", ["a", "b"], ["c"]).with_name("add");
        ModelProto {
            ir_version: 8,
            producer_name: "pipeline-test".to_string(),
            metadata_props: vec![StringStringEntryProto {
                key: "author".to_string(),
                value: "someone".to_string(),
            }],
            graph: Some(GraphProto {
                name: "main".to_string(),
                node: vec![add.to_onnx_node()],
                initializer: vec![
                    Tensor::scalar(2.0f32).to_proto("a"),
                    Tensor::scalar(3.0f32).to_proto("b"),
                ],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_optimize_model_preserves_metadata() {
        let (model, stats) = Optimizer::new().optimize_model(add_model(), None).unwrap();

        assert_eq!(stats.nodes_removed, 1);
        assert_eq!(model.producer_name, "pipeline-test");
        assert_eq!(model.metadata_props.len(), 1);

        let graph = model.graph.unwrap();
        assert_eq!(graph.name, "main");
        assert!(graph.node.is_empty());
        assert_eq!(graph.initializer.len(), 3);
        assert_eq!(graph.input.len(), 1);

        let c = graph.initializer.iter().find(|init| init.name == "c").unwrap();
        assert_eq!(Tensor::from_proto(c).unwrap(), Tensor::scalar(5.0f32));
    }

    #[test]
    fn test_unknown_pass_rejected() {
        let result = Optimizer::new()
            .with_passes(["CONSTANT_FOLDING", "NOT_A_PASS"])
            .optimize_model(add_model(), None);

        match result {
            Err(OptimizerError::UnknownPass(name, _)) => assert_eq!(name, "NOT_A_PASS"),
            other => panic!("expected UnknownPass, got {:?}", other.map(|(_, stats)| stats)),
        }
    }

    #[test]
    fn test_empty_pass_list_is_noop() {
        let original = add_model();
        let (model, stats) = Optimizer::new()
            .with_passes(Vec::<String>::new())
            .optimize_model(original.clone(), None)
            .unwrap();

        assert_eq!(model, original);
        assert!(!stats.changed());
    }

    #[test]
    fn test_missing_graph() {
        let model = ModelProto::default();
        let result = Optimizer::new().optimize_model(model, None);
        assert!(matches!(result, Err(OptimizerError::InvalidModel(_))));
    }
}
