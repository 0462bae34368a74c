// Graph optimization driver
//
// Applies a list of optimization passes to an OnnxGraph, each pass exactly once,
// in the requested order, and collects statistics along the way.

use super::ir::OnnxGraph;
use super::passes::OptimizationPass;
use super::registry::{create_passes, PassOptions};
use crate::error::Result;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Graph optimizer
///
/// Runs a sequence of optimization passes on an OnnxGraph.
pub struct GraphOptimizer {
    /// Optimization passes to apply
    passes: Vec<Box<dyn OptimizationPass>>,

    /// Whether to log detailed statistics
    verbose: bool,
}

impl GraphOptimizer {
    /// Create a new graph optimizer with default settings
    pub fn new(passes: Vec<Box<dyn OptimizationPass>>) -> Self {
        Self { passes, verbose: false }
    }

    /// Create an optimizer from registered pass names
    ///
    /// Fails with `UnknownPass` if any name is not registered.
    pub fn from_names<S: AsRef<str>>(names: &[S], options: &PassOptions) -> Result<Self> {
        Ok(Self::new(create_passes(names, options)?))
    }

    /// Enable verbose logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Optimize the graph
    ///
    /// Runs every pass once, in order. The first failing pass aborts the run.
    ///
    /// Returns statistics about the optimization process.
    pub fn optimize(&self, graph: &mut OnnxGraph) -> Result<OptimizationStats> {
        let start_time = Instant::now();
        let initial_stats = graph.statistics();

        info!("Starting graph optimization...");
        if self.verbose {
            info!("Initial graph: {}", initial_stats);
        }

        let mut pass_stats = Vec::with_capacity(self.passes.len());

        for pass in &self.passes {
            let pass_start = Instant::now();
            let nodes_before = graph.node_count();
            let constants_before = graph.constant_count();

            let changed = pass.run(graph)?;

            let pass_duration = pass_start.elapsed();
            let nodes_removed = nodes_before.saturating_sub(graph.node_count());
            let constants_added = graph.constant_count().saturating_sub(constants_before);

            if changed {
                debug!(
                    "  {} - Changed: yes, Nodes removed: {}, Time: {:?}",
                    pass.name(),
                    nodes_removed,
                    pass_duration
                );
            } else {
                debug!("  {} - No changes, Time: {:?}", pass.name(), pass_duration);
            }

            pass_stats.push(PassStats {
                pass_name: pass.name().to_string(),
                changed,
                nodes_removed,
                constants_added,
                duration: pass_duration,
            });
        }

        let final_stats = graph.statistics();

        let stats = OptimizationStats {
            initial_nodes: initial_stats.total_nodes,
            final_nodes: final_stats.total_nodes,
            nodes_removed: initial_stats.total_nodes.saturating_sub(final_stats.total_nodes),
            initial_constants: initial_stats.num_initializers,
            final_constants: final_stats.num_initializers,
            duration: start_time.elapsed(),
            pass_stats,
        };

        if self.verbose {
            info!("Optimization complete:");
            info!(
                "  Nodes: {} → {} (removed {})",
                stats.initial_nodes, stats.final_nodes, stats.nodes_removed
            );
            info!("  Constants: {} → {}", stats.initial_constants, stats.final_constants);
            info!("  Total time: {:?}", stats.duration);
        }

        Ok(stats)
    }
}

/// Statistics for a single pass execution
#[derive(Debug, Clone)]
pub struct PassStats {
    pub pass_name: String,
    pub changed: bool,
    pub nodes_removed: usize,
    pub constants_added: usize,
    pub duration: Duration,
}

/// Overall optimization statistics
#[derive(Debug, Clone)]
pub struct OptimizationStats {
    pub initial_nodes: usize,
    pub final_nodes: usize,
    pub nodes_removed: usize,
    pub initial_constants: usize,
    pub final_constants: usize,
    pub duration: Duration,
    pub pass_stats: Vec<PassStats>,
}

impl OptimizationStats {
    /// Number of constants created by all passes
    pub fn constants_added(&self) -> usize {
        self.final_constants.saturating_sub(self.initial_constants)
    }

    pub fn changed(&self) -> bool {
        self.pass_stats.iter().any(|stat| stat.changed)
    }
}

impl std::fmt::Display for OptimizationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Optimization Statistics:")?;
        writeln!(
            f,
            "  Nodes: {} → {} (removed {})",
            self.initial_nodes, self.final_nodes, self.nodes_removed
        )?;
        writeln!(
            f,
            "  Constants: {} → {} (added {})",
            self.initial_constants,
            self.final_constants,
            self.constants_added()
        )?;
        writeln!(f, "  Total time: {:?}", self.duration)?;

        if !self.pass_stats.is_empty() {
            writeln!(f, "  Pass details:")?;
            for stat in &self.pass_stats {
                writeln!(
                    f,
                    "    {} - Removed {} nodes, added {} constants ({:?})",
                    stat.pass_name, stat.nodes_removed, stat.constants_added, stat.duration
                )?;
            }
        }

        Ok(())
    }
}

/// Apply the named passes to `graph`, in order
///
/// All names are validated before the graph is modified.
pub fn optimize_graph<S: AsRef<str>>(
    graph: &mut OnnxGraph,
    pass_names: &[S],
    options: &PassOptions,
) -> Result<OptimizationStats> {
    GraphOptimizer::from_names(pass_names, options)?.optimize(graph)
}
