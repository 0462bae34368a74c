//! Pass registry
//!
//! A fixed table mapping pass names to constructors. Names are validated here
//! before the driver touches the graph.

use super::passes::{ConstantFolding, FoldOrder, OptimizationPass};
use crate::error::{OptimizerError, Result};
use crate::executor::{NodeExecutor, ReferenceExecutor};
use std::sync::Arc;

/// Name of the constant folding pass
pub const CONSTANT_FOLDING: &str = "CONSTANT_FOLDING";

/// Settings handed to every pass constructor
#[derive(Clone)]
pub struct PassOptions {
    pub fold_order: FoldOrder,
    pub expose_folded_as_inputs: bool,
    pub executor: Arc<dyn NodeExecutor>,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            fold_order: FoldOrder::default(),
            expose_folded_as_inputs: true,
            executor: Arc::new(ReferenceExecutor::new()),
        }
    }
}

impl std::fmt::Debug for PassOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassOptions")
            .field("fold_order", &self.fold_order)
            .field("expose_folded_as_inputs", &self.expose_folded_as_inputs)
            .finish_non_exhaustive()
    }
}

/// Pass constructor
pub type PassFactory = fn(&PassOptions) -> Box<dyn OptimizationPass>;

fn constant_folding(options: &PassOptions) -> Box<dyn OptimizationPass> {
    Box::new(
        ConstantFolding::new()
            .with_executor(Arc::clone(&options.executor))
            .with_order(options.fold_order)
            .with_expose_folded_as_inputs(options.expose_folded_as_inputs),
    )
}

const PASSES: &[(&str, PassFactory)] = &[(CONSTANT_FOLDING, constant_folding)];

/// Names of all registered passes
pub fn available_passes() -> Vec<&'static str> {
    PASSES.iter().map(|(name, _)| *name).collect()
}

/// Look up a pass constructor by name
pub fn lookup(name: &str) -> Option<PassFactory> {
    PASSES
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, factory)| *factory)
}

/// Build the named passes, in order
///
/// Every name is checked before any pass is constructed, so an unknown name
/// fails with `UnknownPass` without side effects.
pub fn create_passes<S: AsRef<str>>(names: &[S], options: &PassOptions) -> Result<Vec<Box<dyn OptimizationPass>>> {
    let factories = names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            lookup(name).ok_or_else(|| OptimizerError::UnknownPass(name.to_string(), available_passes().join(", ")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(factories.into_iter().map(|factory| factory(options)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert!(lookup(CONSTANT_FOLDING).is_some());
        assert!(lookup("constant_folding").is_none());
        assert_eq!(available_passes(), vec!["CONSTANT_FOLDING"]);
    }

    #[test]
    fn test_create_passes_in_order() {
        let passes = create_passes(&[CONSTANT_FOLDING, CONSTANT_FOLDING], &PassOptions::default()).unwrap();
        assert_eq!(passes.len(), 2);
        assert!(passes.iter().all(|p| p.name() == CONSTANT_FOLDING));
    }

    #[test]
    fn test_unknown_pass() {
        let result = create_passes(&["CONSTANT_FOLDING", "FUSE_BN"], &PassOptions::default());
        match result {
            Err(OptimizerError::UnknownPass(name, available)) => {
                assert_eq!(name, "FUSE_BN");
                assert_eq!(available, "CONSTANT_FOLDING");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected UnknownPass"),
        }
    }
}
