//! # onnx-optimizer
//!
//! Constant folding for ONNX models, as a CLI (`onnx-optimize`) and a library.
//!
//! ## CLI Usage
//!
//! ```bash
//! onnx-optimize --infile model.onnx --outfile model.folded.onnx
//!
//! # Visit nodes in file order instead of dependency order
//! onnx-optimize -i model.onnx -o out.onnx --fold-order sequential
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use onnx_optimizer::Optimizer;
//!
//! let report = Optimizer::new().optimize_file("model.onnx", "out.onnx")?;
//! println!("{}", report);
//! # Ok::<(), onnx_optimizer::OptimizerError>(())
//! ```

// Re-export everything from the core crate
pub use onnx_optimizer_core::*;

/// Get the version of onnx-optimizer
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
