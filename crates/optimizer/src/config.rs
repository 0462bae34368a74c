//! Configuration file support for onnx-optimizer
//!
//! Supports loading optimizer settings from TOML configuration files.
//!
//! # Config File Locations
//!
//! The optimizer searches for config files in the following order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./onnx-optimizer.toml` (current directory)
//! 3. `./.onnx-optimizer.toml` (dotfile in current directory)
//! 4. `~/.config/onnx-optimizer/config.toml` (user config)
//!
//! # Example Config File
//!
//! ```toml
//! # onnx-optimizer.toml
//!
//! # Passes to apply, in order (default: ["CONSTANT_FOLDING"])
//! passes = ["CONSTANT_FOLDING"]
//!
//! # Node visit order for constant folding: "topological" or "sequential"
//! fold_order = "topological"
//!
//! # Also list folded constants as graph inputs (default: true)
//! expose_folded_as_inputs = true
//!
//! # Enable verbose output (default: false)
//! verbose = true
//! ```

use crate::graph::passes::FoldOrder;
use crate::graph::registry::CONSTANT_FOLDING;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Section name used in shared config files
pub const CONFIG_SECTION: &str = "onnx-optimizer";

/// Root configuration that can contain sections for different tools
///
/// Supports two formats:
///
/// 1. **Sectioned format** (recommended for shared config):
/// ```toml
/// [onnx-optimizer]
/// fold_order = "sequential"
/// verbose = true
/// ```
///
/// 2. **Direct format**:
/// ```toml
/// fold_order = "sequential"
/// verbose = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct RootConfig {
    /// Optimizer settings (under [onnx-optimizer] section)
    #[serde(rename = "onnx-optimizer", skip_serializing_if = "Option::is_none")]
    pub onnx_optimizer: Option<OptimizerConfig>,

    /// Direct settings, flattened at root level
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub direct: Option<OptimizerConfig>,
}

/// Optimizer configuration loaded from TOML file
///
/// All fields are optional. CLI arguments override config file values.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OptimizerConfig {
    /// Input ONNX model path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,

    /// Output ONNX model path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Pass names to apply, in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passes: Option<Vec<String>>,

    /// Node visit order used by constant folding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fold_order: Option<FoldOrder>,

    /// Register folded constants as graph inputs as well as initializers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expose_folded_as_inputs: Option<bool>,

    /// Enable verbose output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

impl OptimizerConfig {
    /// Load config from TOML file
    ///
    /// Accepts both the sectioned and the direct format; the `[onnx-optimizer]`
    /// section wins when present.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use onnx_optimizer_core::config::OptimizerConfig;
    ///
    /// let config = OptimizerConfig::load("onnx-optimizer.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::IoError(path.as_ref().to_path_buf(), e))?;

        let root: RootConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(path.as_ref().to_path_buf(), e))?;

        Ok(root.onnx_optimizer.or(root.direct).unwrap_or_default())
    }

    /// Find and load config file from standard locations
    ///
    /// Returns `None` if no config file is found.
    pub fn find_and_load() -> Result<Option<Self>, ConfigError> {
        for candidate in Self::search_paths() {
            if candidate.exists() {
                tracing::debug!("Using config file {}", candidate.display());
                return Ok(Some(Self::load(&candidate)?));
            }
        }

        Ok(None)
    }

    /// Standard config locations, in search order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("./onnx-optimizer.toml"),
            PathBuf::from("./.onnx-optimizer.toml"),
        ];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config/onnx-optimizer/config.toml"));
        }

        paths
    }

    /// Save config to TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(path.as_ref().to_path_buf(), e))?;

        Ok(())
    }

    /// Merge with CLI arguments (CLI args take precedence)
    ///
    /// Values missing from both sources fall back to the defaults: the single
    /// `CONSTANT_FOLDING` pass, topological fold order, folded constants exposed
    /// as graph inputs, quiet output.
    pub fn merge_with_cli(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        passes: Option<Vec<String>>,
        fold_order: Option<FoldOrder>,
        expose_folded_as_inputs: Option<bool>,
        verbose: Option<bool>,
    ) -> MergedConfig {
        MergedConfig {
            input: input.or_else(|| self.input.clone()),
            output: output.or_else(|| self.output.clone()),
            passes: passes
                .or_else(|| self.passes.clone())
                .unwrap_or_else(|| vec![CONSTANT_FOLDING.to_string()]),
            fold_order: fold_order.or(self.fold_order).unwrap_or_default(),
            expose_folded_as_inputs: expose_folded_as_inputs.or(self.expose_folded_as_inputs).unwrap_or(true),
            verbose: verbose.or(self.verbose).unwrap_or(false),
        }
    }
}

/// Merged configuration after combining config file + CLI args
///
/// Paths may still be unset; the CLI reports that as a usage error.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub passes: Vec<String>,
    pub fold_order: FoldOrder,
    pub expose_folded_as_inputs: bool,
    pub verbose: bool,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file {0}: {1}")]
    IoError(PathBuf, #[source] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, #[source] toml::de::Error),

    /// Failed to serialize config
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[source] toml::ser::Error),
}
