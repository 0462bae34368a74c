//! Error types for the ONNX optimizer

use crate::config::ConfigError;
use std::io;
use thiserror::Error;

/// Result type for optimizer operations
pub type Result<T> = std::result::Result<T, OptimizerError>;

/// Errors that can occur while loading, optimizing or saving an ONNX model
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("Failed to parse ONNX model: {0}")]
    ParseError(String),

    #[error("Invalid model structure: {0}")]
    InvalidModel(String),

    #[error("Unknown optimization pass '{0}' (available: {1})")]
    UnknownPass(String, String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOp(String),

    #[error("Node execution failed: {0}")]
    ExecutionError(String),

    #[error("Unsupported tensor data type: {0}")]
    UnsupportedDataType(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("Invalid attribute value: {0}")]
    InvalidAttribute(String),

    #[error("Failed to fold node '{node}' ({op_type}): {source}")]
    FoldError {
        node: String,
        op_type: String,
        #[source]
        source: Box<OptimizerError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Protobuf decode error: {0}")]
    DecodeError(#[from] prost::DecodeError),

    #[error("Protobuf encode error: {0}")]
    EncodeError(#[from] prost::EncodeError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

impl OptimizerError {
    /// Attach the failing node to an executor error
    pub fn in_node(self, node: &str, op_type: &str) -> Self {
        OptimizerError::FoldError {
            node: node.to_string(),
            op_type: op_type.to_string(),
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through `FoldError` wrappers
    pub fn root_cause(&self) -> &OptimizerError {
        match self {
            OptimizerError::FoldError { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_error_display() {
        let err = OptimizerError::UnsupportedOp("LSTM".to_string()).in_node("lstm_0", "LSTM");
        assert_eq!(
            err.to_string(),
            "Failed to fold node 'lstm_0' (LSTM): Unsupported operation: LSTM"
        );
        assert!(matches!(err.root_cause(), OptimizerError::UnsupportedOp(_)));
    }

    #[test]
    fn test_unknown_pass_display() {
        let err = OptimizerError::UnknownPass("FUSION".to_string(), "CONSTANT_FOLDING".to_string());
        assert!(err.to_string().contains("FUSION"));
        assert!(err.to_string().contains("CONSTANT_FOLDING"));
    }
}
