//! ONNX model loading and saving

use crate::error::{OptimizerError, Result};
use crate::proto::ModelProto;
use prost::Message;
use std::path::Path;
use tracing::debug;

/// Decode a model from raw protobuf bytes
///
/// Fails with `InvalidModel` if the model carries no graph.
pub fn decode_model(bytes: &[u8]) -> Result<ModelProto> {
    let model = ModelProto::decode(bytes)?;
    if model.graph.is_none() {
        return Err(OptimizerError::InvalidModel("ONNX model has no graph".to_string()));
    }
    Ok(model)
}

/// Read and decode an ONNX model file
pub fn load_model(path: impl AsRef<Path>) -> Result<ModelProto> {
    let path = path.as_ref();
    let onnx_bytes = std::fs::read(path)?;
    debug!("Read {} bytes from {}", onnx_bytes.len(), path.display());

    decode_model(&onnx_bytes)
}

/// Encode a model and write it to `path`, replacing any existing file
pub fn save_model(model: &ModelProto, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = model.encode_to_vec();
    std::fs::write(path, &bytes)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
