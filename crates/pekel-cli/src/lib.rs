//! Core logic behind the `pekel` binary:
//! - `pack`: JSON to pekel stream
//! - `unpack`: pekel stream to pretty JSON

use pekel::{DecodeError, DecoderOptions, EncodeError, PekelDecoder, PekelEncoder};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Encodes a JSON document. Arrays become lists; floats and objects are
/// rejected.
pub fn pack(json: &str) -> Result<Vec<u8>, CliError> {
    let value: Value = serde_json::from_str(json)?;
    let bytes = PekelEncoder::new().encode_json(&value)?;
    tracing::debug!(len = bytes.len(), "packed");
    Ok(bytes)
}

/// Decodes a pekel stream to pretty JSON. Tuples and lists both become
/// arrays, bytes become base64 data URIs.
pub fn unpack(bytes: &[u8], options: DecoderOptions) -> Result<String, CliError> {
    let (value, used) = PekelDecoder::with_options(options).decode_with_consumed(bytes)?;
    if used < bytes.len() {
        tracing::warn!(
            ignored = bytes.len() - used,
            "input continues past the terminator"
        );
    }
    Ok(serde_json::to_string_pretty(&Value::from(value))?)
}
