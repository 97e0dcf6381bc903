//! Content-addressed cache keys.

use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

use crate::error::{RiftError, RiftResult};

/// RFC 8785 canonical bytes: object keys sorted, no insignificant whitespace.
pub fn canonical_json(value: &JsonValue) -> RiftResult<Vec<u8>> {
    serde_jcs::to_vec(value).map_err(|e| RiftError::ValidationFailure {
        message: format!("failed to canonicalize narrative input: {e}"),
    })
}

/// SHA-256 over model id, system prompt and the canonical input, hex encoded.
pub fn cache_key(model_id: &str, system_prompt: &str, input: &JsonValue) -> RiftResult<String> {
    let canonical = canonical_json(input)?;
    let mut h = Sha256::new();
    h.update(model_id.as_bytes());
    h.update(b"\n");
    h.update(system_prompt.as_bytes());
    h.update(b"\n");
    h.update(&canonical);
    Ok(hex::encode(h.finalize()))
}
