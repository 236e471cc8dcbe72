//! Content hashing of canonical JSON payloads.

use cutflow_core::errors::AnaError;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::serde::to_canonical_json_bytes;

/// SHA-256 over the canonical JSON form of `value`, as lowercase hex.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, AnaError> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Leading twelve hex digits of a hash, for log headers.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
