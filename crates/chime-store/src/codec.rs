//! Record serialization.
//!
//! Records are JSON objects. Fields are matched by name and every optional
//! field carries a serde default, so older records decode after new fields
//! are added.

use chime_core::error::{ChimeError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub fn encode_record<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| ChimeError::Internal(format!("encode record: {e}")))
}

pub fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| ChimeError::Decode(e.to_string()))
}
