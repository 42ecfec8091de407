//! # Persisted Artifact Form
//!
//! Artifacts are written as JSON for tooling (bytecode as hex) or as
//! compact bincode for storage. Both forms round-trip exactly, and decoding
//! rejects artifacts whose hash, address or slots disagree with the bytecode.

use crate::domain::entities::CompiledArtifact;
use crate::domain::invariants::artifact_invariants_hold;
use crate::errors::CodecError;

/// Serializes an artifact as pretty-printed JSON.
///
/// # Errors
///
/// `Json` if serialization fails.
pub fn to_json(artifact: &CompiledArtifact) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(artifact)?)
}

/// Parses an artifact from JSON.
///
/// # Errors
///
/// `Json` on malformed input or missing fields, `Inconsistent` if the
/// decoded artifact fails its invariants.
pub fn from_json(json: &str) -> Result<CompiledArtifact, CodecError> {
    checked(serde_json::from_str(json)?)
}

/// Serializes an artifact with bincode.
///
/// # Errors
///
/// `Binary` if serialization fails.
pub fn to_bytes(artifact: &CompiledArtifact) -> Result<Vec<u8>, CodecError> {
    Ok(bincode::serialize(artifact)?)
}

/// Deserializes an artifact written by [`to_bytes`].
///
/// # Errors
///
/// `Binary` on truncated or corrupt input, `Inconsistent` as for
/// [`from_json`].
pub fn from_bytes(bytes: &[u8]) -> Result<CompiledArtifact, CodecError> {
    checked(bincode::deserialize(bytes)?)
}

fn checked(artifact: CompiledArtifact) -> Result<CompiledArtifact, CodecError> {
    if artifact_invariants_hold(&artifact) {
        Ok(artifact)
    } else {
        Err(CodecError::Inconsistent(artifact.unit))
    }
}
