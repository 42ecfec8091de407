//! # Domain Services
//!
//! Pure functions of the precompilation model: content hashing, address
//! derivation, sentinel generation, value encoding and byte scanning.
//! These functions are deterministic and have no side effects.

use crate::domain::value_objects::{Address, Hash, TemplateValue, UnitName, ValueKind};
use crate::errors::ValueError;
use sha2::{Digest, Sha512_256};

/// Prefix hashed in front of program bytes when computing a content hash.
pub const PROGRAM_DOMAIN_SEPARATOR: &[u8] = b"Program";

/// Domain tag for sentinel generation.
const SENTINEL_DOMAIN: &[u8] = b"qc-precompile/sentinel/v1";

// =============================================================================
// CONTENT HASH & ADDRESS
// =============================================================================

/// Computes the content hash of a program.
///
/// hash = SHA-512/256("Program" ++ bytecode)
#[must_use]
pub fn content_hash(bytecode: &[u8]) -> Hash {
    let mut hasher = Sha512_256::new();
    hasher.update(PROGRAM_DOMAIN_SEPARATOR);
    hasher.update(bytecode);
    Hash::new(hasher.finalize().into())
}

/// Derives the content address for a content hash.
///
/// The address body is the hash itself; the checksum is the last four bytes
/// of SHA-512/256(hash).
#[must_use]
pub fn derive_address(hash: &Hash) -> Address {
    let digest = Sha512_256::digest(hash.as_bytes());
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&digest[28..32]);
    Address::from_parts(*hash.as_bytes(), checksum)
}

/// Content address of a program, in one step.
#[must_use]
pub fn program_address(bytecode: &[u8]) -> Address {
    derive_address(&content_hash(bytecode))
}

// =============================================================================
// SENTINELS
// =============================================================================

/// Whether a slot receives a value at build time or stays open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// A value is patched in after compilation.
    Bound,
    /// Left for a parent or the caller to patch later.
    Open,
}

impl SlotState {
    const fn tag(self) -> u8 {
        match self {
            Self::Bound => 0x01,
            Self::Open => 0x02,
        }
    }
}

/// Generates the placeholder bytes rendered for a variable.
///
/// The pattern depends only on the unit, the variable, the width and the
/// slot state, never on the bound value, so recompiling with a different
/// value yields identical bytecode outside the patched region.
#[must_use]
pub fn sentinel(unit: &UnitName, variable: &str, width: usize, state: SlotState) -> Vec<u8> {
    let mut out = Vec::with_capacity(width + 32);
    let mut counter: u32 = 0;
    while out.len() < width {
        let mut hasher = Sha512_256::new();
        hasher.update(SENTINEL_DOMAIN);
        hasher.update([state.tag()]);
        hasher.update(unit.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(variable.as_bytes());
        hasher.update(counter.to_be_bytes());
        out.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    out.truncate(width);
    out
}

// =============================================================================
// VALUE ENCODING
// =============================================================================

/// Encodes a value into exactly `kind.width()` bytes.
///
/// Bytes must match the width exactly. Integers are big-endian and fail if
/// their significant bytes exceed the width.
pub fn encode_value(kind: &ValueKind, value: &TemplateValue) -> Result<Vec<u8>, ValueError> {
    match (kind, value) {
        (ValueKind::Bytes { width }, TemplateValue::Bytes(bytes)) => {
            if bytes.len() == *width {
                Ok(bytes.clone())
            } else {
                Err(ValueError::WidthMismatch {
                    expected: *width,
                    actual: bytes.len(),
                })
            }
        }
        (ValueKind::UInt { width }, TemplateValue::UInt(int)) => {
            let needed = (int.bits() + 7) / 8;
            if needed > *width {
                return Err(ValueError::WidthMismatch {
                    expected: *width,
                    actual: needed,
                });
            }
            let mut buf = [0u8; 32];
            int.to_big_endian(&mut buf);
            Ok(buf[32 - width..].to_vec())
        }
        (ValueKind::Bytes { .. }, TemplateValue::UInt(_)) => Err(ValueError::KindMismatch {
            expected: "bytes",
            actual: "uint",
        }),
        (ValueKind::UInt { .. }, TemplateValue::Bytes(_)) => Err(ValueError::KindMismatch {
            expected: "uint",
            actual: "bytes",
        }),
    }
}

// =============================================================================
// BYTE SCANNING & PATCHING
// =============================================================================

/// Returns every offset at which `needle` occurs in `haystack`.
///
/// Overlapping occurrences are reported. An empty needle matches nowhere.
#[must_use]
pub fn find_occurrences(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(offset, _)| offset)
        .collect()
}

/// Overwrites `bytecode[offset..offset + value.len()]` with `value`.
///
/// Returns false (leaving the bytecode untouched) if the range is out of bounds.
pub fn patch(bytecode: &mut [u8], offset: usize, value: &[u8]) -> bool {
    let Some(end) = offset.checked_add(value.len()) else {
        return false;
    };
    match bytecode.get_mut(offset..end) {
        Some(region) => {
            region.copy_from_slice(value);
            true
        }
        None => false,
    }
}

/// Renders bytes as a `0x`-prefixed lowercase hex literal.
#[must_use]
pub fn hex_literal(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// =============================================================================
// TESTS
// =============================================================================
