//! # Value Objects
//!
//! Immutable primitives of the precompilation model.
//! These types are defined by their value, not identity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// Re-export U256 from primitive-types for integer template values
pub use primitive_types::U256;

/// Largest width a `Bytes` template variable may declare.
pub const MAX_BYTES_WIDTH: usize = 4096;

/// Largest width an integer template variable may declare (256 bits).
pub const MAX_UINT_WIDTH: usize = 32;

/// Width of an integer template variable when none is given (u64).
pub const DEFAULT_UINT_WIDTH: usize = 8;

/// Returns true if `s` is a non-empty ASCII identifier (`[A-Za-z0-9_]+`).
#[must_use]
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_identifier_byte)
}

/// Returns true if `b` may appear inside an identifier.
#[must_use]
pub fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

// =============================================================================
// UNIT NAME
// =============================================================================

/// Name of a unit, unique within a [`UnitGraph`](crate::domain::UnitGraph).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitName(String);

impl UnitName {
    /// Creates a unit name. Returns None unless `name` is an identifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        is_identifier(&name).then_some(Self(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UnitName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// HASH (32 bytes)
// =============================================================================

/// A 32-byte SHA-512/256 digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a hash from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Creates a hash from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(slice).ok().map(Self)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns true if this is the zero hash.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{}...{}",
            hex::encode(&self.0[..4]),
            hex::encode(&self.0[28..])
        )
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for [u8; 32] {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

// =============================================================================
// ADDRESS (32 bytes + checksum)
// =============================================================================

/// Content address of a signature program.
///
/// The 32 address bytes are the program's content hash; the 4-byte
/// checksum is carried alongside for the textual form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    bytes: [u8; 32],
    checksum: [u8; 4],
}

impl Address {
    /// Length of the address body in bytes.
    pub const LEN: usize = 32;

    /// Assembles an address from its body and checksum.
    #[must_use]
    pub const fn from_parts(bytes: [u8; 32], checksum: [u8; 4]) -> Self {
        Self { bytes, checksum }
    }

    /// Returns the 32 address bytes (the value embedded into bytecode).
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Returns the 4-byte checksum.
    #[must_use]
    pub const fn checksum(&self) -> &[u8; 4] {
        &self.checksum
    }

    /// Full textual form: hex body followed by hex checksum.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}{}", hex::encode(self.bytes), hex::encode(self.checksum))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.encode();
        write!(f, "{}...{}", &encoded[..8], &encoded[encoded.len() - 8..])
    }
}

// =============================================================================
// VALUE KIND
// =============================================================================

/// Kind and width of a template variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Fixed-width byte string.
    Bytes {
        /// Exact number of bytes reserved in the program.
        width: usize,
    },
    /// Unsigned integer, big-endian in `width` bytes.
    UInt {
        /// Number of bytes reserved in the program.
        width: usize,
    },
}

impl ValueKind {
    /// A byte string of exactly `width` bytes.
    #[must_use]
    pub const fn bytes(width: usize) -> Self {
        Self::Bytes { width }
    }

    /// A u64-sized unsigned integer.
    #[must_use]
    pub const fn uint() -> Self {
        Self::UInt {
            width: DEFAULT_UINT_WIDTH,
        }
    }

    /// An unsigned integer occupying `width` bytes.
    #[must_use]
    pub const fn uint_with_width(width: usize) -> Self {
        Self::UInt { width }
    }

    /// Number of bytes this kind occupies in bytecode.
    #[must_use]
    pub const fn width(&self) -> usize {
        match self {
            Self::Bytes { width } | Self::UInt { width } => *width,
        }
    }

    /// Returns true for byte strings.
    #[must_use]
    pub const fn is_bytes(&self) -> bool {
        matches!(self, Self::Bytes { .. })
    }

    /// Returns true if the width lies within the allowed range for the kind.
    #[must_use]
    pub const fn has_valid_width(&self) -> bool {
        match self {
            Self::Bytes { width } => *width >= 1 && *width <= MAX_BYTES_WIDTH,
            Self::UInt { width } => *width >= 1 && *width <= MAX_UINT_WIDTH,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes { width } => write!(f, "bytes[{width}]"),
            Self::UInt { width } => write!(f, "uint[{width}]"),
        }
    }
}

// =============================================================================
// TEMPLATE VALUE
// =============================================================================

/// A concrete value for a template variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TemplateValue {
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Unsigned integer.
    UInt(U256),
}

impl TemplateValue {
    /// Short kind label for diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::UInt(_) => "uint",
        }
    }
}

impl From<Vec<u8>> for TemplateValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for TemplateValue {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for TemplateValue {
    fn from(bytes: [u8; N]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Hash> for TemplateValue {
    fn from(hash: Hash) -> Self {
        Self::Bytes(hash.0.to_vec())
    }
}

impl From<Address> for TemplateValue {
    fn from(address: Address) -> Self {
        Self::Bytes(address.as_bytes().to_vec())
    }
}

impl From<u64> for TemplateValue {
    fn from(value: u64) -> Self {
        Self::UInt(U256::from(value))
    }
}

impl From<U256> for TemplateValue {
    fn from(value: U256) -> Self {
        Self::UInt(value)
    }
}

// =============================================================================
// EXTERNAL BINDINGS
// =============================================================================

/// Values supplied by the caller of a build.
///
/// Keys are either qualified (`"<unit>.<variable>"`) or bare
/// (`"<variable>"`); a qualified key wins over a bare one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalBindings(BTreeMap<String, TemplateValue>);

impl ExternalBindings {
    /// Creates an empty binding set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<TemplateValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a binding.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TemplateValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Looks up the value for `variable` of `unit`.
    #[must_use]
    pub fn lookup(&self, unit: &UnitName, variable: &str) -> Option<&TemplateValue> {
        self.0
            .get(&format!("{unit}.{variable}"))
            .or_else(|| self.0.get(variable))
    }

    /// Raw access by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TemplateValue> {
        self.0.get(key)
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no bindings are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates bindings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TemplateValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<TemplateValue>> FromIterator<(K, V)> for ExternalBindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
