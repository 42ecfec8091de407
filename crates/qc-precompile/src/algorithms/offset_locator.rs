//! Offset Locator
//!
//! Finds where each slot landed in compiled bytecode, either from the
//! adapter's symbol table or by scanning for the slot's sentinel.

use crate::domain::services::find_occurrences;
use crate::domain::value_objects::UnitName;
use crate::errors::PrecompileError;
use crate::ports::outbound::SymbolTable;

/// How an offset was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetSource {
    /// Named by the compiler adapter.
    SymbolTable,
    /// Found by scanning for the sentinel.
    Scan,
}

/// Locates the slot of `variable` in `bytecode`.
///
/// A symbol-table entry wins over scanning, but the bytes at that offset
/// must still be the sentinel. When scanning, the sentinel must occur
/// exactly once.
///
/// # Errors
///
/// - `TemplateNotFound` if the sentinel is absent (or not at the named offset)
/// - `AmbiguousTemplate` if the sentinel occurs more than once
pub fn locate_slot(
    unit: &UnitName,
    variable: &str,
    bytecode: &[u8],
    sentinel: &[u8],
    symbols: &SymbolTable,
) -> Result<(usize, OffsetSource), PrecompileError> {
    let not_found = || PrecompileError::TemplateNotFound {
        unit: unit.clone(),
        variable: variable.to_string(),
    };

    if let Some(&offset) = symbols.get(variable) {
        let end = offset.checked_add(sentinel.len()).ok_or_else(not_found)?;
        return match bytecode.get(offset..end) {
            Some(bytes) if bytes == sentinel => Ok((offset, OffsetSource::SymbolTable)),
            _ => Err(not_found()),
        };
    }

    match find_occurrences(bytecode, sentinel).as_slice() {
        [] => Err(not_found()),
        [offset] => Ok((*offset, OffsetSource::Scan)),
        many => Err(PrecompileError::AmbiguousTemplate {
            unit: unit.clone(),
            variable: variable.to_string(),
            occurrences: many.len(),
        }),
    }
}

/// Locates every copy of an embedded child's open slot.
///
/// A child embedded more than once leaves one open slot per copy.
///
/// # Errors
///
/// `TemplateNotFound` (attributed to the child) if no copy survived
/// compilation.
pub fn locate_embedded_slot(
    child: &UnitName,
    variable: &str,
    bytecode: &[u8],
    sentinel: &[u8],
) -> Result<Vec<usize>, PrecompileError> {
    let offsets = find_occurrences(bytecode, sentinel);
    if offsets.is_empty() {
        return Err(PrecompileError::TemplateNotFound {
            unit: child.clone(),
            variable: variable.to_string(),
        });
    }
    Ok(offsets)
}
