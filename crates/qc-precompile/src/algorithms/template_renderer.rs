//! Template Renderer
//!
//! Finds `TMPL_<variable>` and `CHILD_<unit>` tokens in a source template and
//! substitutes them with hex literals: the variable's sentinel, or the
//! child's bytecode.
//!
//! A token only counts at an identifier boundary (`xTMPL_a` is left alone),
//! and its name is the longest identifier run after the prefix.

use crate::domain::services::hex_literal;
use crate::domain::value_objects::{is_identifier_byte, UnitName};
use crate::errors::PrecompileError;
use std::collections::HashMap;
use std::ops::Range;

/// Prefix of a template variable token.
pub const VARIABLE_PREFIX: &str = "TMPL_";

/// Prefix of a child bytecode token.
pub const CHILD_PREFIX: &str = "CHILD_";

/// What a placeholder token stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// `TMPL_<variable>`
    Variable,
    /// `CHILD_<unit>`
    Child,
}

/// A placeholder token found in a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder {
    /// Variable or child.
    pub kind: PlaceholderKind,
    /// Name following the prefix.
    pub name: String,
    /// Byte range of the whole token in the template.
    pub span: Range<usize>,
}

impl Placeholder {
    /// The token as written in the template.
    #[must_use]
    pub fn token(&self) -> String {
        match self.kind {
            PlaceholderKind::Variable => format!("{VARIABLE_PREFIX}{}", self.name),
            PlaceholderKind::Child => format!("{CHILD_PREFIX}{}", self.name),
        }
    }
}

/// Source text ready for the compiler adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedSource {
    /// Rendered text.
    pub source: String,
    /// Variables substituted, in order of first appearance.
    pub variables: Vec<String>,
    /// Children whose bytecode was embedded, in order of first appearance.
    pub embedded_children: Vec<UnitName>,
}

/// Lists every placeholder token in `template`, in source order.
#[must_use]
pub fn scan_placeholders(template: &str) -> Vec<Placeholder> {
    let bytes = template.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    'outer: while i < bytes.len() {
        let at_boundary = i == 0 || !is_identifier_byte(bytes[i - 1]);
        if at_boundary {
            for (prefix, kind) in [
                (VARIABLE_PREFIX, PlaceholderKind::Variable),
                (CHILD_PREFIX, PlaceholderKind::Child),
            ] {
                if !bytes[i..].starts_with(prefix.as_bytes()) {
                    continue;
                }
                let start = i + prefix.len();
                let len = bytes[start..]
                    .iter()
                    .take_while(|b| is_identifier_byte(**b))
                    .count();
                if len == 0 {
                    continue;
                }
                let end = start + len;
                found.push(Placeholder {
                    kind,
                    name: template[start..end].to_string(),
                    span: i..end,
                });
                i = end;
                continue 'outer;
            }
        }
        i += 1;
    }

    found
}

/// Renders `template` for `unit`.
///
/// `sentinels` maps every declared variable to the bytes rendered in its
/// place; `children` maps every declared child to its bytecode.
///
/// # Errors
///
/// `UndeclaredPlaceholder` if a token names an undeclared variable or child.
pub fn render_template(
    unit: &UnitName,
    template: &str,
    sentinels: &HashMap<&str, Vec<u8>>,
    children: &HashMap<&UnitName, &[u8]>,
) -> Result<RenderedSource, PrecompileError> {
    let mut source = String::with_capacity(template.len());
    let mut variables: Vec<String> = Vec::new();
    let mut embedded_children: Vec<UnitName> = Vec::new();
    let mut cursor = 0;

    for placeholder in scan_placeholders(template) {
        source.push_str(&template[cursor..placeholder.span.start]);
        cursor = placeholder.span.end;

        let undeclared = || PrecompileError::UndeclaredPlaceholder {
            unit: unit.clone(),
            placeholder: placeholder.token(),
        };

        match placeholder.kind {
            PlaceholderKind::Variable => {
                let bytes = sentinels
                    .get(placeholder.name.as_str())
                    .ok_or_else(undeclared)?;
                source.push_str(&hex_literal(bytes));
                if !variables.contains(&placeholder.name) {
                    variables.push(placeholder.name.clone());
                }
            }
            PlaceholderKind::Child => {
                let (child, bytecode) = children
                    .iter()
                    .find(|(name, _)| name.as_str() == placeholder.name)
                    .ok_or_else(undeclared)?;
                source.push_str(&hex_literal(bytecode));
                if !embedded_children.contains(*child) {
                    embedded_children.push((*child).clone());
                }
            }
        }
    }
    source.push_str(&template[cursor..]);

    Ok(RenderedSource {
        source,
        variables,
        embedded_children,
    })
}
