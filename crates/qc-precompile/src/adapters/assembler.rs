//! # Line Assembler
//!
//! A small deterministic assembler implementing [`CompilerAdapter`].
//!
//! ## Syntax
//!
//! One instruction per line; `//` starts a comment.
//!
//! | Form | Encoding |
//! |------|----------|
//! | `#pragma version N` | `N` as the first byte (must precede instructions) |
//! | `pushbytes 0xHEX` | `0x80`, uvarint length, raw bytes |
//! | `pushint N` | `0x81`, `0x08`, `N` as 8 big-endian bytes |
//! | `pushint 0xHEX` | `0x81`, byte count, raw bytes |
//! | `<mnemonic>` | one opcode byte from [`OPCODES`] |
//!
//! A trailing `@name` records `name` in the symbol table at the offset of
//! the instruction's immediate (or of the opcode, for bare mnemonics).

use crate::domain::value_objects::is_identifier;
use crate::ports::outbound::{CompileDiagnostic, CompilerAdapter, CompilerOutput, SymbolTable};

/// Opcode of `pushbytes`.
pub const OP_PUSHBYTES: u8 = 0x80;

/// Opcode of `pushint`.
pub const OP_PUSHINT: u8 = 0x81;

/// Largest immediate accepted by `pushint 0x..`.
const MAX_INT_IMMEDIATE: usize = 32;

/// Mnemonics without immediates.
pub const OPCODES: &[(&str, u8)] = &[
    ("err", 0x00),
    ("sha256", 0x01),
    ("keccak256", 0x02),
    ("sha512_256", 0x03),
    ("ed25519verify", 0x04),
    ("add", 0x08),
    ("sub", 0x09),
    ("div", 0x0a),
    ("mul", 0x0b),
    ("lt", 0x0c),
    ("gt", 0x0d),
    ("eq", 0x12),
    ("not", 0x14),
    ("len", 0x15),
    ("itob", 0x16),
    ("btoi", 0x17),
    ("sender", 0x31),
    ("return", 0x43),
    ("assert", 0x44),
    ("pop", 0x48),
    ("dup", 0x49),
    ("concat", 0x50),
    ("global_get", 0x64),
    ("global_put", 0x67),
    ("log", 0xb0),
    ("itxn_begin", 0xb1),
    ("itxn_field", 0xb2),
    ("itxn_submit", 0xb3),
];

fn opcode(mnemonic: &str) -> Option<u8> {
    OPCODES
        .iter()
        .find(|(name, _)| *name == mnemonic)
        .map(|(_, code)| *code)
}

/// Appends `value` as an unsigned LEB128 varint.
pub fn put_uvarint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        // Low seven bits with the continuation flag
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Deterministic line-oriented assembler.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineAssembler;

impl LineAssembler {
    /// Creates an assembler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Assembles `source`.
    ///
    /// # Errors
    ///
    /// A [`CompileDiagnostic`] naming the offending line.
    pub fn assemble(&self, source: &str) -> Result<CompilerOutput, CompileDiagnostic> {
        let mut bytecode: Vec<u8> = Vec::new();
        let mut symbols = SymbolTable::new();
        let mut saw_instruction = false;

        for (index, raw_line) in source.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.split("//").next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let mut words: Vec<&str> = line.split_whitespace().collect();
            let annotation = match words.last().copied() {
                Some(last) if last.starts_with('@') => {
                    let name = &last[1..];
                    if !is_identifier(name) {
                        return Err(CompileDiagnostic::at_line(
                            line_no,
                            format!("invalid annotation `{last}`"),
                        ));
                    }
                    words.pop();
                    Some(name)
                }
                _ => None,
            };

            let symbol_offset = match words.as_slice() {
                ["#pragma", "version", version] => {
                    if saw_instruction || annotation.is_some() {
                        return Err(CompileDiagnostic::at_line(
                            line_no,
                            "pragma must precede all instructions",
                        ));
                    }
                    let version: u8 = version
                        .parse()
                        .ok()
                        .filter(|v| *v > 0)
                        .ok_or_else(|| {
                            CompileDiagnostic::at_line(line_no, format!("invalid version `{version}`"))
                        })?;
                    bytecode.push(version);
                    saw_instruction = true;
                    continue;
                }
                ["pushbytes", literal] => {
                    let bytes = parse_hex(literal).ok_or_else(|| {
                        CompileDiagnostic::at_line(line_no, format!("invalid hex literal `{literal}`"))
                    })?;
                    bytecode.push(OP_PUSHBYTES);
                    put_uvarint(&mut bytecode, bytes.len() as u64);
                    let offset = bytecode.len();
                    bytecode.extend_from_slice(&bytes);
                    offset
                }
                ["pushint", literal] => {
                    let bytes = parse_int(literal).ok_or_else(|| {
                        CompileDiagnostic::at_line(line_no, format!("invalid integer `{literal}`"))
                    })?;
                    bytecode.push(OP_PUSHINT);
                    // parse_int caps the immediate at 32 bytes
                    bytecode.push(bytes.len() as u8);
                    let offset = bytecode.len();
                    bytecode.extend_from_slice(&bytes);
                    offset
                }
                [mnemonic @ ("pushbytes" | "pushint"), ..] => {
                    return Err(CompileDiagnostic::at_line(
                        line_no,
                        format!("`{mnemonic}` takes exactly one immediate"),
                    ));
                }
                [mnemonic] => {
                    let code = opcode(mnemonic).ok_or_else(|| {
                        CompileDiagnostic::at_line(line_no, format!("unknown opcode `{mnemonic}`"))
                    })?;
                    let offset = bytecode.len();
                    bytecode.push(code);
                    offset
                }
                [mnemonic, ..] => {
                    return Err(CompileDiagnostic::at_line(
                        line_no,
                        format!("unexpected operands for `{mnemonic}`"),
                    ));
                }
                [] => {
                    return Err(CompileDiagnostic::at_line(
                        line_no,
                        "annotation without instruction",
                    ));
                }
            };
            saw_instruction = true;

            if let Some(name) = annotation {
                if symbols.insert(name.to_string(), symbol_offset).is_some() {
                    return Err(CompileDiagnostic::at_line(
                        line_no,
                        format!("duplicate annotation `@{name}`"),
                    ));
                }
            }
        }

        Ok(CompilerOutput { bytecode, symbols })
    }
}

impl CompilerAdapter for LineAssembler {
    fn compile(&self, source: &str) -> Result<CompilerOutput, CompileDiagnostic> {
        self.assemble(source)
    }
}

fn parse_hex(literal: &str) -> Option<Vec<u8>> {
    let digits = literal.strip_prefix("0x")?;
    hex::decode(digits).ok()
}

fn parse_int(literal: &str) -> Option<Vec<u8>> {
    if literal.starts_with("0x") {
        return parse_hex(literal).filter(|b| !b.is_empty() && b.len() <= MAX_INT_IMMEDIATE);
    }
    literal.parse::<u64>().ok().map(|n| n.to_be_bytes().to_vec())
}
