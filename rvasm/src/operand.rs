//! The operand model: every comma-separated token in an instruction's
//! argument list is one of a register, a literal/relocation immediate, a
//! bare label reference, or a `offset(base)` memory reference.

use std::collections::HashMap;

use crate::error::AssemblyError;
use crate::tables::lookup_register;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Immediate {
    Value(i32),
    HiOf(String),
    LoOf(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(u8),
    Immediate(Immediate),
    Label(String),
    Mem { base: u8, offset: Immediate },
}

/// Parses a signed integer literal in decimal, `0x`, `0o`, or `0b` form,
/// the same set `i64::from_str_radix` covers once the prefix is peeled.
pub fn parse_integer_literal(token: &str, line: usize) -> Result<i32, AssemblyError> {
    let token = token.trim();
    let (negative, unsigned) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };

    let value = if let Some(hex) = unsigned.strip_prefix("0x").or_else(|| unsigned.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if let Some(oct) = unsigned.strip_prefix("0o").or_else(|| unsigned.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8)
    } else if let Some(bin) = unsigned.strip_prefix("0b").or_else(|| unsigned.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2)
    } else {
        unsigned.parse::<i64>()
    }
    .map_err(|_| AssemblyError::MalformedOperand {
        line,
        detail: format!("\"{token}\" is not a valid integer literal"),
    })?;

    let value = if negative { -value } else { value };
    if !(i32::MIN as i64..=u32::MAX as i64).contains(&value) {
        return Err(AssemblyError::ImmediateOutOfRange {
            line,
            value,
            bits: 32,
        });
    }
    // An unsigned literal with the high bit set (e.g. 0xFFFFFFFF) doesn't
    // fit in an i32's positive range; reinterpret its low 32 bits instead
    // of rejecting it, matching an unbounded-int-then-truncate reading.
    Ok(value as u32 as i32)
}

pub fn parse_immediate(token: &str, line: usize) -> Result<Immediate, AssemblyError> {
    let token = token.trim();
    if let Some(inner) = token.strip_prefix("%hi(").and_then(|s| s.strip_suffix(')')) {
        return Ok(Immediate::HiOf(inner.trim().to_string()));
    }
    if let Some(inner) = token.strip_prefix("%lo(").and_then(|s| s.strip_suffix(')')) {
        return Ok(Immediate::LoOf(inner.trim().to_string()));
    }
    parse_integer_literal(token, line).map(Immediate::Value)
}

/// Resolves a `%hi`/`%lo`-biased relocation or passes a literal through
/// unchanged.
pub fn resolve_immediate(
    imm: &Immediate,
    symbols: &HashMap<String, u32>,
    line: usize,
) -> Result<i32, AssemblyError> {
    match imm {
        Immediate::Value(v) => Ok(*v),
        Immediate::HiOf(label) => {
            let address = lookup_symbol(symbols, label, line)?;
            Ok(((address as i64 + 0x800) >> 12) as i32 & 0xFFFFF)
        }
        Immediate::LoOf(label) => {
            let address = lookup_symbol(symbols, label, line)?;
            let lo = (address & 0xFFF) as i32;
            Ok(if lo & 0x800 != 0 { lo - 0x1000 } else { lo })
        }
    }
}

fn lookup_symbol(symbols: &HashMap<String, u32>, label: &str, line: usize) -> Result<u32, AssemblyError> {
    symbols
        .get(label)
        .copied()
        .ok_or_else(|| AssemblyError::UnknownLabel {
            line,
            label: label.to_string(),
        })
}

fn split_top_level_commas(s: &str) -> Vec<&str> {
    s.split(',').map(str::trim).filter(|t| !t.is_empty()).collect()
}

/// Parses one `offset(base)` token into its immediate and base register.
fn parse_mem_token(token: &str, line: usize) -> Result<(Immediate, u8), AssemblyError> {
    let open = token.find('(').ok_or_else(|| AssemblyError::MalformedOperand {
        line,
        detail: format!("expected \"offset(reg)\", got \"{token}\""),
    })?;
    let close = token.rfind(')').ok_or_else(|| AssemblyError::MalformedOperand {
        line,
        detail: format!("expected \"offset(reg)\", got \"{token}\""),
    })?;
    let offset_str = &token[..open];
    let reg_str = &token[open + 1..close];
    let offset = parse_immediate(offset_str, line)?;
    let base = lookup_register(reg_str.trim(), line)?;
    Ok((offset, base))
}

fn parse_one(token: &str, line: usize) -> Result<Operand, AssemblyError> {
    if token.contains('(') {
        let (offset, base) = parse_mem_token(token, line)?;
        return Ok(Operand::Mem { base, offset });
    }
    if let Ok(reg) = lookup_register(token, line) {
        return Ok(Operand::Register(reg));
    }
    if token.starts_with("%hi(") || token.starts_with("%lo(") {
        return Ok(Operand::Immediate(parse_immediate(token, line)?));
    }
    if let Ok(imm) = parse_integer_literal(token, line) {
        return Ok(Operand::Immediate(Immediate::Value(imm)));
    }
    Ok(Operand::Label(token.to_string()))
}

pub fn parse_operands(operand_str: &str, line: usize) -> Result<Vec<Operand>, AssemblyError> {
    split_top_level_commas(operand_str)
        .into_iter()
        .map(|tok| parse_one(tok, line))
        .collect()
}
