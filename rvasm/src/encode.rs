//! Pass 2: turn each (already sized, by pass 1) source line into bytes,
//! now that every label's address is known.

use std::collections::HashMap;

use byteorder::{ByteOrder, WriteBytesExt};
use rvcore::constants::BASE_ADDRESS;
use tracing::debug;
use util::Endian;

use crate::error::AssemblyError;
use crate::lexer::RawLine;
use crate::operand::{parse_operands, resolve_immediate, Immediate, Operand};
use crate::pseudo;
use crate::tables::{lookup_opcode, Format, OpcodeDef};

pub fn assemble_lines(
    lines: &[RawLine],
    symbols: &HashMap<String, u32>,
) -> Result<Vec<u8>, AssemblyError> {
    let mut out = Vec::new();
    let mut location = BASE_ADDRESS;

    for line in lines {
        let Some(rest) = &line.rest else { continue };
        let mut it = rest.splitn(2, char::is_whitespace);
        let op = it.next().unwrap_or("");
        let operand_str = it.next().unwrap_or("").trim();

        if let Some(directive) = op.strip_prefix('.') {
            location = emit_directive(directive, operand_str, location, line.line_no, &mut out)?;
            continue;
        }

        for expanded in pseudo::expand(rest, line.line_no)? {
            let word = encode_one(&expanded, location, symbols, line.line_no)?;
            out.write_u32::<Endian>(word)
                .expect("writing into a Vec<u8> never fails");
            location += 4;
        }
    }

    debug!(bytes = out.len(), "assembled program");
    Ok(out)
}

fn emit_directive(
    directive: &str,
    operand_str: &str,
    location: u32,
    line_no: usize,
    out: &mut Vec<u8>,
) -> Result<u32, AssemblyError> {
    let values = || {
        operand_str
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    match directive {
        "word" => {
            let mut loc = location;
            for v in values() {
                let value = crate::operand::parse_integer_literal(v, line_no)?;
                out.write_i32::<Endian>(value).unwrap();
                loc += 4;
            }
            Ok(loc)
        }
        "half" => {
            let mut loc = location;
            for v in values() {
                let value = crate::operand::parse_integer_literal(v, line_no)?;
                check_fits(value as i64, 16, line_no)?;
                out.write_i16::<Endian>(value as i16).unwrap();
                loc += 2;
            }
            Ok(loc)
        }
        "byte" => {
            let mut loc = location;
            for v in values() {
                let value = crate::operand::parse_integer_literal(v, line_no)?;
                check_fits(value as i64, 8, line_no)?;
                out.push(value as i8 as u8);
                loc += 1;
            }
            Ok(loc)
        }
        "align" => {
            let exponent: u32 = operand_str
                .trim()
                .parse()
                .map_err(|_| AssemblyError::MalformedOperand {
                    line: line_no,
                    detail: format!(".align expects an integer exponent, got \"{operand_str}\""),
                })?;
            let alignment = 1u32 << exponent;
            let padding = (alignment - (location % alignment)) % alignment;
            out.extend(std::iter::repeat(0u8).take(padding as usize));
            Ok(location + padding)
        }
        other => Err(AssemblyError::UnknownMnemonic {
            line: line_no,
            mnemonic: format!(".{other}"),
        }),
    }
}

fn check_fits(value: i64, bits: u32, line: usize) -> Result<(), AssemblyError> {
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    if value < min || value > max {
        return Err(AssemblyError::ImmediateOutOfRange { line, value, bits });
    }
    Ok(())
}

fn field(value: i32, width: u32) -> u32 {
    (value as u32) & ((1u32 << width) - 1)
}

fn encode_one(
    line_text: &str,
    location: u32,
    symbols: &HashMap<String, u32>,
    line_no: usize,
) -> Result<u32, AssemblyError> {
    let mut it = line_text.splitn(2, char::is_whitespace);
    let mnemonic = it.next().unwrap_or("");
    let operand_str = it.next().unwrap_or("").trim();

    let def = lookup_opcode(mnemonic, line_no)?;
    let operands = parse_operands(operand_str, line_no)?;

    match def.format {
        Format::R | Format::RFloat => encode_r(&def, &operands, line_no),
        Format::RFloatUnary | Format::RFloatConv => encode_r_unary(&def, &operands, line_no),
        Format::I => encode_i(&def, &operands, symbols, line_no),
        Format::IShift => encode_ishift(&def, &operands, line_no),
        Format::ILoad | Format::IFload => encode_iload(&def, &operands, symbols, line_no),
        Format::S | Format::SFstore => encode_s(&def, &operands, symbols, line_no),
        Format::B => encode_b(&def, &operands, location, symbols, line_no),
        Format::U => encode_u(&def, &operands, symbols, line_no),
        Format::J => encode_j(&def, &operands, location, symbols, line_no),
    }
}

fn expect_register(op: &Operand, line: usize) -> Result<u8, AssemblyError> {
    match op {
        Operand::Register(r) => Ok(*r),
        _ => Err(AssemblyError::MalformedOperand {
            line,
            detail: format!("expected a register, got {op:?}"),
        }),
    }
}

fn expect_immediate<'a>(op: &'a Operand, line: usize) -> Result<&'a Immediate, AssemblyError> {
    match op {
        Operand::Immediate(imm) => Ok(imm),
        _ => Err(AssemblyError::MalformedOperand {
            line,
            detail: format!("expected an immediate, got {op:?}"),
        }),
    }
}

fn expect_label(op: &Operand, line: usize) -> Result<&str, AssemblyError> {
    match op {
        Operand::Label(l) => Ok(l.as_str()),
        _ => Err(AssemblyError::MalformedOperand {
            line,
            detail: format!("expected a label, got {op:?}"),
        }),
    }
}

fn expect_mem(op: &Operand, line: usize) -> Result<(u8, &Immediate), AssemblyError> {
    match op {
        Operand::Mem { base, offset } => Ok((*base, offset)),
        _ => Err(AssemblyError::MalformedOperand {
            line,
            detail: format!("expected \"offset(reg)\", got {op:?}"),
        }),
    }
}

fn encode_r(def: &OpcodeDef, operands: &[Operand], line: usize) -> Result<u32, AssemblyError> {
    let rd = expect_register(operands.first().ok_or(missing(line))?, line)?;
    let rs1 = expect_register(operands.get(1).ok_or(missing(line))?, line)?;
    let rs2 = expect_register(operands.get(2).ok_or(missing(line))?, line)?;
    Ok(def.opcode
        | (rd as u32) << 7
        | def.funct3 << 12
        | (rs1 as u32) << 15
        | (rs2 as u32) << 20
        | def.funct7 << 25)
}

/// `fsqrt.s`/`fcvt.*`: two registers, rs2 field fixed at zero.
fn encode_r_unary(def: &OpcodeDef, operands: &[Operand], line: usize) -> Result<u32, AssemblyError> {
    let rd = expect_register(operands.first().ok_or(missing(line))?, line)?;
    let rs1 = expect_register(operands.get(1).ok_or(missing(line))?, line)?;
    Ok(def.opcode | (rd as u32) << 7 | def.funct3 << 12 | (rs1 as u32) << 15 | def.funct7 << 25)
}

fn encode_i(
    def: &OpcodeDef,
    operands: &[Operand],
    symbols: &HashMap<String, u32>,
    line: usize,
) -> Result<u32, AssemblyError> {
    let rd = expect_register(operands.first().ok_or(missing(line))?, line)?;
    let rs1 = expect_register(operands.get(1).ok_or(missing(line))?, line)?;
    let imm_expr = expect_immediate(operands.get(2).ok_or(missing(line))?, line)?;
    let imm = resolve_immediate(imm_expr, symbols, line)?;
    check_fits(imm as i64, 12, line)?;
    Ok(def.opcode | (rd as u32) << 7 | def.funct3 << 12 | (rs1 as u32) << 15 | field(imm, 12) << 20)
}

fn encode_ishift(def: &OpcodeDef, operands: &[Operand], line: usize) -> Result<u32, AssemblyError> {
    let rd = expect_register(operands.first().ok_or(missing(line))?, line)?;
    let rs1 = expect_register(operands.get(1).ok_or(missing(line))?, line)?;
    let imm_expr = expect_immediate(operands.get(2).ok_or(missing(line))?, line)?;
    let shamt = match imm_expr {
        Immediate::Value(v) => *v,
        _ => {
            return Err(AssemblyError::MalformedOperand {
                line,
                detail: "shift amount must be a literal".to_string(),
            })
        }
    };
    if !(0..32).contains(&shamt) {
        return Err(AssemblyError::ImmediateOutOfRange {
            line,
            value: shamt as i64,
            bits: 5,
        });
    }
    Ok(def.opcode
        | (rd as u32) << 7
        | def.funct3 << 12
        | (rs1 as u32) << 15
        | (shamt as u32) << 20
        | def.funct7 << 25)
}

fn encode_iload(
    def: &OpcodeDef,
    operands: &[Operand],
    symbols: &HashMap<String, u32>,
    line: usize,
) -> Result<u32, AssemblyError> {
    let rd = expect_register(operands.first().ok_or(missing(line))?, line)?;
    let (rs1, offset) = expect_mem(operands.get(1).ok_or(missing(line))?, line)?;
    let imm = resolve_immediate(offset, symbols, line)?;
    check_fits(imm as i64, 12, line)?;
    Ok(def.opcode | (rd as u32) << 7 | def.funct3 << 12 | (rs1 as u32) << 15 | field(imm, 12) << 20)
}

fn encode_s(
    def: &OpcodeDef,
    operands: &[Operand],
    symbols: &HashMap<String, u32>,
    line: usize,
) -> Result<u32, AssemblyError> {
    let rs2 = expect_register(operands.first().ok_or(missing(line))?, line)?;
    let (rs1, offset) = expect_mem(operands.get(1).ok_or(missing(line))?, line)?;
    let imm = resolve_immediate(offset, symbols, line)?;
    check_fits(imm as i64, 12, line)?;
    let imm = field(imm, 12);
    Ok(def.opcode
        | (imm & 0x1F) << 7
        | def.funct3 << 12
        | (rs1 as u32) << 15
        | (rs2 as u32) << 20
        | ((imm >> 5) & 0x7F) << 25)
}

fn encode_b(
    def: &OpcodeDef,
    operands: &[Operand],
    location: u32,
    symbols: &HashMap<String, u32>,
    line: usize,
) -> Result<u32, AssemblyError> {
    let rs1 = expect_register(operands.first().ok_or(missing(line))?, line)?;
    let rs2 = expect_register(operands.get(1).ok_or(missing(line))?, line)?;
    let label = expect_label(operands.get(2).ok_or(missing(line))?, line)?;
    let target = *symbols
        .get(label)
        .ok_or_else(|| AssemblyError::UnknownLabel {
            line,
            label: label.to_string(),
        })?;
    let offset = target.wrapping_sub(location) as i32;
    check_fits(offset as i64, 13, line)?;
    let imm = field(offset, 13);
    Ok(def.opcode
        | ((imm >> 11) & 1) << 7
        | ((imm >> 1) & 0xF) << 8
        | def.funct3 << 12
        | (rs1 as u32) << 15
        | (rs2 as u32) << 20
        | ((imm >> 5) & 0x3F) << 25
        | ((imm >> 12) & 1) << 31)
}

fn encode_u(
    def: &OpcodeDef,
    operands: &[Operand],
    symbols: &HashMap<String, u32>,
    line: usize,
) -> Result<u32, AssemblyError> {
    let rd = expect_register(operands.first().ok_or(missing(line))?, line)?;
    let imm_expr = expect_immediate(operands.get(1).ok_or(missing(line))?, line)?;
    let imm = resolve_immediate(imm_expr, symbols, line)?;
    // The U-type field is the literal 20-bit value the caller supplies
    // (the %hi bias already folds in any rounding), not a signed quantity.
    if !(0..=0xFFFFF).contains(&imm) {
        return Err(AssemblyError::ImmediateOutOfRange {
            line,
            value: imm as i64,
            bits: 20,
        });
    }
    Ok(def.opcode | (rd as u32) << 7 | field(imm, 20) << 12)
}

fn encode_j(
    def: &OpcodeDef,
    operands: &[Operand],
    location: u32,
    symbols: &HashMap<String, u32>,
    line: usize,
) -> Result<u32, AssemblyError> {
    let rd = expect_register(operands.first().ok_or(missing(line))?, line)?;
    let label = expect_label(operands.get(1).ok_or(missing(line))?, line)?;
    let target = *symbols
        .get(label)
        .ok_or_else(|| AssemblyError::UnknownLabel {
            line,
            label: label.to_string(),
        })?;
    let offset = target.wrapping_sub(location) as i32;
    check_fits(offset as i64, 21, line)?;
    let imm = field(offset, 21);
    Ok(def.opcode
        | (rd as u32) << 7
        | ((imm >> 12) & 0xFF) << 12
        | ((imm >> 11) & 1) << 20
        | ((imm >> 1) & 0x3FF) << 21
        | ((imm >> 20) & 1) << 31)
}

fn missing(line: usize) -> AssemblyError {
    AssemblyError::MalformedOperand {
        line,
        detail: "too few operands".to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::clean_and_split;
    use crate::symbols::resolve_symbols;

    fn assemble(source: &str) -> Vec<u8> {
        let lines = clean_and_split(source);
        let symbols = resolve_symbols(&lines).unwrap();
        assemble_lines(&lines, &symbols).unwrap()
    }

    #[test]
    fn add_encodes_expected_word() {
        let bytes = assemble("add x3, x1, x2\n");
        let word = Endian::read_u32(&bytes);
        assert_eq!(word, 0b0000000_00010_00001_000_00011_0110011);
    }

    #[test]
    fn directive_word_emits_little_endian_bytes() {
        let bytes = assemble(".word 0xFFFFFFFF\n");
        assert_eq!(bytes, vec![0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn branch_to_earlier_label_encodes_negative_offset() {
        let bytes = assemble("loop:\naddi x1, x1, 1\nbeq x1, x0, loop\n");
        let word = Endian::read_u32(&bytes[4..8]);
        let instr = rvcore::decode::decode(word);
        assert_eq!(instr.imm_b, -4);
    }

    #[test]
    fn out_of_range_branch_offset_is_an_error() {
        let mut src = String::from("beq x0, x0, far\n");
        for _ in 0..5000 {
            src.push_str("nop\n");
        }
        src.push_str("far:\n");
        let lines = clean_and_split(&src);
        let symbols = resolve_symbols(&lines).unwrap();
        assert!(matches!(
            assemble_lines(&lines, &symbols),
            Err(AssemblyError::ImmediateOutOfRange { .. })
        ));
    }

    #[test]
    fn unknown_label_reference_is_an_error() {
        let lines = clean_and_split("jal x1, nowhere\n");
        let symbols = resolve_symbols(&lines).unwrap();
        assert!(matches!(
            assemble_lines(&lines, &symbols),
            Err(AssemblyError::UnknownLabel { .. })
        ));
    }

    #[test]
    fn la_round_trips_through_hi_lo_relocation() {
        let bytes = assemble("la a0, target\ntarget:\n.word 42\n");
        let lui = Endian::read_u32(&bytes[0..4]);
        let addi = Endian::read_u32(&bytes[4..8]);
        let lui_instr = rvcore::decode::decode(lui);
        let addi_instr = rvcore::decode::decode(addi);
        let reconstructed = lui_instr.imm_u + addi_instr.imm_i;
        assert_eq!(reconstructed as u32, rvcore::constants::BASE_ADDRESS + 8);
    }
}
