//! Frozen lookup tables built once: register names to 5-bit indices, and
//! mnemonics to their opcode/funct3/funct7/format.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use rvcore::constants::*;

use crate::error::AssemblyError;

/// How an instruction's operand list is laid out and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    R,
    I,
    IShift,
    ILoad,
    S,
    B,
    U,
    J,
    RFloat,
    RFloatUnary,
    RFloatConv,
    IFload,
    SFstore,
}

#[derive(Debug, Clone, Copy)]
pub struct OpcodeDef {
    pub opcode: u32,
    pub funct3: u32,
    pub funct7: u32,
    pub format: Format,
}

pub static REGS: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for i in 0..32u8 {
        m.insert(Box::leak(format!("x{i}").into_boxed_str()) as &str, i);
        m.insert(Box::leak(format!("f{i}").into_boxed_str()) as &str, i);
    }
    let abi_aliases: &[(&str, u8)] = &[
        ("zero", 0),
        ("ra", 1),
        ("sp", 2),
        ("gp", 3),
        ("tp", 4),
        ("t0", 5),
        ("t1", 6),
        ("t2", 7),
        ("s0", 8),
        ("fp", 8),
        ("s1", 9),
        ("a0", 10),
        ("a1", 11),
        ("a2", 12),
        ("a3", 13),
        ("a4", 14),
        ("a5", 15),
        ("a6", 16),
        ("a7", 17),
        ("s2", 18),
        ("s3", 19),
        ("s4", 20),
        ("s5", 21),
        ("s6", 22),
        ("s7", 23),
        ("s8", 24),
        ("s9", 25),
        ("s10", 26),
        ("s11", 27),
        ("t3", 28),
        ("t4", 29),
        ("t5", 30),
        ("t6", 31),
    ];
    for (name, idx) in abi_aliases {
        m.insert(*name, *idx);
    }
    m
});

pub fn lookup_register(name: &str, line: usize) -> Result<u8, AssemblyError> {
    REGS.get(name)
        .copied()
        .ok_or_else(|| AssemblyError::UnknownRegister {
            line,
            name: name.to_string(),
        })
}

pub static OPCODES: Lazy<HashMap<&'static str, OpcodeDef>> = Lazy::new(|| {
    use Format::*;
    let mut m = HashMap::new();
    let mut def = |name: &'static str, opcode: u32, funct3: u32, funct7: u32, format: Format| {
        m.insert(name, OpcodeDef { opcode, funct3, funct7, format });
    };

    // RV32I R-type
    def("add", OPCODE_R, 0b000, 0, R);
    def("sub", OPCODE_R, 0b000, FUNCT7_ALT, R);
    def("sll", OPCODE_R, 0b001, 0, R);
    def("slt", OPCODE_R, 0b010, 0, R);
    def("sltu", OPCODE_R, 0b011, 0, R);
    def("xor", OPCODE_R, 0b100, 0, R);
    def("srl", OPCODE_R, 0b101, 0, R);
    def("sra", OPCODE_R, 0b101, FUNCT7_ALT, R);
    def("or", OPCODE_R, 0b110, 0, R);
    def("and", OPCODE_R, 0b111, 0, R);

    // RV32M R-type
    def("mul", OPCODE_R, 0b000, FUNCT7_MULDIV, R);
    def("mulh", OPCODE_R, 0b001, FUNCT7_MULDIV, R);
    def("div", OPCODE_R, 0b100, FUNCT7_MULDIV, R);
    def("rem", OPCODE_R, 0b110, FUNCT7_MULDIV, R);

    // I-type ALU
    def("addi", OPCODE_I_ARITH, 0b000, 0, I);
    def("slti", OPCODE_I_ARITH, 0b010, 0, I);
    def("sltiu", OPCODE_I_ARITH, 0b011, 0, I);
    def("xori", OPCODE_I_ARITH, 0b100, 0, I);
    def("ori", OPCODE_I_ARITH, 0b110, 0, I);
    def("andi", OPCODE_I_ARITH, 0b111, 0, I);
    def("slli", OPCODE_I_ARITH, 0b001, 0, IShift);
    def("srli", OPCODE_I_ARITH, 0b101, 0, IShift);
    def("srai", OPCODE_I_ARITH, 0b101, FUNCT7_ALT, IShift);

    // jalr is I-format but not an ALU op
    def("jalr", OPCODE_JALR, 0b000, 0, I);

    // Loads
    def("lb", OPCODE_LOAD, 0b000, 0, ILoad);
    def("lh", OPCODE_LOAD, 0b001, 0, ILoad);
    def("lw", OPCODE_LOAD, 0b010, 0, ILoad);
    def("lbu", OPCODE_LOAD, 0b100, 0, ILoad);
    def("lhu", OPCODE_LOAD, 0b101, 0, ILoad);

    // Stores
    def("sb", OPCODE_STORE, 0b000, 0, S);
    def("sh", OPCODE_STORE, 0b001, 0, S);
    def("sw", OPCODE_STORE, 0b010, 0, S);

    // Branches
    def("beq", OPCODE_BRANCH, 0b000, 0, B);
    def("bne", OPCODE_BRANCH, 0b001, 0, B);
    def("blt", OPCODE_BRANCH, 0b100, 0, B);
    def("bge", OPCODE_BRANCH, 0b101, 0, B);
    def("bltu", OPCODE_BRANCH, 0b110, 0, B);
    def("bgeu", OPCODE_BRANCH, 0b111, 0, B);

    // U-type
    def("lui", OPCODE_LUI, 0, 0, U);
    def("auipc", OPCODE_AUIPC, 0, 0, U);

    // J-type
    def("jal", OPCODE_JAL, 0, 0, J);

    // F-extension
    def("flw", OPCODE_FLOAD, 0b010, 0, IFload);
    def("fsw", OPCODE_FSTORE, 0b010, 0, SFstore);
    def("fadd.s", OPCODE_FP, 0b000, FUNCT7_FADD, RFloat);
    def("fsub.s", OPCODE_FP, 0b000, FUNCT7_FSUB, RFloat);
    def("fmul.s", OPCODE_FP, 0b000, FUNCT7_FMUL, RFloat);
    def("fdiv.s", OPCODE_FP, 0b000, FUNCT7_FDIV, RFloat);
    def("fsqrt.s", OPCODE_FP, 0b000, FUNCT7_FSQRT, RFloatUnary);
    def("fcvt.w.s", OPCODE_FP, 0b000, FUNCT7_FCVT_W_S, RFloatConv);
    def("fcvt.s.w", OPCODE_FP, 0b000, FUNCT7_FCVT_S_W, RFloatConv);

    m
});

pub fn lookup_opcode(mnemonic: &str, line: usize) -> Result<OpcodeDef, AssemblyError> {
    OPCODES
        .get(mnemonic)
        .copied()
        .ok_or_else(|| AssemblyError::UnknownMnemonic {
            line,
            mnemonic: mnemonic.to_string(),
        })
}
