//! Public API: load a program, step it, inspect it, reset it.

use tracing::{debug, trace};

use crate::constants::{BASE_ADDRESS, DEFAULT_MEMORY_SIZE};
use crate::decode::decode;
use crate::error::LoadError;
use crate::exec::{execute, ExecOutcome, HaltReason};
use crate::memory::{Memory, Storage};
use crate::registers::RegisterFile;

/// Outcome of a single [`Simulator::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Continue,
    Halt(HaltReason),
}

/// A snapshot of the architectural state at a point in time, decoupled
/// from the live simulator so callers can hold onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub pc: u32,
    pub registers: [u32; crate::constants::NUM_REGISTERS],
    pub float_registers: [f32; crate::constants::NUM_REGISTERS],
    /// A copy of the bytes in `[window_start, window_start + window.len())`.
    pub memory_window: Vec<u8>,
    pub window_start: u32,
}

/// The interpreter core: registers, memory, and a program counter, stepped
/// one instruction at a time.
pub struct Simulator {
    regs: RegisterFile,
    mem: Memory,
    pc: u32,
    halted: Option<HaltReason>,
}

impl Simulator {
    pub fn new() -> Self {
        Self::with_memory_size(DEFAULT_MEMORY_SIZE)
    }

    pub fn with_memory_size(size: usize) -> Self {
        Self {
            regs: RegisterFile::new(),
            mem: Memory::new(size),
            pc: BASE_ADDRESS,
            halted: None,
        }
    }

    /// Loads `program` at [`BASE_ADDRESS`], resetting registers, the program
    /// counter, and memory (so nothing from a prior image lingers outside
    /// the newly written range) before copying the new bytes in.
    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        let capacity = self.mem.length().saturating_sub(BASE_ADDRESS) as usize;
        if program.len() > capacity {
            return Err(LoadError::LoadTooLarge {
                program_len: program.len(),
                capacity,
            });
        }
        self.mem.clear();
        for (offset, byte) in program.iter().enumerate() {
            self.mem
                .write_byte(BASE_ADDRESS + offset as u32, *byte)
                .expect("range was checked above");
        }
        self.regs.reset();
        self.pc = BASE_ADDRESS;
        self.halted = None;
        debug!(bytes = program.len(), "loaded program");
        Ok(())
    }

    /// Executes one instruction. Once halted, repeated calls return the
    /// same halt reason without touching any state.
    pub fn step(&mut self) -> StepResult {
        if let Some(reason) = self.halted {
            return StepResult::Halt(reason);
        }

        let word = match self.mem.read_word(self.pc) {
            Ok(word) => word,
            Err(()) => {
                let reason = HaltReason::OutOfBounds { pc: self.pc };
                self.halted = Some(reason);
                debug!(?reason, "halted");
                return StepResult::Halt(reason);
            }
        };

        if word == 0 {
            let reason = HaltReason::ZeroSentinel { pc: self.pc };
            self.halted = Some(reason);
            debug!(?reason, "halted");
            return StepResult::Halt(reason);
        }

        let instr = decode(word);
        trace!(pc = self.pc, opcode = instr.opcode, "executing instruction");

        match execute(&instr, self.pc, &mut self.regs, &mut self.mem) {
            ExecOutcome::NextPc(next_pc) => {
                self.pc = next_pc;
                StepResult::Continue
            }
            ExecOutcome::Halt(reason) => {
                self.halted = Some(reason);
                debug!(?reason, "halted");
                StepResult::Halt(reason)
            }
        }
    }

    /// Resets registers, program counter, and memory to their initial
    /// (zeroed) state. The simulator must be [`load`](Self::load)ed again
    /// before stepping.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.pc = BASE_ADDRESS;
        self.halted = None;
    }

    /// Captures the current state. `window` bounds how many bytes of
    /// memory (starting at `window_start`) are copied into the snapshot.
    pub fn snapshot(&self, window_start: u32, window_len: u32) -> Snapshot {
        let memory_window = self
            .mem
            .borrow_slice(window_start, window_len)
            .map(|s| s.to_vec())
            .unwrap_or_default();

        Snapshot {
            pc: self.pc,
            registers: *self.regs.int_bank(),
            float_registers: *self.regs.float_bank(),
            memory_window,
            window_start,
        }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode_i(opcode: u32, rd: u8, funct3: u32, rs1: u8, imm: i32) -> u32 {
        opcode | (rd as u32) << 7 | funct3 << 12 | (rs1 as u32) << 15 | ((imm as u32) & 0xFFF) << 20
    }

    #[test]
    fn stepping_past_the_zero_sentinel_halts() {
        let mut sim = Simulator::new();
        // addi x1, x0, 5 ; (implicit all-zero halt word follows)
        let word = encode_i(crate::constants::OPCODE_I_ARITH, 1, 0, 0, 5).to_le_bytes();
        sim.load(&word).unwrap();
        assert_eq!(sim.step(), StepResult::Continue);
        assert_eq!(
            sim.step(),
            StepResult::Halt(HaltReason::ZeroSentinel {
                pc: crate::constants::BASE_ADDRESS + 4
            })
        );
        assert_eq!(sim.snapshot(0, 0).registers[1], 5);
    }

    #[test]
    fn load_rejects_program_larger_than_capacity() {
        let mut sim = Simulator::with_memory_size(crate::constants::BASE_ADDRESS as usize + 4);
        let program = vec![0u8; 8];
        assert!(matches!(
            sim.load(&program),
            Err(LoadError::LoadTooLarge { .. })
        ));
    }

    #[test]
    fn reset_returns_pc_to_base_address() {
        let mut sim = Simulator::new();
        let word = encode_i(crate::constants::OPCODE_I_ARITH, 1, 0, 0, 5).to_le_bytes();
        sim.load(&word).unwrap();
        sim.step();
        sim.reset();
        assert_eq!(sim.pc(), crate::constants::BASE_ADDRESS);
        assert_eq!(sim.snapshot(0, 0).registers[1], 0);
    }

    #[test]
    fn loading_a_shorter_program_clears_bytes_left_over_from_the_prior_one() {
        let mut sim = Simulator::new();
        let first = encode_i(crate::constants::OPCODE_I_ARITH, 1, 0, 0, 5).to_le_bytes();
        sim.load(&first).unwrap();
        sim.load(&[]).unwrap();
        assert_eq!(sim.step(), StepResult::Halt(HaltReason::ZeroSentinel {
            pc: crate::constants::BASE_ADDRESS
        }));
    }

    #[test]
    fn halting_is_sticky() {
        let mut sim = Simulator::with_memory_size(crate::constants::BASE_ADDRESS as usize);
        sim.load(&[]).unwrap();
        let first = sim.step();
        let second = sim.step();
        assert_eq!(first, second);
    }
}
