//! Cycle-accurate interpreter core for a subset of RV32I, with the M
//! (multiply/divide) and F (single-precision float) extensions.
//!
//! This crate only knows how to execute an already-assembled flat binary
//! image; see the `rvasm` crate for turning assembly text into one.

pub mod constants;
pub mod decode;
pub mod error;
pub mod exec;
pub mod memory;
pub mod registers;
pub mod simulator;

pub use error::LoadError;
pub use exec::HaltReason;
pub use memory::{Memory, Storage};
pub use registers::RegisterFile;
pub use simulator::{Simulator, Snapshot, StepResult};
