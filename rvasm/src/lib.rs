//! Two-pass assembler turning RV32I/M/F assembly text into a flat,
//! little-endian binary image with no header, footer, or relocations.
//!
//! ```
//! let program = rvasm::assemble("addi x1, x0, 5\n").unwrap();
//! assert_eq!(program.len(), 4);
//! ```

pub mod encode;
pub mod error;
pub mod lexer;
pub mod operand;
pub mod pseudo;
pub mod symbols;
pub mod tables;

pub use error::AssemblyError;

/// Assembles `source` into a flat binary image loadable at
/// [`rvcore::constants::BASE_ADDRESS`].
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblyError> {
    let lines = lexer::clean_and_split(source);
    let symbols = symbols::resolve_symbols(&lines)?;
    encode::assemble_lines(&lines, &symbols)
}

/// Assembles `source` and also returns the resolved label table, for
/// callers (the CLI, tests) that want to show or check it.
pub fn assemble_with_symbols(
    source: &str,
) -> Result<(Vec<u8>, std::collections::HashMap<String, u32>), AssemblyError> {
    let lines = lexer::clean_and_split(source);
    let symbols = symbols::resolve_symbols(&lines)?;
    let bytes = encode::assemble_lines(&lines, &symbols)?;
    Ok((bytes, symbols))
}
