//! Pass 1: walk the source once with a location counter, recording every
//! label's address. Pseudo-instructions are sized (not expanded into
//! bytes) so the counter advances exactly as far as pass 2 will.

use std::collections::HashMap;

use rvcore::constants::BASE_ADDRESS;
use tracing::trace;

use crate::error::AssemblyError;
use crate::lexer::RawLine;
use crate::pseudo;

pub fn resolve_symbols(lines: &[RawLine]) -> Result<HashMap<String, u32>, AssemblyError> {
    let mut symbols = HashMap::new();
    let mut location = BASE_ADDRESS;

    for line in lines {
        if let Some(label) = &line.label {
            if symbols.contains_key(label) {
                return Err(AssemblyError::DuplicateLabel {
                    line: line.line_no,
                    label: label.clone(),
                });
            }
            trace!(label = %label, address = format!("{location:#x}"), "resolved label");
            symbols.insert(label.clone(), location);
        }

        if let Some(rest) = &line.rest {
            location = advance(location, rest, line.line_no)?;
        }
    }

    Ok(symbols)
}

/// Returns the location counter after accounting for one source line's
/// contribution, without emitting any bytes.
fn advance(location: u32, rest: &str, line_no: usize) -> Result<u32, AssemblyError> {
    let mut it = rest.splitn(2, char::is_whitespace);
    let op = it.next().unwrap_or("");
    let operand_str = it.next().unwrap_or("").trim();

    if let Some(directive) = op.strip_prefix('.') {
        return directive_advance(location, directive, operand_str, line_no);
    }

    let words = pseudo::instruction_word_count(op, operand_str, line_no)?;
    Ok(location + words * 4)
}

fn directive_advance(
    location: u32,
    directive: &str,
    operand_str: &str,
    line_no: usize,
) -> Result<u32, AssemblyError> {
    let count = operand_str.split(',').filter(|s| !s.trim().is_empty()).count() as u32;
    match directive {
        "word" => Ok(location + 4 * count),
        "half" => Ok(location + 2 * count),
        "byte" => Ok(location + count),
        "align" => {
            let exponent: u32 = operand_str.trim().parse().map_err(|_| AssemblyError::MalformedOperand {
                line: line_no,
                detail: format!(".align expects an integer exponent, got \"{operand_str}\""),
            })?;
            let alignment = 1u32 << exponent;
            let padding = (alignment - (location % alignment)) % alignment;
            Ok(location + padding)
        }
        other => Err(AssemblyError::UnknownMnemonic {
            line: line_no,
            mnemonic: format!(".{other}"),
        }),
    }
}
