//! Pseudo-instruction expansion.
//!
//! Each pseudo-instruction expands into one or more real instructions as
//! plain text, which then goes through the same parsing/encoding path as
//! anything the user wrote directly. `li`'s instruction count depends only
//! on the literal value, never on a label address, so it comes out
//! identically whether it's computed during the location-counter pass or
//! the encoding pass.

use crate::error::AssemblyError;
use crate::operand::parse_integer_literal;

/// Expands `rest` (mnemonic + operand text, no label) into one or more
/// real instruction/directive lines. Non-pseudo lines pass through
/// unchanged.
pub fn expand(rest: &str, line: usize) -> Result<Vec<String>, AssemblyError> {
    let mut it = rest.splitn(2, char::is_whitespace);
    let op = it.next().unwrap_or("");
    let operand_str = it.next().unwrap_or("").trim();
    let args: Vec<String> = operand_str
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let arg = |index: usize| -> Result<&str, AssemblyError> {
        args.get(index).map(String::as_str).ok_or_else(|| AssemblyError::MalformedOperand {
            line,
            detail: format!("\"{op}\" expects more operands than \"{rest}\" supplies"),
        })
    };

    match op {
        "nop" => Ok(vec!["addi x0, x0, 0".to_string()]),
        "mv" => Ok(vec![format!("addi {}, {}, 0", arg(0)?, arg(1)?)]),
        "not" => Ok(vec![format!("xori {}, {}, -1", arg(0)?, arg(1)?)]),
        "neg" => Ok(vec![format!("sub {}, x0, {}", arg(0)?, arg(1)?)]),
        "li" => {
            let rd = arg(0)?;
            let imm = parse_integer_literal(arg(1)?, line)?;
            if (-2048..=2047).contains(&imm) {
                Ok(vec![format!("addi {rd}, x0, {imm}")])
            } else {
                let upper = ((imm as i64 + 0x800) >> 12) & 0xFFFFF;
                let lower = {
                    let l = imm & 0xFFF;
                    if l & 0x800 != 0 {
                        l - 0x1000
                    } else {
                        l
                    }
                };
                Ok(vec![
                    format!("lui {rd}, {upper}"),
                    format!("addi {rd}, {rd}, {lower}"),
                ])
            }
        }
        "la" => {
            let rd = arg(0)?;
            let label = arg(1)?;
            // lui (absolute), not auipc (pc-relative): %hi/%lo reconstruct
            // the label's absolute address, so the upper half must land
            // without a pc offset added in.
            Ok(vec![
                format!("lui {rd}, %hi({label})"),
                format!("addi {rd}, {rd}, %lo({label})"),
            ])
        }
        _ => Ok(vec![rest.to_string()]),
    }
}

/// Number of 32-bit words a pseudo-instruction occupies, without actually
/// expanding it — used by the location-counter pass so it doesn't have to
/// throw away the expansion.
pub fn instruction_word_count(op: &str, args_after_op: &str, line: usize) -> Result<u32, AssemblyError> {
    Ok(match op {
        "la" => 2,
        "li" => {
            let imm_str = args_after_op
                .split(',')
                .nth(1)
                .map(str::trim)
                .ok_or_else(|| AssemblyError::MalformedOperand {
                    line,
                    detail: "\"li\" expects an immediate operand".to_string(),
                })?;
            let imm = parse_integer_literal(imm_str, line)?;
            if (-2048..=2047).contains(&imm) {
                1
            } else {
                2
            }
        }
        _ => 1,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn li_within_range_is_one_instruction() {
        let lines = expand("li a0, 100", 1).unwrap();
        assert_eq!(lines, vec!["addi a0, x0, 100"]);
    }

    #[test]
    fn li_out_of_range_expands_to_lui_addi_pair() {
        let lines = expand("li a0, 100000", 1).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("lui"));
        assert!(lines[1].starts_with("addi"));
    }

    #[test]
    fn li_just_past_the_addi_range_sign_extends_the_lower_half() {
        // 2048 overflows addi's 12-bit signed immediate by one, so the
        // lower addi must carry a sign-extended -2048, not a raw 2048
        // (which wouldn't fit in 12 bits either).
        let lines = expand("li a0, 2048", 1).unwrap();
        assert_eq!(lines, vec!["lui a0, 1", "addi a0, a0, -2048"]);
    }

    #[test]
    fn la_always_expands_to_two_instructions_with_hi_lo() {
        let lines = expand("la a0, buffer", 1).unwrap();
        assert_eq!(lines, vec!["lui a0, %hi(buffer)", "addi a0, a0, %lo(buffer)"]);
    }

    #[test]
    fn word_count_matches_actual_expansion_for_li() {
        assert_eq!(instruction_word_count("li", "a0, 100", 1).unwrap(), 1);
        assert_eq!(instruction_word_count("li", "a0, 100000", 1).unwrap(), 2);
        assert_eq!(instruction_word_count("la", "a0, buffer", 1).unwrap(), 2);
    }

    #[test]
    fn nop_mv_not_neg_each_expand_to_one_instruction() {
        assert_eq!(expand("nop", 1).unwrap(), vec!["addi x0, x0, 0"]);
        assert_eq!(expand("mv a0, a1", 1).unwrap(), vec!["addi a0, a1, 0"]);
        assert_eq!(expand("not a0, a1", 1).unwrap(), vec!["xori a0, a1, -1"]);
        assert_eq!(expand("neg a0, a1", 1).unwrap(), vec!["sub a0, x0, a1"]);
    }
}
