//! Textual instruction parser (external collaborator: produces the decoded
//! program the core consumes, but never reaches into core internals).

use crate::common::error::ParseError;
use crate::isa::instruction::{Instruction, Opcode};

const MIN_IMMEDIATE: i32 = -64;
const MAX_IMMEDIATE: i32 = 63;
const MAX_ARCH_REGISTER: u8 = 7;
const MAX_SYNTAX_REGISTER: u8 = 15;

/// Splits a line on whitespace, commas, and parentheses, dropping empties.
fn tokenize(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')')
        .filter(|tok| !tok.is_empty())
        .collect()
}

fn parse_register(tok: &str, line: usize, text: &str) -> Result<u8, ParseError> {
    let digits = tok.strip_prefix(['r', 'R']).ok_or_else(|| ParseError::BadOperand {
        line,
        text: text.to_owned(),
        detail: format!("expected register, found `{tok}`"),
    })?;
    let idx: u8 = digits.parse().map_err(|_| ParseError::BadOperand {
        line,
        text: text.to_owned(),
        detail: format!("invalid register index `{tok}`"),
    })?;
    if idx > MAX_SYNTAX_REGISTER {
        return Err(ParseError::BadOperand {
            line,
            text: text.to_owned(),
            detail: format!("register index {idx} out of syntactic range 0..=15"),
        });
    }
    if idx > MAX_ARCH_REGISTER {
        return Err(ParseError::RegisterOutOfRange {
            line,
            text: text.to_owned(),
            register: idx,
        });
    }
    Ok(idx)
}

fn parse_immediate(tok: &str, line: usize, text: &str) -> Result<i16, ParseError> {
    let value: i32 = tok.parse().map_err(|_| ParseError::BadOperand {
        line,
        text: text.to_owned(),
        detail: format!("invalid immediate `{tok}`"),
    })?;
    if !(MIN_IMMEDIATE..=MAX_IMMEDIATE).contains(&value) {
        return Err(ParseError::ImmediateOutOfRange {
            line,
            text: text.to_owned(),
            value,
        });
    }
    Ok(value as i16)
}

/// Parses one non-blank, non-comment source line into a decoded instruction.
/// `program_index` is the position the instruction will occupy in the
/// program vector.
pub fn parse_line(line_no: usize, raw: &str, program_index: usize) -> Result<Instruction, ParseError> {
    let tokens = tokenize(raw);
    let (mnemonic, operands) = tokens.split_first().ok_or_else(|| ParseError::EmptyLine { line: line_no })?;
    let mnemonic_lower = mnemonic.to_ascii_lowercase();

    let instr = match mnemonic_lower.as_str() {
        "load" => {
            let [rd, off, rs] = take3(operands, line_no, raw)?;
            let rd = parse_register(rd, line_no, raw)?;
            let off = parse_immediate(off, line_no, raw)?;
            let rs = parse_register(rs, line_no, raw)?;
            Instruction::new(Opcode::Load, rs, 0, rd, off, raw.to_owned(), program_index)
        }
        "store" => {
            let [rt, off, rs] = take3(operands, line_no, raw)?;
            let rt = parse_register(rt, line_no, raw)?;
            let off = parse_immediate(off, line_no, raw)?;
            let rs = parse_register(rs, line_no, raw)?;
            Instruction::new(Opcode::Store, rs, rt, 0, off, raw.to_owned(), program_index)
        }
        "beq" => {
            let [rs, rt, off] = take3(operands, line_no, raw)?;
            let rs = parse_register(rs, line_no, raw)?;
            let rt = parse_register(rt, line_no, raw)?;
            let off = parse_immediate(off, line_no, raw)?;
            Instruction::new(Opcode::Beq, rs, rt, 0, off, raw.to_owned(), program_index)
        }
        "call" => {
            let [off] = take1(operands, line_no, raw)?;
            let off = parse_immediate(off, line_no, raw)?;
            Instruction::new(Opcode::Call, 0, 0, 0, off, raw.to_owned(), program_index)
        }
        "ret" => {
            take0(operands, line_no, raw)?;
            Instruction::new(Opcode::Ret, 1, 0, 0, 0, raw.to_owned(), program_index)
        }
        "add" | "sub" | "nor" | "mul" => {
            let [rd, rs, rt] = take3(operands, line_no, raw)?;
            let rd = parse_register(rd, line_no, raw)?;
            let rs = parse_register(rs, line_no, raw)?;
            let rt = parse_register(rt, line_no, raw)?;
            let opcode = match mnemonic_lower.as_str() {
                "add" => Opcode::Add,
                "sub" => Opcode::Sub,
                "nor" => Opcode::Nor,
                _ => Opcode::Mul,
            };
            Instruction::new(opcode, rs, rt, rd, 0, raw.to_owned(), program_index)
        }
        other => {
            return Err(ParseError::UnknownMnemonic {
                line: line_no,
                text: raw.to_owned(),
                mnemonic: other.to_owned(),
            });
        }
    };
    Ok(instr)
}

fn take3<'a>(ops: &[&'a str], line: usize, text: &str) -> Result<[&'a str; 3], ParseError> {
    match ops {
        [a, b, c] => Ok([a, b, c]),
        _ => Err(ParseError::WrongOperandCount {
            line,
            text: text.to_owned(),
            expected: 3,
            found: ops.len(),
        }),
    }
}

fn take1<'a>(ops: &[&'a str], line: usize, text: &str) -> Result<[&'a str; 1], ParseError> {
    match ops {
        [a] => Ok([a]),
        _ => Err(ParseError::WrongOperandCount {
            line,
            text: text.to_owned(),
            expected: 1,
            found: ops.len(),
        }),
    }
}

fn take0(ops: &[&str], line: usize, text: &str) -> Result<(), ParseError> {
    if ops.is_empty() {
        Ok(())
    } else {
        Err(ParseError::WrongOperandCount {
            line,
            text: text.to_owned(),
            expected: 0,
            found: ops.len(),
        })
    }
}

/// Parses a whole program, one instruction per non-blank line. Blank lines
/// and lines starting with `#` are skipped and do not consume a
/// `program_index` slot.
pub fn parse_program(source: &str) -> Result<Vec<Instruction>, ParseError> {
    let mut program = Vec::new();
    for (line_no, raw) in source.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let instr = parse_line(line_no + 1, trimmed, program.len())?;
        program.push(instr);
    }
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_add() {
        let instr = parse_line(1, "add r1 r2 r3", 0).unwrap();
        assert_eq!(instr.dest_reg_d, 1);
        assert_eq!(instr.source_reg_s, 2);
        assert_eq!(instr.source_reg_t, 3);
        assert!(matches!(instr.opcode, Opcode::Add));
    }

    #[test]
    fn parses_load_with_parens_and_commas() {
        let instr = parse_line(1, "load r3, 0(r2)", 0).unwrap();
        assert_eq!(instr.dest_reg_d, 3);
        assert_eq!(instr.source_reg_s, 2);
        assert_eq!(instr.immediate, 0);
    }

    #[rstest]
    #[case(8)]
    #[case(9)]
    #[case(12)]
    #[case(15)]
    fn rejects_out_of_architectural_range_register(#[case] register: u8) {
        let text = format!("add r{register} r0 r0");
        let err = parse_line(1, &text, 0).unwrap_err();
        assert!(matches!(err, ParseError::RegisterOutOfRange { register: r, .. } if r == register));
    }

    #[rstest]
    #[case("r16")]
    #[case("r99")]
    #[case("rX")]
    fn rejects_syntactically_invalid_register(#[case] token: &str) {
        let text = format!("add {token} r0 r0");
        let err = parse_line(1, &text, 0).unwrap_err();
        assert!(matches!(err, ParseError::BadOperand { .. }));
    }

    #[rstest]
    #[case(64)]
    #[case(100)]
    #[case(-65)]
    #[case(-200)]
    fn rejects_immediate_out_of_range(#[case] offset: i32) {
        let text = format!("call {offset}");
        let err = parse_line(1, &text, 0).unwrap_err();
        assert!(matches!(err, ParseError::ImmediateOutOfRange { value, .. } if value == offset));
    }

    #[rstest]
    #[case("xor")]
    #[case("foo")]
    #[case("jmp")]
    fn rejects_unknown_mnemonic(#[case] mnemonic: &str) {
        let text = format!("{mnemonic} r1 r2 r3");
        let err = parse_line(1, &text, 0).unwrap_err();
        assert!(matches!(err, ParseError::UnknownMnemonic { mnemonic: m, .. } if m == mnemonic));
    }

    #[test]
    fn ret_takes_no_operands() {
        let instr = parse_line(1, "ret", 0).unwrap();
        assert!(matches!(instr.opcode, Opcode::Ret));
        assert_eq!(instr.source_reg_s, 1);
    }

    #[test]
    fn program_skips_blank_and_comment_lines() {
        let program = parse_program("# header\n\nadd r1 r2 r3\n\nret\n").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program[0].program_index, 0);
        assert_eq!(program[1].program_index, 1);
    }
}
