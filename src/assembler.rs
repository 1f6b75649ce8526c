/*!
  The two-pass assembler: mnemonic source text in, an installed-ready
  `Program` out.

  Pass 1 strips comments and blank lines, peels label declarations off the
  front of each line, and records them at the current instruction counter.
  Pass 2 tokenizes each retained line with a small nom grammar and encodes it
  through the codec, resolving address operands against the label table first
  and as 2-digit hex literals second.

  Assembly is all-or-nothing: the first error aborts the whole run and no
  partial program is ever produced. The caller's previous program stays
  untouched. Every error names its 1-based source line.
*/

use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::take_while1,
  character::complete::{char as one_char, space0},
  combinator::{all_consuming, map},
  multi::many0,
  sequence::{delimited, pair, preceded},
  IResult,
};
use thiserror::Error;

use crate::isa::{encode, Instruction, Opcode, Register, Shape};
use crate::labels::LabelTable;
use crate::program::{Program, ProgramWord};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AssemblyError {
  #[error("line {line}: unknown mnemonic `{name}`")]
  UnknownMnemonic { line: usize, name: String },

  #[error("line {line}: invalid operand in `{token}`")]
  InvalidOperand { line: usize, token: String },

  #[error("line {line}: duplicate label `{name}`")]
  DuplicateLabel { line: usize, name: String },

  #[error("line {line}: program exceeds {} words", Program::CAPACITY)]
  RomOverflow { line: usize },

  #[error("line {line}: invalid hex word `{word}`")]
  InvalidHexWord { line: usize, word: String },
}

/// A comment-stripped, uppercased instruction line surviving pass 1, tagged
/// with where it came from.
struct RetainedLine {
  line :  usize,
  text :  String,
}

// region Line grammar

/// Mnemonics, register names, labels, and hex literals are all the same token
/// class at this level; meaning is assigned during encoding.
fn identifier(input: &str) -> IResult<&str, &str> {
  take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

/// `[REG]` — the brackets are syntax only and are stripped here.
fn bracketed(input: &str) -> IResult<&str, &str> {
  delimited(one_char('['), identifier, one_char(']'))(input)
}

fn operand(input: &str) -> IResult<&str, &str> {
  alt((bracketed, identifier))(input)
}

/// Operands are separated by any run of spaces, tabs, and commas.
fn separator(input: &str) -> IResult<&str, &str> {
  take_while1(|c: char| c == ' ' || c == '\t' || c == ',')(input)
}

struct Tokenized<'a> {
  mnemonic :  &'a str,
  operands :  Vec<&'a str>,
}

fn instruction_line(input: &str) -> IResult<&str, Tokenized<'_>> {
  all_consuming(delimited(
    space0,
    map(
      pair(identifier, many0(preceded(separator, operand))),
      |(mnemonic, operands)| Tokenized { mnemonic, operands },
    ),
    space0,
  ))(input)
}

// endregion

// region Pass 1

/// Comment to end of line, then surrounding whitespace.
fn strip_comment(raw: &str) -> &str {
  raw.split(';').next().unwrap_or("").trim()
}

/**
  Splits any leading `NAME:` declarations off a line, returning the label
  names and the remaining instruction text. `NAME: SET 05` is a label and an
  instruction on one line; a bare `NAME:` is a label only.
*/
fn split_labels(text: &str) -> (Vec<&str>, &str) {
  let mut labels = Vec::new();
  let mut rest   = text;

  while let Some(position) = rest.find(':') {
    let candidate = rest[..position].trim();
    let is_name = !candidate.is_empty()
      && candidate.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !is_name {
      break;
    }
    labels.push(candidate);
    rest = rest[position + 1..].trim();
  }

  (labels, rest)
}

fn collect_labels(source: &str) -> Result<(LabelTable, Vec<RetainedLine>), AssemblyError> {
  let mut labels   = LabelTable::new();
  let mut retained = Vec::new();

  for (index, raw) in source.lines().enumerate() {
    let line = index + 1;
    let text = strip_comment(raw);
    if text.is_empty() {
      continue;
    }
    let text = text.to_ascii_uppercase();

    let (declared, instruction) = split_labels(&text);
    for name in declared {
      // An address past the last ROM slot can never be jumped to; such a
      // label is simply not recorded and a reference to it fails in pass 2.
      if retained.len() <= u8::MAX as usize
        && !labels.declare(name, retained.len() as u8)
      {
        return Err(AssemblyError::DuplicateLabel { line, name: name.to_string() });
      }
    }

    if instruction.is_empty() {
      continue;
    }
    if retained.len() >= Program::CAPACITY {
      return Err(AssemblyError::RomOverflow { line });
    }
    retained.push(RetainedLine { line, text: instruction.to_string() });
  }

  Ok((labels, retained))
}

// endregion

// region Pass 2

fn parse_register(line: usize, token: &str) -> Result<Register, AssemblyError> {
  Register::from_str(token)
    .map_err(|_| AssemblyError::InvalidOperand { line, token: token.to_string() })
}

fn parse_byte(line: usize, token: &str) -> Result<u8, AssemblyError> {
  if token.len() > 2 {
    return Err(AssemblyError::InvalidOperand { line, token: token.to_string() });
  }
  u8::from_str_radix(token, 16)
    .map_err(|_| AssemblyError::InvalidOperand { line, token: token.to_string() })
}

/// Address operands resolve against the label table first, then as hex.
fn resolve_address(line: usize, token: &str, labels: &LabelTable) -> Result<u8, AssemblyError> {
  match labels.address_of(token) {
    Some(address) => Ok(address),
    None          => parse_byte(line, token),
  }
}

fn encode_line(
  retained : &RetainedLine,
  labels   : &LabelTable,
) -> Result<Instruction, AssemblyError> {
  let line = retained.line;

  let tokens = match instruction_line(&retained.text) {
    Ok((_rest, tokens)) => tokens,
    Err(_) => {
      return Err(AssemblyError::InvalidOperand { line, token: retained.text.clone() });
    }
  };

  let opcode = Opcode::from_str(tokens.mnemonic).map_err(|_| {
    AssemblyError::UnknownMnemonic { line, name: tokens.mnemonic.to_string() }
  })?;

  let arity_error = || AssemblyError::InvalidOperand { line, token: retained.text.clone() };
  let operands = &tokens.operands;

  let instruction =
    match opcode.shape() {

      Shape::Pair => {
        if operands.len() != 2 {
          return Err(arity_error());
        }
        Instruction::Pair {
          opcode,
          dest: parse_register(line, operands[0])?,
          src:  parse_register(line, operands[1])?,
        }
      }

      Shape::Single => {
        if operands.len() != 1 {
          return Err(arity_error());
        }
        Instruction::Single { opcode, reg: parse_register(line, operands[0])? }
      }

      Shape::Immediate => {
        // `SET 05` or `SET AC, 05`; the explicit target may only be AC.
        let value = match operands.len() {
          1 => parse_byte(line, operands[0])?,
          2 => {
            if parse_register(line, operands[0])? != Register::Ac {
              return Err(arity_error());
            }
            parse_byte(line, operands[1])?
          }
          _ => return Err(arity_error()),
        };
        Instruction::Immediate { value }
      }

      Shape::Target => {
        if operands.len() != 1 {
          return Err(arity_error());
        }
        Instruction::Target { opcode, address: resolve_address(line, operands[0], labels)? }
      }

      Shape::Implied => {
        if !operands.is_empty() {
          return Err(arity_error());
        }
        Instruction::Implied(opcode)
      }

    };

  Ok(instruction)
}

// endregion

/**
  Assembles a source text into a `Program`.

  The label table lives only for the duration of this call. On success the
  caller installs the program with `Machine::load`, which resets the program
  counter; on any error the caller's current program is unaffected.
*/
pub fn assemble(source: &str) -> Result<Program, AssemblyError> {
  let (labels, retained) = collect_labels(source)?;

  let mut words = Vec::with_capacity(retained.len());
  for entry in &retained {
    let instruction = encode_line(entry, &labels)?;
    words.push(ProgramWord {
      word: encode(&instruction),
      text: entry.text.clone(),
    });
  }

  Ok(Program::new(words))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn assembles_a_simple_program() {
    let program = assemble("SET 05\nMOV R0, AC\nADD AC, R0\n").unwrap();
    assert_eq!(program.len(), 3);
    assert_eq!(program.get(0).unwrap().word, 0x1D05);
    assert_eq!(program.get(1).unwrap().word, 0x1F04);
    assert_eq!(program.get(2).unwrap().word, 0x0040);
  }

  #[test]
  fn source_is_case_insensitive_and_commented() {
    let program = assemble("  set 3f   ; load the literal\n\n; full-line comment\nmov r1, ac\n").unwrap();
    assert_eq!(program.len(), 2);
    assert_eq!(program.get(0).unwrap().word, 0x1D3F);
    assert_eq!(program.get(0).unwrap().text, "SET 3F");
  }

  #[test]
  fn labels_resolve_forward_and_backward() {
    let source = "START:\n\
                  SET 01\n\
                  JZ DONE\n\
                  JMP START\n\
                  DONE:\n\
                  RET\n";
    let program = assemble(source).unwrap();
    assert_eq!(program.get(1).unwrap().word, 0x1803); // JZ DONE -> address 3
    assert_eq!(program.get(2).unwrap().word, 0x1E00); // JMP START -> address 0
  }

  #[test]
  fn a_label_may_share_a_line_with_its_instruction() {
    let program = assemble("START: SET 05\nJMP START\n").unwrap();
    assert_eq!(program.len(), 2);
    assert_eq!(program.get(0).unwrap().word, 0x1D05);
    assert_eq!(program.get(1).unwrap().word, 0x1E00);
  }

  #[test]
  fn duplicate_label_aborts_with_no_program() {
    let result = assemble("LOOP:\nSET 01\nLOOP:\nSET 02\n");
    assert_eq!(
      result,
      Err(AssemblyError::DuplicateLabel { line: 3, name: "LOOP".to_string() })
    );
  }

  #[test]
  fn unknown_mnemonic_names_the_line() {
    let result = assemble("SET 01\nNOP\n");
    assert_eq!(
      result,
      Err(AssemblyError::UnknownMnemonic { line: 2, name: "NOP".to_string() })
    );
  }

  #[test]
  fn bad_operands_name_the_line() {
    assert_eq!(
      assemble("MOV AC\n"),
      Err(AssemblyError::InvalidOperand { line: 1, token: "MOV AC".to_string() })
    );
    assert_eq!(
      assemble("MOV AC, ROM\n"),
      Err(AssemblyError::InvalidOperand { line: 1, token: "ROM".to_string() })
    );
    assert_eq!(
      assemble("JMP NOWHERE\n"),
      Err(AssemblyError::InvalidOperand { line: 1, token: "NOWHERE".to_string() })
    );
  }

  #[test]
  fn set_accepts_an_explicit_ac_target_only() {
    let program = assemble("SET AC, 7F\n").unwrap();
    assert_eq!(program.get(0).unwrap().word, 0x1D7F);
    assert!(assemble("SET R0, 7F\n").is_err());
  }

  #[test]
  fn memory_ops_use_bracket_syntax() {
    let program = assemble("LOAD R1, [AC]\nSTORE [AC], R0\n").unwrap();
    assert_eq!(program.get(0).unwrap().word, 0x1A14);
    assert_eq!(program.get(1).unwrap().word, 0x1940);
  }

  #[test]
  fn overflowing_the_rom_aborts() {
    let mut source = String::new();
    for _ in 0..257 {
      source.push_str("SET 01\n");
    }
    assert_eq!(assemble(&source), Err(AssemblyError::RomOverflow { line: 257 }));
  }

  #[test]
  fn errors_render_with_their_line() {
    let message = assemble("BOGUS\n").unwrap_err().to_string();
    assert_eq!(message, "line 1: unknown mnemonic `BOGUS`");
  }
}
