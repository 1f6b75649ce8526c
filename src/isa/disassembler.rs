/*!
  Turning raw words back into source text. This is the display side of the
  codec, used when a program is hand-loaded as hex rather than assembled:
  whatever the canonical text cannot express still gets *some* listing line,
  because arbitrary words are legal to load. Strictness stays on the
  assembler's side of the fence.
*/

use crate::assembler::AssemblyError;
use crate::program::{Program, ProgramWord};

use super::word::try_instruction;

/**
  Renders a word as canonical source text.

  For every recognized opcode whose operand nibbles resolve, the result
  re-assembles to an equivalent word. Anything else — an unused opcode point,
  or a reserved nibble where the shape needs a register — becomes a diagnostic
  placeholder embedding the raw hex. This function never fails.
*/
pub fn disassemble(word: u16) -> String {
  match try_instruction(word) {
    Some(instruction) => instruction.to_string(),
    None              => format!("??? {:04X}", word),
  }
}

/**
  Builds a `Program` from raw machine code, one 4-hex-digit word per line.
  Blank lines and `;` comments are tolerated; each word's listing text is its
  disassembly.

  Like assembly, the load is all-or-nothing: a malformed or over-long word
  aborts with `InvalidHexWord` naming the line, and more than 256 words is a
  `RomOverflow`.
*/
pub fn load_hex(source: &str) -> Result<Program, AssemblyError> {
  let mut words = Vec::new();

  for (index, raw) in source.lines().enumerate() {
    let line = index + 1;
    let text = raw.split(';').next().unwrap_or("").trim();
    if text.is_empty() {
      continue;
    }

    if text.len() != 4 || !text.chars().all(|c| c.is_ascii_hexdigit()) {
      return Err(AssemblyError::InvalidHexWord { line, word: text.to_string() });
    }
    let word = u16::from_str_radix(text, 16)
      .map_err(|_| AssemblyError::InvalidHexWord { line, word: text.to_string() })?;

    if words.len() >= Program::CAPACITY {
      return Err(AssemblyError::RomOverflow { line });
    }
    words.push(ProgramWord { word, text: disassemble(word) });
  }

  Ok(Program::new(words))
}
