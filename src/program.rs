/*!
  The program store: an ordered, capacity-256 sequence of instruction words,
  each paired with the canonical source text it was assembled (or disassembled)
  from. A program is replaced wholesale by the assembler or a hex load and is
  immutable while the engine runs it.
*/

use std::fmt::Write as _;

/// One installed word and the text shown for it in listings and exports.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProgramWord {
  pub word :  u16,
  pub text :  String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
  words: Vec<ProgramWord>,
}

impl Program {
  /// Program memory holds 256 words; both the assembler and the hex loader
  /// refuse anything longer before a program is built.
  pub const CAPACITY: usize = 256;

  pub fn new(words: Vec<ProgramWord>) -> Program {
    debug_assert!(words.len() <= Program::CAPACITY);
    Program { words }
  }

  pub fn len(&self) -> usize {
    self.words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.words.is_empty()
  }

  pub fn get(&self, address: usize) -> Option<&ProgramWord> {
    self.words.get(address)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, ProgramWord> {
    self.words.iter()
  }

  /**
    Renders the program as a plain-text memory-initialization table, one line
    per address:

    ```text
    % micro8 program memory %
    TABLE
    H"00" => H"1D05";
    END TABLE;
    ```

    Returns `None` for an empty program.
  */
  pub fn export_memory_table(&self) -> Option<String> {
    if self.words.is_empty() {
      return None;
    }
    let mut out = String::from("% micro8 program memory %\nTABLE\n");
    for (address, entry) in self.words.iter().enumerate() {
      // The writer for a String is infallible.
      let _ = writeln!(out, "H\"{:02X}\" => H\"{:04X}\";", address, entry.word);
    }
    out.push_str("END TABLE;\n");
    Some(out)
  }
}
