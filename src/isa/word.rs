/*!
  Encoding and decoding of 16-bit instruction words.

  A word is `(opcode << 8) | (dest_nibble << 4) | src_nibble`. The opcode
  occupies bits 8..=12; bits 13..=15 are ignored on decode. The low byte is
  the data byte and doubles as the immediate for SET and the target address
  for JMP/JZ/CALL.

  `Instruction` holds the unencoded components, one variant per operand shape
  rather than per opcode, and an enum is used only for the opcode itself. Its
  `Display` impl produces the canonical text form, which is what the
  disassembler emits and the assembler accepts back.

  Decoding is total: an unused opcode point decodes with `opcode: None`, and a
  nibble that names no register decodes as `Operand::Unresolved`. Strictness
  lives in the assembler; everything downstream of a raw word is lenient.
*/

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use super::opcode::{Opcode, Register, Shape};

/// Holds the unencoded components of an instruction, grouped by operand shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// MOV, ADD, SUB, AND, OR, XOR, LOAD, STORE. For LOAD the `src` position is
  /// the memory-address register (`LOAD R1, [AC]`); for STORE it is the
  /// `dest` position (`STORE [AC], R0`).
  Pair {
    opcode :  Opcode,
    dest   :  Register,
    src    :  Register,
  },
  /// INC, DEC, CPL, RR, RL. The register is mirrored into both nibbles; the
  /// redundant source nibble is not a second operand.
  Single {
    opcode :  Opcode,
    reg    :  Register,
  },
  /// SET. Always targets AC.
  Immediate {
    value: u8
  },
  /// JMP, JZ, CALL. The data byte is the resolved program address.
  Target {
    opcode  :  Opcode,
    address :  u8,
  },
  /// IN, OUT, RET. The data byte is zero.
  Implied(Opcode),
}

/// A decoded operand nibble. Execution matches on this instead of testing a
/// maybe-register for truthiness: an `Unresolved` nibble skips the dependent
/// side effect, it never fails.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operand {
  Resolved(Register),
  Unresolved(u8),
}

impl Operand {
  pub fn from_nibble(nibble: u8) -> Operand {
    match Register::try_from(nibble) {
      Ok(register) => Operand::Resolved(register),
      Err(_)       => Operand::Unresolved(nibble),
    }
  }

  pub fn resolved(self) -> Option<Register> {
    match self {
      Operand::Resolved(register) => Some(register),
      Operand::Unresolved(_)      => None,
    }
  }
}

/// The fields of a fetched word. `opcode` is `None` for an unused code point;
/// the engine treats that as a no-op and the disassembler as a placeholder.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Decoded {
  pub opcode :  Option<Opcode>,
  pub dest   :  Operand,
  pub src    :  Operand,
  pub data   :  u8,
}

/// Encodes the instruction into its 16-bit word.
pub fn encode(instruction: &Instruction) -> u16 {
  match *instruction {

    Instruction::Pair { opcode, dest, src } => {
      word(opcode, (dest.nibble() << 4) | src.nibble())
    }

    Instruction::Single { opcode, reg } => {
      word(opcode, (reg.nibble() << 4) | reg.nibble())
    }

    Instruction::Immediate { value } => {
      word(Opcode::Set, value)
    }

    Instruction::Target { opcode, address } => {
      word(opcode, address)
    }

    Instruction::Implied(opcode) => {
      word(opcode, 0)
    }

  }
}

fn word(opcode: Opcode, data: u8) -> u16 {
  ((opcode.code() as u16) << 8) | data as u16
}

/// Decodes a word into its fields. Total: every `u16` decodes to something.
pub fn decode(word: u16) -> Decoded {
  let data = (word & 0xFF) as u8;
  Decoded {
    opcode :  Opcode::try_from(((word >> 8) & 0x1F) as u8).ok(),
    dest   :  Operand::from_nibble(data >> 4),
    src    :  Operand::from_nibble(data & 0xF),
    data,
  }
}

/**
  Rebuilds the shaped `Instruction` for a word, when the word has one: the
  opcode must be defined and every nibble the shape reads must name a register.
  Words failing either test get the disassembler's placeholder instead.
*/
pub fn try_instruction(encoded: u16) -> Option<Instruction> {
  let decoded = decode(encoded);
  let opcode  = decoded.opcode?;

  let instruction =
    match opcode.shape() {
      Shape::Pair => Instruction::Pair {
        opcode,
        dest: decoded.dest.resolved()?,
        src:  decoded.src.resolved()?,
      },
      Shape::Single => Instruction::Single {
        opcode,
        reg: decoded.dest.resolved()?,
      },
      Shape::Immediate => Instruction::Immediate { value: decoded.data },
      Shape::Target    => Instruction::Target { opcode, address: decoded.data },
      Shape::Implied   => Instruction::Implied(opcode),
    };

  Some(instruction)
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Pair { opcode: Opcode::Load, dest, src } => {
        write!(f, "LOAD {}, [{}]", dest, src)
      }

      Instruction::Pair { opcode: Opcode::Store, dest, src } => {
        write!(f, "STORE [{}], {}", dest, src)
      }

      Instruction::Pair { opcode, dest, src } => {
        write!(f, "{} {}, {}", opcode, dest, src)
      }

      Instruction::Single { opcode, reg } => {
        write!(f, "{} {}", opcode, reg)
      }

      Instruction::Immediate { value } => {
        write!(f, "SET {:02X}", value)
      }

      Instruction::Target { opcode, address } => {
        write!(f, "{} {:02X}", opcode, address)
      }

      Instruction::Implied(opcode) => {
        write!(f, "{}", opcode)
      }

    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pair_ops_round_trip() {
    for opcode in [
      Opcode::Mov, Opcode::Add, Opcode::Sub, Opcode::And,
      Opcode::Or,  Opcode::Xor, Opcode::Load, Opcode::Store,
    ] {
      let instruction = Instruction::Pair { opcode, dest: Register::Ac, src: Register::R3 };
      let encoded = encode(&instruction);
      assert_eq!(encoded & 0xFF, 0x43);
      assert_eq!(try_instruction(encoded), Some(instruction));
    }
  }

  #[test]
  fn single_register_ops_mirror_the_nibble() {
    let encoded = encode(&Instruction::Single { opcode: Opcode::Inc, reg: Register::R2 });
    assert_eq!(encoded, 0x0222);
    let decoded = decode(encoded);
    assert_eq!(decoded.dest, Operand::Resolved(Register::R2));
    assert_eq!(decoded.src,  Operand::Resolved(Register::R2));
  }

  #[test]
  fn set_and_jumps_carry_the_data_byte() {
    assert_eq!(encode(&Instruction::Immediate { value: 0xA7 }), 0x1DA7);
    assert_eq!(encode(&Instruction::Target { opcode: Opcode::Jmp, address: 0x10 }), 0x1E10);
    assert_eq!(encode(&Instruction::Target { opcode: Opcode::Call, address: 0x02 }), 0x1602);
    assert_eq!(decode(0x1DA7).data, 0xA7);
  }

  #[test]
  fn implied_ops_encode_a_zero_data_byte() {
    assert_eq!(encode(&Instruction::Implied(Opcode::Ret)), 0x1700);
    assert_eq!(encode(&Instruction::Implied(Opcode::In)),  0x1C00);
    assert_eq!(encode(&Instruction::Implied(Opcode::Out)), 0x1B00);
  }

  #[test]
  fn reserved_nibbles_decode_as_unresolved() {
    let decoded = decode(0x1F9F); // MOV with ROM/NONE nibbles
    assert_eq!(decoded.opcode, Some(Opcode::Mov));
    assert_eq!(decoded.dest, Operand::Unresolved(9));
    assert_eq!(decoded.src,  Operand::Unresolved(15));
    assert_eq!(try_instruction(0x1F9F), None);
  }

  #[test]
  fn unused_opcode_points_decode_with_no_opcode() {
    // 0x0B is a hole between the ALU block and the control block.
    let decoded = decode(0x0B22);
    assert_eq!(decoded.opcode, None);
    assert_eq!(decoded.data, 0x22);
  }

  #[test]
  fn bits_above_the_opcode_are_ignored() {
    assert_eq!(decode(0xFE10).opcode, Some(Opcode::Jmp));
    assert_eq!(decode(0x1E10).opcode, Some(Opcode::Jmp));
  }

  #[test]
  fn canonical_text_uses_bracket_syntax_for_memory_ops() {
    let load = Instruction::Pair { opcode: Opcode::Load, dest: Register::R1, src: Register::Ac };
    assert_eq!(load.to_string(), "LOAD R1, [AC]");
    let store = Instruction::Pair { opcode: Opcode::Store, dest: Register::Ac, src: Register::R0 };
    assert_eq!(store.to_string(), "STORE [AC], R0");
  }
}
