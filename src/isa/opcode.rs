/*!
  Opcode and register tables of the ISA.

  Both tables are `#[repr(u8)]` enums carrying their hardware encoding as the
  discriminant, so conversion in either direction is a derive away: `strum`
  handles the mnemonic side, `num_enum` the numeric side. Lookups are O(1) and
  the `Shape` classification below is exhaustive over the opcode set, so adding
  an opcode without teaching the codec about it is a compile error.
*/

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

/**
  Opcodes of the machine. The discriminant is the 5-bit value stored in bits
  8..=12 of an instruction word.

  The ALU opcodes are the contiguous block 0x00..=0x09; `is_alu` relies on
  that ordering. CALL and RET have disagreed across revisions of this ISA;
  0x16/0x17 are the values fixed here (see DESIGN.md).
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,  Debug,        Hash
)]
#[strum(serialize_all = "shouty_snake_case")]
#[repr(u8)]
pub enum Opcode {
  // ALU class: writes a destination register and updates the zero flag //
  Add   = 0x00,
  Sub   = 0x01,
  Inc   = 0x02,
  Dec   = 0x03,
  Cpl   = 0x04, // bitwise complement
  And   = 0x05,
  Or    = 0x06,
  Xor   = 0x07,
  Rr    = 0x08, // shift right one bit
  Rl    = 0x09, // shift left one bit, truncated

  // Control and data movement //
  Call  = 0x16,
  Ret   = 0x17,
  Jz    = 0x18,
  Store = 0x19,
  Load  = 0x1A,
  Out   = 0x1B,
  In    = 0x1C,
  Set   = 0x1D,
  Jmp   = 0x1E,
  Mov   = 0x1F,
}

pub const LAST_ALU_OPCODE: u8 = 0x09;

/// The operand layout of an instruction, which fixes how its data byte is
/// built and read back.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Shape {
  /// Two register operands packed as `(dest << 4) | src`.
  Pair,
  /// One register operand mirrored into both nibbles.
  Single,
  /// An 8-bit literal, implicitly targeting AC.
  Immediate,
  /// A program address, literal or label-resolved.
  Target,
  /// No operands; the data byte is zero.
  Implied,
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// ALU opcodes compute into a destination register and set the zero flag;
  /// nothing else touches the flag.
  pub fn is_alu(&self) -> bool {
    self.code() <= LAST_ALU_OPCODE
  }

  pub fn shape(&self) -> Shape {
    match self {
      | Opcode::Mov
      | Opcode::Add
      | Opcode::Sub
      | Opcode::And
      | Opcode::Or
      | Opcode::Xor
      | Opcode::Load
      | Opcode::Store => Shape::Pair,

      | Opcode::Inc
      | Opcode::Dec
      | Opcode::Cpl
      | Opcode::Rr
      | Opcode::Rl => Shape::Single,

      Opcode::Set => Shape::Immediate,

      | Opcode::Jmp
      | Opcode::Jz
      | Opcode::Call => Shape::Target,

      | Opcode::In
      | Opcode::Out
      | Opcode::Ret => Shape::Implied,
    }
  }
}

/**
  Operand-addressable registers. The discriminant is the operand nibble.

  Nibbles 8..=15 name no operand register. Three of them are reserved bus
  encodings (`ROM` 9, `RAM` 10, `NONE` 15) with no operand syntax; decode
  surfaces all of them as `Operand::Unresolved` and execution skips the
  dependent side effect.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,  Debug,        Hash
)]
#[strum(serialize_all = "shouty_snake_case")]
#[repr(u8)]
pub enum Register {
  R0 = 0,
  R1 = 1,
  R2 = 2,
  R3 = 3,
  Ac = 4,
  Pc = 5,
  Io = 6,
  Sp = 7,
}

/// Reserved nibble encodings, listed for reference. They never parse as
/// operands and never resolve on decode.
pub const RESERVED_ROM_NIBBLE:  u8 = 9;
pub const RESERVED_RAM_NIBBLE:  u8 = 10;
pub const RESERVED_NONE_NIBBLE: u8 = 15;

impl Register {
  pub fn nibble(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// Index into the machine's register file.
  pub fn index(&self) -> usize {
    self.nibble() as usize
  }
}

#[cfg(test)]
mod tests {
  use std::convert::TryFrom;
  use std::str::FromStr;

  use super::*;

  #[test]
  fn opcodes_round_trip_through_their_codes() {
    for op in [
      Opcode::Add, Opcode::Sub, Opcode::Inc, Opcode::Dec, Opcode::Cpl,
      Opcode::And, Opcode::Or,  Opcode::Xor, Opcode::Rr,  Opcode::Rl,
      Opcode::Call, Opcode::Ret, Opcode::Jz,  Opcode::Store, Opcode::Load,
      Opcode::Out,  Opcode::In,  Opcode::Set, Opcode::Jmp,   Opcode::Mov,
    ] {
      assert_eq!(Opcode::try_from(op.code()), Ok(op));
    }
  }

  #[test]
  fn mnemonics_are_uppercase_and_parse_back() {
    assert_eq!(Opcode::Cpl.to_string(), "CPL");
    assert_eq!(Opcode::from_str("JZ"), Ok(Opcode::Jz));
    assert_eq!(Register::Ac.to_string(), "AC");
    assert_eq!(Register::from_str("R2"), Ok(Register::R2));
    assert!(Opcode::from_str("NOP").is_err());
  }

  #[test]
  fn reserved_encodings_have_no_register() {
    for nibble in [RESERVED_ROM_NIBBLE, RESERVED_RAM_NIBBLE, RESERVED_NONE_NIBBLE] {
      assert!(Register::try_from(nibble).is_err());
    }
    assert!(Register::from_str("ROM").is_err());
    assert!(Register::from_str("NONE").is_err());
  }

  #[test]
  fn the_alu_block_is_exactly_the_flag_writers() {
    assert!(Opcode::Add.is_alu());
    assert!(Opcode::Rl.is_alu());
    assert!(!Opcode::Mov.is_alu());
    assert!(!Opcode::Set.is_alu());
    assert!(!Opcode::Call.is_alu());
  }
}
