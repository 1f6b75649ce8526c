/*!
  The instruction set architecture: a 16-bit word per instruction,

    [unused:3][Opcode:5][DestNibble:4][SrcNibble:4]

  with the low byte doubling as an 8-bit immediate (SET) or program address
  (JMP/JZ/CALL). The textual form of a word is 4 uppercase hex digits.

  Opcodes and registers carry their hardware encoding as enum discriminants,
  so the codec is a pair of shifts plus derived conversions in each direction.
  Register nibbles that name no register decode as `Operand::Unresolved`
  rather than failing; the execution engine and the disassembler both treat
  such words leniently because hand-loaded hex may contain anything.
*/

mod disassembler;
mod opcode;
mod word;

pub use disassembler::{disassemble, load_hex};
pub use opcode::{Opcode, Register, Shape, LAST_ALU_OPCODE};
pub use word::{decode, encode, try_instruction, Decoded, Instruction, Operand};
