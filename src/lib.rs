/*!
  `micro8` emulates a small stored-program 8-bit computer for studying
  fetch-decode-execute cycles, flags, branching, and subroutine linkage.

  The pieces, leaf to root:

  - [`isa`] — the instruction word codec: 16-bit words of the form
    `(opcode << 8) | (dest << 4) | src`, plus the disassembler.
  - [`assembler`] — two-pass translation of mnemonic source into a program,
    resolving labels.
  - [`program`] — the capacity-256 program store and its export format.
  - [`machine`] — registers, zero flag, 16-byte RAM, and the step engine.
  - [`runner`] — cancellable fixed-interval run mode with non-overlapping
    steps.

  Rendering and input are external collaborators: a renderer reads
  [`machine::Snapshot`] after each step, and the IN instruction samples an
  8-bit value passed into [`machine::Machine::step`].
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod assembler;
pub mod isa;
pub mod labels;
pub mod machine;
pub mod program;
pub mod runner;

pub use assembler::{assemble, AssemblyError};
pub use isa::{decode, disassemble, encode, load_hex, Decoded, Instruction, Opcode, Operand, Register};
pub use machine::{Machine, Snapshot, StepOutcome};
pub use program::{Program, ProgramWord};
pub use runner::Runner;
