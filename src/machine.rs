/*!
  The machine itself: register file, zero flag, 16-byte RAM, program store,
  and the fetch-decode-execute engine. Everything lives in one explicit
  `Machine` value passed by reference into `step`; there is no ambient state.

  The program counter is register cell 5 of the file, exactly as the ISA
  encodes it, so it is an ordinary 8-bit register as far as operands are
  concerned. The step rule, however, always advances from the pre-fetch
  counter value unless a control opcode (JMP/JZ/CALL/RET) fired, so a MOV or
  ALU write into the PC cell is clobbered by the advance.

  SP is a single-slot return-address holder, not a stack: a nested CALL before
  the matching RET overwrites the pending return address. Programs exist that
  depend on this, so it is preserved rather than fixed.
*/

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::assembler::{assemble, AssemblyError};
use crate::isa::{decode, load_hex, Opcode, Operand, Register};
use crate::program::Program;

/// The result of one `step` call. `Halted` is terminal and sticky: further
/// steps are no-ops, and run mode stops on it automatically.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StepOutcome {
  Stepped,
  Halted,
}

const REGISTER_ORDER: [Register; 8] = [
  Register::R0, Register::R1, Register::R2, Register::R3,
  Register::Ac, Register::Pc, Register::Io, Register::Sp,
];

pub struct Machine {
  /// The operand-addressable cells, indexed by register nibble. Cell 5 is PC.
  registers :  [u8; 8],
  /// Output latch, written only by OUT. Not operand-addressable.
  rs        :  u8,
  /// Set exactly when the last ALU result was 0x00.
  zero_flag :  bool,
  ram       :  [u8; 16],
  rom       :  Program,
}

/// One program row as a collaborator sees it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnapshotLine {
  pub address :  u8,
  pub word    :  u16,
  pub text    :  String,
  pub current :  bool,
}

/// A fully-settled copy of machine state, taken after a step, load, or reset.
/// This is the only thing the render collaborator ever reads.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
  pub registers :  [u8; 8],
  pub rs        :  u8,
  pub zero_flag :  bool,
  pub ram       :  [u8; 16],
  pub pc        :  u8,
  pub program   :  Vec<SnapshotLine>,
}

impl Snapshot {
  pub fn register(&self, register: Register) -> u8 {
    self.registers[register.index()]
  }
}

impl Machine {

  // region Construction and state access

  pub fn new() -> Machine {
    Machine {
      registers :  [0; 8],
      rs        :  0,
      zero_flag :  false,
      ram       :  [0; 16],
      rom       :  Program::default(),
    }
  }

  /// Zeroes every register, the flag, and RAM, and discards the program.
  pub fn reset(&mut self) {
    *self = Machine::new();
  }

  pub fn register(&self, register: Register) -> u8 {
    self.registers[register.index()]
  }

  pub fn set_register(&mut self, register: Register, value: u8) {
    self.registers[register.index()] = value;
  }

  pub fn rs(&self) -> u8 {
    self.rs
  }

  pub fn zero_flag(&self) -> bool {
    self.zero_flag
  }

  pub fn ram(&self) -> &[u8; 16] {
    &self.ram
  }

  pub fn program(&self) -> &Program {
    &self.rom
  }

  pub fn pc(&self) -> u8 {
    self.registers[Register::Pc.index()]
  }

  fn set_pc(&mut self, value: u8) {
    self.registers[Register::Pc.index()] = value;
  }

  /// The terminal condition: the counter has run off the end of the program.
  pub fn halted(&self) -> bool {
    self.pc() as usize >= self.rom.len()
  }

  // endregion

  // region Program installation

  /// Installs a program wholesale and resets the counter to 0. Registers,
  /// flag, and RAM are left as they are.
  pub fn load(&mut self, program: Program) {
    self.rom = program;
    self.set_pc(0);
  }

  /// Assembles and installs in one call. On error the current program is
  /// untouched, per the all-or-nothing rule.
  pub fn load_source(&mut self, source: &str) -> Result<(), AssemblyError> {
    let program = assemble(source)?;
    self.load(program);
    Ok(())
  }

  /// Hex-load counterpart of `load_source`, same all-or-nothing rule.
  pub fn load_hex_source(&mut self, source: &str) -> Result<(), AssemblyError> {
    let program = load_hex(source)?;
    self.load(program);
    Ok(())
  }

  // endregion

  // region Execution

  /**
    Executes one fetch-decode-execute cycle. `input` is the externally owned
    switch sample consumed by IN; the machine performs no input I/O itself.

    Execution is deliberately permissive where assembly is strict: an unused
    opcode point is a no-op besides the counter advance, and an instruction
    whose operand nibble names no register skips the dependent side effect
    (including the flag update) instead of failing.
  */
  pub fn step(&mut self, input: u8) -> StepOutcome {
    let current_pc = self.pc();
    let fetched = match self.rom.get(current_pc as usize) {
      Some(entry) => entry.word,
      None        => return StepOutcome::Halted,
    };
    let decoded = decode(fetched);

    #[cfg(feature = "trace_execution")]
    println!("{:02X}:  {:04X}  {}", current_pc, fetched, crate::isa::disassemble(fetched));

    let mut pc_updated = false;

    if let Some(opcode) = decoded.opcode {
      match opcode {

        Opcode::Mov => {
          if let (Operand::Resolved(dest), Operand::Resolved(src)) = (decoded.dest, decoded.src) {
            self.registers[dest.index()] = self.register(src);
          }
        }

        Opcode::Set => {
          self.registers[Register::Ac.index()] = decoded.data;
        }

        Opcode::Jmp => {
          self.set_pc(decoded.data);
          pc_updated = true;
        }

        Opcode::Jz => {
          if self.zero_flag {
            self.set_pc(decoded.data);
            pc_updated = true;
          }
        }

        Opcode::Call => {
          // Single-slot return holder; a nested CALL overwrites it.
          self.registers[Register::Sp.index()] = current_pc.wrapping_add(1);
          self.set_pc(decoded.data);
          pc_updated = true;
        }

        Opcode::Ret => {
          self.set_pc(self.register(Register::Sp));
          pc_updated = true;
        }

        Opcode::In => {
          self.registers[Register::Ac.index()] = input;
        }

        Opcode::Out => {
          self.rs = self.register(Register::Ac);
        }

        Opcode::Load => {
          if let (Operand::Resolved(dest), Operand::Resolved(address)) = (decoded.dest, decoded.src) {
            let cell = (self.register(address) & 0xF) as usize;
            self.registers[dest.index()] = self.ram[cell];
          }
        }

        Opcode::Store => {
          if let (Operand::Resolved(address), Operand::Resolved(src)) = (decoded.dest, decoded.src) {
            let cell = (self.register(address) & 0xF) as usize;
            self.ram[cell] = self.register(src);
          }
        }

        | Opcode::Add | Opcode::Sub | Opcode::Inc | Opcode::Dec | Opcode::Cpl
        | Opcode::And | Opcode::Or  | Opcode::Xor | Opcode::Rr  | Opcode::Rl => {
          self.execute_alu(opcode, decoded.dest, decoded.src);
        }

      }
    }

    if !pc_updated {
      self.set_pc(current_pc.wrapping_add(1));
    }

    StepOutcome::Stepped
  }

  /// The ALU class: compute into the destination, then mirror the result into
  /// the zero flag. The single-register ops ignore the mirrored source nibble.
  fn execute_alu(&mut self, opcode: Opcode, dest: Operand, src: Operand) {
    let computed = match (opcode, dest.resolved(), src.resolved()) {
      (Opcode::Add, Some(dest), Some(src)) => Some((dest, self.register(dest).wrapping_add(self.register(src)))),
      (Opcode::Sub, Some(dest), Some(src)) => Some((dest, self.register(dest).wrapping_sub(self.register(src)))),
      (Opcode::And, Some(dest), Some(src)) => Some((dest, self.register(dest) & self.register(src))),
      (Opcode::Or,  Some(dest), Some(src)) => Some((dest, self.register(dest) | self.register(src))),
      (Opcode::Xor, Some(dest), Some(src)) => Some((dest, self.register(dest) ^ self.register(src))),
      (Opcode::Inc, Some(dest), _        ) => Some((dest, self.register(dest).wrapping_add(1))),
      (Opcode::Dec, Some(dest), _        ) => Some((dest, self.register(dest).wrapping_sub(1))),
      (Opcode::Cpl, Some(dest), _        ) => Some((dest, !self.register(dest))),
      (Opcode::Rr,  Some(dest), _        ) => Some((dest, self.register(dest) >> 1)),
      (Opcode::Rl,  Some(dest), _        ) => Some((dest, self.register(dest) << 1)),
      _                                    => None,
    };

    if let Some((dest, value)) = computed {
      self.registers[dest.index()] = value;
      self.zero_flag = value == 0;
    }
  }

  // endregion

  /// A settled copy of everything a renderer shows, with the program
  /// annotated by the current counter.
  pub fn snapshot(&self) -> Snapshot {
    let pc = self.pc();
    Snapshot {
      registers :  self.registers,
      rs        :  self.rs,
      zero_flag :  self.zero_flag,
      ram       :  self.ram,
      pc,
      program   :  self.rom.iter().enumerate()
        .map(|(address, entry)| SnapshotLine {
          address :  address as u8,
          word    :  entry.word,
          text    :  entry.text.clone(),
          current :  address == pc as usize,
        })
        .collect(),
    }
  }

  // region Display methods

  fn make_register_table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Reg", ubl->"Value"]);
    for register in REGISTER_ORDER {
      table.add_row(row![r->format!("{} =", register), format!("{:02X}", self.register(register))]);
    }
    table.add_row(row![r->"RS =", format!("{:02X}", self.rs)]);
    table.add_row(row![r->"ZF =", format!("{}", self.zero_flag as u8)]);
    table
  }

  fn make_ram_table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Addr", ubl->"Value"]);
    for (address, value) in self.ram.iter().enumerate() {
      table.add_row(row![r->format!("{:X}", address), format!("{:02X}", value)]);
    }
    table
  }

  fn make_program_table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Addr", ubl->"Source", ubl->"Word"]);
    for (address, entry) in self.rom.iter().enumerate() {
      match address == self.pc() as usize {

        true => {
          table.add_row(
            row![r->format!("* --> {:02X}", address), entry.text, format!("{:04X}", entry.word)]
          );
        }

        false => {
          table.add_row(
            row![r->format!("{:02X}", address), entry.text, format!("{:04X}", entry.word)]
          );
        }

      } // end match on highlight
    }
    table
  }

  // endregion

}

impl Default for Machine {
  fn default() -> Machine {
    Machine::new()
  }
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut combined_table = table!([
      self.make_register_table(),
      self.make_ram_table(),
      self.make_program_table()
    ]);

    combined_table.set_titles(row![ub->"Registers", ub->"RAM", ub->"Program"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let state = match self.halted() {
      true  => "Halted.",
      false => "Ready.",
    };

    write!(f, "{}\n{}", state, combined_table)
  }
}
