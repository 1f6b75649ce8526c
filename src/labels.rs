/*!
  The label table built during the assembler's first pass: a mapping from
  label names to program addresses. Names are interned atoms since the same
  label is looked up once per reference. The table is transient; it is dropped
  when `assemble` returns.

  The map is deliberately one-directional. Two labels may alias the same
  address (`LOOP:` directly above `START:`), so a bijective table would reject
  legal sources.
*/

use std::collections::HashMap;

use string_cache::DefaultAtom;

#[derive(Debug, Default)]
pub struct LabelTable {
  table: HashMap<DefaultAtom, u8>,
}

impl LabelTable {
  pub fn new() -> LabelTable {
    LabelTable { table: HashMap::new() }
  }

  /// Declares `name` at `address`. Returns `false` when the name is already
  /// declared, which the assembler reports as a fatal `DuplicateLabel`.
  pub fn declare(&mut self, name: &str, address: u8) -> bool {
    let name = DefaultAtom::from(name);
    if self.table.contains_key(&name) {
      return false;
    }
    self.table.insert(name, address);
    true
  }

  pub fn address_of(&self, name: &str) -> Option<u8> {
    self.table.get(&DefaultAtom::from(name)).copied()
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}
