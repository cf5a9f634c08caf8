//! Def-use index over a module.
//!
//! Built by a single walk in module layout order (function, block,
//! instruction), so the recorded use lists have a fixed, reproducible order.
//! Only instruction operands are indexed; terminator conditions are not use
//! sites (nothing downstream queries them).

use std::collections::HashMap;

use crate::instr::{InstrRef, Value};
use crate::module::{FuncId, GlobalId, Module};

/// An instruction that references some value or global.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UseSite {
    pub func: FuncId,
    pub block: u32,
    pub instr: u32,
}

impl UseSite {
    /// The referencing instruction, as a function-local reference.
    pub const fn instr_ref(&self) -> InstrRef {
        InstrRef {
            block: self.block,
            instr: self.instr,
        }
    }
}

/// Reverse operand index: which instructions reference a given global or
/// instruction result.
#[derive(Clone, Debug, Default)]
pub struct UseIndex {
    global_uses: HashMap<GlobalId, Vec<UseSite>>,
    value_uses: HashMap<(FuncId, InstrRef), Vec<UseSite>>,
}

impl UseIndex {
    /// Build the index for a module.
    pub fn build(module: &Module) -> Self {
        let mut index = Self::default();
        for (func, f) in module.iter_functions() {
            for (b, block) in f.blocks.iter().enumerate() {
                for (i, instr) in block.instrs.iter().enumerate() {
                    let site = UseSite {
                        func,
                        block: b as u32,
                        instr: i as u32,
                    };
                    for operand in instr.operands() {
                        match operand {
                            Value::Global(g) => {
                                index.global_uses.entry(g).or_default().push(site);
                            }
                            Value::Instr(def) => {
                                index
                                    .value_uses
                                    .entry((func, def))
                                    .or_default()
                                    .push(site);
                            }
                            Value::Const(_) | Value::Arg(_) => {}
                        }
                    }
                }
            }
        }
        index
    }

    /// All instructions referencing global `g`, in layout order.
    pub fn uses_of_global(&self, g: GlobalId) -> &[UseSite] {
        self.global_uses.get(&g).map_or(&[], Vec::as_slice)
    }

    /// All instructions referencing the result of `def` in `func`, in layout
    /// order.
    pub fn uses_of_value(&self, func: FuncId, def: InstrRef) -> &[UseSite] {
        self.value_uses
            .get(&(func, def))
            .map_or(&[], Vec::as_slice)
    }
}
