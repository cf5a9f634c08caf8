//! Instructions, operands and block terminators.

use crate::module::{FuncId, GlobalId};

/// Reference to an instruction within a function: block layout index plus
/// position within the block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrRef {
    pub block: u32,
    pub instr: u32,
}

/// An operand: a constant, the result of another instruction in the same
/// function, the address of a global, or a function argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Const(u64),
    Instr(InstrRef),
    Global(GlobalId),
    Arg(u32),
}

/// A value-producing or side-effecting instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr {
    /// Address of element `index` of the array object at `base`.
    ElementAddr { base: Value, index: Value },
    /// Load one counter-width cell from `addr`.
    Load { addr: Value },
    /// Store `value` to `addr`.
    Store { addr: Value, value: Value },
    /// Integer addition.
    Add { lhs: Value, rhs: Value },
    /// Direct call.
    Call { callee: FuncId, args: Vec<Value> },
}

impl Instr {
    /// Operands of this instruction, in a fixed order.
    pub fn operands(&self) -> Vec<Value> {
        match self {
            Self::ElementAddr { base, index } => vec![*base, *index],
            Self::Load { addr } => vec![*addr],
            Self::Store { addr, value } => vec![*addr, *value],
            Self::Add { lhs, rhs } => vec![*lhs, *rhs],
            Self::Call { args, .. } => args.clone(),
        }
    }

    /// Check whether this is a memory write.
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}

/// Block terminator - controls where execution goes next. Targets are block
/// layout indices within the owning function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminator {
    /// Unconditional jump.
    Jump { target: u32 },
    /// Two-way conditional branch; `taken` precedes `fallthrough` in
    /// successor order.
    Branch {
        cond: Value,
        taken: u32,
        fallthrough: u32,
    },
    /// Return to the caller.
    Ret,
    /// Never reached.
    Unreachable,
}

impl Default for Terminator {
    fn default() -> Self {
        Self::Ret
    }
}

impl Terminator {
    /// Successor block indices, in branch order.
    pub fn successors(&self) -> Vec<u32> {
        match self {
            Self::Jump { target } => vec![*target],
            Self::Branch {
                taken, fallthrough, ..
            } => vec![*taken, *fallthrough],
            Self::Ret | Self::Unreachable => Vec::new(),
        }
    }

    /// Check if this terminator leaves the function.
    pub const fn is_exit(&self) -> bool {
        matches!(self, Self::Ret | Self::Unreachable)
    }
}
