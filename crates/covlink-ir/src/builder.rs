//! Function builder fluent API.

use thiserror::Error;

use crate::instr::{Instr, InstrRef, Terminator, Value};
use crate::module::{Block, FuncId, Function, Linkage, Module};

/// Errors from finishing a built function.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BuildError {
    #[error("function {func} has no blocks")]
    Empty { func: String },
    #[error("block {block} of function {func} targets out-of-range block {target}")]
    BadTarget {
        func: String,
        block: usize,
        target: u32,
    },
}

/// Builder for a function body, appended to a module on `finish`.
///
/// Blocks are created up front with [`add_block`](Self::add_block) so
/// forward branches can name their targets, then filled one at a time after
/// [`select`](Self::select). A freshly added block terminates with `Ret`
/// until a terminator is set.
pub struct FunctionBuilder {
    name: String,
    linkage: Linkage,
    blocks: Vec<Block>,
    current: usize,
}

impl FunctionBuilder {
    /// Create a builder for an externally visible function.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            linkage: Linkage::External,
            blocks: Vec::new(),
            current: 0,
        }
    }

    /// Set the function's linkage.
    #[must_use]
    pub const fn linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Append a new empty block, returning its layout index.
    pub fn add_block(&mut self) -> u32 {
        self.blocks.push(Block {
            instrs: Vec::new(),
            terminator: Terminator::default(),
        });
        (self.blocks.len() - 1) as u32
    }

    /// Make `block` the insertion point for subsequent instructions.
    pub fn select(&mut self, block: u32) {
        self.current = block as usize;
    }

    fn push(&mut self, instr: Instr) -> Value {
        let at = InstrRef {
            block: self.current as u32,
            instr: self.blocks[self.current].instrs.len() as u32,
        };
        self.blocks[self.current].instrs.push(instr);
        Value::Instr(at)
    }

    /// Emit an element-address computation.
    pub fn element_addr(&mut self, base: Value, index: Value) -> Value {
        self.push(Instr::ElementAddr { base, index })
    }

    /// Emit a load.
    pub fn load(&mut self, addr: Value) -> Value {
        self.push(Instr::Load { addr })
    }

    /// Emit a store.
    pub fn store(&mut self, addr: Value, value: Value) {
        self.push(Instr::Store { addr, value });
    }

    /// Emit an addition.
    pub fn add(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push(Instr::Add { lhs, rhs })
    }

    /// Emit a direct call.
    pub fn call(&mut self, callee: FuncId, args: Vec<Value>) -> Value {
        self.push(Instr::Call { callee, args })
    }

    /// Terminate the current block with an unconditional jump.
    pub fn jump(&mut self, target: u32) {
        self.blocks[self.current].terminator = Terminator::Jump { target };
    }

    /// Terminate the current block with a conditional branch.
    pub fn branch(&mut self, cond: Value, taken: u32, fallthrough: u32) {
        self.blocks[self.current].terminator = Terminator::Branch {
            cond,
            taken,
            fallthrough,
        };
    }

    /// Terminate the current block with a return.
    pub fn ret(&mut self) {
        self.blocks[self.current].terminator = Terminator::Ret;
    }

    /// Mark the current block as unreachable.
    pub fn unreachable(&mut self) {
        self.blocks[self.current].terminator = Terminator::Unreachable;
    }

    /// Validate terminator targets and append the function to `module`.
    pub fn finish(self, module: &mut Module) -> Result<FuncId, BuildError> {
        if self.blocks.is_empty() {
            return Err(BuildError::Empty { func: self.name });
        }
        let count = self.blocks.len() as u32;
        for (i, block) in self.blocks.iter().enumerate() {
            if let Some(target) = block
                .terminator
                .successors()
                .into_iter()
                .find(|&t| t >= count)
            {
                return Err(BuildError::BadTarget {
                    func: self.name.clone(),
                    block: i,
                    target,
                });
            }
        }
        Ok(module.add_function(Function {
            name: self.name,
            linkage: self.linkage,
            blocks: self.blocks,
        }))
    }
}
