//! Serialized control-flow-graph model for the covlink pass.
//!
//! These are the wire-facing types: the compiler side encodes one
//! [`ControlFlowGraph`] per module into a byte blob embedded in the binary,
//! and the fuzzing runtime decodes it at module-load time. Both sides agree
//! on the layout through [`encode`] and [`decode`].

mod codec;

pub use codec::*;

use serde::{Deserialize, Serialize};

/// Mark value of a basic block with no correlated coverage counter.
pub const NO_MARK: u64 = u64::MAX;

/// A basic block node: module-unique id, coverage mark (or [`NO_MARK`]),
/// and successor block ids in branch order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: u64,
    pub mark: u64,
    pub successors: Vec<u64>,
}

impl BasicBlock {
    /// Create a block with no successors.
    pub const fn new(id: u64, mark: u64) -> Self {
        Self {
            id,
            mark,
            successors: Vec::new(),
        }
    }

    /// Check whether a coverage counter was correlated to this block.
    pub const fn is_instrumented(&self) -> bool {
        self.mark != NO_MARK
    }
}

/// A function node: module-unique id, symbol name, and blocks in layout
/// order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub id: u64,
    pub name: String,
    pub blocks: Vec<BasicBlock>,
}

/// The full per-module graph, discarded by the compiler once encoded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    pub functions: Vec<Function>,
}

impl ControlFlowGraph {
    /// Total number of blocks across all functions.
    pub fn block_count(&self) -> usize {
        self.functions.iter().map(|f| f.blocks.len()).sum()
    }
}
