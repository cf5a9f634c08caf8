//! CFG builder.
//!
//! Materializes the serializable graph for every eligible function: every
//! block gets a fresh module-unique identifier and its mark from the merged
//! mapping (sentinel when no counter was correlated), then successor edges
//! are emitted in terminator order. Identifier assignment follows natural
//! layout order, so bit-identical input yields a bit-identical graph.

use rustc_hash::FxHashMap;
use tracing::trace;

use covlink_cfg::{BasicBlock, ControlFlowGraph, NO_MARK};
use covlink_ir::{BlockRef, FuncId, Function, Module};

use crate::INSTRUMENTATION_PREFIX;

/// Module-scoped identifier wells, fresh per pass invocation.
#[derive(Debug, Default)]
struct GraphBuilder {
    next_function_id: u64,
    next_block_id: u64,
}

impl GraphBuilder {
    fn function_id(&mut self) -> u64 {
        let id = self.next_function_id;
        self.next_function_id += 1;
        id
    }

    fn block_id(&mut self) -> u64 {
        let id = self.next_block_id;
        self.next_block_id += 1;
        id
    }

    fn build_function(
        &mut self,
        func: FuncId,
        f: &Function,
        marks: &FxHashMap<BlockRef, u64>,
    ) -> covlink_cfg::Function {
        let ids: Vec<u64> = f.blocks.iter().map(|_| self.block_id()).collect();

        let blocks = f
            .blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                let mark = marks
                    .get(&BlockRef {
                        func,
                        block: i as u32,
                    })
                    .copied()
                    .unwrap_or(NO_MARK);
                let successors = block
                    .terminator
                    .successors()
                    .into_iter()
                    // All blocks are materialized, so every successor should
                    // resolve; skip any that does not.
                    .filter_map(|target| ids.get(target as usize).copied())
                    .collect();
                BasicBlock {
                    id: ids[i],
                    mark,
                    successors,
                }
            })
            .collect();

        let id = self.function_id();
        trace!(function = %f.name, id, blocks = ids.len(), "built function graph");
        covlink_cfg::Function {
            id,
            name: f.name.clone(),
            blocks,
        }
    }
}

/// Build the per-module graph from the merged block-to-mark mapping.
///
/// Declarations and instrumentation-internal functions (the `sancov.` name
/// prefix) are infrastructure, not user code, and are excluded.
pub fn build_graph(module: &Module, marks: &FxHashMap<BlockRef, u64>) -> ControlFlowGraph {
    let mut builder = GraphBuilder::default();
    let functions = module
        .iter_functions()
        .filter(|(_, f)| !f.is_declaration() && !f.name.starts_with(INSTRUMENTATION_PREFIX))
        .map(|(id, f)| builder.build_function(id, f, marks))
        .collect();
    ControlFlowGraph { functions }
}
