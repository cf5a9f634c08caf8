//! Coverage-to-CFG correlation pass.
//!
//! Runs once per compiled module, after the coverage instrumentation stage
//! has placed 8-bit counter arrays in [`COUNTER_SECTION`]:
//!
//! 1. [`scan_regions`] recovers, from the counter-increment code patterns,
//!    which basic block owns each counter slot of each region.
//! 2. [`allocate_marks`] folds the per-region slots into one dense
//!    module-wide mark space and records a remap point per non-empty region.
//! 3. [`build_graph`] walks every eligible function and builds the
//!    block/edge/mark graph with fresh module-unique identifiers.
//! 4. The graph is encoded with `covlink-cfg` and [`register_module`] embeds
//!    the blob plus the remap tables into the module, together with a static
//!    constructor that hands everything to the runtime entry point
//!    [`INIT_FUNC_NAME`] at load time.
//!
//! The pass is total: uncorrelated blocks get the sentinel mark, a module
//! with no counter regions (or one already carrying the constructor) is left
//! untouched and reported as [`Outcome::Unchanged`].

mod graph;
mod marks;
mod registrar;
mod scanner;

pub use graph::build_graph;
pub use marks::{MarkAllocation, RemapPoint, allocate_marks};
pub use registrar::{
    PAYLOAD_GLOBAL_NAME, REMAP_ADDRS_GLOBAL_NAME, REMAP_STARTS_GLOBAL_NAME, register_module,
};
pub use scanner::{RegionCounters, scan_regions};

use thiserror::Error;
use tracing::debug;

use covlink_ir::Module;

/// Section the instrumentation stage places counter arrays in.
pub const COUNTER_SECTION: &str = "__sancov_cntrs";

/// Name prefix of instrumentation-internal functions, excluded from the
/// graph.
pub const INSTRUMENTATION_PREFIX: &str = "sancov.";

/// Weakly-bound runtime entry point called by the injected constructor.
///
/// Signature, in argument order: CFG blob pointer and byte length; remap
/// start-mark array pointer and element count; remap region-address array
/// pointer (same element count); base address of this module's primary
/// counter region. The runtime must tolerate one call per loaded module, in
/// load order, possibly concurrently.
pub const INIT_FUNC_NAME: &str = "__covlink_module_init";

/// Name of the injected constructor; its presence marks a module as already
/// processed.
pub const CTOR_FUNC_NAME: &str = "covlink.module_ctor";

/// Constructor priority: after allocator/runtime setup, before most user
/// static initializers.
pub const CTOR_PRIORITY: u16 = 573;

/// Whether the pass modified the module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Changed,
    Unchanged,
}

/// Pass errors. Analysis itself is total; only emitting the blob and the
/// constructor can fail.
#[derive(Error, Debug)]
pub enum PassError {
    #[error("CFG blob encoding failed: {0}")]
    Encode(#[from] covlink_cfg::EncodeError),
    #[error("constructor emission failed: {0}")]
    Emit(#[from] covlink_ir::BuildError),
}

pub type Result<T> = std::result::Result<T, PassError>;

/// Run the pass over one module.
pub fn run(module: &mut Module) -> Result<Outcome> {
    if module.function_by_name(CTOR_FUNC_NAME).is_some() {
        debug!(module = %module.name, "already instrumented, skipping");
        return Ok(Outcome::Unchanged);
    }

    let regions = scan_regions(module);
    if regions.is_empty() {
        debug!(module = %module.name, "no counter regions, skipping");
        return Ok(Outcome::Unchanged);
    }
    let primary_region = regions[0].global;

    let allocation = allocate_marks(&regions);
    let cfg = build_graph(module, &allocation.marks);
    let blob = covlink_cfg::encode(&cfg)?;

    register_module(module, &blob, &allocation.remap, primary_region)?;
    debug!(
        module = %module.name,
        functions = cfg.functions.len(),
        blocks = cfg.block_count(),
        regions = allocation.remap.len(),
        blob_bytes = blob.len(),
        "registered module graph"
    );
    Ok(Outcome::Changed)
}
