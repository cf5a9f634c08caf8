//! Global mark allocator.
//!
//! Folds the per-region slot maps into one dense, collision-free mark space:
//! region *k* starts where region *k-1* ended, empty regions occupy no range
//! and contribute no remap point. The remap points let the runtime translate
//! a raw (region address, local slot) observation back into a global mark by
//! binary-searching the start array.

use rustc_hash::FxHashMap;
use tracing::debug;

use covlink_ir::{BlockRef, GlobalId};

use crate::scanner::RegionCounters;

/// Links a mark-range start to the region it originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemapPoint {
    /// First mark of the region's contiguous range.
    pub start_mark: u64,
    /// The region whose base address anchors the range.
    pub region: GlobalId,
}

/// Result of mark allocation over all regions of a module.
#[derive(Clone, Debug, Default)]
pub struct MarkAllocation {
    /// Merged block-to-mark mapping across all regions.
    pub marks: FxHashMap<BlockRef, u64>,
    /// One point per non-empty region, start marks strictly increasing.
    pub remap: Vec<RemapPoint>,
}

/// Assign global marks to all recognized slots, in region scan order.
pub fn allocate_marks(regions: &[RegionCounters]) -> MarkAllocation {
    let mut allocation = MarkAllocation::default();
    let mut next_start = 0u64;

    for region in regions {
        let count = region.slot_count();
        if count == 0 {
            continue;
        }
        let mut slots: Vec<(u64, BlockRef)> =
            region.slots.iter().map(|(&s, &b)| (s, b)).collect();
        slots.sort_unstable_by_key(|&(slot, _)| slot);
        for (slot, block) in slots {
            // A block owning several slots keeps the first mark, in slot
            // order; a block reached again through a later region likewise.
            allocation.marks.entry(block).or_insert(next_start + slot);
        }
        allocation.remap.push(RemapPoint {
            start_mark: next_start,
            region: region.global,
        });
        debug!(
            start_mark = next_start,
            slots = count,
            "allocated mark range"
        );
        next_start += count;
    }

    allocation
}
