//! Counter-region scanner.
//!
//! Recovers the slot-to-block mapping of every counter region by walking the
//! uses of each region global. The only recognized increment idiom is the
//! one the instrumentation stage guarantees: an element address with a
//! statically known constant index that feeds a store. Every other use (a
//! bare load, a non-constant index, the address flowing somewhere else) is
//! not a coverage increment and is ignored.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use covlink_ir::{BlockRef, GlobalId, Instr, Module, UseIndex, Value};

use crate::COUNTER_SECTION;

/// One counter region and its recovered slot ownership.
#[derive(Clone, Debug)]
pub struct RegionCounters {
    /// The region's data object.
    pub global: GlobalId,
    /// Local slot index to the block whose execution increments it.
    pub slots: FxHashMap<u64, BlockRef>,
}

impl RegionCounters {
    /// Number of slots this region occupies in the mark space: one past the
    /// highest recognized slot, 0 when no increment was recognized.
    pub fn slot_count(&self) -> u64 {
        self.slots.keys().max().map_or(0, |&max| max + 1)
    }
}

/// Scan a module for counter regions, in declaration order.
pub fn scan_regions(module: &Module) -> Vec<RegionCounters> {
    let uses = UseIndex::build(module);
    let regions: Vec<RegionCounters> = module
        .globals_in_section(COUNTER_SECTION)
        .map(|(id, _)| scan_region(module, &uses, id))
        .collect();
    debug!(
        module = %module.name,
        regions = regions.len(),
        "scanned counter regions"
    );
    regions
}

/// Recover the slot-to-block mapping of one region.
///
/// The use index enumerates sites in module layout order, so when a slot is
/// written from more than one block the write latest in layout order wins,
/// deterministically.
fn scan_region(module: &Module, uses: &UseIndex, region: GlobalId) -> RegionCounters {
    let mut slots = FxHashMap::default();

    for site in uses.uses_of_global(region) {
        let Instr::ElementAddr {
            base: Value::Global(base),
            index: Value::Const(slot),
        } = *module.instr(site.func, site.instr_ref())
        else {
            continue;
        };
        if base != region {
            // The region appeared as the index operand of someone else's
            // address computation; not an increment.
            continue;
        }

        for user in uses.uses_of_value(site.func, site.instr_ref()) {
            let Instr::Store {
                addr: Value::Instr(addr),
                ..
            } = *module.instr(user.func, user.instr_ref())
            else {
                continue;
            };
            if addr != site.instr_ref() {
                // The address is the stored value, not the destination.
                continue;
            }
            let owner = BlockRef {
                func: user.func,
                block: user.block,
            };
            trace!(region = %module.global(region).name, slot, ?owner, "slot write");
            slots.insert(slot, owner);
        }
    }

    debug!(
        region = %module.global(region).name,
        slots = slots.len(),
        "recognized counter region"
    );
    RegionCounters {
        global: region,
        slots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covlink_ir::{FunctionBuilder, Global, Init, Linkage};

    fn counter_global(module: &mut Module, name: &str, len: u64) -> GlobalId {
        module.add_global(Global {
            name: name.to_string(),
            section: Some(COUNTER_SECTION.to_string()),
            linkage: Linkage::Private,
            constant: false,
            init: Init::Zeroed { len },
        })
    }

    fn increment(fb: &mut FunctionBuilder, region: GlobalId, slot: u64) {
        let addr = fb.element_addr(Value::Global(region), Value::Const(slot));
        let loaded = fb.load(addr);
        let bumped = fb.add(loaded, Value::Const(1));
        fb.store(addr, bumped);
    }

    #[test]
    fn test_recognizes_increment_pattern() {
        let mut module = Module::new("m");
        let region = counter_global(&mut module, "cntrs", 2);

        let mut fb = FunctionBuilder::new("f");
        let entry = fb.add_block();
        let next = fb.add_block();
        fb.select(entry);
        increment(&mut fb, region, 0);
        fb.jump(next);
        fb.select(next);
        increment(&mut fb, region, 1);
        fb.ret();
        let func = fb.finish(&mut module).unwrap();

        let regions = scan_regions(&module);
        assert_eq!(regions.len(), 1);
        let slots = &regions[0].slots;
        assert_eq!(regions[0].slot_count(), 2);
        assert_eq!(slots[&0], BlockRef { func, block: 0 });
        assert_eq!(slots[&1], BlockRef { func, block: 1 });
    }

    #[test]
    fn test_ignores_non_constant_index() {
        let mut module = Module::new("m");
        let region = counter_global(&mut module, "cntrs", 4);

        let mut fb = FunctionBuilder::new("f");
        let entry = fb.add_block();
        fb.select(entry);
        let addr = fb.element_addr(Value::Global(region), Value::Arg(0));
        fb.store(addr, Value::Const(1));
        fb.ret();
        fb.finish(&mut module).unwrap();

        let regions = scan_regions(&module);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].slots.is_empty());
        assert_eq!(regions[0].slot_count(), 0);
    }

    #[test]
    fn test_ignores_read_only_uses() {
        let mut module = Module::new("m");
        let region = counter_global(&mut module, "cntrs", 4);

        let mut fb = FunctionBuilder::new("f");
        let entry = fb.add_block();
        fb.select(entry);
        let addr = fb.element_addr(Value::Global(region), Value::Const(2));
        let _observed = fb.load(addr);
        fb.ret();
        fb.finish(&mut module).unwrap();

        let regions = scan_regions(&module);
        assert!(regions[0].slots.is_empty());
    }

    #[test]
    fn test_ignores_address_stored_as_value() {
        let mut module = Module::new("m");
        let region = counter_global(&mut module, "cntrs", 4);

        let mut fb = FunctionBuilder::new("f");
        let entry = fb.add_block();
        fb.select(entry);
        let addr = fb.element_addr(Value::Global(region), Value::Const(3));
        // Spill the address itself somewhere; the region slot is not written.
        fb.store(Value::Const(0x2000), addr);
        fb.ret();
        fb.finish(&mut module).unwrap();

        let regions = scan_regions(&module);
        assert!(regions[0].slots.is_empty());
    }

    #[test]
    fn test_last_writer_in_layout_order_wins() {
        let mut module = Module::new("m");
        let region = counter_global(&mut module, "cntrs", 1);

        let mut fb = FunctionBuilder::new("f");
        let entry = fb.add_block();
        let late = fb.add_block();
        fb.select(entry);
        increment(&mut fb, region, 0);
        fb.jump(late);
        fb.select(late);
        increment(&mut fb, region, 0);
        fb.ret();
        let func = fb.finish(&mut module).unwrap();

        let regions = scan_regions(&module);
        assert_eq!(regions[0].slots[&0], BlockRef { func, block: 1 });
    }

    #[test]
    fn test_non_section_global_is_not_a_region() {
        let mut module = Module::new("m");
        let plain = module.add_global(Global {
            name: "table".to_string(),
            section: None,
            linkage: Linkage::Private,
            constant: false,
            init: Init::Zeroed { len: 16 },
        });

        let mut fb = FunctionBuilder::new("f");
        let entry = fb.add_block();
        fb.select(entry);
        increment(&mut fb, plain, 0);
        fb.ret();
        fb.finish(&mut module).unwrap();

        assert!(scan_regions(&module).is_empty());
    }
}
