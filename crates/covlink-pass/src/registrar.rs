//! Module registrar.
//!
//! Embeds the encoded CFG blob and the remap tables as read-only module
//! constants and injects a private static constructor that hands them to the
//! weakly-bound runtime entry point at load time. Each loaded module carries
//! its own constructor and registers itself independently; aggregating the
//! registrations is the runtime's job.

use covlink_ir::{
    BuildError, Function, FunctionBuilder, Global, GlobalId, Init, Linkage, Module, Value,
};

use crate::marks::RemapPoint;
use crate::{CTOR_FUNC_NAME, CTOR_PRIORITY, INIT_FUNC_NAME};

/// Name of the embedded CFG blob global.
pub const PAYLOAD_GLOBAL_NAME: &str = "__covlink_cfg_payload";

/// Name of the remap start-mark array global.
pub const REMAP_STARTS_GLOBAL_NAME: &str = "__covlink_remap_starts";

/// Name of the remap region-address array global.
pub const REMAP_ADDRS_GLOBAL_NAME: &str = "__covlink_remap_addrs";

fn constant(name: &str, init: Init) -> Global {
    Global {
        name: name.to_string(),
        section: None,
        linkage: Linkage::Private,
        constant: true,
        init,
    }
}

/// Emit the registration constants and the startup routine into `module`.
///
/// `primary_region` is the module's first counter region; its base address
/// lets the runtime tell which physical region a registration corresponds to
/// when the module is loaded dynamically.
pub fn register_module(
    module: &mut Module,
    blob: &[u8],
    remap: &[RemapPoint],
    primary_region: GlobalId,
) -> Result<(), BuildError> {
    let payload = module.add_global(constant(PAYLOAD_GLOBAL_NAME, Init::Bytes(blob.to_vec())));
    let starts = module.add_global(constant(
        REMAP_STARTS_GLOBAL_NAME,
        Init::Words(remap.iter().map(|p| p.start_mark).collect()),
    ));
    let addrs = module.add_global(constant(
        REMAP_ADDRS_GLOBAL_NAME,
        Init::Addresses(remap.iter().map(|p| p.region).collect()),
    ));

    let init = module.add_function(Function {
        name: INIT_FUNC_NAME.to_string(),
        linkage: Linkage::ExternalWeak,
        blocks: Vec::new(),
    });

    let mut fb = FunctionBuilder::new(CTOR_FUNC_NAME).linkage(Linkage::Private);
    let entry = fb.add_block();
    fb.select(entry);
    fb.call(
        init,
        vec![
            Value::Global(payload),
            Value::Const(blob.len() as u64),
            Value::Global(starts),
            Value::Const(remap.len() as u64),
            Value::Global(addrs),
            Value::Global(primary_region),
        ],
    );
    fb.ret();
    let ctor = fb.finish(module)?;
    module.add_ctor(CTOR_PRIORITY, ctor);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use covlink_ir::Instr;

    fn region(module: &mut Module) -> GlobalId {
        module.add_global(Global {
            name: "cntrs".to_string(),
            section: Some(crate::COUNTER_SECTION.to_string()),
            linkage: Linkage::Private,
            constant: false,
            init: Init::Zeroed { len: 3 },
        })
    }

    #[test]
    fn test_emits_parallel_remap_arrays() {
        let mut module = Module::new("m");
        let a = region(&mut module);
        let b = region(&mut module);
        let remap = vec![
            RemapPoint {
                start_mark: 0,
                region: a,
            },
            RemapPoint {
                start_mark: 3,
                region: b,
            },
        ];

        register_module(&mut module, &[1, 2, 3], &remap, a).unwrap();

        let starts = module
            .iter_globals()
            .find(|(_, g)| g.name == REMAP_STARTS_GLOBAL_NAME)
            .map(|(_, g)| g.clone())
            .unwrap();
        assert!(starts.constant);
        assert_eq!(starts.init, Init::Words(vec![0, 3]));

        let addrs = module
            .iter_globals()
            .find(|(_, g)| g.name == REMAP_ADDRS_GLOBAL_NAME)
            .map(|(_, g)| g.clone())
            .unwrap();
        assert_eq!(addrs.init, Init::Addresses(vec![a, b]));
    }

    #[test]
    fn test_ctor_calls_weak_init_with_full_contract() {
        let mut module = Module::new("m");
        let a = region(&mut module);
        let remap = vec![RemapPoint {
            start_mark: 0,
            region: a,
        }];
        let blob = vec![9u8; 17];

        register_module(&mut module, &blob, &remap, a).unwrap();

        let init = module.function_by_name(INIT_FUNC_NAME).unwrap();
        assert_eq!(module.function(init).linkage, Linkage::ExternalWeak);
        assert!(module.function(init).is_declaration());

        let ctor = module.function_by_name(CTOR_FUNC_NAME).unwrap();
        assert_eq!(module.function(ctor).linkage, Linkage::Private);
        assert_eq!(module.ctors.len(), 1);
        assert_eq!(module.ctors[0].priority, CTOR_PRIORITY);
        assert_eq!(module.ctors[0].func, ctor);

        let body = &module.function(ctor).blocks[0];
        let Instr::Call { callee, args } = &body.instrs[0] else {
            panic!("constructor must start with the init call");
        };
        assert_eq!(*callee, init);
        assert_eq!(args[1], Value::Const(17));
        assert_eq!(args[3], Value::Const(1));
        assert_eq!(args[5], Value::Global(a));
    }
}
