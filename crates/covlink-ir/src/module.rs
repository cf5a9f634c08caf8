//! Module, global and function containers.

use crate::instr::{Instr, InstrRef, Terminator};

/// Index of a global within a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId(pub u32);

/// Index of a function within a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

/// A basic block within a specific function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef {
    pub func: FuncId,
    /// Layout index of the block within its function.
    pub block: u32,
}

/// Symbol binding of a global or function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Linkage {
    /// Visible only within this module.
    Private,
    /// Visible to the linker.
    External,
    /// Resolved at link/load time; may be absent.
    ExternalWeak,
}

/// Initializer of a global.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Init {
    /// External declaration, no initializer in this module.
    None,
    /// Zero-initialized array of `len` bytes.
    Zeroed { len: u64 },
    /// Raw byte contents.
    Bytes(Vec<u8>),
    /// Array of 64-bit words.
    Words(Vec<u64>),
    /// Array of pointer-sized address-of relocations.
    Addresses(Vec<GlobalId>),
}

/// A global data object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Global {
    pub name: String,
    /// Object-file section the global is placed in, if any.
    pub section: Option<String>,
    pub linkage: Linkage,
    /// Read-only after load.
    pub constant: bool,
    pub init: Init,
}

/// A basic block: straight-line instructions plus one terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub instrs: Vec<Instr>,
    pub terminator: Terminator,
}

/// A function definition or declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    /// Blocks in layout order; empty for declarations.
    pub blocks: Vec<Block>,
}

impl Function {
    /// Check whether this is a declaration (no body).
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// A static-constructor entry: `func` runs before `main` at `priority`
/// (lower priorities run earlier).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ctor {
    pub priority: u16,
    pub func: FuncId,
}

/// A compiled module: globals, functions and static constructors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
    pub ctors: Vec<Ctor>,
}

impl Module {
    /// Create an empty module.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Append a global, returning its id.
    pub fn add_global(&mut self, global: Global) -> GlobalId {
        let id = GlobalId(u32::try_from(self.globals.len()).unwrap_or(u32::MAX));
        self.globals.push(global);
        id
    }

    /// Append a function, returning its id.
    pub fn add_function(&mut self, function: Function) -> FuncId {
        let id = FuncId(u32::try_from(self.functions.len()).unwrap_or(u32::MAX));
        self.functions.push(function);
        id
    }

    /// Append a static-constructor entry.
    pub fn add_ctor(&mut self, priority: u16, func: FuncId) {
        self.ctors.push(Ctor { priority, func });
    }

    /// Get a global by id.
    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[id.0 as usize]
    }

    /// Get a function by id.
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    /// Iterate over globals with their ids, in declaration order.
    pub fn iter_globals(&self) -> impl Iterator<Item = (GlobalId, &Global)> {
        self.globals
            .iter()
            .enumerate()
            .map(|(i, g)| (GlobalId(i as u32), g))
    }

    /// Iterate over functions with their ids, in declaration order.
    pub fn iter_functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncId(i as u32), f))
    }

    /// Find a function by name.
    pub fn function_by_name(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(|i| FuncId(i as u32))
    }

    /// Iterate over globals placed in `section`, in declaration order.
    pub fn globals_in_section<'a>(
        &'a self,
        section: &'a str,
    ) -> impl Iterator<Item = (GlobalId, &'a Global)> {
        self.iter_globals()
            .filter(move |(_, g)| g.section.as_deref() == Some(section))
    }

    /// Resolve an instruction reference within a function.
    pub fn instr(&self, func: FuncId, at: InstrRef) -> &Instr {
        &self.function(func).blocks[at.block as usize].instrs[at.instr as usize]
    }
}
