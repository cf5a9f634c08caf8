//! Minimal module IR for the covlink coverage correlation pass.
//!
//! This crate provides just enough of a compiled-module representation for
//! the pass to consume and produce: globals with sections and initializers,
//! functions of basic blocks, the handful of value-producing instructions a
//! counter increment is made of, and a def-use index over them. It carries no
//! knowledge of coverage itself; that lives in `covlink-pass`.

mod builder;
mod instr;
mod module;
mod uses;

pub use builder::*;
pub use instr::*;
pub use module::*;
pub use uses::*;
