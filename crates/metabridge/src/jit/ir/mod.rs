//! JIT IR: SSA-form intermediate representation carrying klass references

pub mod types;
pub mod instr;
pub mod builder;
pub mod display;

pub use builder::JitBuilder;
pub use types::JitType;
pub use instr::{Reg, JitBlockId, JitInstr, JitTerminator, JitBlock, JitFunction};
