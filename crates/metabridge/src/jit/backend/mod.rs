//! Backend-agnostic code generation traits and implementations

pub mod traits;
pub mod stub;

pub use traits::{
    CodegenBackend, CodegenError, CompiledCode, ModuleContext, Relocation,
    RelocationTarget, RuntimeHelper, SymbolResolver, TargetArch, TargetInfo,
};
pub use stub::StubBackend;
