//! Backend-agnostic code generation traits
//!
//! Defines the `CodegenBackend` trait that pluggable backends implement, along
//! with types for compiled code and relocations. Klass operands never reach
//! the backend as addresses: they arrive as slots in the unit's `KlassPool`
//! and are patched in by `finalize` through the runtime's `SymbolResolver`.

use crate::jit::handle::MetadataHandle;
use crate::jit::ir::instr::JitFunction;
use crate::jit::unit::KlassPool;

/// Target architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetArch {
    /// x86-64
    X86_64,
    /// 64-bit ARM
    AArch64,
}

/// Target information
#[derive(Debug, Clone)]
pub struct TargetInfo {
    /// Architecture code is generated for
    pub arch: TargetArch,
}

/// Error during code generation
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// Backend-internal failure
    #[error("Backend error: {0}")]
    BackendError(String),
    /// A klass the runtime could not map to a record (carries its description)
    #[error("Unresolved klass: {0}")]
    UnresolvedKlass(String),
    /// A helper or function address the runtime could not supply
    #[error("Unresolved symbol: {0}")]
    UnresolvedSymbol(String),
}

/// A relocation target for code patching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationTarget {
    /// Pointer to a runtime helper function
    RuntimeHelper(RuntimeHelper),
    /// Pointer to another JIT-compiled function
    JitFunction(u32),
    /// Address of a native class record, by slot in the unit's klass pool
    Klass(u32),
}

/// A relocation entry (address to patch after code is placed in memory)
#[derive(Debug, Clone)]
pub struct Relocation {
    /// Offset in the generated code where the relocation applies
    pub code_offset: usize,
    /// What address to patch in
    pub target: RelocationTarget,
}

/// Well-known runtime helper functions that JIT code calls via trampolines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeHelper {
    /// GC safepoint poll
    SafepointPoll,
}

/// Resolver for symbol addresses at finalization time
///
/// Implemented by the runtime. `resolve_klass` is the only way a handle is
/// turned back into the record it names.
pub trait SymbolResolver {
    /// Address of a runtime helper
    fn resolve_runtime_helper(&self, helper: RuntimeHelper) -> Option<usize>;
    /// Entry address of another compiled function
    fn resolve_jit_function(&self, func_index: u32) -> Option<usize>;
    /// Address of the class record a handle names, if this runtime owns it
    fn resolve_klass(&self, klass: &MetadataHandle<'_>) -> Option<usize>;
}

/// Context information about the unit being compiled
pub struct ModuleContext<'a, 'rt> {
    /// Function index being compiled
    pub func_index: u32,
    /// Klass constants the function may reference
    pub klasses: &'a KlassPool<'rt>,
}

/// Compiled machine code (needs relocation patching before it can run)
#[derive(Debug)]
pub struct CompiledCode {
    /// Raw machine code bytes
    pub code: Vec<u8>,
    /// Offset of the function entry point within code
    pub entry_offset: usize,
    /// Relocations to patch
    pub relocations: Vec<Relocation>,
}

impl CompiledCode {
    /// Slots in the klass pool referenced by relocations, in code order
    pub fn klass_slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.relocations.iter().filter_map(|r| match r.target {
            RelocationTarget::Klass(slot) => Some(slot),
            _ => None,
        })
    }
}

/// The backend-agnostic code generation trait
///
/// The compilation pipeline is:
///   JitFunction → compile_function() → CompiledCode → finalize() → patched CompiledCode
pub trait CodegenBackend: Send + Sync {
    /// Backend name (for diagnostics)
    fn name(&self) -> &str;

    /// Compile a JIT IR function to machine code
    fn compile_function(
        &self,
        func: &JitFunction<'_>,
        ctx: &ModuleContext<'_, '_>,
    ) -> Result<CompiledCode, CodegenError>;

    /// Apply relocations in place
    fn finalize(
        &self,
        code: &mut CompiledCode,
        klasses: &KlassPool<'_>,
        resolver: &dyn SymbolResolver,
    ) -> Result<(), CodegenError>;

    /// Return target architecture information
    fn target_info(&self) -> TargetInfo;
}
