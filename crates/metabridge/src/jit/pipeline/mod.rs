//! Compilation pipeline: JIT IR → optimized IR → backend
//!
//! The pipeline chains together the compiler-side stages of a unit:
//! 1. Run optimization passes (merging and folding klass references)
//! 2. Intern every surviving klass reference into the unit's constant pool
//! 3. Lower to backend (stub or native codegen)

pub mod optimize;

use crate::jit::backend::traits::{CodegenBackend, CodegenError, CompiledCode, ModuleContext};
use crate::jit::handle::HandleError;
use crate::jit::unit::CompilationUnit;
use self::optimize::JitOptimizer;

/// Errors from the compilation pipeline
///
/// Every variant abandons the compilation unit that produced it.
#[derive(Debug, thiserror::Error)]
pub enum JitError {
    /// A handle in the unit was built from an absent proxy
    #[error("Handle error: {0}")]
    Handle(#[from] HandleError),
    /// The backend failed to generate or patch code
    #[error("Codegen error: {0}")]
    Codegen(#[from] CodegenError),
    /// The unit references more distinct klasses than allowed
    #[error("Too many klass constants (limit {limit})")]
    TooManyKlassConstants {
        /// Configured maximum
        limit: usize,
    },
}

/// Complete JIT compilation pipeline
///
/// Chains: optimize → intern klasses → backend.compile_function()
pub struct JitPipeline<B: CodegenBackend> {
    backend: B,
    optimizer: JitOptimizer,
    klass_limit: usize,
}

impl<B: CodegenBackend> JitPipeline<B> {
    /// Create a new pipeline with the default optimizer
    pub fn new(backend: B) -> Self {
        JitPipeline {
            backend,
            optimizer: JitOptimizer::new(),
            klass_limit: usize::MAX,
        }
    }

    /// Create a pipeline with a custom optimizer
    pub fn with_optimizer(backend: B, optimizer: JitOptimizer) -> Self {
        JitPipeline {
            backend,
            optimizer,
            klass_limit: usize::MAX,
        }
    }

    /// Cap the number of distinct klasses one unit may reference
    pub fn with_klass_limit(mut self, limit: usize) -> Self {
        self.klass_limit = limit;
        self
    }

    /// Run the optimizer over the unit's function
    pub fn optimize(&self, unit: &mut CompilationUnit<'_>) {
        self.optimizer.optimize(unit.func_mut());
    }

    /// Intern klass references and generate code, without optimizing
    ///
    /// A poisoned unit is rejected with the handle error that poisoned it.
    pub fn lower(&self, unit: &mut CompilationUnit<'_>) -> Result<CompiledCode, JitError> {
        if let Some(err) = unit.poisoned() {
            return Err(JitError::Handle(err));
        }

        let klass_count = unit.intern_referenced_klasses();
        if klass_count > self.klass_limit {
            return Err(JitError::TooManyKlassConstants { limit: self.klass_limit });
        }

        let ctx = ModuleContext {
            func_index: unit.func().func_index,
            klasses: unit.klass_pool(),
        };
        let code = self.backend.compile_function(unit.func(), &ctx)?;
        tracing::debug!(
            backend = self.backend.name(),
            klasses = klass_count,
            code_size = code.code.len(),
            relocations = code.relocations.len(),
            "unit lowered"
        );
        Ok(code)
    }

    /// Compile a unit through the full pipeline
    pub fn compile(&self, unit: &mut CompilationUnit<'_>) -> Result<CompiledCode, JitError> {
        self.optimize(unit);
        self.lower(unit)
    }

    /// Get a reference to the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get a reference to the optimizer
    pub fn optimizer(&self) -> &JitOptimizer {
        &self.optimizer
    }
}
