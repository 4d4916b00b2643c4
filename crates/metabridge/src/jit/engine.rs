//! Top-level JIT engine: drives a compilation unit from IR to patched code.

use crate::jit::backend::traits::{CodegenBackend, CompiledCode, SymbolResolver};
use crate::jit::backend::StubBackend;
use crate::jit::pipeline::{JitError, JitPipeline};
use crate::jit::unit::CompilationUnit;

/// Configuration for the JIT engine
#[derive(Debug, Clone)]
pub struct JitConfig {
    /// Maximum distinct klasses one unit may reference (default: 1024)
    pub max_klass_constants: usize,
    /// Dump the optimized IR at trace level (default: false)
    pub trace_ir: bool,
    /// Run the optimization passes (default: true)
    pub optimize: bool,
}

impl Default for JitConfig {
    fn default() -> Self {
        JitConfig {
            max_klass_constants: 1024,
            trace_ir: false,
            optimize: true,
        }
    }
}

/// Top-level JIT engine
pub struct JitEngine<B: CodegenBackend = StubBackend> {
    pipeline: JitPipeline<B>,
    config: JitConfig,
}

impl JitEngine<StubBackend> {
    /// Create a new JIT engine with default configuration
    pub fn new() -> Self {
        Self::with_config(JitConfig::default())
    }

    /// Create a new JIT engine with custom configuration
    pub fn with_config(config: JitConfig) -> Self {
        Self::with_backend(StubBackend, config)
    }
}

impl Default for JitEngine<StubBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: CodegenBackend> JitEngine<B> {
    /// Create an engine over a specific backend
    pub fn with_backend(backend: B, config: JitConfig) -> Self {
        let pipeline = JitPipeline::new(backend).with_klass_limit(config.max_klass_constants);
        JitEngine { pipeline, config }
    }

    /// Compile a unit and patch its klass references through `resolver`
    ///
    /// Any error abandons the unit; nothing partially compiled is returned.
    pub fn compile(
        &self,
        unit: &mut CompilationUnit<'_>,
        resolver: &dyn SymbolResolver,
    ) -> Result<CompiledCode, JitError> {
        let span = tracing::debug_span!(
            "jit_compile",
            func = %unit.func().name,
            func_index = unit.func().func_index,
        );
        let _enter = span.enter();

        self.compile_inner(unit, resolver).inspect_err(|e| {
            tracing::error!(error = %e, "compilation unit abandoned");
        })
    }

    fn compile_inner(
        &self,
        unit: &mut CompilationUnit<'_>,
        resolver: &dyn SymbolResolver,
    ) -> Result<CompiledCode, JitError> {
        if let Some(err) = unit.poisoned() {
            return Err(JitError::Handle(err));
        }
        if self.config.optimize {
            self.pipeline.optimize(unit);
        }
        if self.config.trace_ir {
            tracing::trace!(ir = %unit.func(), "optimized IR");
        }

        let mut code = self.pipeline.lower(unit)?;
        self.pipeline
            .backend()
            .finalize(&mut code, unit.klass_pool(), resolver)?;

        tracing::debug!(
            instrs = unit.func().instr_count(),
            klasses = unit.klass_pool().len(),
            code_size = code.code.len(),
            "unit compiled"
        );
        Ok(code)
    }

    /// Get a reference to the compilation pipeline
    pub fn pipeline(&self) -> &JitPipeline<B> {
        &self.pipeline
    }

    /// Get the engine configuration
    pub fn config(&self) -> &JitConfig {
        &self.config
    }
}
