//! Metabridge
//!
//! This crate lets a JIT compiler name VM class metadata without touching it:
//! - **VM**: native class records, their managed mirrors, and the class registry (`vm` module)
//! - **JIT**: opaque metadata handles, SSA IR, optimization passes, and the codegen
//!   seam (`jit` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use metabridge::{Class, ClassRegistry, CompilationUnit, JitEngine};
//!
//! let mut registry = ClassRegistry::new();
//! let widget = registry.register_class(Class::new(0, "example.Widget".to_string(), 2));
//!
//! let mut unit = CompilationUnit::new(&registry, 0, "make_widget".to_string(), 0, 0);
//! let klass = unit.klass(widget)?;
//! let mut builder = unit.builder();
//! let obj = builder.new_object(klass);
//! builder.terminate(JitTerminator::Return(Some(obj)));
//!
//! let engine = JitEngine::new();
//! let code = engine.compile(&mut unit, &registry)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// VM module: class records, mirrors, and the class registry
pub mod vm;

/// JIT module: metadata handles, IR, pipeline, and backends
pub mod jit;

// ============================================================================
// Re-exports
// ============================================================================

pub use vm::{Class, ClassMirror, ClassRegistry, VTable};

pub use jit::{
    // Handles
    HandleError, MetadataHandle,
    // Compilation units
    CompilationUnit, KlassCache, KlassPool,
    // Engine
    JitConfig, JitEngine, JitError,
};
