//! JIT side of the bridge
//!
//! This module provides everything the compiler needs to carry class
//! metadata references from IR construction to native code:
//! - Opaque metadata handles (identity-only references to klass records)
//! - JIT IR (SSA form intermediate representation)
//! - Compilation units owning handles, klass constant pools, and per-class caches
//! - Optimization passes that merge and fold klass references
//! - Backend trait for pluggable code generation and relocation patching

pub mod handle;
pub mod ir;
pub mod unit;
pub mod pipeline;
pub mod backend;

mod engine;
pub use engine::{JitConfig, JitEngine};
pub use handle::{HandleError, MetadataHandle};
pub use pipeline::JitError;
pub use unit::{CompilationUnit, KlassCache, KlassPool};
