//! Runtime side of the bridge
//!
//! Native class records live here, together with the mirrors the runtime
//! hands to the compiler in their place.

pub mod class_registry;
pub mod mirror;
pub mod object;

pub use class_registry::ClassRegistry;
pub use mirror::ClassMirror;
pub use object::{Class, VTable};
