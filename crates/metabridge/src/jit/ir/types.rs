//! JIT type system
//!
//! Register types for the JIT IR. Klass registers hold a metadata handle
//! and are only ever compared or handed to the backend.

/// JIT IR type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JitType {
    /// NaN-boxed u64 (unknown/polymorphic)
    Value,
    /// Known i32
    I32,
    /// Known boolean
    Bool,
    /// Known heap pointer (object instance)
    Ptr,
    /// Class metadata reference
    Klass,
    /// No value (void return)
    Void,
}

impl std::fmt::Display for JitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JitType::Value => write!(f, "val"),
            JitType::I32 => write!(f, "i32"),
            JitType::Bool => write!(f, "bool"),
            JitType::Ptr => write!(f, "ptr"),
            JitType::Klass => write!(f, "klass"),
            JitType::Void => write!(f, "void"),
        }
    }
}
