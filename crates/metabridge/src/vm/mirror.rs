//! Class mirrors
//!
//! A mirror is the managed value the runtime gives the compiler in place of a
//! native class record. It knows the class's name and, privately, which record
//! it stands for. Mirrors are created only by the `ClassRegistry`, one per
//! registered class, and are never cloned: a mirror's address is its identity.

/// Managed proxy for a registered class
#[derive(Debug)]
pub struct ClassMirror {
    class_id: usize,
    name: String,
}

impl ClassMirror {
    pub(crate) fn new(class_id: usize, name: String) -> Self {
        ClassMirror { class_id, name }
    }

    /// Fully qualified name of the mirrored class
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn class_id(&self) -> usize {
        self.class_id
    }
}
