//! Class registry for managing runtime class metadata

use rustc_hash::FxHashMap;

use crate::jit::backend::traits::{RuntimeHelper, SymbolResolver};
use crate::jit::handle::MetadataHandle;
use crate::vm::mirror::ClassMirror;
use crate::vm::object::Class;

/// Class registry for the VM
///
/// Owns every native class record and the single mirror created for each.
/// Mirrors borrowed out of the registry stay at a fixed address for as long
/// as the borrow lasts, which is what makes handle identity stable.
#[derive(Debug)]
pub struct ClassRegistry {
    /// Classes indexed by ID
    classes: Vec<Class>,
    /// Mirrors indexed by class ID
    mirrors: Vec<ClassMirror>,
    /// Class name to ID mapping (latest registration wins)
    name_to_id: FxHashMap<String, usize>,
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
            mirrors: Vec::new(),
            name_to_id: FxHashMap::default(),
        }
    }

    /// Register a new class and create its mirror
    ///
    /// The class is assigned the next free ID regardless of the ID it was
    /// built with.
    pub fn register_class(&mut self, mut class: Class) -> usize {
        let id = self.classes.len();
        class.id = id;

        self.mirrors.push(ClassMirror::new(id, class.name.clone()));
        self.name_to_id.insert(class.name.clone(), id);
        self.classes.push(class);

        id
    }

    /// Get class by ID
    pub fn get_class(&self, id: usize) -> Option<&Class> {
        self.classes.get(id)
    }

    /// Get class by name
    pub fn get_class_by_name(&self, name: &str) -> Option<&Class> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.classes.get(*id))
    }

    /// Get the mirror standing in for a class
    pub fn mirror(&self, id: usize) -> Option<&ClassMirror> {
        self.mirrors.get(id)
    }

    /// Get the mirror for a class by name
    pub fn mirror_by_name(&self, name: &str) -> Option<&ClassMirror> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.mirrors.get(*id))
    }

    /// Map a handle back to the class record it refers to
    ///
    /// Returns None when the handle's mirror was not created by this registry.
    pub fn resolve(&self, handle: &MetadataHandle<'_>) -> Option<&Class> {
        let mirror = handle.proxy();
        let id = mirror.class_id();
        let own = self.mirrors.get(id)?;
        if std::ptr::eq(own, mirror) {
            self.classes.get(id)
        } else {
            None
        }
    }

    /// Get next available class ID
    pub fn next_class_id(&self) -> usize {
        self.classes.len()
    }

    /// Iterate over all classes with their IDs
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Class)> {
        self.classes.iter().enumerate()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolResolver for ClassRegistry {
    fn resolve_runtime_helper(&self, _helper: RuntimeHelper) -> Option<usize> {
        None
    }

    fn resolve_jit_function(&self, _func_index: u32) -> Option<usize> {
        None
    }

    fn resolve_klass(&self, klass: &MetadataHandle<'_>) -> Option<usize> {
        self.resolve(klass).map(|class| class as *const Class as usize)
    }
}
