//! Compilation units
//!
//! A `CompilationUnit` is the owner of every metadata handle produced while
//! compiling one function. It borrows the class registry for the duration of
//! the compilation, so neither the unit nor any handle it hands out can
//! survive the registry. Dropping the unit drops the IR, the klass constant
//! pool, and the per-class cache in one go.

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::jit::handle::{HandleError, MetadataHandle};
use crate::jit::ir::builder::JitBuilder;
use crate::jit::ir::instr::{JitBlockId, JitFunction};
use crate::vm::class_registry::ClassRegistry;

/// Klass constants referenced by a compiled function, deduplicated by identity
#[derive(Debug, Default)]
pub struct KlassPool<'rt> {
    entries: Vec<MetadataHandle<'rt>>,
    index: FxHashMap<MetadataHandle<'rt>, u32>,
}

impl<'rt> KlassPool<'rt> {
    /// Create an empty pool
    pub fn new() -> Self {
        KlassPool {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Add a klass to the pool, returning its slot
    ///
    /// Interning the same klass twice returns the same slot.
    pub fn intern(&mut self, klass: MetadataHandle<'rt>) -> u32 {
        if let Some(&slot) = self.index.get(&klass) {
            return slot;
        }
        let slot = self.entries.len() as u32;
        self.entries.push(klass);
        self.index.insert(klass, slot);
        slot
    }

    /// Get the klass stored in a slot
    pub fn get(&self, slot: u32) -> Option<MetadataHandle<'rt>> {
        self.entries.get(slot as usize).copied()
    }

    /// Find the slot of a klass already in the pool
    pub fn index_of(&self, klass: &MetadataHandle<'rt>) -> Option<u32> {
        self.index.get(klass).copied()
    }

    /// Number of distinct klasses
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over klasses in slot order
    pub fn iter(&self) -> impl Iterator<Item = MetadataHandle<'rt>> + '_ {
        self.entries.iter().copied()
    }
}

/// Thread-safe per-class cache keyed by metadata handle
///
/// Used for per-class code paths (e.g. the block specialized for a receiver
/// klass). Lookups from several compiler threads take a shared lock.
pub struct KlassCache<'rt, V> {
    entries: RwLock<FxHashMap<MetadataHandle<'rt>, V>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<'rt, V: Clone> KlassCache<'rt, V> {
    /// Create an empty cache
    pub fn new() -> Self {
        KlassCache {
            entries: RwLock::new(FxHashMap::default()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Look up the entry for a klass
    pub fn get(&self, klass: &MetadataHandle<'rt>) -> Option<V> {
        let found = self.entries.read().get(klass).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Return the entry for a klass, creating it with `make` if missing
    ///
    /// When two threads race on the same klass, the first insertion wins and
    /// both get its value.
    pub fn get_or_insert_with(&self, klass: MetadataHandle<'rt>, make: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&klass) {
            return value;
        }
        let mut entries = self.entries.write();
        entries.entry(klass).or_insert_with(make).clone()
    }

    /// Whether the cache holds an entry for a klass
    pub fn contains(&self, klass: &MetadataHandle<'rt>) -> bool {
        self.entries.read().contains_key(klass)
    }

    /// Drop the entry for a klass; returns whether one existed
    pub fn invalidate(&self, klass: &MetadataHandle<'rt>) -> bool {
        self.entries.write().remove(klass).is_some()
    }

    /// Number of cached klasses
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// (hits, misses) counted by `get`
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

impl<V: Clone> Default for KlassCache<'_, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the compiler holds while compiling one function
///
/// A failed handle construction poisons the unit: the first
/// `HandleError` is kept and every later compilation of the unit reports it.
pub struct CompilationUnit<'rt> {
    registry: &'rt ClassRegistry,
    func: JitFunction<'rt>,
    klasses: KlassPool<'rt>,
    klass_paths: KlassCache<'rt, JitBlockId>,
    poisoned: Cell<Option<HandleError>>,
}

impl<'rt> CompilationUnit<'rt> {
    /// Start a unit for one function, with its entry block already created
    pub fn new(
        registry: &'rt ClassRegistry,
        func_index: u32,
        name: String,
        param_count: usize,
        local_count: usize,
    ) -> Self {
        let mut func = JitFunction::new(func_index, name, param_count, local_count);
        func.entry = func.add_block();
        CompilationUnit {
            registry,
            func,
            klasses: KlassPool::new(),
            klass_paths: KlassCache::new(),
            poisoned: Cell::new(None),
        }
    }

    /// Handle for a class by ID, built from the registry's mirror
    ///
    /// An unknown ID leaves no mirror to build from and fails with
    /// `HandleError::InvalidProxy` naming the caller. The failure also
    /// poisons the unit.
    #[track_caller]
    pub fn klass(&self, class_id: usize) -> Result<MetadataHandle<'rt>, HandleError> {
        let handle = MetadataHandle::from_proxy(self.registry.mirror(class_id));
        self.record(handle)
    }

    /// Handle for a class by fully qualified name
    #[track_caller]
    pub fn klass_by_name(&self, name: &str) -> Result<MetadataHandle<'rt>, HandleError> {
        let handle = MetadataHandle::from_proxy(self.registry.mirror_by_name(name));
        self.record(handle)
    }

    fn record(
        &self,
        handle: Result<MetadataHandle<'rt>, HandleError>,
    ) -> Result<MetadataHandle<'rt>, HandleError> {
        if let Err(err) = handle {
            if self.poisoned.get().is_none() {
                self.poisoned.set(Some(err));
            }
        }
        handle
    }

    /// The first handle error raised in this unit, if any
    pub fn poisoned(&self) -> Option<HandleError> {
        self.poisoned.get()
    }

    /// Builder emitting into the function's entry block
    pub fn builder(&mut self) -> JitBuilder<'_, 'rt> {
        JitBuilder::new(&mut self.func)
    }

    /// Add every klass the function references to the constant pool
    ///
    /// Returns the pool size afterwards.
    pub fn intern_referenced_klasses(&mut self) -> usize {
        for klass in self.func.klass_refs() {
            self.klasses.intern(klass);
        }
        self.klasses.len()
    }

    /// The registry this unit compiles against
    pub fn registry(&self) -> &'rt ClassRegistry {
        self.registry
    }

    /// The function being compiled
    pub fn func(&self) -> &JitFunction<'rt> {
        &self.func
    }

    /// The function being compiled, mutably
    pub fn func_mut(&mut self) -> &mut JitFunction<'rt> {
        &mut self.func
    }

    /// The klass constant pool
    pub fn klass_pool(&self) -> &KlassPool<'rt> {
        &self.klasses
    }

    /// Per-class code paths (klass → specialized block)
    pub fn klass_paths(&self) -> &KlassCache<'rt, JitBlockId> {
        &self.klass_paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jit::ir::instr::JitTerminator;
    use crate::vm::object::Class;

    fn registry() -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        registry.register_class(Class::new(0, "example.Widget".to_string(), 2));
        registry.register_class(Class::new(0, "example.Gadget".to_string(), 1));
        registry
    }

    #[test]
    fn test_pool_dedup() {
        let registry = registry();
        let widget = MetadataHandle::new(registry.mirror(0).unwrap());
        let gadget = MetadataHandle::new(registry.mirror(1).unwrap());

        let mut pool = KlassPool::new();
        assert_eq!(pool.intern(widget), 0);
        assert_eq!(pool.intern(gadget), 1);
        assert_eq!(pool.intern(MetadataHandle::new(registry.mirror(0).unwrap())), 0);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(1), Some(gadget));
        assert_eq!(pool.get(2), None);
        assert_eq!(pool.index_of(&gadget), Some(1));
    }

    #[test]
    fn test_unit_klass_lookup() {
        let registry = registry();
        let unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);

        let by_id = unit.klass(0).unwrap();
        let by_name = unit.klass_by_name("example.Widget").unwrap();
        assert_eq!(by_id, by_name);
        assert_ne!(by_id, unit.klass(1).unwrap());
    }

    #[test]
    fn test_unit_unknown_class_is_invalid_proxy() {
        let registry = registry();
        let unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);

        let line = line!() + 1;
        let HandleError::InvalidProxy { site } = unit.klass(42).unwrap_err();
        assert_eq!(site.file(), file!());
        assert_eq!(site.line(), line);

        assert!(unit.klass_by_name("example.Missing").is_err());
    }

    #[test]
    fn test_unit_keeps_first_invalid_proxy() {
        let registry = registry();
        let unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);
        assert_eq!(unit.poisoned(), None);

        unit.klass(0).unwrap();
        assert_eq!(unit.poisoned(), None);

        let first = unit.klass(42).unwrap_err();
        unit.klass_by_name("example.Missing").unwrap_err();
        unit.klass(1).unwrap();
        assert_eq!(unit.poisoned(), Some(first));
    }

    #[test]
    fn test_intern_referenced_klasses() {
        let registry = registry();
        let mut unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);
        let widget = unit.klass(0).unwrap();
        let gadget = unit.klass(1).unwrap();

        let mut builder = unit.builder();
        let a = builder.new_object(widget);
        builder.instance_of(a, gadget);
        builder.const_klass(widget);
        builder.terminate(JitTerminator::Return(Some(a)));

        assert_eq!(unit.intern_referenced_klasses(), 2);
        assert_eq!(unit.klass_pool().index_of(&widget), Some(0));
        assert_eq!(unit.klass_pool().index_of(&gadget), Some(1));
    }

    #[test]
    fn test_klass_cache() {
        let registry = registry();
        let unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);
        let widget = unit.klass(0).unwrap();
        let paths = unit.klass_paths();

        assert_eq!(paths.get(&widget), None);
        assert_eq!(paths.get_or_insert_with(widget, || JitBlockId(3)), JitBlockId(3));
        let again = unit.klass(0).unwrap();
        assert_eq!(paths.get_or_insert_with(again, || JitBlockId(9)), JitBlockId(3));
        assert_eq!(paths.len(), 1);
        assert!(paths.contains(&widget));

        assert!(paths.invalidate(&widget));
        assert!(!paths.invalidate(&widget));
        assert!(paths.is_empty());

        let (hits, misses) = paths.stats();
        assert_eq!(hits, 1);
        assert_eq!(misses, 2);
    }

    #[test]
    fn test_klass_cache_shared_across_threads() {
        let registry = registry();
        let unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);
        let widget = unit.klass(0).unwrap();
        let gadget = unit.klass(1).unwrap();
        let paths = unit.klass_paths();

        std::thread::scope(|s| {
            for i in 0..4u32 {
                s.spawn(move || {
                    let klass = if i % 2 == 0 { widget } else { gadget };
                    paths.get_or_insert_with(klass, || JitBlockId(i));
                });
            }
        });

        assert_eq!(paths.len(), 2);
    }
}
