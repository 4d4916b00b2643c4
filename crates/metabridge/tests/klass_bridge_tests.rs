//! End-to-end klass handle tests
//!
//! Builds IR against a registry, compiles it through the engine with the
//! stub backend, and checks what reaches the patched code.
//! Run with: cargo test -p metabridge --test klass_bridge_tests

use metabridge::jit::backend::RelocationTarget;
use metabridge::jit::ir::{JitInstr, JitTerminator};
use metabridge::{
    Class, ClassRegistry, CompilationUnit, HandleError, JitConfig, JitEngine, JitError,
    MetadataHandle,
};
use rustc_hash::FxHashMap;

fn widget_registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry.register_class(Class::new(0, "example.Widget".to_string(), 2));
    registry.register_class(Class::new(0, "example.Gadget".to_string(), 1));
    registry
}

fn patched_slots(code: &metabridge::jit::backend::CompiledCode) -> Vec<u64> {
    code.relocations
        .iter()
        .filter(|r| matches!(r.target, RelocationTarget::Klass(_)))
        .map(|r| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&code.code[r.code_offset..r.code_offset + 8]);
            u64::from_le_bytes(bytes)
        })
        .collect()
}

// =============================================================================
// HANDLES
// =============================================================================

mod handles {
    use super::*;

    #[test]
    fn test_widget_description() {
        let registry = widget_registry();
        let unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);
        let widget = unit.klass_by_name("example.Widget").unwrap();
        assert!(widget.describe().contains("example.Widget"));
    }

    #[test]
    fn test_same_proxy_single_map_entry() {
        let registry = widget_registry();
        let mirror = registry.mirror(0).unwrap();

        let mut map = FxHashMap::default();
        map.insert(MetadataHandle::new(mirror), "first");
        map.insert(MetadataHandle::new(mirror), "second");
        assert_eq!(map.len(), 1);
        assert_eq!(map[&MetadataHandle::new(mirror)], "second");
    }

    #[test]
    fn test_reloaded_class_is_distinct() {
        let mut registry = widget_registry();
        let reloaded = registry.register_class(Class::new(0, "example.Widget".to_string(), 3));

        let unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);
        let old = unit.klass(0).unwrap();
        let new = unit.klass(reloaded).unwrap();

        assert_eq!(old.describe(), new.describe());
        assert_ne!(old, new);
        assert_eq!(unit.klass_by_name("example.Widget").unwrap(), new);
    }

    #[test]
    fn test_invalid_proxy_names_this_file() {
        let registry = widget_registry();
        let unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);

        let HandleError::InvalidProxy { site } = unit.klass(99).unwrap_err();
        assert!(site.file().ends_with("klass_bridge_tests.rs"));
    }

    #[test]
    fn test_handles_shared_across_threads() {
        let registry = widget_registry();
        let unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);
        let widget = unit.klass(0).unwrap();
        let gadget = unit.klass(1).unwrap();

        let descriptions: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    s.spawn(move || {
                        let klass = if i % 2 == 0 { widget } else { gadget };
                        assert_eq!(klass == widget, i % 2 == 0);
                        klass.describe()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(descriptions[0], "klass<example.Widget>");
        assert_eq!(descriptions[1], "klass<example.Gadget>");
    }
}

// =============================================================================
// COMPILATION
// =============================================================================

mod compilation {
    use super::*;

    #[test]
    fn test_registry_addresses_patched() {
        let registry = widget_registry();
        let mut unit = CompilationUnit::new(&registry, 0, "make_pair".to_string(), 0, 0);
        let widget = unit.klass(0).unwrap();
        let gadget = unit.klass(1).unwrap();

        let mut builder = unit.builder();
        let w = builder.new_object(widget);
        let g = builder.new_object(gadget);
        builder.store_local(0, g);
        builder.terminate(JitTerminator::Return(Some(w)));

        let code = JitEngine::new().compile(&mut unit, &registry).unwrap();

        let widget_addr = registry.get_class(0).unwrap() as *const Class as u64;
        let gadget_addr = registry.get_class(1).unwrap() as *const Class as u64;
        assert_eq!(patched_slots(&code), vec![widget_addr, gadget_addr]);
    }

    #[test]
    fn test_repeated_klass_shares_pool_slot() {
        let registry = widget_registry();
        let mut unit = CompilationUnit::new(&registry, 0, "make_two".to_string(), 0, 0);
        let widget = unit.klass(0).unwrap();

        let mut builder = unit.builder();
        let a = builder.new_object(widget);
        let b = builder.new_object(unit_klass(&registry));
        builder.store_local(0, a);
        builder.terminate(JitTerminator::Return(Some(b)));

        let code = JitEngine::new().compile(&mut unit, &registry).unwrap();
        assert_eq!(unit.klass_pool().len(), 1);
        assert_eq!(code.klass_slots().collect::<Vec<_>>(), vec![0, 0]);
    }

    fn unit_klass(registry: &ClassRegistry) -> MetadataHandle<'_> {
        MetadataHandle::new(registry.mirror(0).unwrap())
    }

    #[test]
    fn test_exact_instanceof_folded_away() {
        let registry = widget_registry();
        let mut unit = CompilationUnit::new(&registry, 0, "is_widget".to_string(), 0, 0);
        let widget = unit.klass(0).unwrap();

        let mut builder = unit.builder();
        let obj = builder.new_object(widget);
        let test = builder.instance_of(obj, widget);
        builder.terminate(JitTerminator::Return(Some(test)));

        JitEngine::new().compile(&mut unit, &registry).unwrap();

        let instrs = &unit.func().blocks[0].instrs;
        assert!(instrs.iter().all(|i| !matches!(i, JitInstr::InstanceOf { .. })));
        assert!(instrs.iter().any(|i| matches!(i, JitInstr::ConstBool { value: true, .. })));
    }

    #[test]
    fn test_mismatched_instanceof_kept() {
        let registry = widget_registry();
        let mut unit = CompilationUnit::new(&registry, 0, "is_gadget".to_string(), 0, 0);
        let widget = unit.klass(0).unwrap();
        let gadget = unit.klass(1).unwrap();

        let mut builder = unit.builder();
        let obj = builder.new_object(widget);
        let test = builder.instance_of(obj, gadget);
        builder.terminate(JitTerminator::Return(Some(test)));

        JitEngine::new().compile(&mut unit, &registry).unwrap();

        let dump = unit.func().to_string();
        assert!(dump.contains("instanceof r0, klass<example.Gadget>"));
        assert!(!dump.contains("0x"));
    }

    #[test]
    fn test_foreign_registry_abandons_unit() {
        let runtime = widget_registry();
        let other = widget_registry();
        let mut unit = CompilationUnit::new(&other, 0, "f".to_string(), 0, 0);
        let widget = unit.klass(0).unwrap();

        let mut builder = unit.builder();
        let obj = builder.new_object(widget);
        builder.terminate(JitTerminator::Return(Some(obj)));

        let err = JitEngine::new().compile(&mut unit, &runtime).unwrap_err();
        assert!(matches!(err, JitError::Codegen(_)));
    }

    #[test]
    fn test_invalid_proxy_abandons_unit() {
        let registry = widget_registry();
        let mut unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);
        let line = line!() + 1;
        assert!(unit.klass(42).is_err());

        // The rest of the unit is well formed
        let widget = unit.klass(0).unwrap();
        let mut builder = unit.builder();
        let obj = builder.new_object(widget);
        builder.terminate(JitTerminator::Return(Some(obj)));

        match JitEngine::new().compile(&mut unit, &registry) {
            Err(JitError::Handle(HandleError::InvalidProxy { site })) => {
                assert!(site.file().ends_with("klass_bridge_tests.rs"));
                assert_eq!(site.line(), line);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("unit with an invalid proxy compiled"),
        }
    }

    #[test]
    fn test_klass_limit_from_config() {
        let registry = widget_registry();
        let mut unit = CompilationUnit::new(&registry, 0, "f".to_string(), 0, 0);
        let widget = unit.klass(0).unwrap();
        let gadget = unit.klass(1).unwrap();

        let mut builder = unit.builder();
        let a = builder.new_object(widget);
        builder.check_cast(a, gadget);
        builder.terminate(JitTerminator::Return(Some(a)));

        let engine = JitEngine::with_config(JitConfig {
            max_klass_constants: 1,
            ..Default::default()
        });
        let err = engine.compile(&mut unit, &registry).unwrap_err();
        assert_eq!(err.to_string(), "Too many klass constants (limit 1)");
    }
}
