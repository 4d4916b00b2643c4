//! Opaque metadata handles
//!
//! A `MetadataHandle` is how JIT IR names a native class record. It borrows
//! the class's `ClassMirror` and nothing else: IR code can copy it, compare it,
//! hash it, and print it, but there is no path from a handle to the record's
//! fields, vtable, or address. Mapping a handle back to the record is done by
//! the runtime (`ClassRegistry::resolve`) at code emission time.
//!
//! Equality is identity of the mirror. Two mirrors that happen to carry the
//! same name (the same class loaded twice) produce unequal handles.
//!
//! The borrowed lifetime keeps a handle from outliving the registry that owns
//! its mirror, and also keeps it out of `dyn Any`, so it cannot be
//! type-tested or downcast.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;

use crate::vm::mirror::ClassMirror;

/// Error raised when building a metadata handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    /// No mirror was supplied for the handle.
    ///
    /// This is a bug at the construction site, not a condition to retry: the
    /// compilation unit that hit it is abandoned.
    #[error("Invalid proxy: metadata handle constructed without a class mirror at {site}")]
    InvalidProxy {
        /// Source location that passed the absent mirror
        site: &'static Location<'static>,
    },
}

/// Opaque reference to a native class record
#[derive(Clone, Copy)]
pub struct MetadataHandle<'rt> {
    proxy: &'rt ClassMirror,
}

impl<'rt> MetadataHandle<'rt> {
    /// Create a handle for the class a mirror stands in for
    pub fn new(proxy: &'rt ClassMirror) -> Self {
        tracing::trace!(klass = proxy.name(), "metadata handle created");
        MetadataHandle { proxy }
    }

    /// Create a handle from a mirror lookup that may have come back empty
    ///
    /// An absent mirror yields `HandleError::InvalidProxy` carrying the
    /// caller's location.
    #[track_caller]
    pub fn from_proxy(proxy: Option<&'rt ClassMirror>) -> Result<Self, HandleError> {
        match proxy {
            Some(proxy) => Ok(Self::new(proxy)),
            None => {
                let site = Location::caller();
                tracing::error!(%site, "metadata handle constructed from an absent proxy");
                Err(HandleError::InvalidProxy { site })
            }
        }
    }

    /// Whether both handles refer to the identical mirror
    pub fn equals(&self, other: &MetadataHandle<'_>) -> bool {
        std::ptr::eq(self.proxy, other.proxy)
    }

    /// Diagnostic text for logs and IR dumps, e.g. `klass<example.Widget>`
    pub fn describe(&self) -> String {
        self.to_string()
    }

    pub(crate) fn proxy(&self) -> &'rt ClassMirror {
        self.proxy
    }
}

impl PartialEq for MetadataHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for MetadataHandle<'_> {}

impl Hash for MetadataHandle<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.proxy, state);
    }
}

// Debug output carries the name only, never the mirror's address.
impl fmt::Debug for MetadataHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MetadataHandle").field(&self.proxy.name()).finish()
    }
}

impl fmt::Display for MetadataHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "klass<{}>", self.proxy.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn mirror(name: &str) -> ClassMirror {
        ClassMirror::new(0, name.to_string())
    }

    #[test]
    fn test_describe_contains_name() {
        let widget = mirror("example.Widget");
        let handle = MetadataHandle::new(&widget);
        assert!(handle.describe().contains("example.Widget"));
        assert!(handle.describe().contains(widget.name()));
    }

    #[test]
    fn test_describe_empty_name() {
        let anon = mirror("");
        assert_eq!(MetadataHandle::new(&anon).describe(), "klass<>");
    }

    #[test]
    fn test_identity_equality() {
        let widget = mirror("example.Widget");
        let a = MetadataHandle::new(&widget);
        let b = MetadataHandle::new(&widget);

        assert!(a.equals(&a));
        assert!(a.equals(&b));
        assert!(b.equals(&a));
        assert_eq!(a, b);
    }

    #[test]
    fn test_equal_names_distinct_mirrors() {
        let first = mirror("example.Widget");
        let second = mirror("example.Widget");
        let a = MetadataHandle::new(&first);
        let b = MetadataHandle::new(&second);

        assert_eq!(a.describe(), b.describe());
        assert!(!a.equals(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_transitive_equality() {
        let widget = mirror("example.Widget");
        let a = MetadataHandle::new(&widget);
        let b = a;
        let c = MetadataHandle::from_proxy(Some(&widget)).unwrap();

        assert!(a == b && b == c);
        assert!(a == c);
    }

    #[test]
    fn test_absent_proxy_rejected() {
        let line = line!() + 1;
        let err = MetadataHandle::from_proxy(None).unwrap_err();

        let HandleError::InvalidProxy { site } = err;
        assert_eq!(site.file(), file!());
        assert_eq!(site.line(), line);
        assert!(err.to_string().contains("Invalid proxy"));
    }

    #[test]
    fn test_handles_as_map_keys() {
        let widget = mirror("example.Widget");
        let gadget = mirror("example.Gadget");

        let mut map: FxHashMap<MetadataHandle<'_>, u32> = FxHashMap::default();
        map.insert(MetadataHandle::new(&widget), 1);
        map.insert(MetadataHandle::new(&widget), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&MetadataHandle::new(&widget)], 2);

        map.insert(MetadataHandle::new(&gadget), 3);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_debug_hides_address() {
        let widget = mirror("example.Widget");
        let debug = format!("{:?}", MetadataHandle::new(&widget));
        assert_eq!(debug, "MetadataHandle(\"example.Widget\")");
        assert!(!debug.contains("0x"));
    }

    #[test]
    fn test_handle_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MetadataHandle<'_>>();
    }
}
