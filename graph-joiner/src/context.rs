//! Caller supplied data threaded through one resolution.

use std::any::Any;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

/// A trait for types that can be stored in the context.
/// Any type that is Clone, Send, Sync and 'static can be stored in the context.
pub trait ContextValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> ContextValue for T {}

/// A thread-safe context that stores values by type.
///
/// The engine never reads the context: it hands the same context to every
/// immediate-fetch and select adapter call made while resolving one request,
/// so adapters can share a session or transaction handle.
///
/// Values are cloned when retrieved. For types that are expensive to clone,
/// or that must be shared (a database session), wrap them in an `Arc` before
/// storing them:
///
/// ```rust
/// use std::sync::Arc;
/// use graph_joiner::Context;
///
/// let context = Context::new();
/// context.insert(Arc::new(String::from("session")));
/// let session = context.get::<Arc<String>>();
/// ```
#[derive(Clone, Default)]
pub struct Context {
    entries: Arc<DashMap<TypeId, Arc<dyn Any + Send + Sync + 'static>>>,
}

impl Context {
    /// Creates a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a value from the context by type.
    pub fn get<T: ContextValue>(&self) -> Option<T> {
        let entry = self.entries.get(&TypeId::of::<T>())?;
        let value: &(dyn Any + Send + Sync) = entry.value().as_ref();
        value.downcast_ref::<T>().cloned()
    }

    /// Returns true if a value of this type is stored.
    pub fn contains<T: ContextValue>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Inserts a value into the context.
    /// If a value of the same type already exists, it is overwritten.
    pub fn insert<T: ContextValue>(&self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Removes a value from the context.
    pub fn remove<T: ContextValue>(&self) {
        self.entries.remove(&TypeId::of::<T>());
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[derive(Debug, PartialEq, Clone)]
    struct Session {
        name: String,
    }

    #[test]
    fn test_basic_operations() {
        let context = Context::new();

        context.insert(42);
        context.insert("hello".to_string());

        assert_eq!(context.get::<i32>(), Some(42));
        assert_eq!(context.get::<String>(), Some("hello".to_string()));

        context.remove::<i32>();
        assert!(context.get::<i32>().is_none());
        assert!(!context.contains::<i32>());
        assert_eq!(context.get::<String>(), Some("hello".to_string()));
    }

    #[test]
    fn test_clones_share_entries() {
        let context = Context::new();
        let session = Arc::new(Session {
            name: "primary".to_string(),
        });
        let cloned = context.clone();
        cloned.insert(session.clone());

        let retrieved = context.get::<Arc<Session>>().unwrap();
        assert!(Arc::ptr_eq(&session, &retrieved));
    }

    #[test]
    fn test_concurrent_access() {
        let context = Context::new();
        let handles: Vec<_> = (0..8usize)
            .map(|i| {
                let context = context.clone();
                thread::spawn(move || {
                    context.insert(i);
                    context.get::<usize>().is_some()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert!(context.get::<usize>().unwrap() < 8);
    }
}
