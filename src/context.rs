//! Type-keyed context store carrying data between workers.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::WorkflowError;

/// Shared store mapping each type to at most one value of that type.
///
/// Workers hand data to later steps by setting a value; setting the same
/// type again overwrites the previous value. Two logically distinct uses of
/// the same stored type therefore collide; wrap them in newtypes when both
/// must live in the store at once.
///
/// The store is owned by one [`WorkerManager`](crate::WorkerManager) for the
/// lifetime of one task and is never shared across tasks. Access is
/// internally synchronized so a worker's own concurrent sub-operations may
/// read and write safely.
///
/// Reads clone the stored value; wrap large values in `Arc` when cloning is
/// costly.
///
/// # Examples
///
/// ```
/// use itonami::WorkerContext;
///
/// let ctx = WorkerContext::new();
/// ctx.set(42u64);
/// ctx.set("hello".to_string());
///
/// assert_eq!(ctx.get::<u64>(), Some(42));
/// assert_eq!(ctx.get::<String>(), Some("hello".to_string()));
/// assert_eq!(ctx.get::<bool>(), None);
/// ```
#[derive(Default)]
pub struct WorkerContext {
    values: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerContext")
            .field("values", &self.read().len())
            .finish()
    }
}

impl WorkerContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TypeId, Box<dyn Any + Send + Sync>>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, Box<dyn Any + Send + Sync>>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a value, replacing any previous value of the same type.
    pub fn set<T: Any + Send + Sync>(&self, value: T) {
        self.write().insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a clone of the stored value of type `T`, if present.
    pub fn get<T: Any + Send + Sync + Clone>(&self) -> Option<T> {
        self.read()
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Returns the stored value of type `T`, or
    /// [`WorkflowError::ContextNotFound`] when absent.
    pub fn get_ensure<T: Any + Send + Sync + Clone>(&self) -> Result<T, WorkflowError> {
        self.get::<T>().ok_or(WorkflowError::ContextNotFound {
            type_name: std::any::type_name::<T>(),
        })
    }

    /// Returns `true` if a value of type `T` is stored.
    pub fn contains<T: Any>(&self) -> bool {
        self.read().contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns the stored value of type `T`.
    pub fn remove<T: Any + Send + Sync>(&self) -> Option<T> {
        self.write()
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let ctx = WorkerContext::new();
        ctx.set(7i32);
        ctx.set("value".to_string());

        assert_eq!(ctx.get::<i32>(), Some(7));
        assert_eq!(ctx.get::<String>(), Some("value".to_string()));
        assert_eq!(ctx.get::<bool>(), None);
    }

    #[test]
    fn test_set_overwrites_same_type() {
        let ctx = WorkerContext::new();
        ctx.set(1u32);
        ctx.set(2u32);
        assert_eq!(ctx.get::<u32>(), Some(2));
    }

    #[test]
    fn test_get_ensure_missing_value() {
        let ctx = WorkerContext::new();
        let error = ctx.get_ensure::<u64>().unwrap_err();
        match error {
            WorkflowError::ContextNotFound { type_name } => {
                assert!(type_name.contains("u64"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_remove() {
        let ctx = WorkerContext::new();
        ctx.set("gone".to_string());
        assert_eq!(ctx.remove::<String>(), Some("gone".to_string()));
        assert!(!ctx.contains::<String>());
    }
}
