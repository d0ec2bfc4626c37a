//! Worker construction collaborator.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

type BoxedFactory = Box<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>;

/// A type-keyed factory map producing worker instances on demand.
///
/// This is the engine's stand-in for a dependency-injection scope: the only
/// capability required is "resolve an instance of type `T`". Factories are
/// invoked per resolve, so every execution gets a fresh instance.
///
/// # Examples
///
/// ```
/// use itonami::WorkerRegistry;
///
/// #[derive(Debug, PartialEq)]
/// struct FetchWorker {
///     attempts: u32,
/// }
///
/// let mut registry = WorkerRegistry::new();
/// registry.register(|| FetchWorker { attempts: 0 });
///
/// let worker = registry.resolve::<FetchWorker>();
/// assert_eq!(worker, Some(FetchWorker { attempts: 0 }));
/// ```
#[derive(Default)]
pub struct WorkerRegistry {
    factories: HashMap<TypeId, BoxedFactory>,
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("registered", &self.factories.len())
            .finish()
    }
}

impl WorkerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `W`, replacing any previous registration.
    pub fn register<W, F>(&mut self, factory: F)
    where
        W: Any + Send + Sync,
        F: Fn() -> W + Send + Sync + 'static,
    {
        self.factories
            .insert(TypeId::of::<W>(), Box::new(move || Box::new(factory())));
    }

    /// Produces a fresh instance of `W`, or `None` when unregistered.
    pub fn resolve<W: Any>(&self) -> Option<W> {
        let factory = self.factories.get(&TypeId::of::<W>())?;
        factory().downcast::<W>().ok().map(|worker| *worker)
    }

    /// Returns `true` if a factory for `W` is registered.
    pub fn contains<W: Any>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<W>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Sample(u32);

    #[test]
    fn test_register_and_resolve() {
        let mut registry = WorkerRegistry::new();
        registry.register(|| Sample(7));

        assert!(registry.contains::<Sample>());
        assert_eq!(registry.resolve::<Sample>(), Some(Sample(7)));
        // Each resolve produces a fresh instance.
        assert_eq!(registry.resolve::<Sample>(), Some(Sample(7)));
    }

    #[test]
    fn test_resolve_unregistered() {
        let registry = WorkerRegistry::new();
        assert!(!registry.contains::<Sample>());
        assert_eq!(registry.resolve::<Sample>(), None);
    }

    #[test]
    fn test_latest_registration_wins() {
        let mut registry = WorkerRegistry::new();
        registry.register(|| Sample(1));
        registry.register(|| Sample(2));
        assert_eq!(registry.resolve::<Sample>(), Some(Sample(2)));
    }
}
