//! Shared boot context handed to every initializer, teardown hook and probe.
//!
//! Holds the configuration provider and a typed resource map so that a
//! service initialized in an early phase can publish a handle (a pool, a
//! client) for services in later phases.

use dashmap::DashMap;
use phasegate_config::ConfigProvider;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

type Resource = Arc<dyn Any + Send + Sync>;

/// Cheaply cloneable handle; clones share the same resources.
#[derive(Clone)]
pub struct BootContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    config: Arc<dyn ConfigProvider>,
    typed: DashMap<TypeId, Resource>,
    named: DashMap<String, Resource>,
}

impl BootContext {
    #[must_use]
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                config,
                typed: DashMap::new(),
                named: DashMap::new(),
            }),
        }
    }

    /// Configuration provider
    #[inline]
    #[must_use]
    pub fn config(&self) -> &dyn ConfigProvider {
        self.inner.config.as_ref()
    }

    /// Shared handle to the configuration provider
    #[inline]
    #[must_use]
    pub fn config_arc(&self) -> Arc<dyn ConfigProvider> {
        Arc::clone(&self.inner.config)
    }

    /// Publish a resource keyed by its type, replacing any previous value
    pub fn insert<T: Any + Send + Sync>(&self, value: T) -> Option<Arc<T>> {
        self.inner
            .typed
            .insert(TypeId::of::<T>(), Arc::new(value))
            .and_then(|old| old.downcast::<T>().ok())
    }

    /// Resource of type `T`, if published
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner
            .typed
            .get(&TypeId::of::<T>())
            .and_then(|entry| Arc::clone(entry.value()).downcast::<T>().ok())
    }

    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.inner.typed.contains_key(&TypeId::of::<T>())
    }

    pub fn remove<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner
            .typed
            .remove(&TypeId::of::<T>())
            .and_then(|(_, old)| old.downcast::<T>().ok())
    }

    /// Publish a resource under a name, for several values of one type
    pub fn insert_named<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) {
        self.inner.named.insert(name.into(), Arc::new(value));
    }

    /// Named resource; `None` when absent or of a different type
    #[must_use]
    pub fn get_named<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.inner
            .named
            .get(name)
            .and_then(|entry| Arc::clone(entry.value()).downcast::<T>().ok())
    }

    /// Total number of published resources
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.inner.typed.len() + self.inner.named.len()
    }
}

impl fmt::Debug for BootContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootContext")
            .field("config", &self.inner.config)
            .field("typed_resources", &self.inner.typed.len())
            .field("named_resources", &self.inner.named.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phasegate_config::MapProvider;

    #[derive(Debug, PartialEq)]
    struct Pool {
        size: usize,
    }

    fn ctx() -> BootContext {
        BootContext::new(Arc::new(MapProvider::new().with("DATABASE_URL", "postgres://db")))
    }

    #[test]
    fn typed_resources_are_shared_between_clones() {
        let ctx = ctx();
        let clone = ctx.clone();
        assert!(ctx.insert(Pool { size: 4 }).is_none());

        assert_eq!(clone.get::<Pool>().unwrap().size, 4);
        assert!(clone.contains::<Pool>());
        assert!(clone.get::<String>().is_none());

        let old = ctx.insert(Pool { size: 8 }).unwrap();
        assert_eq!(old.size, 4);
        assert_eq!(ctx.remove::<Pool>().unwrap().size, 8);
        assert!(!ctx.contains::<Pool>());
    }

    #[test]
    fn named_resources_check_type() {
        let ctx = ctx();
        ctx.insert_named("primary", Pool { size: 1 });
        ctx.insert_named("replica", Pool { size: 2 });

        assert_eq!(ctx.get_named::<Pool>("replica").unwrap().size, 2);
        assert!(ctx.get_named::<String>("primary").is_none());
        assert_eq!(ctx.resource_count(), 2);
    }

    #[test]
    fn exposes_config() {
        assert_eq!(ctx().config().get("DATABASE_URL").as_deref(), Some("postgres://db"));
    }
}
