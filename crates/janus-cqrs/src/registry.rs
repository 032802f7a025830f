//! # Handler Registry
//!
//! Maps an executor's type to the dependency bundle it runs with.
//!
//! ## Registration
//! ```text
//! startup                                    serving
//! ───────                                    ───────
//! HandlerRegistry::new()                     Invoker::new(registry, timeout)
//!   .bundle(store)                             (registry frozen, lock-free reads)
//!     .with::<CreateNote>()?  ─┐
//!     .with::<GetNote>()?      ├─ TypeId ──► Arc<NoteStore>
//!     .with::<CreateNote>()?  ─┘  duplicate ──► ConfigError (fatal)
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use janus_core::error::ConfigError;
use tracing::debug;

use crate::executor::Executor;

struct Entry {
    tag: &'static str,
    deps: Arc<dyn Any + Send + Sync>,
}

/// Executor type → dependency bundle.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: HashMap<TypeId, Entry>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `E` with `deps`.
    ///
    /// ## Errors
    /// [`ConfigError::DuplicateRegistration`] if `E` is already registered.
    pub fn register<E: Executor>(&mut self, deps: Arc<E::Deps>) -> Result<&mut Self, ConfigError> {
        let key = TypeId::of::<E>();
        if self.entries.contains_key(&key) {
            return Err(ConfigError::DuplicateRegistration(E::tag().to_string()));
        }
        debug!(executor = E::tag(), "Registering handler");
        self.entries.insert(
            key,
            Entry {
                tag: E::tag(),
                deps,
            },
        );
        Ok(self)
    }

    /// Starts registering several executors that share one bundle.
    pub fn bundle<D: Send + Sync + 'static>(&mut self, deps: Arc<D>) -> Bundle<'_, D> {
        Bundle {
            registry: self,
            deps,
        }
    }

    /// Dependencies registered for `E`.
    pub fn get<E: Executor>(&self) -> Option<Arc<E::Deps>> {
        let entry = self.entries.get(&TypeId::of::<E>())?;
        Arc::clone(&entry.deps).downcast::<E::Deps>().ok()
    }

    pub fn contains<E: Executor>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<E>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tags of every registered executor, sorted.
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.entries.values().map(|e| e.tag).collect();
        tags.sort_unstable();
        tags
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("executors", &self.tags())
            .finish()
    }
}

/// Registers executors against one shared dependency bundle.
pub struct Bundle<'r, D> {
    registry: &'r mut HandlerRegistry,
    deps: Arc<D>,
}

impl<'r, D: Send + Sync + 'static> Bundle<'r, D> {
    pub fn with<E: Executor<Deps = D>>(self) -> Result<Self, ConfigError> {
        self.registry.register::<E>(Arc::clone(&self.deps))?;
        Ok(self)
    }
}
