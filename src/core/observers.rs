//! Named callbacks fired when a quote refresh completes.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Thread-safe registry of zero-argument callbacks keyed by name. Registering
/// under an existing name replaces the previous callback.
#[derive(Default)]
pub struct ObserverRegistry {
    callbacks: RwLock<HashMap<String, Callback>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, callback: impl Fn() + Send + Sync + 'static) {
        let name = name.into();
        debug!("Registering observer {}", name);
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::new(callback));
    }

    /// Returns whether an observer with this name was registered.
    pub fn remove(&self, name: &str) -> bool {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every registered callback once. The registry lock is released
    /// before the first call, so callbacks may register, remove or trigger
    /// lookups themselves.
    pub fn notify_all(&self) {
        let callbacks: Vec<Callback> = self
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback();
        }
    }
}
