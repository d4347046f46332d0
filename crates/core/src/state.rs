//! Late-bound state shared between a client and its integrator
//!
//! A [`StateProvider`] hands out a value that may be:
//! - fixed at construction,
//! - recomputed from a provider closure on every access, or
//! - pushed in later through [`StateProvider::update`].
//!
//! Backends use it to expose request headers, so an auth token obtained
//! after the client was built can still reach every request.

use std::fmt;
use std::sync::{Arc, RwLock};

type Provider<T> = Arc<dyn Fn() -> T + Send + Sync>;
type UpdateCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Shared, late-bound state
pub struct StateProvider<T> {
    state: Arc<RwLock<T>>,
    provider: Option<Provider<T>>,
    on_update: Option<UpdateCallback<T>>,
}

impl<T> Clone for StateProvider<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            provider: self.provider.clone(),
            on_update: self.on_update.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> StateProvider<T> {
    /// Static state
    pub fn new(state: T) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            provider: None,
            on_update: None,
        }
    }

    /// State recomputed from `provider` on every access
    pub fn from_fn(initial: T, provider: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            provider: Some(Arc::new(provider)),
            ..Self::new(initial)
        }
    }

    /// Register a callback invoked with every pushed update
    #[must_use]
    pub fn on_update(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Arc::new(callback));
        self
    }

    /// Replace the current state and notify the update callback
    pub fn update(&self, state: T) {
        {
            let mut guard = self
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard = state.clone();
        }
        if let Some(callback) = &self.on_update {
            callback(&state);
        }
    }

    /// Current value, recomputed first when a provider is set
    pub fn value(&self) -> T {
        if let Some(provider) = &self.provider {
            let fresh = provider();
            let mut guard = self
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard = fresh.clone();
            return fresh;
        }
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for StateProvider<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for StateProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateProvider")
            .field("state", &self.state)
            .field("has_provider", &self.provider.is_some())
            .field("has_update_callback", &self.on_update.is_some())
            .finish()
    }
}
