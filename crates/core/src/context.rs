//! Explicit per-call-chain context
//!
//! A [`CallContext`] carries headers that should be forwarded on every
//! request issued as part of one logical call chain (for example an
//! incoming `Authorization` header a server wants to pass downstream).
//! Clones share state: work started with a clone of the context observes
//! headers injected later, while calls made with a different context do not.

use crate::headers::HeaderSet;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Context threaded through a chain of client calls
#[derive(Debug, Clone)]
pub struct CallContext {
    id: Uuid,
    forward_headers: Arc<RwLock<HeaderSet>>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    /// Start a new, empty call chain
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            forward_headers: Arc::new(RwLock::new(HeaderSet::new())),
        }
    }

    /// Identifier of this call chain, used for log correlation
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Forward `key: val` on every request made within this chain
    pub fn set_forward_header(&self, key: impl Into<String>, val: impl Into<String>) -> &Self {
        self.forward_headers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key, val);
        self
    }

    /// Snapshot of the forwarded headers
    #[must_use]
    pub fn forward_headers(&self) -> HeaderSet {
        self.forward_headers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
