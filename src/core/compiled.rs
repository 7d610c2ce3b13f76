//! Handler-private compiled state.
//!
//! Handlers turn their config block into whatever precomputed state they
//! want (a resolved item, a nested condition list...) once, at compile time.
//! The engine stores it opaquely and hands it back on every call.

use std::any::Any;
use std::sync::Arc;

use crate::error::{HandlerError, HandlerResult};

/// Opaque, immutable, cheaply cloned compiled data.
#[derive(Clone, Default)]
pub struct CompiledData(Option<Arc<dyn Any + Send + Sync>>);

impl CompiledData {
    /// No compiled data.
    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }

    /// Wrap a handler-specific value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// Whether any data was compiled.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow as `T` if that is what was stored.
    #[must_use]
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|data| data.downcast_ref::<T>())
    }

    /// Borrow as `T`, or fail with a handler error naming `handler`.
    pub fn require<T: Any>(&self, handler: &str) -> HandlerResult<&T> {
        self.get::<T>().ok_or_else(|| HandlerError::CompiledData {
            handler: handler.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }
}

impl std::fmt::Debug for CompiledData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(_) => f.write_str("CompiledData(..)"),
            None => f.write_str("CompiledData(none)"),
        }
    }
}
