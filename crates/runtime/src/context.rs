//! Type-erased, thread-safe context carrier threaded through the agent loop.
//!
//! The carrier holds at most one caller-owned value. It is opaque to the loop
//! itself — only tools and hooks interpret the payload, and it is never sent
//! to the model.

use std::any::{Any, TypeId};
use std::sync::{Arc, RwLock};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("context carrier is empty")]
    NoContext,
    #[error("context carrier holds `{stored}`, requested `{requested}`")]
    ContextTypeMismatch {
        stored: &'static str,
        requested: &'static str,
    },
}

struct Slot {
    type_id: TypeId,
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

/// A shared, read-mostly holder for one caller-provided value of any type.
///
/// Cloning a `ContextCarrier` is cheap and shares the same underlying slot —
/// all clones observe the same value (`Arc<RwLock<_>>` semantics).
#[derive(Clone)]
pub struct ContextCarrier {
    slot: Arc<RwLock<Option<Slot>>>,
}

impl ContextCarrier {
    /// The well-known empty carrier. Tools receiving it must tolerate it —
    /// either degrade gracefully or report [`ContextError::NoContext`].
    pub fn empty() -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
        }
    }

    /// Wrap a caller-owned value as the carrier's payload.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        let carrier = Self::empty();
        carrier.set(value);
        carrier
    }

    /// Replace the carried value under an exclusive lock.
    pub fn set<T: Send + Sync + 'static>(&self, value: T) {
        let mut guard = self.slot.write().expect("context carrier lock poisoned");
        *guard = Some(Slot {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        });
    }

    /// Recover the carried value as `T` under a shared lock, cloning it out.
    ///
    /// Reports [`ContextError::NoContext`] if the carrier is empty, and
    /// [`ContextError::ContextTypeMismatch`] if it holds a different type.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Result<T, ContextError> {
        let guard = self.slot.read().expect("context carrier lock poisoned");
        match guard.as_ref() {
            None => Err(ContextError::NoContext),
            Some(slot) if slot.type_id == TypeId::of::<T>() => Ok(slot
                .value
                .downcast_ref::<T>()
                .expect("type_id matched but downcast failed")
                .clone()),
            Some(slot) => Err(ContextError::ContextTypeMismatch {
                stored: slot.type_name,
                requested: std::any::type_name::<T>(),
            }),
        }
    }

    /// The human-readable name of the carried type, if any.
    pub fn type_tag(&self) -> Option<&'static str> {
        self.slot
            .read()
            .expect("context carrier lock poisoned")
            .as_ref()
            .map(|slot| slot.type_name)
    }

    pub fn is_empty(&self) -> bool {
        self.slot.read().expect("context carrier lock poisoned").is_none()
    }
}

impl Default for ContextCarrier {
    fn default() -> Self {
        Self::empty()
    }
}
