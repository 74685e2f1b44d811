//! `RestrictedSlot` distinguishes "replace the slot" (breaks aliasing)
//! from "mutate in place" (preserves aliasing) for node-visible `inputs`.
//!
//! Design Notes ("Mutable `inputs` aliasing"): the scheduler relies on
//! consumer-side `inputs` retaining stable reference identity between
//! steps, because intra-process edges alias the producer's output buffer
//! directly. User `step_fn` code only ever gets a borrow of the contained
//! value (mutate in place); only the node runtime, via
//! [`RestrictedSlot::rebind`], may swap the underlying allocation when an
//! inter-process/inter-host edge delivers a freshly deserialized buffer.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

#[derive(Debug)]
pub struct RestrictedSlot<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Clone for RestrictedSlot<T> {
    fn clone(&self) -> Self {
        self.alias()
    }
}

impl<T> RestrictedSlot<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Borrow the contained value. Available to user `step_fn` code.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    /// Mutably borrow the contained value in place. Available to user
    /// `step_fn` code; does not break aliasing because the allocation
    /// itself is untouched.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }

    /// Returns a new handle sharing the same backing allocation. This is
    /// how an intra-process edge aliases a producer's output buffer onto
    /// a consumer's input slot with no copy.
    pub fn alias(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }

    /// Only the node runtime calls this: replace the slot's value wholesale
    /// (used when an inter-process/inter-host edge delivers a freshly
    /// deserialized buffer that cannot alias anything).
    pub fn rebind(&self, value: T) {
        *self.inner.write() = value;
    }
}

impl<T: Clone> RestrictedSlot<T> {
    pub fn get_cloned(&self) -> T {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_shares_identity_across_steps() {
        let producer = RestrictedSlot::new(0i32);
        let consumer = producer.alias();

        *producer.write() = 42;
        assert_eq!(*consumer.read(), 42);
    }

    #[test]
    fn rebind_replaces_value_without_new_alias() {
        let slot = RestrictedSlot::new(String::from("a"));
        let alias = slot.alias();
        slot.rebind("b".to_string());
        assert_eq!(*alias.read(), "b");
    }
}
