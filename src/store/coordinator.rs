//! Exclusive access to the frame store
//!
//! Exactly one task operates on the store at a time. [`AccessCoordinator::acquire`]
//! waits for the store and returns a [`StoreGuard`]; the store is handed back
//! when the guard is dropped, on every exit path including `?` and panics.
//! Waiters are served in no particular guaranteed order.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repository::FrameStore;

/// Hands out exclusive access to a single store instance
pub struct AccessCoordinator<S = FrameStore> {
    store: Arc<Mutex<S>>,
}

impl<S> Clone for AccessCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Send + 'static> AccessCoordinator<S> {
    /// Take ownership of the store
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Wait until the store is free and take it
    pub async fn acquire(&self) -> StoreGuard<S> {
        let inner = Arc::clone(&self.store).lock_owned().await;
        StoreGuard {
            inner,
            acquired_at: Instant::now(),
        }
    }

    /// Take the store only if nobody holds it
    pub fn try_acquire(&self) -> Option<StoreGuard<S>> {
        Arc::clone(&self.store)
            .try_lock_owned()
            .ok()
            .map(|inner| StoreGuard {
                inner,
                acquired_at: Instant::now(),
            })
    }

    /// Hand the store back
    ///
    /// Equivalent to dropping the guard.
    pub fn release(guard: StoreGuard<S>) {
        drop(guard);
    }
}

/// Exclusive hold on the store, released on drop
pub struct StoreGuard<S = FrameStore> {
    inner: OwnedMutexGuard<S>,
    acquired_at: Instant,
}

impl<S> Deref for StoreGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S> DerefMut for StoreGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S> Drop for StoreGuard<S> {
    fn drop(&mut self) {
        tracing::trace!(
            held_us = self.acquired_at.elapsed().as_micros() as u64,
            "Store released"
        );
    }
}
