// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Thread-safe handle around a [`Dispatcher`].

use crate::error::Result;
use crate::io::{Dispatcher, OperationKind, Transmission};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable, lock-protected dispatcher.
///
/// Every call holds the lock for its whole duration, so transmissions
/// received on different threads are still processed one at a time.
/// Handlers get `&mut Dispatcher` directly and must not lock the same
/// handle again.
#[derive(Debug, Clone, Default)]
pub struct SharedDispatcher {
    inner: Arc<Mutex<Dispatcher>>,
}

impl SharedDispatcher {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            inner: Arc::new(Mutex::new(dispatcher)),
        }
    }

    /// Dispatch under the lock.
    pub fn dispatch(&self, transmission: &Transmission) -> Result<OperationKind> {
        self.inner.lock().dispatch(transmission)
    }

    /// Exclusive access for registration or inspection.
    pub fn lock(&self) -> MutexGuard<'_, Dispatcher> {
        self.inner.lock()
    }

    /// Run `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut Dispatcher) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl From<Dispatcher> for SharedDispatcher {
    fn from(dispatcher: Dispatcher) -> Self {
        Self::new(dispatcher)
    }
}
