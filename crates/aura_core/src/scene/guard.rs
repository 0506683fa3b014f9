//! # Update Guard
//!
//! Mutex + dirty flag + payload. The flag answers "has this changed since
//! the render side last copied it" without touching the payload.
//!
//! ```text
//!   mutator:  lock ─> write payload ─> dirty = true ─> unlock
//!   consumer: lock ─> dirty? ─> copy payload ─> Ok? ─> dirty = false ─> unlock
//! ```
//!
//! The flag is only cleared when the consumer reports success, so a failed
//! upload is retried on the next frame.

use crate::error::{Collection, SceneError, SceneResult};
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};

struct Guarded<T> {
    dirty: bool,
    payload: T,
}

/// Mutex-protected payload with a dirty flag.
pub struct UpdateGuard<T> {
    inner: Mutex<Guarded<T>>,
}

impl<T> UpdateGuard<T> {
    /// Wraps `payload`. New guards start dirty.
    #[must_use]
    pub fn new(payload: T) -> Self {
        Self {
            inner: Mutex::new(Guarded {
                dirty: true,
                payload,
            }),
        }
    }

    /// Locks the payload. Mutable access through the lock marks it dirty.
    pub fn lock(&self) -> UpdateLock<'_, T> {
        UpdateLock {
            guard: self.inner.lock(),
        }
    }

    /// Runs `f` with shared access. Does not touch the flag.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.lock().payload)
    }

    /// Runs `f` with exclusive access and marks the payload dirty.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock();
        guard.dirty = true;
        f(&mut guard.payload)
    }

    /// Returns the dirty flag.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }

    /// Forces the next consumer to copy the payload.
    pub fn mark_dirty(&self) {
        self.inner.lock().dirty = true;
    }

    /// Hands the payload to `f` if dirty, clearing the flag only on `Ok`.
    ///
    /// Returns `Ok(None)` when there was nothing to propagate. The lock is
    /// held for the duration of `f`, so no write can slip in between the
    /// copy and the clear.
    ///
    /// # Errors
    ///
    /// Whatever `f` returns. The flag stays set.
    pub fn propagate<R, E>(&self, f: impl FnOnce(&T) -> Result<R, E>) -> Result<Option<R>, E> {
        self.propagate_if(false, f)
    }

    /// Like [`UpdateGuard::propagate`], but also runs when `force` is set.
    ///
    /// # Errors
    ///
    /// Whatever `f` returns. The flag stays set.
    pub fn propagate_if<R, E>(
        &self,
        force: bool,
        f: impl FnOnce(&T) -> Result<R, E>,
    ) -> Result<Option<R>, E> {
        let mut guard = self.inner.lock();
        if !guard.dirty && !force {
            return Ok(None);
        }
        let value = f(&guard.payload)?;
        guard.dirty = false;
        Ok(Some(value))
    }

    /// Consumes the guard and returns the payload.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().payload
    }
}

impl<T: Default> Default for UpdateGuard<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> UpdateGuard<Vec<T>> {
    /// Appends `item` unless the collection already holds `limit` items.
    ///
    /// Returns the new index, which equals the previous length.
    ///
    /// # Errors
    ///
    /// [`SceneError::CapacityExceeded`] with the collection untouched.
    #[allow(clippy::cast_possible_truncation)] // len < limit <= u32::MAX
    pub fn append(&self, item: T, limit: u32, collection: Collection) -> SceneResult<u32> {
        let mut guard = self.inner.lock();
        let len = guard.payload.len();
        if len >= limit as usize {
            return Err(SceneError::CapacityExceeded { collection, limit });
        }
        guard.payload.push(item);
        guard.dirty = true;
        Ok(len as u32)
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().payload.len()
    }

    /// Returns true if nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for UpdateGuard<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.lock();
        f.debug_struct("UpdateGuard")
            .field("dirty", &guard.dirty)
            .field("payload", &guard.payload)
            .finish()
    }
}

/// Held lock on an [`UpdateGuard`].
///
/// Reading is free; the first mutable deref sets the dirty flag.
pub struct UpdateLock<'a, T> {
    guard: MutexGuard<'a, Guarded<T>>,
}

impl<T> UpdateLock<'_, T> {
    /// Dirty flag as seen under this lock.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.guard.dirty
    }

    /// [`UpdateGuard::propagate`] for a caller that already holds the lock,
    /// e.g. to copy several guards as one consistent snapshot.
    ///
    /// # Errors
    ///
    /// Whatever `f` returns. The flag stays set.
    pub fn propagate<R, E>(
        &mut self,
        f: impl FnOnce(&T) -> Result<R, E>,
    ) -> Result<Option<R>, E> {
        if !self.guard.dirty {
            return Ok(None);
        }
        let value = f(&self.guard.payload)?;
        self.guard.dirty = false;
        Ok(Some(value))
    }
}

impl<T> Deref for UpdateLock<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard.payload
    }
}

impl<T> DerefMut for UpdateLock<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.guard.dirty = true;
        &mut self.guard.payload
    }
}
