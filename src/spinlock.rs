// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
A tiny exclusive spinlock.

The startup buffer is written to from wherever code happens to log during startup,
including inside panic hooks and logging-configuration callbacks that are themselves
failing.  A std `Mutex` would poison there; this lock cannot.  Critical sections must be
a handful of instructions: a push or a pop.
*/

use std::cell::UnsafeCell;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

pub struct Spinlock<T> {
    data: UnsafeCell<T>,
    locked: AtomicBool,
}

unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send> Sync for Spinlock<T> {}

struct Unlock<'a>(&'a AtomicBool);

impl Drop for Unlock<'_> {
    fn drop(&mut self) {
        self.0.store(false, Release);
    }
}

impl<T> Spinlock<T> {
    pub const fn new(data: T) -> Self {
        Spinlock {
            data: UnsafeCell::new(data),
            locked: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> Unlock<'_> {
        while self
            .locked
            .compare_exchange_weak(false, true, Acquire, Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
        Unlock(&self.locked)
    }

    /// Runs `f` with exclusive access.  The lock is released even if `f` unwinds.
    pub fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let _unlock = self.lock();
        // SAFETY: the flag was false and we swapped in true, so nobody else holds it
        unsafe { f(&mut *self.data.get()) }
    }
}
