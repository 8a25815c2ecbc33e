//! Debug-only reentry detection.
//!
//! Capability closures (comparator, hasher, copier, printer) run while a
//! table is probing or rebuilding its buckets. Calling back into the same
//! table from one of those closures would observe — or mutate — a structure
//! mid-operation. In debug builds a nested entry panics with a clear
//! message; in release builds the check compiles to nothing. Disposers are
//! exempt by construction: the table only invokes them after the entry is
//! unlinked and the structure is consistent again.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-structure reentry flag. Guard method bodies that run capability
/// closures with `let _g = self.reentry.enter();`.
pub struct DebugReentry {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // !Send + !Sync, matching the crate's single-threaded design.
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentry {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _nosend: PhantomData,
        }
    }

    /// Mark the structure busy. In debug builds, panics if already busy.
    #[inline]
    pub fn enter(&self) -> ReentryGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "reentry: table method called from a capability closure"
            );
            return ReentryGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            return ReentryGuard { _lt: PhantomData };
        }
    }
}

impl Default for DebugReentry {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by [`DebugReentry::enter`].
pub struct ReentryGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentry,
    #[cfg(not(debug_assertions))]
    _lt: PhantomData<&'a ()>,
}

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.busy.set(false);
    }
}
