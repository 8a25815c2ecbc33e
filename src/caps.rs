//! Capability contract: per-operation function objects.
//!
//! Each wrapper pairs an optional `Rc`'d closure with whatever state the
//! closure captured; the captures play the role the opaque context pointer
//! plays in C-style container libraries, and cloning a wrapper shares that
//! context rather than duplicating it. An unset wrapper is an unsupported
//! capability: operations that need it fail with
//! [`Error::Missing`](crate::Error::Missing), never a null-pointer fault.

use crate::errors::Error;
use core::cmp::Ordering;
use core::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Names a capability for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Copier,
    Disposer,
    Printer,
    Comparator,
    Hasher,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Copier => "copier",
            Capability::Disposer => "disposer",
            Capability::Printer => "printer",
            Capability::Comparator => "comparator",
            Capability::Hasher => "hasher",
        };
        f.write_str(name)
    }
}

/// Duplicates an element. Returning `None` models allocation failure and
/// surfaces as [`Error::AllocFailed`].
pub struct Copier<T> {
    f: Option<Rc<dyn Fn(&T) -> Option<T>>>,
}

impl<T> Copier<T> {
    pub fn new(f: impl Fn(&T) -> Option<T> + 'static) -> Self {
        Self { f: Some(Rc::new(f)) }
    }

    /// Convenience for copiers that cannot fail.
    pub fn infallible(f: impl Fn(&T) -> T + 'static) -> Self {
        Self::new(move |v| Some(f(v)))
    }

    pub fn unset() -> Self {
        Self { f: None }
    }

    pub fn is_set(&self) -> bool {
        self.f.is_some()
    }

    pub fn copy(&self, value: &T) -> Result<T, Error> {
        match &self.f {
            Some(f) => f(value).ok_or(Error::AllocFailed),
            None => Err(Error::Missing(Capability::Copier)),
        }
    }
}

/// Receives ownership of a payload the container is releasing
/// (remove/clear/destroy/copy-over). Unset means the payload is simply
/// dropped; configuring a disposer makes release observable, which is the
/// closest safe rendition of a C freer.
pub struct Disposer<T> {
    f: Option<Rc<dyn Fn(T)>>,
}

impl<T> Disposer<T> {
    pub fn new(f: impl Fn(T) + 'static) -> Self {
        Self { f: Some(Rc::new(f)) }
    }

    pub fn unset() -> Self {
        Self { f: None }
    }

    pub fn is_set(&self) -> bool {
        self.f.is_some()
    }

    /// Never fails: an unset disposer drops the value.
    pub fn dispose(&self, value: T) {
        match &self.f {
            Some(f) => f(value),
            None => drop(value),
        }
    }
}

/// Formats an element for debug rendering.
pub struct Printer<T> {
    f: Option<Rc<dyn Fn(&T) -> String>>,
}

impl<T> Printer<T> {
    pub fn new(f: impl Fn(&T) -> String + 'static) -> Self {
        Self { f: Some(Rc::new(f)) }
    }

    pub fn unset() -> Self {
        Self { f: None }
    }

    pub fn is_set(&self) -> bool {
        self.f.is_some()
    }

    pub fn print(&self, value: &T) -> Result<String, Error> {
        match &self.f {
            Some(f) => Ok(f(value)),
            None => Err(Error::Missing(Capability::Printer)),
        }
    }
}

/// Total order over elements; equality is `Ordering::Equal`. Mandatory for
/// the table, which uses it for every key match.
pub struct Comparator<T> {
    f: Option<Rc<dyn Fn(&T, &T) -> Ordering>>,
}

impl<T> Comparator<T> {
    pub fn new(f: impl Fn(&T, &T) -> Ordering + 'static) -> Self {
        Self { f: Some(Rc::new(f)) }
    }

    pub fn unset() -> Self {
        Self { f: None }
    }

    pub fn is_set(&self) -> bool {
        self.f.is_some()
    }

    pub fn compare(&self, a: &T, b: &T) -> Result<Ordering, Error> {
        match &self.f {
            Some(f) => Ok(f(a, b)),
            None => Err(Error::Missing(Capability::Comparator)),
        }
    }

    /// Equality under this comparator.
    pub fn matches(&self, a: &T, b: &T) -> Result<bool, Error> {
        Ok(self.compare(a, b)? == Ordering::Equal)
    }
}

impl<T: Ord + 'static> Comparator<T> {
    pub fn from_ord() -> Self {
        Self::new(|a: &T, b: &T| a.cmp(b))
    }
}

/// The copier/disposer/printer set for one payload slot (keys or values).
pub struct SlotOps<T> {
    pub copier: Copier<T>,
    pub disposer: Disposer<T>,
    pub printer: Printer<T>,
}

impl<T> SlotOps<T> {
    pub fn new() -> Self {
        Self {
            copier: Copier::unset(),
            disposer: Disposer::unset(),
            printer: Printer::unset(),
        }
    }

    pub fn with_copier(mut self, copier: Copier<T>) -> Self {
        self.copier = copier;
        self
    }

    pub fn with_disposer(mut self, disposer: Disposer<T>) -> Self {
        self.disposer = disposer;
        self
    }

    pub fn with_printer(mut self, printer: Printer<T>) -> Self {
        self.printer = printer;
        self
    }
}

/// Marker for types whose `Clone` aliases underlying storage instead of
/// copying it: `Rc`, `Arc`, and plain references. Shallow clone/copy of a
/// table is only offered for such payloads, so the aliasing hazard of a
/// pointer-sharing clone is a compile error rather than a runtime surprise.
pub trait ShareClone: Clone {}

impl<T: ?Sized> ShareClone for Rc<T> {}
impl<T: ?Sized> ShareClone for Arc<T> {}
impl<'a, T: ?Sized> ShareClone for &'a T {}

// Clone shares the closure and its captured context; Default is unset.
// Written out by hand because `derive` would demand `T: Clone`.
macro_rules! share_impls {
    ($($ty:ident),*) => {$(
        impl<T> Clone for $ty<T> {
            fn clone(&self) -> Self {
                Self { f: self.f.clone() }
            }
        }

        impl<T> Default for $ty<T> {
            fn default() -> Self {
                Self::unset()
            }
        }

        impl<T> fmt::Debug for $ty<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($ty), "({})"), if self.is_set() { "set" } else { "unset" })
            }
        }
    )*};
}

share_impls!(Copier, Disposer, Printer, Comparator);

impl<T> Clone for SlotOps<T> {
    fn clone(&self) -> Self {
        Self {
            copier: self.copier.clone(),
            disposer: self.disposer.clone(),
            printer: self.printer.clone(),
        }
    }
}

impl<T> Default for SlotOps<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Invariant: an unset wrapper reports a missing capability, never panics.
    #[test]
    fn unset_wrappers_report_missing() {
        let c: Copier<i32> = Copier::unset();
        assert_eq!(c.copy(&1), Err(Error::Missing(Capability::Copier)));

        let p: Printer<i32> = Printer::unset();
        assert_eq!(p.print(&1), Err(Error::Missing(Capability::Printer)));

        let cmp: Comparator<i32> = Comparator::unset();
        assert_eq!(cmp.compare(&1, &2), Err(Error::Missing(Capability::Comparator)));

        // Disposing without a disposer just drops the value.
        let d: Disposer<String> = Disposer::unset();
        d.dispose("gone".to_string());
    }

    /// Invariant: a copier returning `None` surfaces as AllocFailed.
    #[test]
    fn copier_none_is_alloc_failure() {
        let c: Copier<i32> = Copier::new(|_| None);
        assert_eq!(c.copy(&7), Err(Error::AllocFailed));

        let ok: Copier<i32> = Copier::infallible(|v| v + 1);
        assert_eq!(ok.copy(&7), Ok(8));
    }

    /// Invariant: cloning a wrapper shares its captured context.
    #[test]
    fn clone_shares_context() {
        let calls = Rc::new(Cell::new(0u32));
        let ctx = calls.clone();
        let d: Disposer<i32> = Disposer::new(move |_| ctx.set(ctx.get() + 1));
        let d2 = d.clone();

        d.dispose(1);
        d2.dispose(2);
        assert_eq!(calls.get(), 2, "both wrappers feed the same context");
    }

    /// Invariant: comparator equality is `Ordering::Equal`, nothing else.
    #[test]
    fn comparator_matches_on_equal_only() {
        let cmp: Comparator<i32> = Comparator::from_ord();
        assert_eq!(cmp.compare(&1, &2), Ok(Ordering::Less));
        assert_eq!(cmp.matches(&3, &3), Ok(true));
        assert_eq!(cmp.matches(&3, &4), Ok(false));

        // Case-insensitive comparator: equality follows the comparator, not `==`.
        let ci: Comparator<String> =
            Comparator::new(|a: &String, b: &String| a.to_lowercase().cmp(&b.to_lowercase()));
        assert_eq!(ci.matches(&"Key".to_string(), &"kEY".to_string()), Ok(true));
    }
}
