//! chained-hashmap: a single-threaded chained hash table with explicit
//! bucket control and capability-based element operations.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: give callers a hash table whose shape (bucket count, hash
//!   policy, element lifecycle) is entirely under their control, built in
//!   small, independently testable layers.
//! - Layers:
//!   - caps: function objects (copier/disposer/printer/comparator), each
//!     an optional `Rc`'d closure; the captures are the operation's
//!     context. A missing capability is a reported error, never a fault.
//!   - policy: resolves a (key width, policy tier) pair to a concrete hash
//!     function — widths 1/2/4/8 and a string sentinel; simple/robust/
//!     secure tiers — or accepts a fully custom hasher that bypasses
//!     resolution.
//!   - chain: arena-backed doubly-linked chain over `slotmap` with
//!     generational node refs; the bucket storage and the element-wise
//!     rebuild primitive the clone/copy operations are built from.
//!   - table: `ChainedTable<K, V>` — hash-then-chain-scan with a bucket
//!     array that changes size only through explicit `resize`, plus
//!     deep/shallow clone and copy-over.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` by design (shared `Rc` contexts, no
//!   atomics). Callers needing concurrency add their own synchronization.
//! - No automatic growth: the load factor is queryable but never acted on.
//! - Duplicate inserts fail; replace is remove-then-insert by contract.
//! - Every fallible operation returns a code from one closed enum
//!   ([`Error`]); multi-step operations either complete or roll back
//!   (build-then-swap for resize, rollback-to-empty for copy-over).
//!
//! Why this split?
//! - Localize invariants: the chain owns link consistency, the table owns
//!   count and placement invariants, the resolver owns width validation.
//! - Keep user code at the edges: entries cache their hash at insert, so
//!   rehashing never re-enters user closures; a debug-only reentry guard
//!   catches closures that call back in.
//! - Make the sharing hazard a type: deep clone goes through copier
//!   capabilities, shallow clone is only callable for [`ShareClone`]
//!   payloads, where aliasing is what `Clone` already means.

pub mod caps;
pub mod chain;
mod errors;
pub mod policy;
mod reentrancy;
pub mod table;
mod table_proptest;

// Public surface
pub use caps::{Capability, Comparator, Copier, Disposer, Printer, ShareClone, SlotOps};
pub use errors::Error;
pub use policy::{HashPolicy, KeyHasher, KeyRepr, KeyWidth, Repr};
pub use table::{ChainedTable, TableBuilder};
