//! # Mink GC
//!
//! Ownership layer for the Mink object model.
//!
//! There is no tracing collector here: objects use shared-reference handles
//! ([`GcRef`]) and live as long as any holder does. The object model keeps the
//! prototype forest acyclic, so delegation links can never keep each other
//! alive in a loop. Reference cycles through ordinary property values are
//! possible and are the host's responsibility to break (drop the holders, or
//! route the back-edge through a [`WeakRef`]).
//!
//! [`SideTable`] stores per-object auxiliary state keyed by handle identity,
//! without touching the object's own property slots.

#![warn(clippy::all)]
#![warn(missing_docs)]

mod handle;
mod side_table;

pub use handle::{GcRef, WeakRef};
pub use side_table::SideTable;
