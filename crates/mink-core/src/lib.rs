//! # Mink Core
//!
//! Prototype-delegation object model for the Mink project.
//!
//! Objects own ordered property slots (data or accessor), delegate lookups
//! through a single optional prototype link, and stay acyclic by validating
//! every link assignment. Functions are ordinary objects with an invocation
//! payload and no inherent receiver; constructors produce prototype-linked
//! instances with the return-override rule intact.
//!
//! ## Design Principles
//!
//! - **Explicit receivers**: every invocation names its receiver; only `bind`
//!   can fix one in advance
//! - **Explicit realms**: the root object is dependency-injected state, never
//!   an ambient global
//! - **Receiver-correct delegation**: accessors found on an ancestor run
//!   against the object the lookup started at
//! - **Single-threaded**: operations run to completion; hosts with concurrent
//!   callers serialize them

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod context;
pub mod convert;
pub mod error;
pub mod function;
pub mod mixin;
pub mod object;
pub mod realm;
pub mod string;
pub mod value;

// Ownership layer, re-exported for hosts.
pub use mink_gc::{GcRef, SideTable, WeakRef};

pub use context::CallContext;
pub use convert::{compare, to_display_string, to_number, to_primitive};
pub use error::{ModelError, ModelResult};
pub use function::{Callable, NativeFn, apply, bind, call, call_object, instance_of};
pub use mixin::{CopyOptions, copy_slots};
pub use object::{
    ObjectOps, ObjectRef, PropertyAttributes, PropertyDescriptor, PropertyKey, ScriptObject,
};
pub use realm::{ObjectBuilder, Realm, RealmOptions};
pub use string::ScriptString;
pub use value::{Value, same_value, strict_equals};
