//! Model objects and property slots
//!
//! An object is an insertion-ordered map from property keys to slots, plus at
//! most one delegation link ("prototype") to another object. Lookups walk the
//! chain; writes shadow; the delegation graph is kept a forest by validating
//! acyclicity every time a link is set.

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use mink_gc::GcRef;

use crate::error::{ModelError, ModelResult};
use crate::function::{self, Callable};
use crate::string::ScriptString;
use crate::value::{Value, same_value};

/// Shared handle to a model object.
pub type ObjectRef = GcRef<ScriptObject>;

/// Property key (name or integer index)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String property key
    String(Arc<ScriptString>),
    /// Integer index (for array-like objects)
    Index(u32),
}

impl PropertyKey {
    /// Create a string property key
    pub fn string(s: &str) -> Self {
        Self::String(ScriptString::intern(s))
    }

    /// Create an index property key
    pub fn index(i: u32) -> Self {
        Self::Index(i)
    }

    /// Derive a key from a value: strings keep their name, non-negative
    /// integral numbers become indices, everything else is stringified.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::String(s.clone()),
            Value::Number(n)
                if n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX) =>
            {
                Self::Index(*n as u32)
            }
            other => Self::string(&crate::convert::to_display_string(other)),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::Index(i)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s.as_str()),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Property attributes
///
/// `Default` is all-false, which is also the defaulting rule for flags left
/// unspecified when defining a slot explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropertyAttributes {
    /// Slot value may be overwritten
    pub writable: bool,
    /// Slot shows up in key enumeration
    pub enumerable: bool,
    /// Slot may be deleted or redefined
    pub configurable: bool,
}

impl PropertyAttributes {
    /// Default attributes for plainly assigned data slots
    pub const fn data() -> Self {
        Self {
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Non-writable, non-enumerable, non-configurable
    pub const fn frozen() -> Self {
        Self {
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }

    /// Writable and configurable but hidden from enumeration, the shape of
    /// built-in methods
    pub const fn builtin_method() -> Self {
        Self {
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }
}

/// Property slot: either stored data or a getter/setter pair
#[derive(Clone, Debug)]
pub enum PropertyDescriptor {
    /// Data slot
    Data {
        /// The stored value
        value: Value,
        /// Attributes
        attributes: PropertyAttributes,
    },
    /// Accessor slot
    Accessor {
        /// Getter function (a callable value), if any
        get: Option<Value>,
        /// Setter function (a callable value), if any
        set: Option<Value>,
        /// Attributes
        attributes: PropertyAttributes,
    },
}

impl PropertyDescriptor {
    /// Data slot with plain-assignment attributes
    pub fn data(value: Value) -> Self {
        Self::Data {
            value,
            attributes: PropertyAttributes::data(),
        }
    }

    /// Data slot with explicit attributes
    pub fn data_with_attrs(value: Value, attributes: PropertyAttributes) -> Self {
        Self::Data { value, attributes }
    }

    /// Accessor slot
    pub fn accessor(get: Option<Value>, set: Option<Value>, attributes: PropertyAttributes) -> Self {
        Self::Accessor {
            get,
            set,
            attributes,
        }
    }

    /// Data slot shaped like a built-in method
    pub fn builtin_method(value: Value) -> Self {
        Self::Data {
            value,
            attributes: PropertyAttributes::builtin_method(),
        }
    }

    /// Data slot shaped like a function's `name`/`length` metadata:
    /// non-writable, non-enumerable, configurable.
    pub fn function_length(value: Value) -> Self {
        Self::Data {
            value,
            attributes: PropertyAttributes {
                writable: false,
                enumerable: false,
                configurable: true,
            },
        }
    }

    /// The stored value (for data slots)
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Data { value, .. } => Some(value),
            Self::Accessor { .. } => None,
        }
    }

    /// Whether this is a data slot
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }

    /// Whether this is an accessor slot
    pub fn is_accessor(&self) -> bool {
        matches!(self, Self::Accessor { .. })
    }

    /// The slot's attributes
    pub fn attributes(&self) -> PropertyAttributes {
        match self {
            Self::Data { attributes, .. } | Self::Accessor { attributes, .. } => *attributes,
        }
    }

    fn attributes_mut(&mut self) -> &mut PropertyAttributes {
        match self {
            Self::Data { attributes, .. } | Self::Accessor { attributes, .. } => attributes,
        }
    }
}

type SlotMap = IndexMap<PropertyKey, PropertyDescriptor, FxBuildHasher>;

/// A model object
///
/// Interior mutability keeps the public API `&self`; all heap data is shared,
/// so handles are `Send + Sync`. The model itself is single-threaded; hosts
/// with concurrent callers must serialize compound operation sequences.
pub struct ScriptObject {
    /// Own slots, in insertion order
    slots: RwLock<SlotMap>,
    /// Delegation link (None for root objects)
    prototype: RwLock<Option<ObjectRef>>,
    /// New own slots may be added
    extensible: AtomicBool,
    /// Invocation payload, fixed at construction (None for plain objects)
    callable: Option<Callable>,
}

impl ScriptObject {
    /// Create a plain object with the given delegation link.
    pub fn new(prototype: Option<ObjectRef>) -> Self {
        Self {
            slots: RwLock::new(SlotMap::default()),
            prototype: RwLock::new(prototype),
            extensible: AtomicBool::new(true),
            callable: None,
        }
    }

    /// Create a callable object (a function).
    pub fn new_callable(prototype: Option<ObjectRef>, callable: Callable) -> Self {
        Self {
            slots: RwLock::new(SlotMap::default()),
            prototype: RwLock::new(prototype),
            extensible: AtomicBool::new(true),
            callable: Some(callable),
        }
    }

    /// The invocation payload, if this object is callable.
    pub fn callable(&self) -> Option<&Callable> {
        self.callable.as_ref()
    }

    /// Whether this object can be invoked.
    pub fn is_callable(&self) -> bool {
        self.callable.is_some()
    }

    /// Resolve `key` through the delegation chain, invoking a getter (if one
    /// is found) with the given receiver. The receiver stays the object the
    /// lookup started at even when the slot lives on an ancestor.
    ///
    /// Lookups never mutate the chain; cost is O(chain depth).
    pub fn get_with_receiver(&self, key: &PropertyKey, receiver: &Value) -> ModelResult<Value> {
        let own = self.slots.read().get(key).cloned();
        if let Some(descriptor) = own {
            return match descriptor {
                PropertyDescriptor::Data { value, .. } => Ok(value),
                PropertyDescriptor::Accessor { get: Some(getter), .. } => {
                    function::call(&getter, receiver.clone(), &[])
                }
                PropertyDescriptor::Accessor { get: None, .. } => Ok(Value::Undefined),
            };
        }
        match self.prototype() {
            Some(parent) => parent.get_with_receiver(key, receiver),
            None => Ok(Value::Undefined),
        }
    }

    /// The own slot for `key`, if any (never consults ancestors).
    pub fn own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.slots.read().get(key).cloned()
    }

    /// The nearest slot for `key` on the chain above this object.
    fn inherited_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let mut cursor = self.prototype();
        while let Some(parent) = cursor {
            if let Some(descriptor) = parent.own_property(key) {
                return Some(descriptor);
            }
            cursor = parent.prototype();
        }
        None
    }

    /// Whether this object itself owns a slot named `key`.
    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.slots.read().contains_key(key)
    }

    /// Whether `key` resolves anywhere on this object or its chain.
    pub fn has(&self, key: &PropertyKey) -> bool {
        if self.has_own(key) {
            return true;
        }
        self.inherited_property(key).is_some()
    }

    /// Remove the own slot for `key`.
    ///
    /// Returns `false` (and leaves the slot in place) when the slot is
    /// non-configurable. Removing an absent slot succeeds trivially.
    /// Ancestors are never affected.
    pub fn delete(&self, key: &PropertyKey) -> bool {
        let mut slots = self.slots.write();
        match slots.get(key) {
            Some(descriptor) if !descriptor.attributes().configurable => false,
            Some(_) => {
                slots.shift_remove(key);
                true
            }
            None => true,
        }
    }

    /// Install or replace the own slot for `key` exactly as described.
    ///
    /// Fails when the object is non-extensible and `key` is new, or when an
    /// existing non-configurable slot would be redefined incompatibly
    /// (loosening `configurable`/`writable`, flipping `enumerable`, switching
    /// data/accessor kind, changing a non-writable value, or swapping
    /// accessor functions). Tightening `writable` and same-value rewrites are
    /// allowed.
    pub fn define_property(
        &self,
        key: PropertyKey,
        descriptor: PropertyDescriptor,
    ) -> ModelResult<()> {
        let mut slots = self.slots.write();
        match slots.get(&key) {
            None => {
                if !self.is_extensible() {
                    return Err(ModelError::configuration(format!(
                        "cannot define property \"{key}\" on a non-extensible object"
                    )));
                }
            }
            Some(existing) if !existing.attributes().configurable => {
                validate_redefinition(&key, existing, &descriptor)?;
            }
            Some(_) => {}
        }
        slots.insert(key, descriptor);
        Ok(())
    }

    /// Enumerable own slot names, in insertion order. Ancestors excluded.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        self.slots
            .read()
            .iter()
            .filter(|(_, descriptor)| descriptor.attributes().enumerable)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// All own slot names (enumerable or not), in insertion order.
    pub fn own_property_names(&self) -> Vec<PropertyKey> {
        self.slots.read().keys().cloned().collect()
    }

    /// Whether new own slots may be added.
    pub fn is_extensible(&self) -> bool {
        self.extensible.load(Ordering::Relaxed)
    }

    /// Forbid adding new own slots. One-way.
    pub fn prevent_extensions(&self) {
        self.extensible.store(false, Ordering::Relaxed);
    }

    /// [`prevent_extensions`](Self::prevent_extensions) plus mark every
    /// current own slot non-configurable. One-way.
    pub fn seal(&self) {
        self.extensible.store(false, Ordering::Relaxed);
        let mut slots = self.slots.write();
        for descriptor in slots.values_mut() {
            descriptor.attributes_mut().configurable = false;
        }
        debug!("object sealed");
    }

    /// [`seal`](Self::seal) plus mark every own data slot non-writable.
    /// One-way.
    pub fn freeze(&self) {
        self.extensible.store(false, Ordering::Relaxed);
        let mut slots = self.slots.write();
        for descriptor in slots.values_mut() {
            descriptor.attributes_mut().configurable = false;
            if let PropertyDescriptor::Data { attributes, .. } = descriptor {
                attributes.writable = false;
            }
        }
        debug!("object frozen");
    }

    /// Whether the object is non-extensible with all own slots
    /// non-configurable.
    pub fn is_sealed(&self) -> bool {
        if self.is_extensible() {
            return false;
        }
        self.slots
            .read()
            .values()
            .all(|descriptor| !descriptor.attributes().configurable)
    }

    /// Whether the object is sealed with all own data slots non-writable.
    pub fn is_frozen(&self) -> bool {
        if self.is_extensible() {
            return false;
        }
        self.slots.read().values().all(|descriptor| {
            let attributes = descriptor.attributes();
            !attributes.configurable && (descriptor.is_accessor() || !attributes.writable)
        })
    }

    /// The delegation link, if any.
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.prototype.read().clone()
    }

    /// Re-link the delegation ancestor.
    ///
    /// Rejected with a cycle error (links untouched) when the new ancestor's
    /// chain already includes this object.
    pub fn set_prototype(&self, prototype: Option<ObjectRef>) -> ModelResult<()> {
        if let Some(parent) = &prototype {
            let mut cursor = Some(parent.clone());
            while let Some(ancestor) = cursor {
                if std::ptr::eq(ancestor.as_ptr(), self as *const ScriptObject) {
                    debug!("rejected prototype assignment forming a cycle");
                    return Err(ModelError::cycle(
                        "object would become its own prototype ancestor",
                    ));
                }
                cursor = ancestor.prototype();
            }
        }
        *self.prototype.write() = prototype;
        Ok(())
    }

    /// Whether this object appears on `other`'s delegation chain.
    pub fn is_prototype_of(&self, other: &ObjectRef) -> bool {
        let mut cursor = other.prototype();
        while let Some(ancestor) = cursor {
            if std::ptr::eq(ancestor.as_ptr(), self as *const ScriptObject) {
                return true;
            }
            cursor = ancestor.prototype();
        }
        false
    }

    /// Overwrite an own writable data slot in place, keeping its attributes.
    fn write_data_slot(&self, key: &PropertyKey, value: Value) {
        let mut slots = self.slots.write();
        if let Some(PropertyDescriptor::Data {
            value: stored,
            attributes,
        }) = slots.get_mut(key)
        {
            if attributes.writable {
                *stored = value;
            }
        }
    }

    /// Create a fresh own data slot with plain-assignment attributes.
    fn insert_own_data(&self, key: PropertyKey, value: Value) -> ModelResult<()> {
        if !self.is_extensible() {
            return Err(ModelError::configuration(format!(
                "cannot add property \"{key}\" to a non-extensible object"
            )));
        }
        self.slots
            .write()
            .insert(key, PropertyDescriptor::data(value));
        Ok(())
    }
}

/// Check that redefining a non-configurable slot keeps every locked aspect.
fn validate_redefinition(
    key: &PropertyKey,
    current: &PropertyDescriptor,
    incoming: &PropertyDescriptor,
) -> ModelResult<()> {
    let reject = || {
        Err(ModelError::configuration(format!(
            "cannot redefine non-configurable property \"{key}\""
        )))
    };

    if incoming.attributes().configurable {
        return reject();
    }
    if incoming.attributes().enumerable != current.attributes().enumerable {
        return reject();
    }
    match (current, incoming) {
        (
            PropertyDescriptor::Data {
                value: current_value,
                attributes: current_attrs,
            },
            PropertyDescriptor::Data {
                value: new_value,
                attributes: new_attrs,
            },
        ) => {
            if !current_attrs.writable {
                if new_attrs.writable {
                    return reject();
                }
                if !same_value(current_value, new_value) {
                    return reject();
                }
            }
            // Still writable: value changes and writable→false are allowed.
            Ok(())
        }
        (
            PropertyDescriptor::Accessor {
                get: current_get,
                set: current_set,
                ..
            },
            PropertyDescriptor::Accessor {
                get: new_get,
                set: new_set,
                ..
            },
        ) => {
            if !option_same(current_get, new_get) || !option_same(current_set, new_set) {
                return reject();
            }
            Ok(())
        }
        // Data/accessor kind switches are locked out entirely.
        _ => reject(),
    }
}

fn option_same(a: &Option<Value>, b: &Option<Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => same_value(a, b),
        _ => false,
    }
}

/// Receiver-aware entry points, implemented on the handle so the object can
/// pass itself to getters and setters.
pub trait ObjectOps {
    /// Resolve `key` through the chain with this object as receiver.
    fn get(&self, key: &PropertyKey) -> ModelResult<Value>;

    /// Write `key` with shadowing semantics and this object as receiver.
    ///
    /// Writes to a non-writable own data slot and writes through an accessor
    /// without a setter are defined no-ops. Creating a slot on a
    /// non-extensible object is a configuration error.
    fn set(&self, key: &PropertyKey, value: Value) -> ModelResult<()>;

    /// This object as a value.
    fn to_value(&self) -> Value;
}

impl ObjectOps for ObjectRef {
    fn get(&self, key: &PropertyKey) -> ModelResult<Value> {
        self.get_with_receiver(key, &Value::object(self.clone()))
    }

    fn set(&self, key: &PropertyKey, value: Value) -> ModelResult<()> {
        let receiver = Value::object(self.clone());

        if let Some(descriptor) = self.own_property(key) {
            return match descriptor {
                PropertyDescriptor::Accessor {
                    set: Some(setter), ..
                } => function::call(&setter, receiver, &[value]).map(|_| ()),
                // No setter: silently ignored, matching permissive semantics.
                PropertyDescriptor::Accessor { set: None, .. } => Ok(()),
                PropertyDescriptor::Data { attributes, .. } if !attributes.writable => Ok(()),
                PropertyDescriptor::Data { .. } => {
                    self.write_data_slot(key, value);
                    Ok(())
                }
            };
        }

        // An inherited accessor intercepts the write; an inherited data slot
        // is shadowed, never mutated.
        if let Some(PropertyDescriptor::Accessor { set, .. }) = self.inherited_property(key) {
            return match set {
                Some(setter) => function::call(&setter, receiver, &[value]).map(|_| ()),
                None => Ok(()),
            };
        }

        self.insert_own_data(key.clone(), value)
    }

    fn to_value(&self) -> Value {
        Value::object(self.clone())
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptObject")
            .field("slots", &self.slots.read().len())
            .field("callable", &self.callable.is_some())
            .field("extensible", &self.is_extensible())
            .finish()
    }
}
