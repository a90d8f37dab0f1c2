//! Realms
//!
//! A realm is one self-contained model instance: it owns the root object that
//! object literals delegate to and the prototype shared by function objects.
//! Realms are explicit (there is no ambient global instance), so tests and
//! embedders can run any number of them independently.
//!
//! Initialization is two-stage: the prototypes are allocated bare first to
//! break the circular dependency (the root's own methods are functions, and
//! functions delegate to a prototype that delegates to the root), then
//! populated in dependency order.

use std::sync::Arc;
use tracing::debug;

use mink_gc::GcRef;

use crate::context::CallContext;
use crate::error::{ModelError, ModelResult};
use crate::function::{self, Callable, NativeFn};
use crate::object::{
    ObjectOps, ObjectRef, PropertyAttributes, PropertyDescriptor, PropertyKey, ScriptObject,
};
use crate::value::Value;

/// Host-tunable realm configuration.
#[derive(Clone, Debug)]
pub struct RealmOptions {
    /// Name of the primitive-conversion hook consulted first by comparison
    /// coercion.
    pub primitive_hook: String,
    /// Name of the string-conversion hook consulted as the fallback.
    pub string_hook: String,
}

impl Default for RealmOptions {
    fn default() -> Self {
        Self {
            primitive_hook: String::from("valueOf"),
            string_hook: String::from("toString"),
        }
    }
}

struct RealmInner {
    object_prototype: ObjectRef,
    function_prototype: ObjectRef,
    options: RealmOptions,
}

/// One model instance. Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Realm {
    inner: Arc<RealmInner>,
}

impl Realm {
    /// Create a realm with default options.
    pub fn new() -> Self {
        Self::with_options(RealmOptions::default())
    }

    /// Create a realm with host-supplied options.
    pub fn with_options(options: RealmOptions) -> Self {
        // Stage 1: bare prototypes.
        let object_prototype = GcRef::new(ScriptObject::new(None));
        let function_prototype = GcRef::new(ScriptObject::new(Some(object_prototype.clone())));
        let realm = Self {
            inner: Arc::new(RealmInner {
                object_prototype,
                function_prototype,
                options,
            }),
        };
        // Stage 2: populate defaults.
        realm.init_object_prototype();
        realm.init_function_prototype();
        debug!("realm initialized");
        realm
    }

    /// The root object: default delegation ancestor for object literals.
    pub fn object_prototype(&self) -> &ObjectRef {
        &self.inner.object_prototype
    }

    /// The prototype shared by function objects.
    pub fn function_prototype(&self) -> &ObjectRef {
        &self.inner.function_prototype
    }

    /// The realm's configuration.
    pub fn options(&self) -> &RealmOptions {
        &self.inner.options
    }

    /// Create an empty object delegating to the root.
    pub fn object(&self) -> ObjectRef {
        GcRef::new(ScriptObject::new(Some(self.inner.object_prototype.clone())))
    }

    /// Create an empty object with an explicit delegation link (or none at
    /// all, for clean lookup tables).
    pub fn object_with_prototype(&self, prototype: Option<ObjectRef>) -> ObjectRef {
        GcRef::new(ScriptObject::new(prototype))
    }

    /// Start building an object literal.
    pub fn build_object(&self) -> ObjectBuilder {
        ObjectBuilder {
            realm: self.clone(),
            prototype: Some(self.inner.object_prototype.clone()),
            properties: Vec::new(),
        }
    }

    /// Create a function object.
    ///
    /// The function carries non-enumerable `name`/`length` metadata and a
    /// fresh `prototype` object whose `constructor` slot points back at the
    /// function. That back-link is a convention the model seeds but never
    /// enforces; hosts may overwrite it freely.
    pub fn function<F>(&self, name: &str, length: u32, body: F) -> ObjectRef
    where
        F: Fn(&CallContext<'_>) -> ModelResult<Value> + Send + Sync + 'static,
    {
        let func = self.intrinsic_method(name, length, Arc::new(body));
        let proto = GcRef::new(ScriptObject::new(Some(self.inner.object_prototype.clone())));
        let _ = proto.define_property(
            PropertyKey::string("constructor"),
            PropertyDescriptor::builtin_method(Value::object(func.clone())),
        );
        let _ = func.define_property(
            PropertyKey::string("prototype"),
            PropertyDescriptor::data_with_attrs(
                Value::object(proto),
                PropertyAttributes {
                    writable: true,
                    enumerable: false,
                    configurable: false,
                },
            ),
        );
        func
    }

    /// Instantiate via a constructor function.
    ///
    /// A fresh object is linked to the constructor's `prototype` (the realm
    /// root when that value is not an object) and passed as the receiver. If
    /// the body returns an object, that object wins and the fresh one is
    /// discarded; any other return yields the fresh object.
    pub fn construct(&self, ctor: &ObjectRef, args: &[Value]) -> ModelResult<ObjectRef> {
        if !ctor.is_callable() {
            return Err(ModelError::type_error("construct target is not a function"));
        }
        // A bound function constructs through its target: bound arguments are
        // prepended but the bound receiver never survives `construct`.
        let (target, prefix) = resolve_construct_target(ctor);

        let proto = match target.get(&PropertyKey::string("prototype"))? {
            Value::Object(proto) => proto,
            _ => self.inner.object_prototype.clone(),
        };
        let fresh = GcRef::new(ScriptObject::new(Some(proto)));

        let result = if prefix.is_empty() {
            function::call_object(&target, Value::object(fresh.clone()), args)?
        } else {
            let mut full = prefix;
            full.extend_from_slice(args);
            function::call_object(&target, Value::object(fresh.clone()), &full)?
        };

        Ok(match result {
            Value::Object(overridden) => overridden,
            _ => fresh,
        })
    }

    /// Build an array-like object (`length` plus index slots) from a slice,
    /// the shape [`function::apply`] consumes.
    pub fn arguments_object(&self, values: &[Value]) -> ObjectRef {
        let obj = self.object();
        for (i, value) in values.iter().enumerate() {
            let _ = obj.define_property(
                PropertyKey::index(i as u32),
                PropertyDescriptor::data(value.clone()),
            );
        }
        let _ = obj.define_property(
            PropertyKey::string("length"),
            PropertyDescriptor::data_with_attrs(
                Value::number(values.len() as f64),
                PropertyAttributes::builtin_method(),
            ),
        );
        obj
    }

    /// A function object without the constructor-style `prototype` property.
    fn intrinsic_method(&self, name: &str, length: u32, body: NativeFn) -> ObjectRef {
        let func = GcRef::new(ScriptObject::new_callable(
            Some(self.inner.function_prototype.clone()),
            Callable::Native(body),
        ));
        let _ = func.define_property(
            PropertyKey::string("name"),
            PropertyDescriptor::function_length(Value::string(name)),
        );
        let _ = func.define_property(
            PropertyKey::string("length"),
            PropertyDescriptor::function_length(Value::number(f64::from(length))),
        );
        func
    }

    /// Root defaults. All non-enumerable, so own-key enumeration of ordinary
    /// objects stays clean.
    fn init_object_prototype(&self) {
        let root = &self.inner.object_prototype;

        let has_own = self.intrinsic_method(
            "hasOwnProperty",
            1,
            Arc::new(|cx: &CallContext<'_>| {
                let Some(receiver) = cx.receiver.as_object() else {
                    return Err(ModelError::type_error(
                        "hasOwnProperty called on a primitive",
                    ));
                };
                Ok(Value::boolean(
                    receiver.has_own(&PropertyKey::from_value(&cx.arg(0))),
                ))
            }),
        );
        let _ = root.define_property(
            PropertyKey::string("hasOwnProperty"),
            PropertyDescriptor::builtin_method(Value::object(has_own)),
        );

        let is_prototype_of = self.intrinsic_method(
            "isPrototypeOf",
            1,
            Arc::new(|cx: &CallContext<'_>| {
                let Some(receiver) = cx.receiver.as_object() else {
                    return Err(ModelError::type_error("isPrototypeOf called on a primitive"));
                };
                let target = cx.arg(0);
                Ok(Value::boolean(match target.as_object() {
                    Some(obj) => receiver.is_prototype_of(obj),
                    None => false,
                }))
            }),
        );
        let _ = root.define_property(
            PropertyKey::string("isPrototypeOf"),
            PropertyDescriptor::builtin_method(Value::object(is_prototype_of)),
        );

        // The two default coercion hooks. They live on the root so overriding
        // either on any prototype affects every delegating instance.
        let value_of = self.intrinsic_method(
            "valueOf",
            0,
            Arc::new(|cx: &CallContext<'_>| Ok(cx.receiver.clone())),
        );
        let _ = root.define_property(
            PropertyKey::string("valueOf"),
            PropertyDescriptor::builtin_method(Value::object(value_of)),
        );

        let to_string = self.intrinsic_method(
            "toString",
            0,
            Arc::new(|_cx: &CallContext<'_>| Ok(Value::string("[object Object]"))),
        );
        let _ = root.define_property(
            PropertyKey::string("toString"),
            PropertyDescriptor::builtin_method(Value::object(to_string)),
        );
    }

    /// Function defaults: `call`, `apply`, `bind` as methods, mirroring the
    /// Rust-level operations.
    fn init_function_prototype(&self) {
        let fn_proto = &self.inner.function_prototype;

        let call_method = self.intrinsic_method(
            "call",
            1,
            Arc::new(|cx: &CallContext<'_>| {
                let Some(func) = cx.receiver.as_object().cloned() else {
                    return Err(ModelError::type_error("call target is not a function"));
                };
                let rest = cx.args.get(1..).unwrap_or(&[]);
                function::call_object(&func, cx.arg(0), rest)
            }),
        );
        let _ = fn_proto.define_property(
            PropertyKey::string("call"),
            PropertyDescriptor::builtin_method(Value::object(call_method)),
        );

        let apply_method = self.intrinsic_method(
            "apply",
            2,
            Arc::new(|cx: &CallContext<'_>| {
                let Some(func) = cx.receiver.as_object().cloned() else {
                    return Err(ModelError::type_error("apply target is not a function"));
                };
                function::apply(&func, cx.arg(0), &cx.arg(1))
            }),
        );
        let _ = fn_proto.define_property(
            PropertyKey::string("apply"),
            PropertyDescriptor::builtin_method(Value::object(apply_method)),
        );

        let bind_method = self.intrinsic_method(
            "bind",
            1,
            Arc::new(|cx: &CallContext<'_>| {
                let Some(func) = cx.receiver.as_object().cloned() else {
                    return Err(ModelError::type_error("bind target is not a function"));
                };
                let rest = cx.args.get(1..).unwrap_or(&[]);
                function::bind(&func, cx.arg(0), rest).map(Value::object)
            }),
        );
        let _ = fn_proto.define_property(
            PropertyKey::string("bind"),
            PropertyDescriptor::builtin_method(Value::object(bind_method)),
        );
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_construct_target(ctor: &ObjectRef) -> (ObjectRef, Vec<Value>) {
    match ctor.callable() {
        Some(Callable::Bound(bound)) => (bound.target.clone(), bound.bound_args.clone()),
        _ => (ctor.clone(), Vec::new()),
    }
}

/// A deferred slot definition applied by [`ObjectBuilder::build`].
enum DeferredProperty {
    Data {
        key: PropertyKey,
        value: Value,
        attrs: PropertyAttributes,
    },
    Method {
        name: String,
        length: u32,
        body: NativeFn,
    },
    Accessor {
        name: String,
        get: Option<NativeFn>,
        set: Option<NativeFn>,
    },
}

/// Fluent builder for object literals.
///
/// Data slots and accessors are enumerable like literal members; methods get
/// the hidden built-in shape.
pub struct ObjectBuilder {
    realm: Realm,
    prototype: Option<ObjectRef>,
    properties: Vec<DeferredProperty>,
}

impl ObjectBuilder {
    /// Override the delegation link (use `None` for a prototype-less object).
    pub fn prototype(mut self, prototype: Option<ObjectRef>) -> Self {
        self.prototype = prototype;
        self
    }

    /// Add an enumerable data slot.
    pub fn prop(mut self, name: &str, value: Value) -> Self {
        self.properties.push(DeferredProperty::Data {
            key: PropertyKey::string(name),
            value,
            attrs: PropertyAttributes::data(),
        });
        self
    }

    /// Add a data slot with explicit attributes.
    pub fn prop_with_attrs(
        mut self,
        key: PropertyKey,
        value: Value,
        attrs: PropertyAttributes,
    ) -> Self {
        self.properties
            .push(DeferredProperty::Data { key, value, attrs });
        self
    }

    /// Add a method (non-enumerable function-valued slot).
    pub fn method<F>(mut self, name: &str, length: u32, body: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> ModelResult<Value> + Send + Sync + 'static,
    {
        self.properties.push(DeferredProperty::Method {
            name: name.to_string(),
            length,
            body: Arc::new(body),
        });
        self
    }

    /// Add an enumerable accessor slot.
    pub fn accessor(mut self, name: &str, get: Option<NativeFn>, set: Option<NativeFn>) -> Self {
        self.properties.push(DeferredProperty::Accessor {
            name: name.to_string(),
            get,
            set,
        });
        self
    }

    /// Create the object and apply the definitions in order.
    pub fn build(self) -> ModelResult<ObjectRef> {
        let obj = GcRef::new(ScriptObject::new(self.prototype));
        for property in self.properties {
            match property {
                DeferredProperty::Data { key, value, attrs } => {
                    obj.define_property(key, PropertyDescriptor::data_with_attrs(value, attrs))?;
                }
                DeferredProperty::Method { name, length, body } => {
                    let func = self.realm.intrinsic_method(&name, length, body);
                    obj.define_property(
                        PropertyKey::string(&name),
                        PropertyDescriptor::builtin_method(Value::object(func)),
                    )?;
                }
                DeferredProperty::Accessor { name, get, set } => {
                    let getter = get.map(|body| {
                        Value::object(self.realm.intrinsic_method(&format!("get {name}"), 0, body))
                    });
                    let setter = set.map(|body| {
                        Value::object(self.realm.intrinsic_method(&format!("set {name}"), 1, body))
                    });
                    obj.define_property(
                        PropertyKey::string(&name),
                        PropertyDescriptor::accessor(
                            getter,
                            setter,
                            PropertyAttributes {
                                writable: false,
                                enumerable: true,
                                configurable: true,
                            },
                        ),
                    )?;
                }
            }
        }
        Ok(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_objects_delegate_to_root() {
        let realm = Realm::new();
        let obj = realm.object();
        assert!(realm.object_prototype().is_prototype_of(&obj));
        // Root defaults resolve but do not enumerate.
        assert!(obj.has(&PropertyKey::string("hasOwnProperty")));
        assert!(obj.own_keys().is_empty());
    }

    #[test]
    fn test_prototype_less_object() {
        let realm = Realm::new();
        let bare = realm.object_with_prototype(None);
        assert!(!bare.has(&PropertyKey::string("toString")));
        assert!(bare.get(&PropertyKey::string("toString")).unwrap().is_undefined());
    }

    #[test]
    fn test_root_has_own_property_method() {
        let realm = Realm::new();
        let obj = realm.object();
        obj.set(&PropertyKey::string("mine"), Value::number(1.0)).unwrap();

        let method = obj.get(&PropertyKey::string("hasOwnProperty")).unwrap();
        let owns_mine =
            function::call(&method, Value::object(obj.clone()), &[Value::string("mine")]).unwrap();
        assert_eq!(owns_mine, Value::boolean(true));
        // Inherited names are not own.
        let owns_to_string =
            function::call(&method, Value::object(obj), &[Value::string("toString")]).unwrap();
        assert_eq!(owns_to_string, Value::boolean(false));
    }

    #[test]
    fn test_function_objects_carry_metadata_and_prototype() {
        let realm = Realm::new();
        let func = realm.function("frobnicate", 2, |_cx| Ok(Value::Undefined));

        assert_eq!(
            func.get(&PropertyKey::string("name")).unwrap(),
            Value::string("frobnicate")
        );
        assert_eq!(
            func.get(&PropertyKey::string("length")).unwrap(),
            Value::number(2.0)
        );

        let proto = func.get(&PropertyKey::string("prototype")).unwrap();
        let proto = proto.as_object().unwrap();
        let ctor = proto.get(&PropertyKey::string("constructor")).unwrap();
        assert!(ctor.as_object().unwrap().ptr_eq(&func));
        // Metadata stays out of enumeration.
        assert!(func.own_keys().is_empty());
        // Functions delegate to the shared function prototype.
        assert!(realm.function_prototype().is_prototype_of(&func));
    }

    #[test]
    fn test_construct_links_and_initializes() {
        let realm = Realm::new();
        let ctor = realm.function("Pokemon", 1, |cx| {
            let receiver = cx.receiver.as_object().cloned().unwrap();
            receiver.set(&PropertyKey::string("name"), cx.arg(0))?;
            Ok(Value::Undefined)
        });

        let inst = realm.construct(&ctor, &[Value::string("pikachu")]).unwrap();
        assert_eq!(
            inst.get(&PropertyKey::string("name")).unwrap(),
            Value::string("pikachu")
        );
        assert!(function::instance_of(&Value::object(inst.clone()), &ctor).unwrap());
        // constructor resolves through the chain.
        let ctor_back = inst.get(&PropertyKey::string("constructor")).unwrap();
        assert!(ctor_back.as_object().unwrap().ptr_eq(&ctor));
    }

    #[test]
    fn test_construct_return_override() {
        let realm = Realm::new();
        let replacement = realm.object();
        replacement
            .set(&PropertyKey::string("marker"), Value::string("replaced"))
            .unwrap();

        let replacement_for_ctor = replacement.clone();
        let overriding = realm.function("Overriding", 0, move |_cx| {
            Ok(Value::object(replacement_for_ctor.clone()))
        });
        let out = realm.construct(&overriding, &[]).unwrap();
        assert!(out.ptr_eq(&replacement));

        // A primitive return does not override.
        let plain = realm.function("Plain", 0, |cx| {
            let receiver = cx.receiver.as_object().cloned().unwrap();
            receiver.set(&PropertyKey::string("made"), Value::boolean(true))?;
            Ok(Value::string("ignored"))
        });
        let out = realm.construct(&plain, &[]).unwrap();
        assert_eq!(
            out.get(&PropertyKey::string("made")).unwrap(),
            Value::boolean(true)
        );
    }

    #[test]
    fn test_construct_falls_back_to_root_prototype() {
        let realm = Realm::new();
        let ctor = realm.function("Loose", 0, |_cx| Ok(Value::Undefined));
        // Clobber the prototype with a primitive.
        let _ = ctor.define_property(
            PropertyKey::string("prototype"),
            PropertyDescriptor::data_with_attrs(
                Value::number(7.0),
                PropertyAttributes {
                    writable: true,
                    enumerable: false,
                    configurable: false,
                },
            ),
        );

        let inst = realm.construct(&ctor, &[]).unwrap();
        assert!(realm.object_prototype().is_prototype_of(&inst));
    }

    #[test]
    fn test_function_prototype_methods_dispatch() {
        let realm = Realm::new();
        let func = realm.function("speak", 0, |cx| {
            let receiver = cx.receiver.as_object().cloned().unwrap();
            receiver.get(&PropertyKey::string("sound"))
        });
        let cow = realm.object();
        cow.set(&PropertyKey::string("sound"), Value::string("moo")).unwrap();

        // f.call(cow) through the method on Function.prototype.
        let call_method = func.get(&PropertyKey::string("call")).unwrap();
        let out = function::call(
            &call_method,
            Value::object(func.clone()),
            &[Value::object(cow.clone())],
        )
        .unwrap();
        assert_eq!(out, Value::string("moo"));

        // f.apply(cow, args) likewise.
        let apply_method = func.get(&PropertyKey::string("apply")).unwrap();
        let out = function::call(
            &apply_method,
            Value::object(func.clone()),
            &[Value::object(cow.clone()), Value::Undefined],
        )
        .unwrap();
        assert_eq!(out, Value::string("moo"));

        // f.bind(cow) returns a function locked to cow.
        let bind_method = func.get(&PropertyKey::string("bind")).unwrap();
        let bound = function::call(
            &bind_method,
            Value::object(func),
            &[Value::object(cow)],
        )
        .unwrap();
        let other = realm.object();
        other.set(&PropertyKey::string("sound"), Value::string("quack")).unwrap();
        let out = function::call(&bound, Value::object(other), &[]).unwrap();
        assert_eq!(out, Value::string("moo"));
    }

    #[test]
    fn test_arguments_object_shape() {
        let realm = Realm::new();
        let args = realm.arguments_object(&[Value::string("a"), Value::number(2.0)]);
        assert_eq!(
            args.get(&PropertyKey::string("length")).unwrap(),
            Value::number(2.0)
        );
        assert_eq!(args.get(&PropertyKey::index(0)).unwrap(), Value::string("a"));
        // length does not enumerate, the indices do.
        assert_eq!(
            args.own_keys(),
            vec![PropertyKey::index(0), PropertyKey::index(1)]
        );
    }

    #[test]
    fn test_apply_consumes_arguments_object() {
        let realm = Realm::new();
        let join = realm.function("join", 0, |cx| {
            let mut out = String::new();
            for arg in cx.args {
                out.push_str(&crate::convert::to_display_string(arg));
            }
            Ok(Value::string(&out))
        });
        let args = realm.arguments_object(&[Value::string("6"), Value::string("x")]);
        let out = function::apply(&join, Value::Undefined, &Value::object(args)).unwrap();
        assert_eq!(out, Value::string("6x"));
    }

    #[test]
    fn test_builder_with_explicit_prototype() {
        let realm = Realm::new();
        // A prototype-less lookup table plus a hidden slot.
        let table = realm
            .build_object()
            .prototype(None)
            .prop("entry", Value::number(1.0))
            .prop_with_attrs(
                PropertyKey::string("internal"),
                Value::number(2.0),
                PropertyAttributes::builtin_method(),
            )
            .build()
            .unwrap();

        assert!(table.prototype().is_none());
        assert!(!table.has(&PropertyKey::string("toString")));
        assert_eq!(table.own_keys(), vec![PropertyKey::string("entry")]);
        assert!(table.has_own(&PropertyKey::string("internal")));
    }

    #[test]
    fn test_object_builder() {
        let realm = Realm::new();
        let book = realm
            .build_object()
            .prop("title", Value::string("The Principles"))
            .prop("year", Value::number(2014.0))
            .method("describe", 0, |cx| {
                let receiver = cx.receiver.as_object().cloned().unwrap();
                receiver.get(&PropertyKey::string("title"))
            })
            .build()
            .unwrap();

        assert_eq!(
            book.own_keys(),
            vec![PropertyKey::string("title"), PropertyKey::string("year")]
        );
        let describe = book.get(&PropertyKey::string("describe")).unwrap();
        let out = function::call(&describe, Value::object(book), &[]).unwrap();
        assert_eq!(out, Value::string("The Principles"));
    }

    #[test]
    fn test_builder_accessor_reads_backing_slot() {
        let realm = Realm::new();
        let obj = realm
            .build_object()
            .prop("_name", Value::string("Corey"))
            .accessor(
                "name",
                Some(Arc::new(|cx: &CallContext<'_>| {
                    let receiver = cx.receiver.as_object().cloned().unwrap();
                    receiver.get(&PropertyKey::string("_name"))
                })),
                Some(Arc::new(|cx: &CallContext<'_>| {
                    let receiver = cx.receiver.as_object().cloned().unwrap();
                    receiver.set(&PropertyKey::string("_name"), cx.arg(0))?;
                    Ok(Value::Undefined)
                })),
            )
            .build()
            .unwrap();

        assert_eq!(
            obj.get(&PropertyKey::string("name")).unwrap(),
            Value::string("Corey")
        );
        obj.set(&PropertyKey::string("name"), Value::string("Molly")).unwrap();
        assert_eq!(
            obj.get(&PropertyKey::string("name")).unwrap(),
            Value::string("Molly")
        );
        assert_eq!(
            obj.get(&PropertyKey::string("_name")).unwrap(),
            Value::string("Molly")
        );
    }

    #[test]
    fn test_custom_hook_names() {
        let realm = Realm::with_options(RealmOptions {
            primitive_hook: String::from("primValue"),
            string_hook: String::from("describe"),
        });
        assert_eq!(realm.options().primitive_hook, "primValue");
        assert_eq!(realm.options().string_hook, "describe");
    }
}
