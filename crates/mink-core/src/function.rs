//! Function invocation
//!
//! Functions are ordinary objects carrying an invocation payload. They have no
//! inherent receiver: every call supplies one explicitly, except for bound
//! functions, which substitute the receiver captured at bind time.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

use crate::context::CallContext;
use crate::error::{ModelError, ModelResult};
use crate::object::{ObjectOps, ObjectRef, PropertyDescriptor, PropertyKey, ScriptObject};
use crate::value::Value;

use mink_gc::GcRef;

/// A native function body.
pub type NativeFn = Arc<dyn Fn(&CallContext<'_>) -> ModelResult<Value> + Send + Sync>;

/// The invocation payload of a callable object.
pub enum Callable {
    /// A host-supplied body.
    Native(NativeFn),
    /// A bound function: fixed receiver, partial arguments, inner target.
    Bound(BoundFn),
}

/// State captured by [`bind`].
pub struct BoundFn {
    /// The function the bound function forwards to (always a native one,
    /// binding a bound function flattens).
    pub target: ObjectRef,
    /// The receiver every invocation will use, whatever the caller supplies.
    pub receiver: Value,
    /// Arguments prepended to every invocation.
    pub bound_args: Vec<Value>,
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Callable::Native"),
            Self::Bound(bound) => f
                .debug_struct("Callable::Bound")
                .field("bound_args", &bound.bound_args.len())
                .finish(),
        }
    }
}

/// Invoke a callable value with an explicit receiver.
pub fn call(callee: &Value, receiver: Value, args: &[Value]) -> ModelResult<Value> {
    match callee.as_object() {
        Some(func) => call_object(func, receiver, args),
        None => Err(ModelError::type_error(format!(
            "{} is not a function",
            callee.type_of()
        ))),
    }
}

/// Invoke a callable object with an explicit receiver.
///
/// For a bound function the supplied receiver is ignored in favor of the
/// bound one, and bound arguments are prepended.
pub fn call_object(func: &ObjectRef, receiver: Value, args: &[Value]) -> ModelResult<Value> {
    match func.callable() {
        None => Err(ModelError::type_error("object is not callable")),
        Some(Callable::Native(body)) => {
            let cx = CallContext { receiver, args };
            (body.as_ref())(&cx)
        }
        Some(Callable::Bound(bound)) => {
            let mut full: SmallVec<[Value; 8]> =
                SmallVec::with_capacity(bound.bound_args.len() + args.len());
            full.extend(bound.bound_args.iter().cloned());
            full.extend(args.iter().cloned());
            call_object(&bound.target, bound.receiver.clone(), &full)
        }
    }
}

/// Invoke with the arguments supplied as one array-like object
/// (`length` plus index slots). `Undefined`/`Null` stand for "no arguments".
pub fn apply(func: &ObjectRef, receiver: Value, args_list: &Value) -> ModelResult<Value> {
    let args = extract_args(args_list)?;
    call_object(func, receiver, &args)
}

fn extract_args(list: &Value) -> ModelResult<Vec<Value>> {
    match list {
        Value::Undefined | Value::Null => Ok(Vec::new()),
        Value::Object(obj) => {
            let length = obj
                .get(&PropertyKey::string("length"))?
                .as_number()
                .unwrap_or(0.0);
            let length = if length.is_finite() && length > 0.0 {
                length.min(f64::from(u32::MAX)) as usize
            } else {
                0
            };
            let mut out = Vec::with_capacity(length);
            for i in 0..length {
                out.push(obj.get(&PropertyKey::index(i as u32))?);
            }
            Ok(out)
        }
        _ => Err(ModelError::type_error("argument list must be an object")),
    }
}

/// Produce a new function whose invocations always use `receiver` and prepend
/// `partial_args`.
///
/// Binding an already-bound function can never change the receiver: the
/// original bound receiver is kept and only the partial arguments grow.
pub fn bind(func: &ObjectRef, receiver: Value, partial_args: &[Value]) -> ModelResult<ObjectRef> {
    let (target, bound_receiver, bound_args) = match func.callable() {
        None => {
            return Err(ModelError::type_error("bind target is not a function"));
        }
        Some(Callable::Bound(inner)) => {
            let mut all = inner.bound_args.clone();
            all.extend_from_slice(partial_args);
            (inner.target.clone(), inner.receiver.clone(), all)
        }
        Some(Callable::Native(_)) => (func.clone(), receiver, partial_args.to_vec()),
    };

    let bound = GcRef::new(ScriptObject::new_callable(
        func.prototype(),
        Callable::Bound(BoundFn {
            target,
            receiver: bound_receiver,
            bound_args,
        }),
    ));

    let target_name = match func.get(&PropertyKey::string("name"))? {
        Value::String(s) => s.as_str().to_string(),
        _ => String::new(),
    };
    let declared = func
        .get(&PropertyKey::string("length"))?
        .as_number()
        .unwrap_or(0.0);
    let remaining = (declared - partial_args.len() as f64).max(0.0);

    let _ = bound.define_property(
        PropertyKey::string("name"),
        PropertyDescriptor::function_length(Value::string(&format!("bound {target_name}"))),
    );
    let _ = bound.define_property(
        PropertyKey::string("length"),
        PropertyDescriptor::function_length(Value::number(remaining)),
    );
    Ok(bound)
}

/// Whether `value` delegates (directly or transitively) to `ctor`'s
/// `prototype` object. Primitives are never instances.
pub fn instance_of(value: &Value, ctor: &ObjectRef) -> ModelResult<bool> {
    let proto_value = ctor.get(&PropertyKey::string("prototype"))?;
    let proto = proto_value.as_object().ok_or_else(|| {
        ModelError::type_error("constructor has no object-valued \"prototype\"")
    })?;
    let Some(obj) = value.as_object() else {
        return Ok(false);
    };
    Ok(proto.is_prototype_of(obj))
}
