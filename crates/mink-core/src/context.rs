//! Call contexts
//!
//! A call context is the ephemeral binding of one invocation: the receiver
//! (the implicit subject of the call) and the argument sequence. It is created
//! at call time and discarded when the call returns; nothing persists it.

use crate::value::Value;

/// The bindings of a single invocation.
///
/// Arity is advisory: callers may pass any number of arguments, and
/// [`arg`](Self::arg) resolves missing positions to the absence marker.
pub struct CallContext<'a> {
    /// The receiver bound for this invocation (may be any value, including
    /// the absence marker for receiver-less calls).
    pub receiver: Value,
    /// The arguments, in order.
    pub args: &'a [Value],
}

impl CallContext<'_> {
    /// The argument at `index`, or the absence marker when not supplied.
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or(Value::Undefined)
    }

    /// How many arguments were actually supplied.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether the call was made with no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}
