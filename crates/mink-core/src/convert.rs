//! Value coercion
//!
//! Relational comparison between objects goes through a two-stage hook
//! fallback: the primitive-conversion hook first, then the string-conversion
//! hook if the first is absent or keeps returning objects. Both hooks are
//! looked up through the delegation chain, so overriding one on a prototype
//! affects every instance sharing it.

use std::cmp::Ordering;

use crate::error::{ModelError, ModelResult};
use crate::function;
use crate::object::{ObjectOps, PropertyKey};
use crate::realm::Realm;
use crate::value::{Value, format_number};

/// Reduce a value to a primitive.
///
/// Primitives pass through. Objects are asked via the realm's hooks, invoked
/// with the object itself as receiver; a hook returning an object falls
/// through to the next stage. If neither hook produces a primitive the
/// conversion fails.
pub fn to_primitive(realm: &Realm, value: &Value) -> ModelResult<Value> {
    let Some(obj) = value.as_object() else {
        return Ok(value.clone());
    };
    let options = realm.options();
    for hook in [options.primitive_hook.as_str(), options.string_hook.as_str()] {
        let candidate = obj.get(&PropertyKey::string(hook))?;
        if candidate.is_callable() {
            let result = function::call(&candidate, value.clone(), &[])?;
            if result.is_primitive() {
                return Ok(result);
            }
        }
    }
    Err(ModelError::type_error(
        "cannot convert object to a primitive value",
    ))
}

/// Numeric view of a primitive. Objects read as NaN; run
/// [`to_primitive`] first.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => {
            let trimmed = s.as_str().trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Object(_) => f64::NAN,
    }
}

/// Printable view of a primitive. Objects read as the opaque default; run
/// [`to_primitive`] first for hook-aware conversion.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Undefined => String::from("undefined"),
        Value::Null => String::from("null"),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.as_str().to_string(),
        Value::Object(_) => String::from("[object Object]"),
    }
}

/// Relational comparison with coercion.
///
/// Both sides reduce to primitives; a string pair compares lexicographically,
/// anything else compares numerically. `None` means unordered (a NaN operand).
pub fn compare(realm: &Realm, a: &Value, b: &Value) -> ModelResult<Option<Ordering>> {
    let pa = to_primitive(realm, a)?;
    let pb = to_primitive(realm, b)?;
    if let (Value::String(sa), Value::String(sb)) = (&pa, &pb) {
        return Ok(Some(sa.cmp(sb)));
    }
    Ok(to_number(&pa).partial_cmp(&to_number(&pb)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_primitives_pass_through() {
        let realm = Realm::new();
        assert_eq!(
            to_primitive(&realm, &Value::number(4.0)).unwrap(),
            Value::number(4.0)
        );
        assert!(to_primitive(&realm, &Value::Undefined).unwrap().is_undefined());
    }

    #[test]
    fn test_to_number_rules() {
        assert!(to_number(&Value::Undefined).is_nan());
        assert_eq!(to_number(&Value::Null), 0.0);
        assert_eq!(to_number(&Value::boolean(true)), 1.0);
        assert_eq!(to_number(&Value::string("  42 ")), 42.0);
        assert_eq!(to_number(&Value::string("")), 0.0);
        assert!(to_number(&Value::string("not a number")).is_nan());
    }

    #[test]
    fn test_default_value_of_defers_to_to_string() {
        // The root valueOf returns the object itself, so conversion falls
        // through to toString.
        let realm = Realm::new();
        let obj = realm.object();
        let prim = to_primitive(&realm, &Value::object(obj)).unwrap();
        assert_eq!(prim, Value::string("[object Object]"));
    }

    #[test]
    fn test_prototype_hook_override_affects_instances() {
        let realm = Realm::new();
        let ctor = realm.function("Dog", 2, |cx| {
            let receiver = cx.receiver.as_object().cloned().unwrap();
            receiver.set(&PropertyKey::string("name"), cx.arg(0))?;
            Ok(Value::Undefined)
        });
        let dog1 = realm.construct(&ctor, &[Value::string("Wendy")]).unwrap();
        let dog2 = realm.construct(&ctor, &[Value::string("Winnie")]).unwrap();

        // Without an override, objects are unordered in a useful sense but
        // both coerce to the same default string.
        assert_eq!(
            compare(&realm, &Value::object(dog1.clone()), &Value::object(dog2.clone())).unwrap(),
            Some(Ordering::Equal)
        );

        // Installing valueOf on the shared prototype changes every instance.
        let proto = ctor.get(&PropertyKey::string("prototype")).unwrap();
        let proto = proto.as_object().unwrap();
        let value_of = realm.function("valueOf", 0, |cx| {
            let receiver = cx.receiver.as_object().cloned().unwrap();
            receiver.get(&PropertyKey::string("name"))
        });
        proto
            .set(&PropertyKey::string("valueOf"), Value::object(value_of))
            .unwrap();

        assert_eq!(
            compare(&realm, &Value::object(dog1.clone()), &Value::object(dog2.clone())).unwrap(),
            Some(Ordering::Less)
        );

        // Dropping back to a toString override exercises the second stage.
        assert!(proto.delete(&PropertyKey::string("valueOf")));
        let to_string = realm.function("toString", 0, |cx| {
            let receiver = cx.receiver.as_object().cloned().unwrap();
            receiver.get(&PropertyKey::string("name"))
        });
        proto
            .set(&PropertyKey::string("toString"), Value::object(to_string))
            .unwrap();
        assert_eq!(
            compare(&realm, &Value::object(dog1), &Value::object(dog2)).unwrap(),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_numeric_and_mixed_comparison() {
        let realm = Realm::new();
        assert_eq!(
            compare(&realm, &Value::number(1.0), &Value::number(2.0)).unwrap(),
            Some(Ordering::Less)
        );
        // A string paired with a number compares numerically.
        assert_eq!(
            compare(&realm, &Value::string("10"), &Value::number(9.0)).unwrap(),
            Some(Ordering::Greater)
        );
        // NaN operands are unordered.
        assert_eq!(
            compare(&realm, &Value::string("x"), &Value::number(1.0)).unwrap(),
            None
        );
    }

    #[test]
    fn test_hopeless_object_conversion_fails() {
        let realm = Realm::new();
        let bare = realm.object_with_prototype(None);
        assert!(matches!(
            to_primitive(&realm, &Value::object(bare)),
            Err(ModelError::Type(_))
        ));
    }
}
