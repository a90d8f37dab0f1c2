//! Mixin composition
//!
//! Mixins copy own slots from a supplier onto a receiver at the descriptor
//! level, so accessor slots arrive as accessors instead of being read through
//! and flattened into data.

use crate::error::ModelResult;
use crate::object::ObjectRef;

/// Options for [`copy_slots`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CopyOptions {
    /// Also copy slots hidden from enumeration.
    pub include_non_enumerable: bool,
}

/// Copy the supplier's own slots onto the receiver, descriptors and all.
///
/// Slots are installed in the supplier's insertion order with their exact
/// attributes. Ancestor slots are not copied; delegation is the receiver's
/// own business. Fails if the receiver refuses a definition (non-extensible,
/// or an incompatible non-configurable slot already present).
pub fn copy_slots(
    receiver: &ObjectRef,
    supplier: &ObjectRef,
    options: CopyOptions,
) -> ModelResult<()> {
    let keys = if options.include_non_enumerable {
        supplier.own_property_names()
    } else {
        supplier.own_keys()
    };
    for key in keys {
        if let Some(descriptor) = supplier.own_property(&key) {
            receiver.define_property(key, descriptor)?;
        }
    }
    Ok(())
}
