//! Collection-shaped field decoding: growable lists and fixed-length arrays.
use crate::binding::errors::{CardinalityError, UnsupportedTypeError};
use crate::binding::plan::{FieldKind, FieldPlan};
use crate::binding::sources::resolve_field_texts;
use crate::binding::value::{materialize, Value};
use crate::binding::BindError;
use crate::binding::binder::BindRequest;
use crate::request::path::PathParams;

/// Decode one collection-shaped field into `root`.
///
/// The resolved raw values become the collection's elements, one per value, in
/// encounter order. A fixed-length field must receive exactly its declared number
/// of values; a growable one is reallocated to the resolved length, discarding any
/// previous contents (a JSON-sourced value for the same field is overridden
/// wholesale).
pub(crate) fn decode(
    field: &FieldPlan,
    req: &BindRequest<'_>,
    params: &PathParams,
    root: &mut Value,
) -> Result<(), BindError> {
    let FieldKind::Collection {
        element,
        elem_ptr_depth,
        fixed_size,
    } = &field.kind
    else {
        // Defensive: only collection-shaped fields may reach this decoder.
        return Err(UnsupportedTypeError {
            type_name: field.shape.type_name(),
        }
        .into());
    };

    // A default substitutes as a single-element list, which can therefore never
    // satisfy a fixed-length field with more than one slot.
    let texts = resolve_field_texts(&field.tags, req, params);
    if texts.is_empty() {
        return Ok(());
    }

    if let Some(expected) = fixed_size {
        if texts.len() != *expected {
            return Err(CardinalityError {
                field: field.name.clone(),
                expected: *expected,
                actual: texts.len(),
            }
            .into());
        }
    }

    let mut items = Vec::with_capacity(texts.len());
    for text in &texts {
        // Each element materializes independently; struct/map elements go through
        // the JSON codec one document at a time.
        let leaf = materialize(element, text)?;
        items.push(leaf.wrap(*elem_ptr_depth));
    }

    *field.slot(root) = Value::List(items).wrap(field.ptr_depth);
    Ok(())
}
