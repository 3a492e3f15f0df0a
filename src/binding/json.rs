//! The whole-body JSON pass and the structural required-field probe.
use http::header::CONTENT_TYPE;
use http::HeaderMap;

use crate::binding::errors::{ConversionError, JsonBodyError, RequiredFieldError};
use crate::binding::plan::{FieldKind, Plan};
use crate::binding::schema::{ScalarKind, Shape};
use crate::binding::tag::SourceKind;
use crate::binding::value::Value;
use crate::binding::BindError;
use crate::request::body::BufferedBody;

/// Check that the `Content-Type` header is set to `application/json`, or another
/// `application/*+json` MIME type.
pub(crate) fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE) else {
        return false;
    };
    let Ok(content_type) = content_type.to_str() else {
        return false;
    };
    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return false;
    };
    mime.type_() == mime::APPLICATION
        && (mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON))
}

/// Parse the buffered body as a JSON document.
///
/// An empty body is tolerated as a no-op (`None`); anything else must be valid
/// JSON or the bind fails before any per-field decoding runs.
pub(crate) fn parse_body(body: &BufferedBody) -> Result<Option<serde_json::Value>, JsonBodyError> {
    if body.bytes.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(&body.bytes)
        .map(Some)
        .map_err(|source| JsonBodyError { source })
}

/// Navigate a dotted key path through nested JSON objects.
pub(crate) fn lookup_path<'a>(
    document: &'a serde_json::Value,
    dotted: &str,
) -> Option<&'a serde_json::Value> {
    let mut node = document;
    for segment in dotted.split('.') {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

/// The structural presence rule for JSON-required fields.
///
/// A present leaf satisfies the requirement. A missing leaf fails it *only when its
/// immediate parent path exists*: when the parent is itself absent, the field is
/// treated as satisfied. The asymmetry is preserved deliberately for compatibility
/// with the original rule.
pub(crate) fn required_path_satisfied(document: &serde_json::Value, dotted: &str) -> bool {
    if lookup_path(document, dotted).is_some() {
        return true;
    }
    if let Some(idx) = dotted.rfind('.') {
        if lookup_path(document, &dotted[..idx]).is_none() {
            return true;
        }
    }
    false
}

/// The required pre-pass: every field whose `json` tag carries the `required`
/// option must have its dotted path present in the body, per
/// [`required_path_satisfied`].
pub(crate) fn check_required(
    plan: &Plan,
    document: &serde_json::Value,
) -> Result<(), RequiredFieldError> {
    for field in &plan.fields {
        let required = field
            .tags
            .iter()
            .any(|tag| tag.source == SourceKind::Json && tag.required);
        if required && !required_path_satisfied(document, &field.json_path) {
            return Err(RequiredFieldError {
                field: field.name.clone(),
                json_path: field.json_path.clone(),
            });
        }
    }
    Ok(())
}

/// The whole-body pass: for every field whose dotted JSON path resolves in the
/// document, convert the node into the field's shape and install it. Later
/// per-field source writes override these values.
pub(crate) fn apply_body(
    plan: &Plan,
    document: &serde_json::Value,
    root: &mut Value,
) -> Result<(), BindError> {
    for field in &plan.fields {
        // Files and custom hooks are never JSON-sourced.
        if matches!(field.kind, FieldKind::File | FieldKind::Custom(_)) {
            continue;
        }
        let Some(node) = lookup_path(document, &field.json_path) else {
            continue;
        };
        let value = json_to_value(&field.shape, node)?;
        // An explicit JSON `null` leaves the slot untouched: a nil pointer must
        // not come out as an allocated pointer to a zero value.
        if value.is_null() {
            continue;
        }
        *field.slot(root) = value.wrap(field.ptr_depth);
    }
    Ok(())
}

/// Convert a JSON node into a value of the given shape.
fn json_to_value(shape: &Shape, node: &serde_json::Value) -> Result<Value, BindError> {
    let (depth, core) = shape.strip_optional();
    if node.is_null() {
        return Ok(Value::Null);
    }
    let leaf = match core {
        Shape::Scalar(kind) => scalar_from_json(*kind, node)?,
        Shape::List {
            element,
            fixed_size,
        } => {
            let Some(items) = node.as_array() else {
                return Err(mismatch(node, core).into());
            };
            // Mirror the lenient array semantics of a whole-struct unmarshal: a
            // fixed-length field takes at most its declared length, and missing
            // tail slots come out zero-valued.
            let take = fixed_size.unwrap_or(items.len());
            let values = items
                .iter()
                .take(take)
                .map(|item| json_to_value(element, item))
                .collect::<Result<Vec<_>, _>>()?;
            Value::List(values)
        }
        Shape::Struct(_) | Shape::Map => Value::Json(node.clone()),
        Shape::Text(codec) => {
            let Some(text) = node.as_str() else {
                return Err(mismatch(node, core).into());
            };
            (codec.parse)(text).map_err(|_| ConversionError {
                text: text.to_owned(),
                target_type: codec.name.to_owned(),
            })?
        }
        Shape::Custom(_) | Shape::File | Shape::Optional(_) => {
            return Ok(Value::Null);
        }
    };
    Ok(leaf.wrap(depth))
}

fn scalar_from_json(kind: ScalarKind, node: &serde_json::Value) -> Result<Value, ConversionError> {
    let value = match kind {
        ScalarKind::Bool => node.as_bool().map(Value::Bool),
        ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64 => {
            node.as_i64().map(Value::Int)
        }
        ScalarKind::U8 | ScalarKind::U16 | ScalarKind::U32 | ScalarKind::U64 => {
            node.as_u64().map(Value::UInt)
        }
        ScalarKind::F32 | ScalarKind::F64 => node.as_f64().map(Value::Float),
        ScalarKind::String => node.as_str().map(|s| Value::Str(s.to_owned())),
    };
    value.ok_or_else(|| ConversionError {
        text: node.to_string(),
        target_type: kind.type_name().to_owned(),
    })
}

fn mismatch(node: &serde_json::Value, shape: &Shape) -> ConversionError {
    ConversionError {
        text: node.to_string(),
        target_type: shape.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_detection_accepts_json_and_json_suffixes() {
        let mut headers = HeaderMap::new();
        assert!(!is_json_content_type(&headers));

        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        assert!(is_json_content_type(&headers));

        headers.insert(CONTENT_TYPE, "application/hal+json".parse().unwrap());
        assert!(is_json_content_type(&headers));

        headers.insert(
            CONTENT_TYPE,
            "application/json; charset=utf-8".parse().unwrap(),
        );
        assert!(is_json_content_type(&headers));

        headers.insert(CONTENT_TYPE, "application/xml".parse().unwrap());
        assert!(!is_json_content_type(&headers));
    }

    #[test]
    fn an_empty_body_is_a_no_op() {
        assert!(parse_body(&BufferedBody::empty()).unwrap().is_none());
    }

    #[test]
    fn a_malformed_body_is_fatal() {
        let err = parse_body(&BufferedBody::new("{not json")).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Failed to deserialize the body as a JSON document");
    }

    #[test]
    fn lookup_navigates_dotted_paths() {
        let document = serde_json::json!({"a": {"b": {"c": 1}}});
        assert_eq!(
            lookup_path(&document, "a.b.c"),
            Some(&serde_json::json!(1))
        );
        assert!(lookup_path(&document, "a.b.missing").is_none());
        assert!(lookup_path(&document, "a.c").is_none());
    }

    #[test]
    fn a_missing_leaf_under_an_existing_parent_is_not_satisfied() {
        let document = serde_json::json!({"meta": {}});
        assert!(!required_path_satisfied(&document, "meta.n"));
    }

    #[test]
    fn a_missing_leaf_under_a_missing_parent_is_satisfied() {
        // The asymmetric compatibility rule: an absent ancestor cannot signal
        // "required leaf missing".
        let document = serde_json::json!({});
        assert!(required_path_satisfied(&document, "meta.n"));
    }

    #[test]
    fn a_missing_top_level_leaf_is_not_satisfied() {
        let document = serde_json::json!({"other": 1});
        assert!(!required_path_satisfied(&document, "n"));
    }
}
