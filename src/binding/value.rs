//! The dynamic value tree that binding materializes, plus the text-to-value
//! conversion registry.
use crate::binding::errors::{ConversionError, UnsupportedTypeError};
use crate::binding::multipart::UploadedFile;
use crate::binding::schema::{ScalarKind, Shape, StructSchema};
use crate::binding::BindError;

/// A dynamically-typed value, shaped by a [`StructSchema`].
///
/// Pointer indirection is explicit: every allocated level is one [`Value::Some`]
/// wrapper, and [`Value::Null`] is an unset slot (a nil pointer, or a field that no
/// source resolved). A field declared at pointer depth `N` that received a value
/// dereferences exactly `N` times down to its leaf.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// An unset slot or a nil pointer level.
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    /// One allocated pointer level.
    Some(Box<Value>),
    List(Vec<Value>),
    /// A map or struct-as-unit payload, decoded through the JSON codec.
    Json(serde_json::Value),
    /// A nested structure, fields parallel to its schema.
    Struct(Vec<Value>),
    File(UploadedFile),
}

impl Value {
    /// Dereference one pointer level, if this value is an allocated pointer.
    pub fn pointee(&self) -> Option<&Value> {
        match self {
            Value::Some(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Is this slot still unset?
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A fresh structure value with every field unset.
    pub(crate) fn empty_struct(schema: &StructSchema) -> Value {
        Value::Struct(vec![Value::Null; schema.fields.len()])
    }

    /// Wrap this value in `depth` pointer levels, innermost first.
    ///
    /// This is the outward half of materialization: the leaf is computed first,
    /// then the chain is reconstructed to the field's full declared depth.
    pub(crate) fn wrap(self, depth: usize) -> Value {
        let mut value = self;
        for _ in 0..depth {
            value = Value::Some(Box::new(value));
        }
        value
    }
}

/// Convert one raw text into a scalar leaf.
///
/// Empty text materializes the kind's zero value rather than erroring, so query
/// strings like `?a=&b` bind numeric fields to zero.
pub(crate) fn parse_scalar(kind: ScalarKind, text: &str) -> Result<Value, ConversionError> {
    if text.is_empty() {
        return Ok(zero_value(kind));
    }
    let error = || ConversionError {
        text: text.to_owned(),
        target_type: kind.type_name().to_owned(),
    };
    let value = match kind {
        ScalarKind::Bool => Value::Bool(text.parse::<bool>().map_err(|_| error())?),
        ScalarKind::I8 => Value::Int(text.parse::<i8>().map_err(|_| error())?.into()),
        ScalarKind::I16 => Value::Int(text.parse::<i16>().map_err(|_| error())?.into()),
        ScalarKind::I32 => Value::Int(text.parse::<i32>().map_err(|_| error())?.into()),
        ScalarKind::I64 => Value::Int(text.parse::<i64>().map_err(|_| error())?),
        ScalarKind::U8 => Value::UInt(text.parse::<u8>().map_err(|_| error())?.into()),
        ScalarKind::U16 => Value::UInt(text.parse::<u16>().map_err(|_| error())?.into()),
        ScalarKind::U32 => Value::UInt(text.parse::<u32>().map_err(|_| error())?.into()),
        ScalarKind::U64 => Value::UInt(text.parse::<u64>().map_err(|_| error())?),
        ScalarKind::F32 => Value::Float(text.parse::<f32>().map_err(|_| error())?.into()),
        ScalarKind::F64 => Value::Float(text.parse::<f64>().map_err(|_| error())?),
        ScalarKind::String => Value::Str(text.to_owned()),
    };
    Ok(value)
}

/// The zero value for a scalar kind.
pub(crate) fn zero_value(kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::Bool => Value::Bool(false),
        ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64 => Value::Int(0),
        ScalarKind::U8 | ScalarKind::U16 | ScalarKind::U32 | ScalarKind::U64 => Value::UInt(0),
        ScalarKind::F32 | ScalarKind::F64 => Value::Float(0.0),
        ScalarKind::String => Value::Str(String::new()),
    }
}

/// Convert one raw text into a leaf value for `shape`.
///
/// Scalars go through the conversion registry; struct- and map-shaped leaves are
/// decoded as one unit through the JSON codec; `Optional` wrappers are stripped
/// and re-applied around the produced leaf. Collection-shaped leaves have no text
/// representation of their own—each element is materialized independently by the
/// collection decoder.
pub(crate) fn materialize(shape: &Shape, text: &str) -> Result<Value, BindError> {
    let (depth, core) = shape.strip_optional();
    let leaf = match core {
        Shape::Scalar(kind) => parse_scalar(*kind, text)?,
        Shape::Text(codec) => (codec.parse)(text).map_err(|_| ConversionError {
            text: text.to_owned(),
            target_type: codec.name.to_owned(),
        })?,
        Shape::Struct(_) | Shape::Map => {
            let document: serde_json::Value =
                serde_json::from_str(text).map_err(|_| ConversionError {
                    text: text.to_owned(),
                    target_type: core.type_name(),
                })?;
            Value::Json(document)
        }
        Shape::List { .. } | Shape::Custom(_) | Shape::File => {
            return Err(UnsupportedTypeError {
                type_name: core.type_name(),
            }
            .into());
        }
        Shape::Optional(_) => unreachable!("strip_optional removed all Optional wrappers"),
    };
    Ok(leaf.wrap(depth))
}

/// Render a bound structure value into a JSON document, guided by its schema.
///
/// Unset slots render as zero values (`0`, `""`, `false`, `[]`, `{}`) and unset
/// optionals as `null`, so the typed facade observes zero-value semantics for
/// fields that no source resolved.
pub(crate) fn render(schema: &StructSchema, value: &Value) -> serde_json::Value {
    render_struct(schema, value)
}

fn render_struct(schema: &StructSchema, value: &Value) -> serde_json::Value {
    match value {
        Value::Json(document) => document.clone(),
        Value::Struct(fields) => {
            let mut object = serde_json::Map::with_capacity(schema.fields.len());
            for (field, slot) in schema.fields.iter().zip(fields) {
                object.insert(field.name.to_owned(), render_shape(&field.shape, slot));
            }
            serde_json::Value::Object(object)
        }
        // An unset struct renders every field from its own unset state.
        _ => {
            let mut object = serde_json::Map::with_capacity(schema.fields.len());
            for field in &schema.fields {
                object.insert(field.name.to_owned(), render_shape(&field.shape, &Value::Null));
            }
            serde_json::Value::Object(object)
        }
    }
}

fn render_shape(shape: &Shape, value: &Value) -> serde_json::Value {
    match shape {
        Shape::Optional(inner) => match value {
            Value::Null => serde_json::Value::Null,
            Value::Some(pointee) => render_shape(inner, pointee),
            other => render_shape(inner, other),
        },
        Shape::Scalar(kind) => match value {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::UInt(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Str(s) => serde_json::Value::from(s.clone()),
            _ => untyped(&zero_value(*kind)),
        },
        Shape::List {
            element,
            fixed_size,
        } => match value {
            Value::List(items) => {
                let mut rendered: Vec<_> = items
                    .iter()
                    .map(|item| render_shape(element, item))
                    .collect();
                // A fixed-length field that received fewer values than its
                // declared length (only reachable through the whole-body JSON
                // pass) zero-fills the tail.
                if let Some(len) = fixed_size {
                    while rendered.len() < *len {
                        rendered.push(render_shape(element, &Value::Null));
                    }
                }
                serde_json::Value::Array(rendered)
            }
            Value::Json(document) => document.clone(),
            // Unset: a growable collection is empty, a fixed one is zero-filled.
            _ => match fixed_size {
                Some(len) => serde_json::Value::Array(
                    (0..*len).map(|_| render_shape(element, &Value::Null)).collect(),
                ),
                None => serde_json::Value::Array(Vec::new()),
            },
        },
        Shape::Struct(schema) => render_struct(schema, value),
        Shape::Map => match value {
            Value::Json(document) => document.clone(),
            _ => serde_json::Value::Object(serde_json::Map::new()),
        },
        Shape::Text(_) | Shape::Custom(_) | Shape::File => untyped(value),
    }
}

/// Render a value without schema guidance. Used for hook-produced leaves, whose
/// shape only the hook knows.
fn untyped(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::UInt(u) => serde_json::Value::from(*u),
        Value::Float(f) => serde_json::Value::from(*f),
        Value::Str(s) => serde_json::Value::from(s.clone()),
        Value::Some(pointee) => untyped(pointee),
        Value::List(items) => serde_json::Value::Array(items.iter().map(untyped).collect()),
        Value::Json(document) => document.clone(),
        Value::Struct(fields) => {
            serde_json::Value::Array(fields.iter().map(untyped).collect())
        }
        Value::File(file) => serde_json::to_value(file).unwrap_or(serde_json::Value::Null),
    }
}
