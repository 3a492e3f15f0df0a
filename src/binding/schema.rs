//! Schema descriptions for bindable structures.
//!
//! Rust has no runtime reflection, so the binder works against an explicit
//! description of the target structure: a [`StructSchema`] lists the fields, each
//! field carries a [`Shape`] and the raw tag annotations that decide which request
//! locations may supply its value.
use std::fmt;
use std::sync::Arc;

use crate::binding::binder::BindRequest;
use crate::binding::value::Value;
use crate::request::path::PathParams;

/// The primitive leaf kinds the text conversion registry knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
}

impl ScalarKind {
    /// The name used in diagnostics when a conversion into this kind fails.
    pub(crate) fn type_name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::String => "string",
        }
    }
}

/// The shape of a field: what kind of value must be materialized for it.
///
/// Pointer indirection is explicit—`Optional` adds one level, and levels nest to
/// arbitrary depth. The binder allocates missing levels on demand whenever a value
/// is produced, so a bound field is never left with a dangling `Null` in the middle
/// of its chain.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Shape {
    /// A primitive leaf, converted from text via the scalar conversion registry.
    Scalar(ScalarKind),
    /// One level of pointer indirection around the inner shape.
    Optional(Box<Shape>),
    /// A growable (`fixed_size: None`) or fixed-length collection.
    List {
        element: Box<Shape>,
        fixed_size: Option<usize>,
    },
    /// A nested structure. Its fields are flattened into the parent's decode
    /// sequence at this position.
    Struct(Arc<StructSchema>),
    /// A string-keyed JSON object, decoded as one unit through the JSON codec.
    Map,
    /// A leaf parsed from raw text by a caller-supplied codec. Unlike
    /// [`Custom`](Shape::Custom), it participates in normal tag-driven
    /// resolution—including as a collection element.
    Text(TextCodec),
    /// A caller-supplied decode hook. It takes priority over structural recursion
    /// for this subtree and is invoked directly, without consulting tags.
    Custom(CustomDecoder),
    /// An uploaded-file handle, resolved through the request's file source.
    File,
}

impl Shape {
    /// Convenience for one level of indirection.
    pub fn optional(inner: Shape) -> Self {
        Shape::Optional(Box::new(inner))
    }

    /// A growable collection of `element`s.
    pub fn list(element: Shape) -> Self {
        Shape::List {
            element: Box::new(element),
            fixed_size: None,
        }
    }

    /// A fixed-length collection of exactly `len` `element`s.
    pub fn array(element: Shape, len: usize) -> Self {
        Shape::List {
            element: Box::new(element),
            fixed_size: Some(len),
        }
    }

    /// Strip all `Optional` wrappers, returning the indirection depth and the core
    /// shape.
    pub(crate) fn strip_optional(&self) -> (usize, &Shape) {
        let mut depth = 0;
        let mut shape = self;
        while let Shape::Optional(inner) = shape {
            depth += 1;
            shape = inner;
        }
        (depth, shape)
    }

    /// A human-readable name for diagnostics.
    pub(crate) fn type_name(&self) -> String {
        match self {
            Shape::Scalar(kind) => kind.type_name().to_owned(),
            Shape::Optional(inner) => format!("optional {}", inner.type_name()),
            Shape::List {
                element,
                fixed_size: Some(len),
            } => format!("[{}; {len}]", element.type_name()),
            Shape::List {
                element,
                fixed_size: None,
            } => format!("[{}]", element.type_name()),
            Shape::Struct(schema) => schema.name.to_owned(),
            Shape::Map => "map".to_owned(),
            Shape::Text(codec) => codec.name.to_owned(),
            Shape::Custom(decoder) => decoder.name.to_owned(),
            Shape::File => "uploaded file".to_owned(),
        }
    }
}

/// The signature of a text-parse codec: one raw text in, the leaf [`Value`] out.
pub type TextParseFn =
    dyn Fn(&str) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> + Send + Sync;

/// A caller-supplied text-parse codec for leaf types outside the built-in scalar
/// registry.
///
/// The codec extends the conversion registry: the binder resolves the field's raw
/// text through the usual tag precedence (first match wins, defaults substitute)
/// and hands the winning text to the codec. A parse failure surfaces as a
/// [`ConversionError`](crate::binding::errors::ConversionError) carrying the
/// codec's name as the target type.
#[derive(Clone)]
pub struct TextCodec {
    pub(crate) name: &'static str,
    pub(crate) parse: Arc<TextParseFn>,
}

impl TextCodec {
    /// Wrap a parse closure under a name used in diagnostics.
    pub fn new<F>(name: &'static str, parse: F) -> Self
    where
        F: Fn(&str) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            parse: Arc::new(parse),
        }
    }
}

impl fmt::Debug for TextCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextCodec")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The signature of a caller-supplied decode hook.
///
/// The hook receives the request and the router-resolved path parameters and
/// returns the leaf [`Value`] to install, before pointer re-wrapping.
pub type CustomDecodeFn = dyn Fn(&BindRequest<'_>, &PathParams) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>
    + Send
    + Sync;

/// A caller-supplied decode hook, resolved once at plan-build time.
#[derive(Clone)]
pub struct CustomDecoder {
    pub(crate) name: &'static str,
    pub(crate) decode: Arc<CustomDecodeFn>,
}

impl CustomDecoder {
    /// Wrap a decode closure under a name used in diagnostics.
    pub fn new<F>(name: &'static str, decode: F) -> Self
    where
        F: Fn(&BindRequest<'_>, &PathParams) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            decode: Arc::new(decode),
        }
    }
}

impl fmt::Debug for CustomDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDecoder")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The description of one bindable structure.
///
/// Field declaration order is preserved in the compiled plan and determines
/// iteration order at bind time.
#[derive(Debug)]
pub struct StructSchema {
    pub(crate) name: &'static str,
    pub(crate) fields: Vec<FieldSchema>,
}

impl StructSchema {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    /// Append a field. Declaration order matters: it is the decode order.
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// The name this schema was declared under.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The description of one field: its name, its shape, and its raw tag annotations.
///
/// Annotations mirror the original struct-tag vocabulary verbatim: the recognized
/// source keys are `path`, `form`, `query`, `cookie`, `header`, `json`, `raw_body`
/// and `file_name`; `default` supplies a fallback literal shared by every source
/// tag on the field; an options suffix containing `required` marks the field
/// mandatory for JSON presence validation, e.g. `("json", "id,required")`.
///
/// A field with no recognized source annotation binds opportunistically from every
/// location, keyed by its own name.
#[derive(Debug)]
pub struct FieldSchema {
    pub(crate) name: &'static str,
    pub(crate) shape: Shape,
    pub(crate) annotations: Vec<(&'static str, &'static str)>,
}

impl FieldSchema {
    pub fn new(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            annotations: Vec::new(),
        }
    }

    /// Attach one raw tag annotation, e.g. `.annotate("query", "id,required")`.
    pub fn annotate(mut self, key: &'static str, content: &'static str) -> Self {
        self.annotations.push((key, content));
        self
    }
}

/// A type that can be bound from an incoming request through the typed facade.
///
/// The schema is compiled into a binding plan on first use and cached for the
/// lifetime of the [`Binder`](crate::binding::Binder), keyed by `TypeId`.
pub trait Bindable: serde::de::DeserializeOwned + 'static {
    /// Describe the structure of `Self`.
    ///
    /// Field names must match the names `serde` expects during deserialization.
    fn schema() -> StructSchema;
}
