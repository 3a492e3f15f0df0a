//! Errors that can happen while compiling a binding plan or binding a request.

/// The error returned by [`Binder::bind`] and [`Binder::bind_value`] when a bind fails.
///
/// The first failing field aborts the entire bind: there is no partial binding and no
/// aggregation of multiple field errors into a single report.
///
/// [`Binder::bind`]: crate::binding::Binder::bind
/// [`Binder::bind_value`]: crate::binding::Binder::bind_value
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BindError {
    #[error(transparent)]
    /// See [`PlanError`] for details.
    Plan(#[from] PlanError),
    #[error(transparent)]
    /// See [`ConversionError`] for details.
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    /// See [`CardinalityError`] for details.
    Cardinality(#[from] CardinalityError),
    #[error(transparent)]
    /// See [`RequiredFieldError`] for details.
    RequiredField(#[from] RequiredFieldError),
    #[error(transparent)]
    /// See [`UnsupportedTypeError`] for details.
    UnsupportedType(#[from] UnsupportedTypeError),
    #[error(transparent)]
    /// See [`JsonBodyError`] for details.
    JsonBody(#[from] JsonBodyError),
    #[error(transparent)]
    /// See [`CustomDecodeError`] for details.
    Custom(#[from] CustomDecodeError),
    #[error(transparent)]
    /// See [`TypedBindError`] for details.
    Typed(#[from] TypedBindError),
}

/// A schema could not be compiled into a binding plan.
///
/// Plan compilation only fails for static schema defects—e.g. a shape that has no
/// text representation was declared as a collection element. A failed plan is never
/// cached.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[error("`{field}` cannot be compiled into a field decoder: {reason}")]
pub struct PlanError {
    pub(crate) field: String,
    pub(crate) reason: String,
}

/// A raw text value could not be parsed into the target leaf type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[error("We can't parse `{text}` as a `{target_type}`")]
pub struct ConversionError {
    pub(crate) text: String,
    pub(crate) target_type: String,
}

impl ConversionError {
    /// The raw text that failed to parse.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The name of the type the text was supposed to parse into.
    pub fn target_type(&self) -> &str {
        &self.target_type
    }
}

/// A fixed-length collection received a different number of values than its declared
/// length.
///
/// A scalar `default` can never satisfy a fixed-length field with more than one slot:
/// the default substitution yields a single value, which then fails this exact-count
/// check.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[error("`{field}` expects exactly {expected} value(s), but {actual} were resolved")]
pub struct CardinalityError {
    pub(crate) field: String,
    pub(crate) expected: usize,
    pub(crate) actual: usize,
}

/// A JSON-required field's leaf is structurally absent from the request body.
///
/// The presence check is asymmetric on purpose, for compatibility: when the leaf's
/// immediate parent path is also absent, the field is treated as satisfied. Only a
/// leaf missing under an *existing* parent fails.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[error("`{json_path}` is required, but it is missing from the JSON body")]
pub struct RequiredFieldError {
    pub(crate) field: String,
    pub(crate) json_path: String,
}

impl RequiredFieldError {
    /// The dotted JSON path that was required but absent.
    pub fn json_path(&self) -> &str {
        &self.json_path
    }
}

/// No text conversion is registered for the leaf shape that a value had to be
/// produced for.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[error("`{type_name}` is not a supported target for text decoding")]
pub struct UnsupportedTypeError {
    pub(crate) type_name: String,
}

/// The request body could not be parsed as a JSON document.
///
/// This is fatal and preempts per-field decoding. An empty body is *not* an error:
/// the whole-body JSON pass is simply skipped.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[error("Failed to deserialize the body as a JSON document")]
pub struct JsonBodyError {
    #[source]
    pub(crate) source: serde_json::Error,
}

/// A caller-supplied decode hook failed.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[error("The custom decoder for `{field}` failed")]
pub struct CustomDecodeError {
    pub(crate) field: String,
    #[source]
    pub(crate) source: Box<dyn std::error::Error + Send + Sync>,
}

/// The bound values could not be deserialized into the target type of the typed
/// facade.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[error("Failed to deserialize the bound values into the target type")]
pub struct TypedBindError {
    #[source]
    pub(crate) source: serde_json::Error,
}
