//! The bind orchestrator: plan cache, whole-body JSON pass, per-field decode loop.
use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;

use crate::binding::collection;
use crate::binding::errors::{ConversionError, CustomDecodeError, TypedBindError};
use crate::binding::json::{apply_body, check_required, is_json_content_type, parse_body};
use crate::binding::plan::{FieldKind, FieldPlan, Plan};
use crate::binding::schema::Bindable;
use crate::binding::sources::resolve_field_texts;
use crate::binding::tag::SourceKind;
use crate::binding::value::{parse_scalar, render, Value};
use crate::binding::BindError;
use crate::binding::multipart::FileSource;
use crate::request::body::BufferedBody;
use crate::request::path::PathParams;
use crate::request::RequestHead;

/// The request data a bind call reads from.
///
/// The binder only ever reads: the head, the buffered body and the optional file
/// source are borrowed for the duration of the call and never mutated.
pub struct BindRequest<'r> {
    pub head: &'r RequestHead,
    pub body: &'r BufferedBody,
    pub(crate) files: Option<&'r dyn FileSource>,
}

impl<'r> BindRequest<'r> {
    pub fn new(head: &'r RequestHead, body: &'r BufferedBody) -> Self {
        Self {
            head,
            body,
            files: None,
        }
    }

    /// Attach the uploaded-file collaborator consulted by file-shaped fields.
    pub fn with_files(mut self, files: &'r dyn FileSource) -> Self {
        self.files = Some(files);
        self
    }
}

/// Binds incoming request data into schema-described structures.
///
/// A `Binder` owns the plan cache: the first bind of a given type compiles its
/// schema into a [`Plan`] and retains it for the binder's lifetime. The cache is
/// safe for concurrent use—two racing first-binds of the same type may both
/// compile, one plan wins, and neither caller observes the race.
///
/// # Example
///
/// ```rust
/// use tagbind::binding::{Bindable, Binder, BindRequest};
/// use tagbind::binding::schema::{FieldSchema, ScalarKind, Shape, StructSchema};
/// use tagbind::request::body::BufferedBody;
/// use tagbind::request::path::PathParams;
/// use tagbind::request::RequestHead;
///
/// #[derive(serde::Deserialize)]
/// struct Home {
///     home_id: u32,
/// }
///
/// impl Bindable for Home {
///     fn schema() -> StructSchema {
///         StructSchema::new("Home").field(
///             FieldSchema::new("home_id", Shape::Scalar(ScalarKind::U32))
///                 .annotate("query", "home_id"),
///         )
///     }
/// }
///
/// let head = RequestHead {
///     method: http::Method::GET,
///     target: "https://example.com/?home_id=1".parse().unwrap(),
///     version: http::Version::HTTP_11,
///     headers: http::HeaderMap::new(),
/// };
/// let body = BufferedBody::empty();
/// let binder = Binder::new();
/// let home: Home = binder
///     .bind(&BindRequest::new(&head, &body), &PathParams::new())
///     .unwrap();
/// assert_eq!(home.home_id, 1);
/// ```
pub struct Binder {
    plans: DashMap<TypeId, Arc<Plan>>,
}

impl Binder {
    pub fn new() -> Self {
        Self {
            plans: DashMap::new(),
        }
    }

    /// Bind the request into a `T`, through `T`'s schema.
    ///
    /// The bound value tree is converted into `T` with the same JSON codec used
    /// for body unmarshalling; fields that no source resolved come out as their
    /// zero values (or `None` for optionals).
    pub fn bind<T: Bindable>(
        &self,
        req: &BindRequest<'_>,
        params: &PathParams,
    ) -> Result<T, BindError> {
        let plan = self.plan_for::<T>()?;
        let value = self.bind_value(&plan, req, params)?;
        let document = render(&plan.schema, &value);
        serde_json::from_value(document)
            .map_err(|source| TypedBindError { source }.into())
    }

    /// Bind the request into a dynamic [`Value`] tree shaped by `plan`.
    ///
    /// This is the core entry point; [`bind`](Self::bind) is a typed facade over
    /// it. The returned value is always a `Value::Struct` parallel to the plan's
    /// schema.
    pub fn bind_value(
        &self,
        plan: &Plan,
        req: &BindRequest<'_>,
        params: &PathParams,
    ) -> Result<Value, BindError> {
        tracing::trace!(schema = plan.schema.name, "Binding request data");
        let mut root = Value::empty_struct(&plan.schema);

        // Whole-body JSON pass first, so later per-field writes override
        // JSON-sourced values for the same field.
        if is_json_content_type(&req.head.headers) {
            if let Some(document) = parse_body(req.body)? {
                check_required(plan, &document)?;
                apply_body(plan, &document, &mut root)?;
            }
        }

        for field in &plan.fields {
            decode_field(field, req, params, &mut root)?;
        }
        Ok(root)
    }

    /// Fetch the cached plan for `T`, compiling it on first use.
    ///
    /// A compile failure is returned to the caller and never cached.
    fn plan_for<T: Bindable>(&self) -> Result<Arc<Plan>, BindError> {
        let type_id = TypeId::of::<T>();
        if let Some(plan) = self.plans.get(&type_id) {
            return Ok(plan.value().clone());
        }
        let plan = Arc::new(Plan::compile(T::schema())?);
        // Two racing first-binds may both compile; the first insert wins and the
        // loser's plan is dropped. Both compile from the same schema, so the
        // outcome is indistinguishable to callers.
        Ok(self.plans.entry(type_id).or_insert(plan).value().clone())
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_field(
    field: &FieldPlan,
    req: &BindRequest<'_>,
    params: &PathParams,
    root: &mut Value,
) -> Result<(), BindError> {
    match &field.kind {
        FieldKind::Scalar(kind) => {
            let texts = resolve_field_texts(&field.tags, req, params);
            let Some(text) = texts.first() else {
                return Ok(());
            };
            let leaf = parse_scalar(*kind, text)?;
            *field.slot(root) = leaf.wrap(field.ptr_depth);
            Ok(())
        }
        FieldKind::Collection { .. } => collection::decode(field, req, params, root),
        FieldKind::Text(codec) => {
            let texts = resolve_field_texts(&field.tags, req, params);
            let Some(text) = texts.first() else {
                return Ok(());
            };
            let leaf = (codec.parse)(text).map_err(|_| ConversionError {
                text: text.clone(),
                target_type: codec.name.to_owned(),
            })?;
            *field.slot(root) = leaf.wrap(field.ptr_depth);
            Ok(())
        }
        FieldKind::Json => {
            let texts = resolve_field_texts(&field.tags, req, params);
            let Some(text) = texts.first() else {
                return Ok(());
            };
            let document: serde_json::Value =
                serde_json::from_str(text).map_err(|_| ConversionError {
                    text: text.clone(),
                    target_type: field.shape.type_name(),
                })?;
            *field.slot(root) = Value::Json(document).wrap(field.ptr_depth);
            Ok(())
        }
        FieldKind::Custom(decoder) => {
            // The hook owns its subtree: tags are not consulted, the returned
            // leaf is installed through the field's pointer depth.
            let leaf = (decoder.decode)(req, params).map_err(|source| CustomDecodeError {
                field: field.name.clone(),
                source,
            })?;
            *field.slot(root) = leaf.wrap(field.ptr_depth);
            Ok(())
        }
        FieldKind::File => {
            let key = field
                .tags
                .iter()
                .find(|tag| tag.source == SourceKind::FileName)
                .map(|tag| tag.key.as_str())
                .unwrap_or(&field.name);
            let Some(files) = req.files else {
                return Ok(());
            };
            let Some(file) = files.file(key) else {
                return Ok(());
            };
            *field.slot(root) = Value::File(file).wrap(field.ptr_depth);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::schema::{FieldSchema, ScalarKind, Shape, StructSchema};

    #[derive(Debug, serde::Deserialize)]
    struct Probe {
        id: u32,
    }

    impl Bindable for Probe {
        fn schema() -> StructSchema {
            StructSchema::new("Probe").field(
                FieldSchema::new("id", Shape::Scalar(ScalarKind::U32)).annotate("query", "id"),
            )
        }
    }

    fn request_parts() -> (RequestHead, BufferedBody) {
        let head = RequestHead {
            method: http::Method::GET,
            target: "http://foobar.com?id=12".parse().unwrap(),
            version: http::Version::HTTP_11,
            headers: http::HeaderMap::new(),
        };
        (head, BufferedBody::empty())
    }

    #[test]
    fn the_plan_is_compiled_once_and_reused() {
        let binder = Binder::new();
        let (head, body) = request_parts();
        let params = PathParams::new();

        let first: Probe = binder.bind(&BindRequest::new(&head, &body), &params).unwrap();
        assert_eq!(first.id, 12);
        let cached = binder.plans.get(&TypeId::of::<Probe>()).unwrap().value().clone();

        let second: Probe = binder.bind(&BindRequest::new(&head, &body), &params).unwrap();
        assert_eq!(second.id, 12);
        let still_cached = binder.plans.get(&TypeId::of::<Probe>()).unwrap().value().clone();
        assert!(Arc::ptr_eq(&cached, &still_cached));
    }

    #[test]
    fn concurrent_first_binds_agree_on_a_single_plan() {
        let binder = std::sync::Arc::new(Binder::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let binder = binder.clone();
                std::thread::spawn(move || {
                    let (head, body) = request_parts();
                    let params = PathParams::new();
                    let probe: Probe = binder
                        .bind(&BindRequest::new(&head, &body), &params)
                        .unwrap();
                    probe.id
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 12);
        }
        assert_eq!(binder.plans.len(), 1);
    }
}
