//! Compilation of a [`StructSchema`] into an ordered sequence of field decoders.
use std::sync::Arc;

use smallvec::SmallVec;

use crate::binding::errors::PlanError;
use crate::binding::schema::{CustomDecoder, ScalarKind, Shape, StructSchema, TextCodec};
use crate::binding::tag::{lookup_field_tags, FieldTag, SourceKind};
use crate::binding::value::Value;

/// One hop of the index chain from the root structure to a leaf field: which field
/// slot to enter, how many pointer levels wrap it, and the schema of the structure
/// stored behind them.
#[derive(Debug, Clone)]
pub(crate) struct PathStep {
    pub(crate) index: usize,
    pub(crate) ptr_depth: usize,
    pub(crate) schema: Arc<StructSchema>,
}

/// The compiled binding instructions for one structure type.
///
/// A plan is immutable after compilation and safe to share across concurrent bind
/// calls. [`Binder`](crate::binding::Binder) compiles and caches one plan per bound
/// type; `Plan::compile` is public for callers that drive the dynamic API
/// themselves.
#[derive(Debug)]
pub struct Plan {
    pub(crate) schema: Arc<StructSchema>,
    pub(crate) fields: Vec<FieldPlan>,
}

/// The compiled binding unit for one leaf field.
///
/// `steps` is the index chain through nested structures, computed once here and
/// reused verbatim at decode time; `index`/`ptr_depth` address the leaf slot inside
/// the final structure.
#[derive(Debug)]
pub(crate) struct FieldPlan {
    pub(crate) steps: SmallVec<[PathStep; 2]>,
    pub(crate) index: usize,
    pub(crate) ptr_depth: usize,
    /// Dotted field name, for diagnostics.
    pub(crate) name: String,
    /// Dotted JSON name chain from the root, for the whole-body pass and the
    /// required-field probe.
    pub(crate) json_path: String,
    /// The field's core shape, with `Optional` wrappers stripped.
    pub(crate) shape: Shape,
    pub(crate) tags: Vec<FieldTag>,
    pub(crate) kind: FieldKind,
}

#[derive(Debug)]
pub(crate) enum FieldKind {
    Scalar(ScalarKind),
    Collection {
        /// The element's core shape, with `Optional` wrappers stripped.
        element: Shape,
        elem_ptr_depth: usize,
        fixed_size: Option<usize>,
    },
    /// A map-shaped field, JSON-unmarshalled as one unit.
    Json,
    /// A leaf parsed from raw text by a caller-supplied codec.
    Text(TextCodec),
    Custom(CustomDecoder),
    File,
}

impl Plan {
    /// Compile a schema into an ordered decoder sequence.
    ///
    /// Nested structure fields are flattened into the parent's sequence at the
    /// position of the enclosing field, so declaration order is preserved across
    /// composition.
    pub fn compile(schema: impl Into<Arc<StructSchema>>) -> Result<Plan, PlanError> {
        let schema = schema.into();
        let mut fields = Vec::new();
        compile_struct(&schema, &SmallVec::new(), "", "", &mut fields)?;
        tracing::debug!(
            schema = schema.name,
            field_decoders = fields.len(),
            "Compiled binding plan"
        );
        Ok(Plan { schema, fields })
    }

    /// The schema this plan was compiled from.
    pub fn schema(&self) -> &Arc<StructSchema> {
        &self.schema
    }
}

fn compile_struct(
    schema: &Arc<StructSchema>,
    steps: &SmallVec<[PathStep; 2]>,
    name_prefix: &str,
    json_prefix: &str,
    out: &mut Vec<FieldPlan>,
) -> Result<(), PlanError> {
    for (index, field) in schema.fields.iter().enumerate() {
        let tags = lookup_field_tags(field);
        let (ptr_depth, core) = field.shape.strip_optional();
        let name = join(name_prefix, field.name);
        let json_path = join(json_prefix, json_name(&tags, field.name));

        let kind = match core {
            // A custom hook takes priority over structural recursion for the
            // whole subtree.
            Shape::Custom(decoder) => FieldKind::Custom(decoder.clone()),
            Shape::Struct(sub) => {
                let mut steps = steps.clone();
                steps.push(PathStep {
                    index,
                    ptr_depth,
                    schema: sub.clone(),
                });
                compile_struct(sub, &steps, &name, &json_path, out)?;
                continue;
            }
            Shape::Scalar(kind) => FieldKind::Scalar(*kind),
            Shape::List {
                element,
                fixed_size,
            } => {
                let (elem_ptr_depth, elem_core) = element.strip_optional();
                if matches!(elem_core, Shape::File) {
                    return Err(PlanError {
                        field: name,
                        reason: "a collection of uploaded files is not supported".to_owned(),
                    });
                }
                FieldKind::Collection {
                    element: elem_core.clone(),
                    elem_ptr_depth,
                    fixed_size: *fixed_size,
                }
            }
            Shape::Map => FieldKind::Json,
            Shape::Text(codec) => FieldKind::Text(codec.clone()),
            Shape::File => FieldKind::File,
            Shape::Optional(_) => unreachable!("strip_optional removed all Optional wrappers"),
        };

        out.push(FieldPlan {
            steps: steps.clone(),
            index,
            ptr_depth,
            name,
            json_path,
            shape: core.clone(),
            tags,
            kind,
        });
    }
    Ok(())
}

/// The JSON name a field responds to in the request body: its `json` tag key when
/// declared, its own name otherwise.
fn json_name<'a>(tags: &'a [FieldTag], field_name: &'static str) -> &'a str {
    tags.iter()
        .find(|tag| tag.source == SourceKind::Json)
        .map(|tag| tag.key.as_str())
        .unwrap_or(field_name)
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_owned()
    } else {
        format!("{prefix}.{segment}")
    }
}

impl FieldPlan {
    /// Navigate to this field's slot inside `root`, allocating missing pointer
    /// levels and intermediate structures along the way.
    ///
    /// `root` must be the structure value the plan was compiled for.
    pub(crate) fn slot<'v>(&self, root: &'v mut Value) -> &'v mut Value {
        let mut current = root;
        for step in &self.steps {
            let slot = struct_slot(current, step.index);
            current = descend(slot, step.ptr_depth, &step.schema);
        }
        struct_slot(current, self.index)
    }
}

fn struct_slot(value: &mut Value, index: usize) -> &mut Value {
    match value {
        Value::Struct(fields) => &mut fields[index],
        // The caller handed us a value that doesn't match the plan's schema.
        // Index chains are computed from the same schema the root value was
        // allocated from, so this cannot happen through the public entry points.
        _ => unreachable!("binding plan index chain does not match the value tree"),
    }
}

/// Walk `ptr_depth` pointer levels into `slot`, allocating any level that is still
/// unset, and materialize an empty structure for `schema` at the end of the chain.
///
/// Loop-based on purpose: chains of arbitrary depth are supported without fixed
/// unrolling.
fn descend<'v>(
    slot: &'v mut Value,
    ptr_depth: usize,
    schema: &Arc<StructSchema>,
) -> &'v mut Value {
    let mut current = slot;
    for _ in 0..ptr_depth {
        if !matches!(current, Value::Some(_)) {
            *current = Value::Some(Box::new(Value::Null));
        }
        current = match current {
            Value::Some(inner) => inner.as_mut(),
            _ => unreachable!("pointer level was allocated just above"),
        };
    }
    if !matches!(current, Value::Struct(_)) {
        *current = Value::empty_struct(schema);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::schema::FieldSchema;

    fn scalar(name: &'static str) -> FieldSchema {
        FieldSchema::new(name, Shape::Scalar(ScalarKind::String))
    }

    #[test]
    fn nested_fields_are_flattened_at_the_position_of_the_enclosing_field() {
        let inner = Arc::new(StructSchema::new("Inner").field(scalar("i1")).field(scalar("i2")));
        let schema = StructSchema::new("Outer")
            .field(scalar("a"))
            .field(FieldSchema::new("inner", Shape::Struct(inner)))
            .field(scalar("z"));

        let plan = Plan::compile(schema).unwrap();
        let names: Vec<_> = plan.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "inner.i1", "inner.i2", "z"]);
    }

    #[test]
    fn index_chains_record_pointer_depth_through_nested_structures() {
        let inner = Arc::new(StructSchema::new("Inner").field(scalar("leaf")));
        let schema = StructSchema::new("Outer").field(FieldSchema::new(
            "inner",
            Shape::optional(Shape::optional(Shape::Struct(inner))),
        ));

        let plan = Plan::compile(schema).unwrap();
        assert_eq!(plan.fields.len(), 1);
        let field = &plan.fields[0];
        assert_eq!(field.steps.len(), 1);
        assert_eq!(field.steps[0].index, 0);
        assert_eq!(field.steps[0].ptr_depth, 2);
        assert_eq!(field.index, 0);
    }

    #[test]
    fn json_paths_chain_the_json_tag_names_through_nesting() {
        let inner = Arc::new(
            StructSchema::new("Meta")
                .field(scalar("n").annotate("json", "n,required"))
                .field(scalar("plain")),
        );
        let schema = StructSchema::new("Outer")
            .field(FieldSchema::new("meta", Shape::Struct(inner)).annotate("json", "meta"));

        let plan = Plan::compile(schema).unwrap();
        let paths: Vec<_> = plan.fields.iter().map(|f| f.json_path.as_str()).collect();
        assert_eq!(paths, vec!["meta.n", "meta.plain"]);
    }

    #[test]
    fn slot_allocates_the_full_pointer_chain_on_first_access() {
        let inner = Arc::new(StructSchema::new("Inner").field(scalar("leaf")));
        let schema = StructSchema::new("Outer").field(FieldSchema::new(
            "inner",
            Shape::optional(Shape::optional(Shape::Struct(inner))),
        ));
        let plan = Plan::compile(schema).unwrap();

        let mut root = Value::empty_struct(&plan.schema);
        *plan.fields[0].slot(&mut root) = Value::Str("v".to_owned());

        // Outer field -> Some(Some(Struct([Str]))).
        let Value::Struct(fields) = &root else {
            unreachable!()
        };
        let leaf = fields[0].pointee().unwrap().pointee().unwrap();
        let Value::Struct(inner_fields) = leaf else {
            panic!("expected an allocated struct, got {leaf:?}")
        };
        assert_eq!(inner_fields[0].as_str(), Some("v"));
    }

    #[test]
    fn collections_of_uploaded_files_are_rejected_at_compile_time() {
        let schema = StructSchema::new("Upload")
            .field(FieldSchema::new("attachments", Shape::list(Shape::File)));
        let err = Plan::compile(schema).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"`attachments` cannot be compiled into a field decoder: a collection of uploaded files is not supported"
        );
    }
}
