//! Tag-annotation parsing: from a field's raw annotations to an ordered list of
//! source descriptors.
use crate::binding::schema::FieldSchema;

pub(crate) const DEFAULT_TAG: &str = "default";
pub(crate) const REQUIRED_OPT: &str = "required";

/// One of the eight recognized request locations a value may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceKind {
    Path,
    Form,
    Query,
    Cookie,
    Header,
    Json,
    RawBody,
    FileName,
}

impl SourceKind {
    /// The fixed catalog, in precedence order. When a field declares several source
    /// tags, this order—not declaration order—governs first-match-wins.
    pub(crate) const CATALOG: [SourceKind; 8] = [
        SourceKind::Path,
        SourceKind::Form,
        SourceKind::Query,
        SourceKind::Cookie,
        SourceKind::Header,
        SourceKind::Json,
        SourceKind::RawBody,
        SourceKind::FileName,
    ];

    pub(crate) fn tag(self) -> &'static str {
        match self {
            SourceKind::Path => "path",
            SourceKind::Form => "form",
            SourceKind::Query => "query",
            SourceKind::Cookie => "cookie",
            SourceKind::Header => "header",
            SourceKind::Json => "json",
            SourceKind::RawBody => "raw_body",
            SourceKind::FileName => "file_name",
        }
    }
}

/// One binding source declared on a field.
#[derive(Debug, Clone)]
pub(crate) struct FieldTag {
    pub(crate) source: SourceKind,
    pub(crate) key: String,
    pub(crate) required: bool,
    pub(crate) default: Option<String>,
}

/// Split `s` at the first `sep`, returning the head and the (possibly empty) tail.
fn head(s: &str, sep: char) -> (&str, &str) {
    match s.find(sep) {
        Some(idx) => (&s[..idx], &s[idx + sep.len_utf8()..]),
        None => (s, ""),
    }
}

/// Parse a field's annotations into an ordered list of [`FieldTag`]s.
///
/// Recognized source keys are scanned in catalog order, so the returned order is
/// the decode precedence. A single `default` annotation applies to every tag on
/// the field. A field with no recognized source annotation gets the synthetic
/// catalog instead (see [`default_field_tags`]).
pub(crate) fn lookup_field_tags(field: &FieldSchema) -> Vec<FieldTag> {
    let default = field
        .annotations
        .iter()
        .find(|(key, _)| *key == DEFAULT_TAG)
        .map(|(_, content)| (*content).to_owned());

    let mut tags = Vec::new();
    for kind in SourceKind::CATALOG {
        let Some((_, content)) = field
            .annotations
            .iter()
            .find(|(key, _)| *key == kind.tag())
        else {
            continue;
        };
        let (value, mut rest) = head(content, ',');
        let mut required = false;
        // Unrecognized option tokens are tolerated and ignored.
        while !rest.is_empty() {
            let (opt, tail) = head(rest, ',');
            if opt == REQUIRED_OPT {
                required = true;
            }
            rest = tail;
        }
        let key = if value.is_empty() { field.name } else { value };
        tags.push(FieldTag {
            source: kind,
            key: key.to_owned(),
            required,
            default: default.clone(),
        });
    }

    if tags.is_empty() {
        default_field_tags(field, default)
    } else {
        tags
    }
}

/// The synthetic tag list for a field with no recognized source annotation: every
/// source kind except `raw_body`, keyed by the field's own name, so the field can
/// bind opportunistically from any location.
fn default_field_tags(field: &FieldSchema, default: Option<String>) -> Vec<FieldTag> {
    [
        SourceKind::Path,
        SourceKind::Form,
        SourceKind::Query,
        SourceKind::Cookie,
        SourceKind::Header,
        SourceKind::Json,
        SourceKind::FileName,
    ]
    .into_iter()
    .map(|source| FieldTag {
        source,
        key: field.name.to_owned(),
        required: false,
        default: default.clone(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::schema::{ScalarKind, Shape};

    fn field(annotations: &[(&'static str, &'static str)]) -> FieldSchema {
        let mut field = FieldSchema::new("home_id", Shape::Scalar(ScalarKind::U32));
        for (key, content) in annotations {
            field = field.annotate(key, content);
        }
        field
    }

    #[test]
    fn catalog_order_governs_precedence() {
        // Declared json-first, but the parsed order follows the fixed catalog.
        let tags = lookup_field_tags(&field(&[("json", "id"), ("query", "id"), ("path", "id")]));
        let sources: Vec<_> = tags.iter().map(|t| t.source).collect();
        assert_eq!(
            sources,
            vec![SourceKind::Path, SourceKind::Query, SourceKind::Json]
        );
    }

    #[test]
    fn required_option_is_detected() {
        let tags = lookup_field_tags(&field(&[("json", "id,required")]));
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].key, "id");
        assert!(tags[0].required);
    }

    #[test]
    fn other_options_do_not_mark_required() {
        let tags = lookup_field_tags(&field(&[("query", "id,lowercase,trim")]));
        assert!(!tags[0].required);
        assert_eq!(tags[0].key, "id");
    }

    #[test]
    fn default_applies_to_every_tag() {
        let tags = lookup_field_tags(&field(&[
            ("query", "id"),
            ("header", "X-Id"),
            ("default", "15"),
        ]));
        assert!(tags.iter().all(|t| t.default.as_deref() == Some("15")));
    }

    #[test]
    fn empty_tag_key_falls_back_to_the_field_name() {
        let tags = lookup_field_tags(&field(&[("query", ",required")]));
        assert_eq!(tags[0].key, "home_id");
        assert!(tags[0].required);
    }

    #[test]
    fn untagged_field_gets_the_synthetic_catalog() {
        let tags = lookup_field_tags(&field(&[]));
        let sources: Vec<_> = tags.iter().map(|t| t.source).collect();
        // Every source kind except `raw_body`, keyed by the field name.
        assert_eq!(
            sources,
            vec![
                SourceKind::Path,
                SourceKind::Form,
                SourceKind::Query,
                SourceKind::Cookie,
                SourceKind::Header,
                SourceKind::Json,
                SourceKind::FileName,
            ]
        );
        assert!(tags.iter().all(|t| t.key == "home_id"));
    }

    #[test]
    fn untagged_field_keeps_its_default() {
        let tags = lookup_field_tags(&field(&[("default", "qwe")]));
        assert!(tags.iter().all(|t| t.default.as_deref() == Some("qwe")));
    }
}
