//! Source resolvers: extract the raw string values a request location holds for a
//! given key.
//!
//! Every resolver is a pure lookup—`(request, path params, key)` to an ordered list
//! of strings, empty when the location holds nothing for the key. Resolvers never
//! fail: a malformed section simply resolves to nothing.
use std::borrow::Cow;

use biscotti::{Processor, ProcessorConfig, RequestCookies};
use http::header::{CONTENT_TYPE, COOKIE};
use http::HeaderMap;
use percent_encoding::percent_decode_str;

use crate::binding::binder::BindRequest;
use crate::binding::tag::{FieldTag, SourceKind};
use crate::request::path::PathParams;

/// Resolve the raw values for `key` from the request location `kind`.
///
/// `Json` and `FileName` are not text sources: the whole-body JSON pass and the
/// file decoder own them, so they resolve to nothing here.
pub(crate) fn resolve(
    kind: SourceKind,
    req: &BindRequest<'_>,
    params: &PathParams,
    key: &str,
) -> Vec<String> {
    match kind {
        SourceKind::Path => path(params, key),
        SourceKind::Query => query(req, key),
        SourceKind::Form => form(req, key),
        SourceKind::Cookie => cookie(req, key),
        SourceKind::Header => header(req, key),
        SourceKind::RawBody => raw_body(req),
        SourceKind::Json | SourceKind::FileName => Vec::new(),
    }
}

/// Resolve a field's raw values using its ordered tag list: the first tag whose
/// source yields at least one value wins, and the remaining tags are not consulted.
/// The shared `default` literal substitutes only when every declared source came up
/// empty.
pub(crate) fn resolve_field_texts(
    tags: &[FieldTag],
    req: &BindRequest<'_>,
    params: &PathParams,
) -> Vec<String> {
    let mut default = None;
    for tag in tags {
        if matches!(tag.source, SourceKind::Json | SourceKind::FileName) {
            continue;
        }
        default = tag.default.clone();
        let texts = resolve(tag.source, req, params, &tag.key);
        if !texts.is_empty() {
            return texts;
        }
    }
    match default {
        Some(default) => vec![default],
        None => Vec::new(),
    }
}

/// Router-resolved path parameters hold at most one value per key. Values are
/// percent-decoded; a value that doesn't decode to UTF-8 is passed through raw.
fn path(params: &PathParams, key: &str) -> Vec<String> {
    let Some(raw) = params.get(key) else {
        return Vec::new();
    };
    let value = percent_decode_str(raw)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_owned());
    vec![value]
}

/// Query pairs, repeated keys in encounter order. A key declared without a value
/// (`?b`) resolves to one empty string.
fn query(req: &BindRequest<'_>, key: &str) -> Vec<String> {
    let Some(query) = req.head.target.query() else {
        return Vec::new();
    };
    form_urlencoded::parse(query.as_bytes())
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .collect()
}

/// Urlencoded body pairs, repeated keys in encounter order. Only consulted when the
/// request declares an `application/x-www-form-urlencoded` content type.
fn form(req: &BindRequest<'_>, key: &str) -> Vec<String> {
    if !is_urlencoded_content_type(&req.head.headers) {
        return Vec::new();
    }
    form_urlencoded::parse(&req.body.bytes)
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .collect()
}

/// Cookies from the request's `Cookie` header(s), one value per cookie name.
fn cookie(req: &BindRequest<'_>, key: &str) -> Vec<String> {
    let processor: Processor = ProcessorConfig::default().into();
    let mut cookies = RequestCookies::new();
    for header in req.head.headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        if cookies.extend_from_header(header, &processor).is_err() {
            return Vec::new();
        }
    }
    cookies
        .get(key)
        .map(|cookie| vec![cookie.value().to_owned()])
        .unwrap_or_default()
}

/// Header values in insertion order. `http::HeaderMap` normalizes key casing
/// itself, so the lookup policy is exactly the store's own policy.
fn header(req: &BindRequest<'_>, key: &str) -> Vec<String> {
    req.head
        .headers
        .get_all(key)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_owned)
        .collect()
}

/// The entire body as a single-element list. Empty and non-UTF-8 bodies resolve to
/// nothing.
fn raw_body(req: &BindRequest<'_>) -> Vec<String> {
    if req.body.bytes.is_empty() {
        return Vec::new();
    }
    std::str::from_utf8(&req.body.bytes)
        .map(|body| vec![body.to_owned()])
        .unwrap_or_default()
}

/// Check that the `Content-Type` header is set to `application/x-www-form-urlencoded`.
pub(crate) fn is_urlencoded_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE) else {
        return false;
    };
    let Ok(content_type) = content_type.to_str() else {
        return false;
    };
    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return false;
    };
    mime.type_() == mime::APPLICATION && mime.subtype() == mime::WWW_FORM_URLENCODED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::binder::BindRequest;
    use crate::request::body::BufferedBody;
    use crate::request::RequestHead;

    fn head(uri: &str) -> RequestHead {
        RequestHead {
            method: http::Method::GET,
            target: uri.parse().unwrap(),
            version: http::Version::HTTP_11,
            headers: http::HeaderMap::new(),
        }
    }

    #[test]
    fn query_values_come_back_in_encounter_order() {
        let head = head("http://foobar.com?id=11&other=1&id=12&id=13");
        let body = BufferedBody::empty();
        let req = BindRequest::new(&head, &body);
        assert_eq!(
            query(&req, "id"),
            vec!["11".to_owned(), "12".to_owned(), "13".to_owned()]
        );
    }

    #[test]
    fn a_query_key_without_a_value_resolves_to_one_empty_string() {
        let head = head("http://foobar.com?a=&b");
        let body = BufferedBody::empty();
        let req = BindRequest::new(&head, &body);
        assert_eq!(query(&req, "a"), vec![String::new()]);
        assert_eq!(query(&req, "b"), vec![String::new()]);
        assert_eq!(query(&req, "c"), Vec::<String>::new());
    }

    #[test]
    fn form_is_only_consulted_for_urlencoded_requests() {
        let mut head = head("http://foobar.com");
        let body = BufferedBody::new("f=form");

        let req = BindRequest::new(&head, &body);
        assert_eq!(form(&req, "f"), Vec::<String>::new());

        head.headers.insert(
            CONTENT_TYPE,
            "application/x-www-form-urlencoded".parse().unwrap(),
        );
        let req = BindRequest::new(&head, &body);
        assert_eq!(form(&req, "f"), vec!["form".to_owned()]);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut head = head("http://foobar.com");
        head.headers.insert("X-Token", "abc".parse().unwrap());
        let body = BufferedBody::empty();
        let req = BindRequest::new(&head, &body);
        assert_eq!(header(&req, "x-token"), vec!["abc".to_owned()]);
    }

    #[test]
    fn cookies_resolve_by_name() {
        let mut head = head("http://foobar.com");
        head.headers
            .insert(COOKIE, "session=s1; theme=dark".parse().unwrap());
        let body = BufferedBody::empty();
        let req = BindRequest::new(&head, &body);
        assert_eq!(cookie(&req, "theme"), vec!["dark".to_owned()]);
        assert_eq!(cookie(&req, "missing"), Vec::<String>::new());
    }

    #[test]
    fn path_values_are_percent_decoded() {
        let mut params = PathParams::new();
        params.insert("address_id", "123%20456");
        assert_eq!(path(&params, "address_id"), vec!["123 456".to_owned()]);
    }

    #[test]
    fn the_first_tag_with_values_wins_and_defaults_fill_the_gap() {
        let head = head("http://foobar.com?b=17");
        let body = BufferedBody::empty();
        let req = BindRequest::new(&head, &body);
        let params = PathParams::new();

        let tags = vec![
            FieldTag {
                source: SourceKind::Query,
                key: "b".to_owned(),
                required: false,
                default: Some("15".to_owned()),
            },
            FieldTag {
                source: SourceKind::Header,
                key: "b".to_owned(),
                required: false,
                default: Some("15".to_owned()),
            },
        ];
        assert_eq!(resolve_field_texts(&tags, &req, &params), vec!["17".to_owned()]);

        let mut absent = tags.clone();
        for tag in &mut absent {
            tag.key = "missing".to_owned();
        }
        assert_eq!(
            resolve_field_texts(&absent, &req, &params),
            vec!["15".to_owned()]
        );
    }
}
