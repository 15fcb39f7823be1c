//! Argument binding: turns a matched route's declared `Arg`s into typed `ArgValue`s, reading from
//! whichever of query string, path captures, or request body each argument was declared against.
//!
//! Binding does not stop at the first failed argument; every argument is attempted, and all
//! failures are collected before a single `BadRequest` is raised, so a caller gets the complete
//! list of what was wrong with their request in one round trip rather than one field at a time.

use std::collections::HashMap;

use crate::error::DispatchError;
use crate::router::segment::{Arg, ArgSource, Route, Visibility};
use crate::value::{read_primitive, ArgValue};

/// Binds every argument declared on `route`.
///
/// `path_captures` is the ordered list the tree matcher produced; `query` is the raw (undecoded)
/// query string; `body` and `content_type` describe the request body, if any.
pub fn bind_args(
    route: &Route,
    path_captures: &[(String, String)],
    query: &str,
    body: &[u8],
    content_type: Option<&str>,
) -> Result<Vec<ArgValue>, DispatchError> {
    let query_map = parse_query(query)?;
    let body_map = parse_body(body, content_type)?;

    let mut values = Vec::with_capacity(route.args.len());
    let mut errors = Vec::new();

    for (index, arg) in route.args.iter().enumerate() {
        if arg.visibility == Visibility::Internal {
            // Never read from the wire: a plugin's `modify_call` fills this slot in before the
            // handler runs, via `ctx.arg_mut`.
            values.push(ArgValue::String(String::new()));
            continue;
        }

        let raw = match (route.body_arg_index, arg.source) {
            (Some(i), ArgSource::Body) if i == index => {
                // Bound to the whole body rather than one field: pass it through verbatim as
                // UTF-8 text (the handler's ArgType, typically String or a UserReader, decides
                // what to do with it).
                Some(String::from_utf8_lossy(body).into_owned())
            }
            _ => match arg.source {
                ArgSource::Path => path_captures
                    .iter()
                    .find(|(name, _)| name == &arg.name)
                    .map(|(_, v)| decode_path_capture(v)),
                ArgSource::Query => query_map.get(&arg.name).cloned(),
                ArgSource::Body => body_map.get(&arg.name).cloned(),
            },
        };
        // An explicitly-empty query value (`?qty=`) carries no wire value to coerce: treat it the
        // same as the key being entirely absent, so optional-default/required-argument handling
        // applies instead of a generic parse failure.
        let raw = match (arg.source, raw) {
            (ArgSource::Query, Some(ref v)) if v.is_empty() => None,
            (_, raw) => raw,
        };

        match raw {
            Some(raw) => match read_primitive(&arg.ty, &raw) {
                Ok(v) => values.push(v),
                Err(e) => errors.push(format!("{}: {}", arg.name, e)),
            },
            None if arg.optional => match &arg.default {
                Some(default_raw) => match read_primitive(&arg.ty, default_raw) {
                    Ok(v) => values.push(v),
                    Err(e) => errors.push(format!("{}: {}", arg.name, e)),
                },
                None => values.push(ArgValue::String(String::new())),
            },
            None => errors.push(format!("{}: missing required argument", arg.name)),
        }
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        Err(DispatchError::bad_request(errors.join("; ")))
    }
}

/// Validates that every required argument on `route` would have a source to bind from, without
/// actually coercing any value. Pure and idempotent: calling it twice with the same inputs always
/// agrees, and it never mutates `route`.
pub fn check_args(
    route: &Route,
    path_captures: &[(String, String)],
    query: &str,
    body_present: bool,
) -> Result<(), DispatchError> {
    let query_map = parse_query(query)?;
    let mut missing = Vec::new();
    for arg in &route.args {
        if arg.optional || arg.visibility == Visibility::Internal {
            continue;
        }
        let present = match arg.source {
            ArgSource::Path => path_captures.iter().any(|(name, _)| name == &arg.name),
            ArgSource::Query => query_map.get(&arg.name).map_or(false, |v| !v.is_empty()),
            ArgSource::Body => body_present,
        };
        if !present {
            missing.push(arg.name.clone());
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DispatchError::bad_request(format!(
            "missing required argument(s): {}",
            missing.join(", ")
        )))
    }
}

/// Splits `query` on `&` and decodes each `key=value` fragment. A non-empty fragment with no `=`
/// (e.g. a bare `?verbose` flag) is rejected rather than silently treated as an empty-valued key,
/// since there is no way to tell that apart from a typo'd parameter from the server side.
fn parse_query(query: &str) -> Result<HashMap<String, String>, DispatchError> {
    let mut map = HashMap::new();
    for fragment in query.split('&').filter(|f| !f.is_empty()) {
        if !fragment.contains('=') {
            return Err(DispatchError::bad_request(format!(
                "query parameter {:?} has no value (expected `name=value`)",
                fragment
            )));
        }
        if let Some((key, value)) = form_urlencoded::parse(fragment.as_bytes()).into_owned().next() {
            map.insert(key, value);
        }
    }
    Ok(map)
}

/// Decodes a single percent-encoded path capture. The tree matcher splits and matches on raw
/// (still-encoded) segments, so a capture like `a%2Fb` reaches here as one segment and is decoded
/// to `a/b` only now — never re-split on the decoded `/`.
fn decode_path_capture(raw: &str) -> String {
    percent_encoding::percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn is_form_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|m| m.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|m| m.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Decodes the request body into a flat `name -> raw text` map, one entry per top-level field.
///
/// JSON object fields are rendered back to text: scalars render as their plain value, and nested
/// objects/arrays render as compact JSON text so a `String`-typed argument can still receive them
/// verbatim. If a field's value is itself a JSON string that parses as JSON (the "double-encoded"
/// case — a client that serialized its payload twice), the inner document's rendering is used
/// instead of the literal escaped string, mirroring what a caller almost always means by sending
/// it that way.
fn parse_body(body: &[u8], content_type: Option<&str>) -> Result<HashMap<String, String>, DispatchError> {
    if body.is_empty() {
        return Ok(HashMap::new());
    }
    let content_type = content_type.unwrap_or("application/json");
    if is_form_content_type(content_type) {
        return Ok(form_urlencoded::parse(body).into_owned().collect());
    }
    if !is_json_content_type(content_type) && !content_type.is_empty() {
        // Unrecognized content type: treat the body as opaque, bindable only via body_arg_index.
        return Ok(HashMap::new());
    }
    let json: serde_json::Value = serde_json::from_slice(body)?;
    let object = match json {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => return Ok(HashMap::new()),
        _ => return Err(DispatchError::bad_request("expected a JSON object body")),
    };
    let mut out = HashMap::with_capacity(object.len());
    for (key, value) in object {
        out.insert(key, render_json_field(value));
    }
    Ok(out)
}

fn render_json_field(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => {
            if let Ok(nested) = serde_json::from_str::<serde_json::Value>(&s) {
                if nested.is_object() || nested.is_array() {
                    return render_json_field(nested);
                }
            }
            s
        }
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        other @ serde_json::Value::Object(_) | other @ serde_json::Value::Array(_) => {
            serde_json::to_string(&other).unwrap_or_default()
        }
    }
}
