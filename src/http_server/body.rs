//! Body parsers.
//!
//! JSON and URL-encoded bodies are buffered, decoded into a
//! [`serde_json::Value`], and attached to the request as [`ParsedBody`].
//! The raw bytes are put back so downstream extractors still work.
//! URL-encoded bodies use extended (bracket) notation: `a[b]=1` nests,
//! `a[]=1&a[]=2` and repeated keys build arrays.

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use futures_util::StreamExt;
use serde_json::{Map, Value};

use super::errors::{PipelineError, PipelineResult};

/// Largest body either parser will buffer
pub const BODY_LIMIT: usize = 100 * 1024;

/// Deepest bracket nesting honoured in URL-encoded keys
const FORM_DEPTH: usize = 5;

/// Highest array index honoured as an index (larger ones become keys)
const FORM_ARRAY_LIMIT: usize = 20;

/// Most `&`-separated parameters accepted in one URL-encoded body
pub const FORM_PARAMETER_LIMIT: usize = 1000;

/// Decoded request body, stored in the request extensions
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    Form(Value),
}

impl ParsedBody {
    pub fn value(&self) -> &Value {
        match self {
            ParsedBody::Json(value) | ParsedBody::Form(value) => value,
        }
    }
}

fn media_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = raw.split(';').next()?.trim().to_ascii_lowercase();
    Some(essence)
}

fn is_json(headers: &HeaderMap) -> bool {
    media_type(headers)
        .map(|m| m == "application/json" || (m.starts_with("application/") && m.ends_with("+json")))
        .unwrap_or(false)
}

fn is_form(headers: &HeaderMap) -> bool {
    media_type(headers)
        .map(|m| m == "application/x-www-form-urlencoded")
        .unwrap_or(false)
}

/// Buffer the body, enforcing [`BODY_LIMIT`], and hand back a request
/// carrying the same bytes.
async fn buffer(request: Request) -> PipelineResult<(Request, Bytes)> {
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > BODY_LIMIT) {
        return Err(PipelineError::PayloadTooLarge { limit: BODY_LIMIT });
    }

    let (parts, body) = request.into_parts();
    let mut stream = body.into_data_stream();
    let mut collected = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| PipelineError::BodyRead(e.to_string()))?;
        if collected.len() + chunk.len() > BODY_LIMIT {
            return Err(PipelineError::PayloadTooLarge { limit: BODY_LIMIT });
        }
        collected.extend_from_slice(&chunk);
    }

    let bytes = Bytes::from(collected);
    Ok((Request::from_parts(parts, Body::from(bytes.clone())), bytes))
}

/// Decode a JSON body; only objects and arrays are accepted at top level
pub fn decode_json(bytes: &[u8]) -> PipelineResult<Value> {
    let value: Value = serde_json::from_slice(bytes)?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err(PipelineError::NonStructuredJson),
    }
}

pub async fn parse_json(request: Request, next: Next) -> PipelineResult<Response> {
    if !is_json(request.headers()) {
        return Ok(next.run(request).await);
    }

    let (mut request, bytes) = buffer(request).await?;
    if !bytes.is_empty() {
        let value = decode_json(&bytes)?;
        request.extensions_mut().insert(ParsedBody::Json(value));
    }

    Ok(next.run(request).await)
}

pub async fn parse_urlencoded(request: Request, next: Next) -> PipelineResult<Response> {
    if !is_form(request.headers()) {
        return Ok(next.run(request).await);
    }

    let (mut request, bytes) = buffer(request).await?;
    let value = decode_form(&bytes)?;
    request.extensions_mut().insert(ParsedBody::Form(value));

    Ok(next.run(request).await)
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
    Push,
}

/// Split `a[b][0][]` into `[Key(a), Key(b), Index(0), Push]`
fn split_key(raw: &str) -> Vec<Segment> {
    let (root, mut rest) = match raw.find('[') {
        None => (raw, ""),
        // `[a][b]` roots at `a`; a bare `[]` stays literal.
        Some(0) => match raw.find(']') {
            Some(close) if close > 1 => (&raw[1..close], &raw[close + 1..]),
            _ => (raw, ""),
        },
        Some(pos) => raw.split_at(pos),
    };

    let mut segments = vec![Segment::Key(root.to_string())];
    while let Some(stripped) = rest.strip_prefix('[') {
        if segments.len() > FORM_DEPTH {
            break;
        }
        let Some(close) = stripped.find(']') else {
            break;
        };
        let inner = &stripped[..close];
        segments.push(match inner.parse::<usize>() {
            _ if inner.is_empty() => Segment::Push,
            Ok(index) if index <= FORM_ARRAY_LIMIT => Segment::Index(index),
            _ => Segment::Key(inner.to_string()),
        });
        rest = &stripped[close + 1..];
    }

    // Anything past the depth limit or a dangling bracket stays literal.
    if !rest.is_empty() {
        segments.push(Segment::Key(rest.to_string()));
    }
    segments
}

fn array_to_object(items: Vec<Value>) -> Map<String, Value> {
    items
        .into_iter()
        .enumerate()
        .filter(|(_, v)| !v.is_null())
        .map(|(i, v)| (i.to_string(), v))
        .collect()
}

fn assign(slot: &mut Value, segments: &[Segment], value: String) {
    let Some((head, tail)) = segments.split_first() else {
        match slot {
            Value::Null => *slot = Value::String(value),
            Value::Array(items) => items.push(Value::String(value)),
            Value::String(existing) => {
                let first = std::mem::take(existing);
                *slot = Value::Array(vec![Value::String(first), Value::String(value)]);
            }
            // A scalar cannot replace a nested structure.
            _ => {}
        }
        return;
    };

    match head {
        Segment::Push => {
            match slot {
                Value::Null => *slot = Value::Array(Vec::new()),
                Value::String(existing) => {
                    let first = std::mem::take(existing);
                    *slot = Value::Array(vec![Value::String(first)]);
                }
                _ => {}
            }
            match slot {
                Value::Array(items) => {
                    items.push(Value::Null);
                    if let Some(last) = items.last_mut() {
                        assign(last, tail, value);
                    }
                }
                Value::Object(map) => {
                    let next = map.len().to_string();
                    assign(map.entry(next).or_insert(Value::Null), tail, value);
                }
                _ => {}
            }
        }
        Segment::Index(index) => {
            if slot.is_null() {
                *slot = Value::Array(Vec::new());
            }
            match slot {
                Value::Array(items) => {
                    if items.len() <= *index {
                        items.resize(index + 1, Value::Null);
                    }
                    assign(&mut items[*index], tail, value);
                }
                Value::Object(map) => {
                    assign(map.entry(index.to_string()).or_insert(Value::Null), tail, value);
                }
                _ => {}
            }
        }
        Segment::Key(key) => {
            match slot {
                Value::Null => *slot = Value::Object(Map::new()),
                Value::Array(items) => {
                    *slot = Value::Object(array_to_object(std::mem::take(items)));
                }
                _ => {}
            }
            if let Value::Object(map) = slot {
                assign(map.entry(key.clone()).or_insert(Value::Null), tail, value);
            }
        }
    }
}

/// Drop the holes left by sparse indices
fn compact(value: &mut Value) {
    match value {
        Value::Array(items) => {
            items.retain(|v| !v.is_null());
            items.iter_mut().for_each(compact);
        }
        Value::Object(map) => map.values_mut().for_each(compact),
        _ => {}
    }
}

/// Decode an `application/x-www-form-urlencoded` body with bracket nesting
pub fn decode_form(bytes: &[u8]) -> PipelineResult<Value> {
    std::str::from_utf8(bytes)?;

    if bytes.split(|b| *b == b'&').count() > FORM_PARAMETER_LIMIT {
        return Err(PipelineError::TooManyParameters {
            limit: FORM_PARAMETER_LIMIT,
        });
    }

    let mut root = Value::Object(Map::new());
    for (key, value) in url::form_urlencoded::parse(bytes) {
        if key.is_empty() {
            continue;
        }
        let segments = split_key(&key);
        assign(&mut root, &segments, value.into_owned());
    }
    compact(&mut root);
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_requires_object_or_array() {
        assert_eq!(decode_json(br#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(decode_json(b"[1,2]").unwrap(), json!([1, 2]));
        assert!(matches!(
            decode_json(b"42"),
            Err(PipelineError::NonStructuredJson)
        ));
        assert!(matches!(
            decode_json(b"not-json"),
            Err(PipelineError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_media_type_detection() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "Application/JSON; charset=utf-8".parse().unwrap());
        assert!(is_json(&headers));

        headers.insert(CONTENT_TYPE, "application/vnd.api+json".parse().unwrap());
        assert!(is_json(&headers));

        headers.insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        assert!(!is_json(&headers));
        assert!(!is_form(&headers));

        headers.insert(
            CONTENT_TYPE,
            "application/x-www-form-urlencoded".parse().unwrap(),
        );
        assert!(is_form(&headers));
    }

    #[test]
    fn test_flat_form() {
        let value = decode_form(b"name=choc+chip&qty=12").unwrap();
        assert_eq!(value, json!({"name": "choc chip", "qty": "12"}));
    }

    #[test]
    fn test_nested_form() {
        let value = decode_form(b"order[item][name]=oat&order[item][qty]=2&order[note]=hi").unwrap();
        assert_eq!(
            value,
            json!({"order": {"item": {"name": "oat", "qty": "2"}, "note": "hi"}})
        );
    }

    #[test]
    fn test_form_arrays() {
        assert_eq!(
            decode_form(b"tags[]=a&tags[]=b").unwrap(),
            json!({"tags": ["a", "b"]})
        );
        assert_eq!(
            decode_form(b"tags=a&tags=b").unwrap(),
            json!({"tags": ["a", "b"]})
        );
        assert_eq!(
            decode_form(b"list[1]=b&list[0]=a").unwrap(),
            json!({"list": ["a", "b"]})
        );
        assert_eq!(
            decode_form(b"sparse[3]=x").unwrap(),
            json!({"sparse": ["x"]})
        );
    }

    #[test]
    fn test_large_index_becomes_key() {
        assert_eq!(
            decode_form(b"a[100]=x").unwrap(),
            json!({"a": {"100": "x"}})
        );
    }

    #[test]
    fn test_depth_limit_keeps_remainder_literal() {
        let value = decode_form(b"a[b][c][d][e][f][g]=deep").unwrap();
        assert_eq!(
            value,
            json!({"a": {"b": {"c": {"d": {"e": {"f": {"[g]": "deep"}}}}}}})
        );
    }

    #[test]
    fn test_percent_decoding_and_brackets() {
        let value = decode_form(b"user%5Bname%5D=J%C3%BCrgen").unwrap();
        assert_eq!(value, json!({"user": {"name": "Jürgen"}}));
    }

    #[test]
    fn test_leading_bracket_key() {
        assert_eq!(decode_form(b"[a]=1").unwrap(), json!({"a": "1"}));
        assert_eq!(
            decode_form(b"[user][name]=ada").unwrap(),
            json!({"user": {"name": "ada"}})
        );
        assert_eq!(decode_form(b"[]=1").unwrap(), json!({"[]": "1"}));
    }

    #[test]
    fn test_parameter_limit() {
        let at_limit = vec!["k=v"; FORM_PARAMETER_LIMIT].join("&");
        assert!(decode_form(at_limit.as_bytes()).is_ok());

        let over = vec!["k=v"; FORM_PARAMETER_LIMIT + 1].join("&");
        let err = decode_form(over.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::TooManyParameters { limit: 1000 }));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_streamed_body_over_limit_is_payload_too_large() {
        let chunks = vec![
            Ok::<_, std::io::Error>(Bytes::from(vec![b'a'; 60 * 1024])),
            Ok(Bytes::from(vec![b'a'; 60 * 1024])),
        ];
        let request = axum::http::Request::post("/")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap();

        let err = buffer(request).await.unwrap_err();
        assert!(matches!(err, PipelineError::PayloadTooLarge { limit: BODY_LIMIT }));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_buffer_keeps_bytes() {
        let request = axum::http::Request::post("/").body(Body::from("a=1")).unwrap();
        let (request, bytes) = buffer(request).await.unwrap();
        assert_eq!(&bytes[..], b"a=1");

        let again = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap();
        assert_eq!(again, bytes);
    }

    #[test]
    fn test_invalid_utf8_form() {
        assert!(matches!(
            decode_form(&[0x61, 0x3d, 0xff]),
            Err(PipelineError::MalformedForm(_))
        ));
    }
}
