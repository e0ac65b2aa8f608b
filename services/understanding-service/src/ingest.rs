use axum::{
    body::{to_bytes, Body},
    http::HeaderMap,
};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::net::SocketAddr;

use crate::models::UnderstandingPayload;

pub const REAL_IP_HEADER: &str = "x-real-ip";
/// Beacons are a few hundred bytes; anything past this is not one of ours.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
pub enum PayloadError {
    Body(axum::Error),
    Json(serde_json::Error),
    NotObject,
    Empty,
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Body(err) => write!(f, "read body: {err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::NotObject => write!(f, "body is not a JSON object"),
            Self::Empty => write!(f, "empty body"),
        }
    }
}

impl std::error::Error for PayloadError {}

/// Proxy-supplied address wins; otherwise the peer address, port included.
pub fn client_ip(headers: &HeaderMap, remote: SocketAddr) -> String {
    headers
        .get(REAL_IP_HEADER)
        .filter(|value| !value.is_empty())
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_else(|| remote.to_string())
}

pub async fn read_payload(body: Body) -> Result<UnderstandingPayload, PayloadError> {
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(PayloadError::Body)?;
    parse_payload(&bytes)
}

/// Decodes the first JSON value in `bytes`; anything after it is ignored.
///
/// Repeated keys keep their last value and field names match without regard
/// to ASCII case.
pub fn parse_payload(bytes: &[u8]) -> Result<UnderstandingPayload, PayloadError> {
    let value = serde_json::Deserializer::from_slice(bytes)
        .into_iter::<Value>()
        .next()
        .ok_or(PayloadError::Empty)?
        .map_err(PayloadError::Json)?;
    let Value::Object(fields) = value else {
        return Err(PayloadError::NotObject);
    };
    UnderstandingPayload::deserialize(Value::Object(fold_keys(fields)))
        .map_err(PayloadError::Json)
}

/// Lowercases object keys. A key already in lowercase beats any other casing
/// of the same name.
fn fold_keys(fields: Map<String, Value>) -> Map<String, Value> {
    let (exact, other): (Vec<_>, Vec<_>) = fields
        .into_iter()
        .partition(|(key, _)| !key.bytes().any(|byte| byte.is_ascii_uppercase()));
    let mut folded = Map::new();
    for (key, value) in other.into_iter().chain(exact) {
        folded.insert(key.to_ascii_lowercase(), value);
    }
    folded
}

/// `Ok(None)` when the client sent no timestamp at all. The client's offset
/// is kept as sent.
pub fn parse_client_timestamp(
    raw: Option<&str>,
) -> Result<Option<DateTime<FixedOffset>>, chrono::ParseError> {
    match raw {
        Some(raw) if !raw.is_empty() => DateTime::parse_from_rfc3339(raw).map(Some),
        _ => Ok(None),
    }
}

pub fn normalize_timestamp(
    raw: Option<&str>,
    now: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    match parse_client_timestamp(raw) {
        Ok(Some(timestamp)) => timestamp,
        Ok(None) => now,
        Err(err) => {
            tracing::warn!(error = %err, raw = raw.unwrap_or_default(), "error parsing timestamp");
            now
        }
    }
}
