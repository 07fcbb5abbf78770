//! Canonical message construction
//!
//! Both sides recompute these strings to verify a signature, so every
//! function here is a pure, deterministic function of its inputs.

use serde_json::{Number, Value};

use super::HttpMethod;
use crate::error::{SdkError, SdkResult};

/// Flat request parameters
pub type Params = serde_json::Map<String, Value>;

/// Render a primitive the way the exchange does (`true`, `1`, `0.5`, raw strings)
fn primitive_to_string(key: &str, value: &Value) -> SdkResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(number_to_string(n)),
        Value::Null => Err(SdkError::Canonicalization(format!(
            "parameter '{}' is null",
            key
        ))),
        Value::Array(_) | Value::Object(_) => Err(SdkError::Canonicalization(format!(
            "parameter '{}' is not a primitive",
            key
        ))),
    }
}

fn number_to_string(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        // integral floats render without a fractional part
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        _ => n.to_string(),
    }
}

fn sorted_entries(params: &Params) -> SdkResult<Vec<(&str, String)>> {
    let mut entries = params
        .iter()
        .map(|(k, v)| Ok((k.as_str(), primitive_to_string(k, v)?)))
        .collect::<SdkResult<Vec<_>>>()?;
    entries.sort_by(|a, b| a.0.cmp(b.0));
    Ok(entries)
}

/// Trading-key message: keys sorted lexicographically, `k=v` joined by `&`.
/// Values are not URL-encoded.
pub fn canonical_order_message(params: &Params) -> SdkResult<String> {
    if params.is_empty() {
        return Err(SdkError::Canonicalization(
            "order payload has no parameters".into(),
        ));
    }
    Ok(sorted_entries(params)?
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&"))
}

/// `application/x-www-form-urlencoded` query string with sorted keys
pub fn sorted_query_string(params: &Params) -> SdkResult<String> {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in sorted_entries(params)? {
        serializer.append_pair(key, &value);
    }
    Ok(serializer.finish())
}

/// Orderly-key message: `timestamp + METHOD + path [+ "?" + query] [+ body]`
pub fn orderly_message(
    timestamp: u64,
    method: HttpMethod,
    path: &str,
    query: Option<&str>,
    body: Option<&str>,
) -> String {
    let mut message = format!("{}{}{}", timestamp, method.as_str(), path);
    if let Some(query) = query {
        message.push('?');
        message.push_str(query);
    }
    if let Some(body) = body {
        message.push_str(body);
    }
    message
}
