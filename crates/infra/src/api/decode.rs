//! Single decode step from raw bytes to [`ResponseBody`]

use civicdesk_domain::ResponseBody;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

/// Decode a body using the declared content type and a sniff of the first
/// character.
///
/// Declared JSON, or text starting with `{` or `[`, is parsed as JSON; a parse
/// failure degrades to a text body instead of an error.
#[must_use]
pub fn decode_body(headers: &HeaderMap, bytes: &[u8]) -> ResponseBody {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ResponseBody::Empty;
    }

    let declared_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
    let looks_structured = trimmed.starts_with('{') || trimmed.starts_with('[');

    if !declared_json && !looks_structured {
        return ResponseBody::Text(trimmed.to_string());
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => ResponseBody::Structured(value),
        Err(err) => {
            debug!(error = %err, declared_json, "Body is not valid JSON, keeping it as text");
            ResponseBody::Text(trimmed.to_string())
        }
    }
}
