//! ResponseParser: raw model text to a sequence of [`Envelope`]s.
//!
//! The protocol asks for one JSON object per line, but models wrap output in
//! Markdown fences, prefix it with role labels, or pretty-print a single
//! object across several lines. The parser repairs those artifacts and never
//! drops a line: anything that still fails to decode becomes
//! [`Envelope::Unrecognized`] carrying the original text.

use serde_json::{Map, Value};
use taskpilot_core::envelope::Envelope;
use tracing::debug;

/// Role labels models sometimes prepend to a line ("Agent: {...}").
const ROLE_LABELS: &[&str] = &["agent", "assistant", "model", "ai", "bot"];

/// Parse a raw model response into envelopes, in order.
///
/// A response with no non-empty lines yields an empty vector.
pub fn parse(raw: &str) -> Vec<Envelope> {
    let lines: Vec<&str> = raw.lines().filter_map(clean_line).collect();
    if lines.is_empty() {
        return Vec::new();
    }

    // Whole-text pass first so pretty-printed objects spanning lines survive.
    let joined = lines.join("\n");
    if let Some(values) = decode_stream(&joined) {
        return values
            .into_iter()
            .map(|(value, raw_text)| from_value(value, raw_text))
            .collect();
    }

    debug!(lines = lines.len(), "Falling back to line-by-line parsing");
    lines.into_iter().map(parse_line).collect()
}

/// Parse a single cleaned line.
fn parse_line(line: &str) -> Envelope {
    match serde_json::from_str::<Value>(line) {
        Ok(value) => from_value(value, line.to_string()),
        Err(_) => Envelope::Unrecognized {
            raw_text: line.to_string(),
        },
    }
}

/// Decode `text` as a stream of concatenated JSON values, each paired with
/// its source text. Returns `None` if any part of it is not JSON.
fn decode_stream(text: &str) -> Option<Vec<(Value, String)>> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    let mut values = Vec::new();
    let mut start = 0;
    while let Some(next) = stream.next() {
        let value = next.ok()?;
        let end = stream.byte_offset();
        values.push((value, text[start..end].trim().to_string()));
        start = end;
    }
    if values.is_empty() { None } else { Some(values) }
}

/// Strip fence markers and role labels. `None` for lines with nothing left.
fn clean_line(line: &str) -> Option<&str> {
    let mut line = strip_role_label(line.trim()).trim();

    if let Some(rest) = line.strip_prefix("```") {
        let rest = rest.trim_start_matches('`');
        // A bare fence, optionally tagged with a language.
        if rest.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        line = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest)
            .trim_start();
    }
    if let Some(rest) = line.strip_suffix("```") {
        line = rest.trim_end_matches('`').trim_end();
    }

    line = strip_role_label(line).trim();
    if line.is_empty() { None } else { Some(line) }
}

fn strip_role_label(line: &str) -> &str {
    let Some((label, rest)) = line.split_once(':') else {
        return line;
    };
    if ROLE_LABELS.iter().any(|known| label.trim().eq_ignore_ascii_case(known)) {
        rest
    } else {
        line
    }
}

/// Map a decoded JSON value to its envelope variant.
///
/// Missing fields become null or empty text rather than a decode failure.
fn from_value(value: Value, raw_text: String) -> Envelope {
    let Value::Object(obj) = value else {
        return Envelope::Unrecognized { raw_text };
    };
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .map(|t| t.trim().to_ascii_lowercase());

    match kind.as_deref() {
        Some("plan") => Envelope::Plan {
            text: text_field(&obj, &["plan", "text"]),
        },
        Some("action") => Envelope::Action {
            function: text_field(&obj, &["function", "name"]),
            input: obj.get("input").cloned().unwrap_or(Value::Null),
        },
        Some("observation") => Envelope::Observation {
            value: obj
                .get("observation")
                .or_else(|| obj.get("value"))
                .cloned()
                .unwrap_or(Value::Null),
        },
        Some("output") => Envelope::Output {
            text: text_field(&obj, &["output", "text"]),
        },
        _ => Envelope::Unrecognized { raw_text },
    }
}

/// The first present key among `keys`, rendered as text.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default()
}
