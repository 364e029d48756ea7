//! Company text-search helpers: query variants, relevance filtering and tax
//! id formatting.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::types::EntityCandidate;

fn dots_and_spaces() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.\s]").expect("valid regex"))
}

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s./-]").expect("valid regex"))
}

/// Format a 14-digit CNPJ as `NN.NNN.NNN/NNNN-NN`. Anything else is
/// returned unchanged.
pub fn format_tax_id(raw: &str) -> String {
    if raw.len() != 14 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.to_string();
    }
    format!(
        "{}.{}.{}/{}-{}",
        &raw[..2],
        &raw[2..5],
        &raw[5..8],
        &raw[8..12],
        &raw[12..]
    )
}

/// Search terms to try in order: verbatim, spaces as hyphens, without dots
/// and whitespace, without any separator. Duplicates and empty terms are
/// dropped.
pub fn query_variants(text: &str) -> Vec<String> {
    let candidates = [
        text.to_string(),
        text.replace(' ', "-"),
        dots_and_spaces().replace_all(text, "").into_owned(),
        separators().replace_all(text, "").into_owned(),
    ];

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

/// Lower-cased, non-empty tokens of `query` split on whitespace, `.`, `-`
/// and `/`.
pub fn query_tokens(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    separators()
        .split(&lowered)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keep the CRM results whose name contains every token of the original
/// query, converted to candidates.
pub fn filter_matches(query: &str, results: &[Value]) -> Vec<EntityCandidate> {
    let tokens = query_tokens(query);
    results
        .iter()
        .filter_map(|raw| {
            let name = raw.get("nome").and_then(Value::as_str).unwrap_or_default();
            let lowered = name.to_lowercase();
            if !tokens.iter().all(|t| lowered.contains(t.as_str())) {
                return None;
            }
            let Some(id) = raw.get("id").and_then(value_as_id) else {
                debug!(candidate = name, "Dropping CRM result without a numeric id");
                return None;
            };
            let tax_id = raw
                .get("inscricao")
                .and_then(Value::as_str)
                .map(format_tax_id)
                .unwrap_or_default();
            Some(EntityCandidate {
                id,
                name: name.to_string(),
                tax_id,
            })
        })
        .collect()
}

/// CRM payloads are either a bare array or an object wrapping one. Returns
/// the first array found.
pub fn first_list(payload: &Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map
            .values()
            .find_map(|v| v.as_array().cloned())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn value_as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
