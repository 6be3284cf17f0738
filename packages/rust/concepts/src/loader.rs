//! Concept export parsing.
//!
//! Snowstorm concept searches can be saved either as the paged response
//! (`{"items": [...], "total": ..}`) or as a bare array of concepts. Both are
//! accepted here and normalized into [`ConceptRecord`]s.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use termgraph_shared::{ConceptRecord, Result, TermGraphError};
use tracing::warn;

/// Matches the trailing `(semantic tag)` of a fully specified name.
static SEM_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)\s*$").expect("semantic tag regex"));

/// Extract the semantic tag from a fully specified name.
///
/// `"Heart structure (body structure)"` yields `Some("body structure")`.
pub fn semantic_tag_from_fsn(fsn: &str) -> Option<String> {
    SEM_TAG_RE
        .captures(fsn)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
}

/// Parse the content of one domain export into concept records.
///
/// `source` is only used in error messages. Empty content yields no records.
pub fn parse_concepts(content: &str, domain_label: &str, source: &str) -> Result<Vec<ConceptRecord>> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let data: Value = serde_json::from_str(trimmed)
        .map_err(|e| TermGraphError::parse(format!("{source}: invalid JSON: {e}")))?;

    let items = match data {
        Value::Object(mut obj) => match obj.remove("items") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(TermGraphError::parse(format!(
                    "{source}: `items` is not an array"
                )));
            }
            None => {
                return Err(TermGraphError::parse(format!(
                    "{source}: expected an object with `items` or an array of concepts"
                )));
            }
        },
        Value::Array(items) => items,
        _ => {
            return Err(TermGraphError::parse(format!(
                "{source}: expected an object with `items` or an array of concepts"
            )));
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match concept_from_json(item, domain_label) {
            Some(record) => records.push(record),
            None => warn!(source, index = idx, "concept without conceptId or id, skipping"),
        }
    }
    Ok(records)
}

/// Normalize a single concept object. Returns `None` when it carries no identifier.
fn concept_from_json(obj: &Value, domain_label: &str) -> Option<ConceptRecord> {
    let concept_id = scalar_field(obj, "conceptId").or_else(|| scalar_field(obj, "id"))?;

    let fsn = nested_term(obj, "fsn");
    let pt = nested_term(obj, "pt");
    let semantic_tag = fsn
        .as_deref()
        .and_then(semantic_tag_from_fsn)
        .unwrap_or_else(|| domain_label.to_string());

    Some(ConceptRecord {
        concept_id,
        active: obj.get("active").is_none_or(is_truthy),
        definition_status: scalar_field(obj, "definitionStatus"),
        module_id: scalar_field(obj, "moduleId"),
        effective_time: scalar_field(obj, "effectiveTime"),
        fsn,
        pt,
        semantic_tag,
        domain_labels: BTreeSet::from([domain_label.to_string()]),
    })
}

/// Read a string or number field as text. Empty strings count as absent.
fn scalar_field(obj: &Value, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `obj[key].term`, tolerating absence at either level.
fn nested_term(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)?
        .get("term")?
        .as_str()
        .map(str::to_string)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
