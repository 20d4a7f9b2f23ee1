//! Placeholder expansion for message templates.
//!
//! Templates reference data with `{{.Name}}` (whitespace and the leading dot
//! are optional). Dotted paths such as `{{.User.Name}}` walk nested maps,
//! which is how struct-like data is addressed after it has been serialized.

use crate::error::{I18nError, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::OnceLock;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"\{\{\s*\.?([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*\}\}")
            .expect("placeholder regex is valid")
    })
}

/// Expand every placeholder in `template` from `data`.
///
/// # Arguments
/// * `message_id` - Used only for error reporting
/// * `template` - Template text
/// * `data` - Template data; `None` behaves like an empty map
///
/// # Returns
/// * `Ok(String)` with all placeholders substituted
/// * `Err(MissingTemplateField)` if a placeholder names absent data
/// * `Err(MalformedTemplate)` if a `{{` is not a valid placeholder
pub fn expand(message_id: &str, template: &str, data: Option<&Map<String, Value>>) -> Result<String> {
    if !template.contains("{{") {
        return Ok(template.to_string());
    }

    let empty = Map::new();
    let data = data.unwrap_or(&empty);
    let mut output = String::with_capacity(template.len());
    let mut last = 0;

    for captures in placeholder_regex().captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let literal = &template[last..whole.start()];
        check_literal(message_id, literal)?;
        output.push_str(literal);

        let path = &captures[1];
        let value = lookup(data, path).ok_or_else(|| I18nError::MissingTemplateField {
            message_id: message_id.to_string(),
            field: path.to_string(),
        })?;
        render_value(value, &mut output);
        last = whole.end();
    }

    let tail = &template[last..];
    check_literal(message_id, tail)?;
    output.push_str(tail);

    Ok(output)
}

/// Every placeholder path referenced by `template`.
pub fn placeholders(template: &str) -> BTreeSet<String> {
    placeholder_regex()
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Check that every `{{` in `template` opens a recognized placeholder.
pub fn check(message_id: &str, template: &str) -> Result<()> {
    let mut last = 0;
    for found in placeholder_regex().find_iter(template) {
        check_literal(message_id, &template[last..found.start()])?;
        last = found.end();
    }
    check_literal(message_id, &template[last..])
}

fn check_literal(message_id: &str, literal: &str) -> Result<()> {
    if let Some(pos) = literal.find("{{") {
        let snippet: String = literal[pos..].chars().take(24).collect();
        return Err(I18nError::MalformedTemplate {
            message_id: message_id.to_string(),
            reason: format!("unrecognized placeholder near '{snippet}'"),
        });
    }
    Ok(())
}

fn lookup<'a>(data: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn render_value(value: &Value, output: &mut String) {
    match value {
        Value::String(s) => output.push_str(s),
        Value::Null => {}
        Value::Bool(b) => output.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => output.push_str(&n.to_string()),
        other => output.push_str(&other.to_string()),
    }
}
