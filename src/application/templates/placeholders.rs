//! Minimal `{{ name }}` substitution with a mandatory leftover check.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::domain::error::ValidationError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Named values for a template, already encoded as text.
pub type Bindings = BTreeMap<&'static str, String>;

/// Replace every placeholder whose name is bound, then fail if any
/// placeholder syntax survives.
pub fn substitute(template: &str, bindings: &Bindings) -> Result<String, ValidationError> {
    let mut rendered = String::with_capacity(template.len());
    let mut cursor = 0;

    for (range, name) in placeholders(template) {
        if let Some(value) = bindings.get(name) {
            rendered.push_str(&template[cursor..range.start]);
            rendered.push_str(value);
            cursor = range.end;
        }
    }
    rendered.push_str(&template[cursor..]);

    let unresolved = unresolved_names(&rendered);
    if !unresolved.is_empty() {
        return Err(ValidationError::UnresolvedPlaceholders { names: unresolved });
    }

    Ok(rendered)
}

/// Distinct placeholder names still present in `text`, in order of first use.
pub fn unresolved_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (_, name) in placeholders(text) {
        if !names.iter().any(|seen| seen == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn placeholders(text: &str) -> Vec<(Range<usize>, &str)> {
    let mut found = Vec::new();
    let mut offset = 0;

    while let Some(open) = text[offset..].find(OPEN) {
        let start = offset + open;
        let inner_start = start + OPEN.len();
        let Some(close) = text[inner_start..].find(CLOSE) else {
            break;
        };
        let inner_end = inner_start + close;
        let name = text[inner_start..inner_end].trim();

        if is_identifier(name) {
            let end = inner_end + CLOSE.len();
            found.push((start..end, name));
            offset = end;
        } else {
            offset = inner_start;
        }
    }

    found
}

fn is_identifier(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
