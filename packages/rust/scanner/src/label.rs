//! Label resolution: first non-empty source wins.
//!
//! 1. `<label for=...>` pointing at the field's id
//! 2. an ancestor `<label>` (minus the field's own value)
//! 3. `aria-label`, then the element(s) named by `aria-labelledby`
//! 4. the nearest preceding sibling element with text

use fieldfill_dom::{Document, NodeId};

use crate::normalize_whitespace;

pub fn resolve(doc: &Document, field: NodeId) -> String {
    [explicit_label, wrapping_label, aria_label, preceding_sibling]
        .into_iter()
        .find_map(|source| source(doc, field).filter(|l| !l.is_empty()))
        .unwrap_or_default()
}

fn explicit_label(doc: &Document, field: NodeId) -> Option<String> {
    let id = doc.attr(field, "id").filter(|id| !id.is_empty())?;
    doc.elements_by_tag("label")
        .into_iter()
        .find(|l| doc.attr(*l, "for") == Some(id))
        .map(|l| normalize_whitespace(&doc.text_content(l)))
}

fn wrapping_label(doc: &Document, field: NodeId) -> Option<String> {
    let label = doc.closest(field, &["label"])?;
    let mut text = normalize_whitespace(&doc.text_content(label));
    let value = doc.value(field);
    if !value.is_empty() {
        text = normalize_whitespace(&text.replacen(value.trim(), "", 1));
    }
    Some(text)
}

fn aria_label(doc: &Document, field: NodeId) -> Option<String> {
    if let Some(label) = doc.attr(field, "aria-label").map(normalize_whitespace) {
        if !label.is_empty() {
            return Some(label);
        }
    }

    let ids = doc.attr(field, "aria-labelledby")?;
    let text = ids
        .split_whitespace()
        .filter_map(|id| doc.get_element_by_id(id))
        .map(|el| normalize_whitespace(&doc.text_content(el)))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Some(text)
}

fn preceding_sibling(doc: &Document, field: NodeId) -> Option<String> {
    doc.previous_element_siblings(field)
        .into_iter()
        .map(|s| normalize_whitespace(&doc.text_content(s)))
        .find(|t| !t.is_empty())
}
