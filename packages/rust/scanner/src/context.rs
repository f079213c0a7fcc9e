//! Surrounding-text extraction for a field.

use fieldfill_dom::{Document, NodeId};
use fieldfill_shared::{FieldDescriptor, truncate_chars};

use crate::normalize_whitespace;

/// Block containers searched for the field's section text.
const CONTAINER_TAGS: &[&str] = &["div", "fieldset", "form", "section"];

/// Characters kept from the container text.
const CONTAINER_TEXT_CHARS: usize = 200;

/// Text nodes taken from the field's parent.
const NEARBY_TEXT_NODES: usize = 3;

/// Minimum trimmed length for a nearby text node to count.
const MIN_NEARBY_TEXT_CHARS: usize = 3;

/// Container text plus up to three nearby text nodes, capped at
/// [`FieldDescriptor::MAX_CONTEXT_CHARS`].
pub fn extract(doc: &Document, field: NodeId) -> String {
    let mut parts: Vec<String> = Vec::new();
    let value = doc.value(field);
    let value = value.trim();

    if let Some(container) = doc.closest(field, CONTAINER_TAGS) {
        let mut text = normalize_whitespace(&doc.text_content(container));
        if !value.is_empty() {
            text = normalize_whitespace(&text.replacen(value, "", 1));
        }
        let text = truncate_chars(&text, CONTAINER_TEXT_CHARS).trim_end();
        if !text.is_empty() {
            parts.push(text.to_string());
        }
    }

    if let Some(parent) = doc.parent_element(field) {
        parts.extend(
            doc.text_nodes(parent)
                .into_iter()
                .filter_map(|n| doc.text(n))
                .map(normalize_whitespace)
                .filter(|t| t.chars().count() >= MIN_NEARBY_TEXT_CHARS)
                .take(NEARBY_TEXT_NODES),
        );
    }

    let joined = parts.join(" ");
    truncate_chars(&joined, FieldDescriptor::MAX_CONTEXT_CHARS)
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_of(html: &str) -> String {
        let doc = Document::parse(html);
        let id = doc.get_element_by_id("f").expect("fixture has #f");
        extract(&doc, id)
    }

    #[test]
    fn container_text_then_nearby_nodes() {
        let html = r#"<form><p>Register for the summit</p>
                      <div>Your name <input id="f"> as on ID</div></form>"#;
        // Nearest container is the div; nearby nodes come from the same div.
        assert_eq!(
            context_of(html),
            "Your name as on ID Your name as on ID"
        );
    }

    #[test]
    fn short_nearby_nodes_are_dropped() {
        let html = r#"<section><span>Bio</span><span>ok</span><input id="f"></section>"#;
        // textContent concatenates without separators; "ok" alone is too
        // short to count as a nearby text node.
        assert_eq!(context_of(html), "Biook Bio");
    }

    #[test]
    fn own_value_is_stripped_from_container_text() {
        let html = r#"<div>Nickname <textarea id="f">Zed</textarea></div>"#;
        let ctx = context_of(html);
        assert!(ctx.starts_with("Nickname"));
        // The textarea's own text node still counts as nearby text.
        assert_eq!(ctx, "Nickname Nickname Zed");
    }

    #[test]
    fn container_text_is_capped_and_total_bounded() {
        let long = "lorem ipsum ".repeat(100);
        let html = format!(
            r#"<div>{long}<p>{long}</p><p>{long}</p><input id="f"></div>"#
        );
        let ctx = context_of(&html);
        assert!(ctx.chars().count() <= FieldDescriptor::MAX_CONTEXT_CHARS);
    }

    #[test]
    fn no_container_uses_parent_text_only() {
        let html = r#"<body><label>Street address <input id="f"></label></body>"#;
        assert_eq!(context_of(html), "Street address");
    }
}
