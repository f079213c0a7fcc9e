//! Field discovery: candidates → eligibility → descriptors.

use fieldfill_dom::{Document, NodeId};
use fieldfill_shared::{FIELD_MARKER_ATTR, FieldDescriptor, FieldId, FieldKind};
use tracing::{debug, instrument, trace};

use crate::{context, eligibility, label};

/// Id counter scoped to one page session.
///
/// Ids are only ever issued by the session that owns the counter, so
/// repeated scans of the same page never hand out a duplicate marker.
#[derive(Debug, Default)]
pub struct ScanSession {
    next: u64,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> FieldId {
        let id = FieldId::from_index(self.next);
        self.next += 1;
        id
    }

    /// The id the `offset`-th next call to [`next_id`](Self::next_id) would return.
    pub fn peek(&self, offset: usize) -> FieldId {
        FieldId::from_index(self.next + offset as u64)
    }
}

/// Candidate nodes with their kind: text-like inputs first, then textareas,
/// each group in document order.
pub fn candidates(doc: &Document) -> Vec<(NodeId, FieldKind)> {
    let inputs = doc.elements_by_tag("input").into_iter().filter_map(|n| {
        FieldKind::from_input_type(doc.attr(n, "type")).map(|kind| (n, kind))
    });
    let textareas = doc
        .elements_by_tag("textarea")
        .into_iter()
        .map(|n| (n, FieldKind::Textarea));
    inputs.chain(textareas).collect()
}

/// Eligible candidates, in scan order.
fn fillable(doc: &Document) -> Vec<(NodeId, FieldKind)> {
    let candidates = candidates(doc);
    debug!(candidates = candidates.len(), "starting field detection");
    candidates
        .into_iter()
        .filter(|(node, _)| match eligibility::check(doc, *node) {
            Ok(()) => true,
            Err(reason) => {
                trace!(node = node.index(), %reason, "skipped non-fillable field");
                false
            }
        })
        .collect()
}

/// Scan the document for fillable fields.
///
/// Each accepted element is tagged with [`FIELD_MARKER_ATTR`] so the fill
/// executor can find it again; that is the only mutation.
#[instrument(skip_all)]
pub fn scan(doc: &mut Document, session: &mut ScanSession) -> Vec<FieldDescriptor> {
    let mut fields = Vec::new();
    for (node, kind) in fillable(doc) {
        let id = session.next_id();
        doc.set_attr(node, FIELD_MARKER_ATTR, id.as_str());

        let descriptor = describe(doc, node, kind, id);
        trace!(id = %descriptor.id, label = %descriptor.label, "added fillable field");
        fields.push(descriptor);
    }

    debug!(fields = fields.len(), "field detection complete");
    fields
}

/// Describe the fillable fields without touching the document or the session.
///
/// Ids are the ones the next [`scan`] with the same session would assign;
/// nothing is reserved and no marker is written.
#[instrument(skip_all)]
pub fn survey(doc: &Document, session: &ScanSession) -> Vec<FieldDescriptor> {
    fillable(doc)
        .into_iter()
        .enumerate()
        .map(|(i, (node, kind))| describe(doc, node, kind, session.peek(i)))
        .collect()
}

fn describe(doc: &Document, node: NodeId, kind: FieldKind, id: FieldId) -> FieldDescriptor {
    let attr = |name: &str| doc.attr(node, name).unwrap_or_default().to_string();

    FieldDescriptor {
        id,
        kind,
        tag_name: doc.tag_name(node).unwrap_or("input").to_string(),
        name: attr("name"),
        placeholder: attr("placeholder"),
        required: doc.has_attr(node, "required"),
        max_length: doc
            .attr(node, "maxlength")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| *n > 0),
        label: label::resolve(doc, node),
        context: context::extract(doc, node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_and_hidden_input() {
        let mut doc = Document::parse(
            r#"<form><input type="email" id="e"><input hidden name="secret"></form>"#,
        );
        let fields = scan(&mut doc, &mut ScanSession::new());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].kind, FieldKind::Email);
    }

    #[test]
    fn inputs_precede_textareas() {
        let mut doc = Document::parse(
            r#"<form><textarea name="bio"></textarea><input name="first"><input type="tel" name="phone"></form>"#,
        );
        let fields = scan(&mut doc, &mut ScanSession::new());
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["first", "phone", "bio"]);
        assert_eq!(fields[2].kind, FieldKind::Textarea);
        assert_eq!(fields[2].tag_name, "textarea");
    }

    #[test]
    fn non_text_inputs_are_ignored() {
        let mut doc = Document::parse(
            r#"<input type="checkbox"><input type="submit"><input type="number"><input type="search">"#,
        );
        let fields = scan(&mut doc, &mut ScanSession::new());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].kind, FieldKind::Search);
    }

    #[test]
    fn markers_and_attributes() {
        let mut doc = Document::parse(
            r#"<input id="a" name="full_name" placeholder="Jane" required maxlength="40">
               <input id="b" maxlength="-1">"#,
        );
        let fields = scan(&mut doc, &mut ScanSession::new());
        assert_eq!(fields.len(), 2);
        assert!(fields[0].required);
        assert_eq!(fields[0].placeholder, "Jane");
        assert_eq!(fields[0].max_length, Some(40));
        assert_eq!(fields[1].max_length, None);

        let a = doc.get_element_by_id("a").unwrap();
        assert_eq!(doc.attr(a, FIELD_MARKER_ATTR), Some("field_0"));
    }

    #[test]
    fn session_counter_continues_across_scans() {
        let mut doc = Document::parse(r#"<input name="a"><input name="b">"#);
        let mut session = ScanSession::new();
        let first = scan(&mut doc, &mut session);
        let second = scan(&mut doc, &mut session);
        assert_eq!(first[0].id.as_str(), "field_0");
        assert_eq!(second[0].id.as_str(), "field_2");
        assert_eq!(session.peek(0).as_str(), "field_4");
    }

    #[test]
    fn survey_leaves_document_and_session_alone() {
        let mut doc = Document::parse(r#"<input id="a" name="a"><textarea name="b"></textarea>"#);
        let mut session = ScanSession::new();
        scan(&mut doc, &mut session);
        let before = doc.to_html();

        let fields = survey(&doc, &session);
        let ids: Vec<&str> = fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["field_2", "field_3"]);
        assert_eq!(fields[1].kind, FieldKind::Textarea);
        assert_eq!(doc.to_html(), before);
        assert_eq!(session.next_id().as_str(), "field_2");

        let a = doc.get_element_by_id("a").unwrap();
        assert_eq!(doc.attr(a, FIELD_MARKER_ATTR), Some("field_0"));
    }
}
