//! Node arena and tree operations.

use fieldfill_shared::{FieldFillError, Result};
use html5ever::{LocalName, QualName, namespace_url, ns};

use crate::event::{DispatchedEvent, EventKind};

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// An element's name, attributes and live form state.
#[derive(Debug, Clone)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Namespaced name as parsed, used when writing the element back out.
    pub(crate) name: QualName,
    pub(crate) attrs: Vec<(QualName, String)>,
    /// Dirty value of a form control; `None` means "use the default value".
    pub(crate) value: Option<String>,
}

impl Element {
    /// A new HTML element with no attributes.
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into().to_ascii_lowercase();
        let name = QualName::new(None, ns!(html), LocalName::from(tag.as_str()));
        Self::from_parts(name, Vec::new())
    }

    pub(crate) fn from_parts(name: QualName, attrs: Vec<(QualName, String)>) -> Self {
        Self {
            tag: (*name.local).to_ascii_lowercase(),
            name,
            attrs,
            value: None,
        }
    }

    /// Attribute lookup by qualified name (`name`, `xlink:href`), ignoring ASCII case.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| name_matches(k, name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether this element holds a user-editable value.
    pub fn is_form_control(&self) -> bool {
        self.name.ns == ns!(html) && matches!(self.tag.as_str(), "input" | "textarea")
    }
}

fn name_matches(qual: &QualName, name: &str) -> bool {
    match (&qual.prefix, name.split_once(':')) {
        (Some(prefix), Some((p, local))) => {
            (**prefix).eq_ignore_ascii_case(p) && (*qual.local).eq_ignore_ascii_case(local)
        }
        (None, None) => (*qual.local).eq_ignore_ascii_case(name),
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub data: NodeData,
}

/// Mutable document tree. Node 0 is always the document node.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) nodes: Vec<Node>,
    focused: Option<NodeId>,
    events: Vec<DispatchedEvent>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            focused: None,
            events: Vec::new(),
        }
    }
}

impl Document {
    /// Parse a full HTML document.
    pub fn parse(html: &str) -> Self {
        crate::parse::parse_document(html)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// `None` for ids that belong to another document.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            match el.attrs.iter_mut().find(|(k, _)| name_matches(k, name)) {
                Some((_, v)) => *v = value.to_string(),
                None => {
                    let local = LocalName::from(name.to_ascii_lowercase());
                    el.attrs.push((QualName::new(None, ns!(), local), value.to_string()));
                }
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.retain(|(k, _)| !name_matches(k, name));
        }
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// Parent, if it is an element (not the document node).
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.element(*p).is_some())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    /// Element ancestors, nearest first (excluding `id` itself).
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent_element(id), move |n| self.parent_element(*n))
    }

    /// All descendants of `id` in document order (excluding `id`).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Connected elements with the given tag, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|n| self.tag_name(*n).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
            .collect()
    }

    /// First connected element whose attribute `name` equals `value`.
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|n| self.attr(*n, name) == Some(value))
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.find_by_attr("id", id)
    }

    /// Nearest inclusive ancestor whose tag is one of `tags`.
    pub fn closest(&self, id: NodeId, tags: &[&str]) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.tag_name(*n).is_some_and(|t| tags.contains(&t)))
    }

    /// Element siblings before `id`, nearest first.
    pub fn previous_element_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.parent(id) else {
            return Vec::new();
        };
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|n| *n == id).unwrap_or(0);
        siblings[..pos]
            .iter()
            .rev()
            .copied()
            .filter(|n| self.element(*n).is_some())
            .collect()
    }

    /// Descendant text nodes of `id` in document order.
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.text(*n).is_some())
            .collect()
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Concatenated text of all descendant text nodes (DOM `textContent`).
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(t) = self.text(id) {
            return t.to_string();
        }
        self.text_nodes(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.elements_by_tag("body").into_iter().next()
    }

    /// Whether `id` is still reachable from the document node.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if n == self.root() {
                return true;
            }
            cur = self.nodes.get(n.0).and_then(|node| node.parent);
        }
        false
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(None, NodeData::Element(Element::new(tag)))
    }

    pub(crate) fn push_node(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            data,
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        for child in std::mem::take(&mut node.children) {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            self.push_node(Some(id), NodeData::Text(text.to_string()));
        }
    }

    /// Remove `id` from its parent. The node stays in the arena, detached.
    pub fn detach(&mut self, id: NodeId) {
        let parent = self.nodes.get_mut(id.0).and_then(|node| node.parent.take());
        if let Some(parent) = parent {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
        if self.focused.is_some_and(|f| f == id || !self.is_connected(f)) {
            self.focused = None;
        }
    }

    // -----------------------------------------------------------------------
    // Form controls
    // -----------------------------------------------------------------------

    /// Current value of an `input`/`textarea`; empty for anything else.
    pub fn value(&self, id: NodeId) -> String {
        let Some(el) = self.element(id) else {
            return String::new();
        };
        if let Some(v) = &el.value {
            return v.clone();
        }
        match el.tag.as_str() {
            "input" => el.attr("value").unwrap_or_default().to_string(),
            "textarea" => self.text_content(id),
            _ => String::new(),
        }
    }

    /// Assign the live value of a form control.
    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<()> {
        let el = self.element_mut(id).ok_or_else(|| {
            FieldFillError::Apply(format!("node {} is not an element", id.0))
        })?;
        if !el.is_form_control() {
            return Err(FieldFillError::Apply(format!(
                "<{}> does not accept a value",
                el.tag
            )));
        }
        el.value = Some(value.to_string());
        Ok(())
    }

    pub fn focus(&mut self, id: NodeId) {
        if self.element(id).is_some() && self.is_connected(id) {
            self.focused = Some(id);
        }
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Dispatch a synthetic event at `target`. Returns the propagation path
    /// (target first, then ancestors when bubbling).
    pub fn dispatch_event(&mut self, target: NodeId, kind: EventKind, bubbles: bool) -> Vec<NodeId> {
        let mut path = vec![target];
        if bubbles {
            path.extend(self.ancestors(target));
        }
        self.events.push(DispatchedEvent {
            target,
            kind,
            bubbles,
            path: path.clone(),
        });
        path
    }

    /// Every event dispatched so far, in dispatch order.
    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    /// Events observed by a listener registered on `node`.
    pub fn events_seen_by(&self, node: NodeId) -> Vec<&DispatchedEvent> {
        self.events.iter().filter(|e| e.path.contains(&node)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse(
            r#"<html><body>
                <form id="f">
                  <div class="row"><label for="n">Name</label><input id="n" name="n"></div>
                  <textarea id="t">preset</textarea>
                  <span id="s">x</span>
                </form>
            </body></html>"#,
        )
    }

    #[test]
    fn navigation_and_queries() {
        let d = doc();
        let input = d.get_element_by_id("n").unwrap();
        assert_eq!(d.tag_name(input), Some("input"));
        assert_eq!(d.tag_name(d.parent(input).unwrap()), Some("div"));

        let form = d.closest(input, &["form"]).unwrap();
        assert_eq!(d.attr(form, "id"), Some("f"));
        // closest is inclusive
        assert_eq!(d.closest(form, &["form"]), Some(form));

        let prev = d.previous_element_siblings(input);
        assert_eq!(prev.len(), 1);
        assert_eq!(d.text_content(prev[0]), "Name");
    }

    #[test]
    fn values_and_textarea_default() {
        let mut d = doc();
        let input = d.get_element_by_id("n").unwrap();
        let textarea = d.get_element_by_id("t").unwrap();
        assert_eq!(d.value(input), "");
        assert_eq!(d.value(textarea), "preset");

        d.set_value(input, "Jane").unwrap();
        assert_eq!(d.value(input), "Jane");

        let span = d.get_element_by_id("s").unwrap();
        assert!(d.set_value(span, "nope").is_err());
    }

    #[test]
    fn detach_breaks_connectivity() {
        let mut d = doc();
        let input = d.get_element_by_id("n").unwrap();
        d.focus(input);
        assert!(d.is_connected(input));
        let row = d.parent(input).unwrap();
        d.detach(row);
        assert!(!d.is_connected(input));
        assert!(d.focused().is_none());
        assert!(d.get_element_by_id("n").is_none());
    }

    #[test]
    fn bubbling_event_reaches_form() {
        let mut d = doc();
        let input = d.get_element_by_id("n").unwrap();
        let form = d.get_element_by_id("f").unwrap();
        d.dispatch_event(input, EventKind::Input, true);
        d.dispatch_event(input, EventKind::Change, false);

        let seen = d.events_seen_by(form);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, EventKind::Input);
        assert_eq!(d.events_seen_by(input).len(), 2);
    }

    #[test]
    fn create_and_append() {
        let mut d = doc();
        let body = d.body().unwrap();
        let div = d.create_element("DIV");
        assert!(!d.is_connected(div));
        d.set_text_content(div, "hello");
        d.append_child(body, div);
        assert!(d.is_connected(div));
        assert_eq!(d.tag_name(div), Some("div"));
        assert_eq!(d.text_content(div), "hello");
    }

    #[test]
    fn foreign_node_ids_are_absent() {
        let big = doc();
        let stranger = big.get_element_by_id("s").unwrap();
        let mut small = Document::parse("<p>x</p>");

        assert!(small.node(stranger).is_none());
        assert_eq!(small.parent(stranger), None);
        assert!(small.children(stranger).is_empty());
        assert_eq!(small.text(stranger), None);

        small.set_text_content(stranger, "ignored");
        small.detach(stranger);
        let root = small.root();
        small.append_child(root, stranger);
        assert_eq!(small.to_html(), Document::parse("<p>x</p>").to_html());
    }
}
