//! Serialize the live document back to HTML through html5ever.
//!
//! Form controls are written with their current value, so a filled document
//! round-trips through any HTML consumer.

use std::io;

use html5ever::serialize::{Serialize, SerializeOpts, Serializer, TraversalScope, serialize};
use html5ever::{LocalName, QualName, namespace_url, ns};
use tracing::warn;

use crate::document::{Document, NodeData, NodeId};

enum Edge {
    Open(NodeId),
    Close(NodeId),
}

/// A node and everything below it, as html5ever sees it.
struct Subtree<'a> {
    doc: &'a Document,
    root: NodeId,
}

impl Serialize for Subtree<'_> {
    fn serialize<S: Serializer>(
        &self,
        serializer: &mut S,
        traversal_scope: TraversalScope,
    ) -> io::Result<()> {
        let skip_root = traversal_scope != TraversalScope::IncludeNode;
        let value_name = QualName::new(None, ns!(), LocalName::from("value"));

        let mut stack = vec![Edge::Open(self.root)];
        while let Some(edge) = stack.pop() {
            match edge {
                Edge::Open(id) => {
                    let Some(node) = self.doc.node(id) else {
                        continue;
                    };
                    stack.push(Edge::Close(id));
                    let emit = !(skip_root && id == self.root);

                    if let NodeData::Element(el) = &node.data {
                        let live = el.value.as_deref().filter(|_| el.is_form_control());
                        if emit {
                            let live_attr = live
                                .filter(|_| el.tag == "input")
                                .map(|v| (&value_name, v));
                            let replaced = live_attr.is_some();
                            let attrs = el
                                .attrs
                                .iter()
                                .filter(|(k, _)| !replaced || *k != value_name)
                                .map(|(k, v)| (k, v.as_str()))
                                .chain(live_attr);
                            serializer.start_elem(el.name.clone(), attrs)?;
                        }
                        if let (Some(v), "textarea") = (live, el.tag.as_str()) {
                            serializer.write_text(v)?;
                            continue;
                        }
                    } else if emit {
                        match &node.data {
                            NodeData::Doctype(name) => serializer.write_doctype(name)?,
                            NodeData::Comment(c) => serializer.write_comment(c)?,
                            NodeData::Text(t) => serializer.write_text(t)?,
                            NodeData::Document | NodeData::Element(_) => {}
                        }
                    }

                    for child in self.doc.children(id).iter().rev() {
                        stack.push(Edge::Open(*child));
                    }
                }
                Edge::Close(id) => {
                    if skip_root && id == self.root {
                        continue;
                    }
                    if let Some(el) = self.doc.element(id) {
                        serializer.end_elem(el.name.clone())?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Document {
    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        let subtree = Subtree {
            doc: self,
            root: self.root(),
        };
        let mut buf = Vec::new();
        if let Err(e) = serialize(&mut buf, &subtree, SerializeOpts::default()) {
            warn!(error = %e, "html serialization stopped early");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
