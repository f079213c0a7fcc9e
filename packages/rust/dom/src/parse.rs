//! Copy a `scraper` parse tree into the owned arena.

use scraper::{Html, Node as ScraperNode};
use tracing::debug;

use crate::document::{Document, Element, NodeData, NodeId};

pub(crate) fn parse_document(html: &str) -> Document {
    let parsed = Html::parse_document(html);
    let mut doc = Document::default();

    // Explicit stack keeps deep documents off the call stack.
    let mut stack = vec![(parsed.tree.root(), None::<NodeId>)];
    while let Some((node_ref, parent)) = stack.pop() {
        let id = match node_ref.value() {
            ScraperNode::Document | ScraperNode::Fragment => Some(doc.root()),
            ScraperNode::Doctype(doctype) => {
                let name = doctype.name().to_string();
                Some(doc.push_node(parent, NodeData::Doctype(name)))
            }
            ScraperNode::Element(el) => {
                let attrs = el
                    .attrs
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_string()))
                    .collect();
                let element = Element::from_parts(el.name.clone(), attrs);
                Some(doc.push_node(parent, NodeData::Element(element)))
            }
            ScraperNode::Text(text) => {
                Some(doc.push_node(parent, NodeData::Text(text.to_string())))
            }
            ScraperNode::Comment(comment) => {
                Some(doc.push_node(parent, NodeData::Comment(comment.to_string())))
            }
            _ => None,
        };

        if let Some(id) = id {
            let children: Vec<_> = node_ref.children().collect();
            for child in children.into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }
    }

    debug!(nodes = doc.nodes.len(), "parsed document");
    doc
}
