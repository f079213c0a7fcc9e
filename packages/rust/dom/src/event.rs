//! Synthetic DOM events.

use crate::document::NodeId;

/// Event types the fill executor dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Input,
    Change,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Change => "change",
        }
    }
}

/// Record of one dispatched event, kept on the document so host-page
/// listeners (and tests) can observe it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub target: NodeId,
    pub kind: EventKind,
    pub bubbles: bool,
    /// Nodes the event visited, target first.
    pub path: Vec<NodeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_use_dom_event_names() {
        assert_eq!(EventKind::Input.as_str(), "input");
        assert_eq!(EventKind::Change.as_str(), "change");
    }
}
