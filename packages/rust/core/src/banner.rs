//! Transient notification banner.
//!
//! At most one banner is attached at a time: showing a new one removes the
//! current one. Each banner dismisses itself after [`DISMISS_AFTER`].

use std::time::Duration;

use tracing::{debug, warn};

use fieldfill_dom::{Document, NodeId};

use crate::SharedDocument;
use crate::timers::TimerSet;

/// Attribute identifying banner nodes.
pub const BANNER_ATTR: &str = "data-ai-fill-banner";

pub const DISMISS_AFTER: Duration = Duration::from_secs(3);

const BANNER_STYLE: &str = "position: fixed; top: 20px; right: 20px; background: #4CAF50; \
     color: white; padding: 12px 20px; border-radius: 4px; \
     box-shadow: 0 2px 10px rgba(0,0,0,0.2); z-index: 10000; \
     font-family: Arial, sans-serif; font-size: 14px; max-width: 300px;";

/// Banner nodes currently attached to the document.
pub fn attached(doc: &Document) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .into_iter()
        .filter(|n| doc.has_attr(*n, BANNER_ATTR))
        .collect()
}

/// Text of the attached banner, if any.
pub fn current_text(doc: &Document) -> Option<String> {
    attached(doc).first().map(|n| doc.text_content(*n))
}

/// Replace any attached banner with a new one carrying `message`.
///
/// Returns `None` when the document has nowhere to attach it.
fn render(doc: &mut Document, message: &str) -> Option<NodeId> {
    let host = doc
        .body()
        .or_else(|| doc.elements_by_tag("html").first().copied())?;

    for old in attached(doc) {
        doc.detach(old);
    }

    let node = doc.create_element("div");
    doc.set_attr(node, BANNER_ATTR, "");
    doc.set_attr(node, "style", BANNER_STYLE);
    doc.set_text_content(node, message);
    doc.append_child(host, node);
    Some(node)
}

/// Shows banners on one page and schedules their dismissal.
#[derive(Debug, Clone)]
pub struct Notifier {
    document: SharedDocument,
    timers: TimerSet,
}

impl Notifier {
    pub fn new(document: SharedDocument, timers: TimerSet) -> Self {
        Self { document, timers }
    }

    pub async fn show(&self, message: &str) -> Option<NodeId> {
        let mut doc = self.document.lock().await;
        self.show_in(&mut doc, message)
    }

    /// Same as [`Notifier::show`] for a caller already holding the document.
    pub(crate) fn show_in(&self, doc: &mut Document, message: &str) -> Option<NodeId> {
        let Some(node) = render(doc, message) else {
            warn!(message, "document has no body, banner not shown");
            return None;
        };
        debug!(message, "banner shown");

        let document = self.document.clone();
        self.timers.schedule(DISMISS_AFTER, async move {
            let mut doc = document.lock().await;
            if doc.is_connected(node) {
                doc.detach(node);
            }
        });
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share;

    fn notifier(html: &str) -> (Notifier, SharedDocument, TimerSet) {
        let document = share(Document::parse(html));
        let timers = TimerSet::new();
        (
            Notifier::new(document.clone(), timers.clone()),
            document,
            timers,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn banner_dismisses_after_three_seconds() {
        let (notifier, document, _timers) = notifier("<body><p>page</p></body>");
        notifier.show("Processing 2 fields...").await.unwrap();

        {
            let doc = document.lock().await;
            assert_eq!(current_text(&doc).as_deref(), Some("Processing 2 fields..."));
            let node = attached(&doc)[0];
            assert!(doc.attr(node, "style").unwrap().contains("position: fixed"));
        }

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(attached(&*document.lock().await).len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(attached(&*document.lock().await).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn new_banner_replaces_current() {
        let (notifier, document, timers) = notifier("<body></body>");
        let first = notifier.show("first").await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        let second = notifier.show("second").await.unwrap();
        {
            let doc = document.lock().await;
            assert!(!doc.is_connected(first));
            assert_eq!(attached(&doc), vec![second]);
        }

        // The first banner's timer fires at 3s and must leave the second alone.
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(
            current_text(&*document.lock().await).as_deref(),
            Some("second")
        );

        timers.settle().await;
        assert!(attached(&*document.lock().await).is_empty());
    }

    #[tokio::test]
    async fn fragment_without_body_still_gets_banner() {
        // The HTML parser always synthesizes html/body.
        let (notifier, document, _timers) = notifier("<input>");
        assert!(notifier.show("hello").await.is_some());
        assert_eq!(current_text(&*document.lock().await).as_deref(), Some("hello"));
    }
}
