//! Applies fill results to the document with timed visual feedback.

use std::time::Duration;

use tracing::{debug, info, instrument, trace, warn};

use fieldfill_dom::{Document, EventKind, NodeId};
use fieldfill_shared::{FIELD_MARKER_ATTR, FieldFillError, FieldId, FillResult, FillSummary, Result};

use crate::SharedDocument;
use crate::banner::Notifier;
use crate::state::{FieldState, FieldTracker};
use crate::timers::TimerSet;

pub const SUCCESS_TINT: &str = "#e8f5e8";
pub const FAILURE_TINT: &str = "#ffebee";
pub const SUCCESS_RESET_AFTER: Duration = Duration::from_secs(1);
pub const FAILURE_RESET_AFTER: Duration = Duration::from_secs(2);

const BACKGROUND: &str = "background-color";

/// Mutates the page for a batch of results and reports the tally.
#[derive(Debug, Clone)]
pub struct FillExecutor {
    document: SharedDocument,
    timers: TimerSet,
    tracker: FieldTracker,
    notifier: Notifier,
}

impl FillExecutor {
    pub fn new(document: SharedDocument, timers: TimerSet, tracker: FieldTracker) -> Self {
        let notifier = Notifier::new(document.clone(), timers.clone());
        Self {
            document,
            timers,
            tracker,
            notifier,
        }
    }

    /// Apply `results` in the order given, then show the summary banner.
    #[instrument(skip_all, fields(results = results.len()))]
    pub async fn apply(&self, results: &[FillResult]) -> FillSummary {
        let mut doc = self.document.lock().await;
        let mut summary = FillSummary::default();

        for result in results {
            match self.apply_one(&mut doc, result) {
                Ok(()) => {
                    debug!(field = %result.field_id, "filled field");
                    summary.success_count += 1;
                }
                Err(e) => {
                    warn!(field = %result.field_id, error = %e, "field not filled");
                    summary.error_count += 1;
                }
            }
        }

        info!(
            filled = summary.success_count,
            errors = summary.error_count,
            "fill results applied"
        );
        self.notifier.show_in(&mut doc, &summary.message());
        summary
    }

    fn apply_one(&self, doc: &mut Document, result: &FillResult) -> Result<()> {
        let id = &result.field_id;
        let node = doc.find_by_attr(FIELD_MARKER_ATTR, id.as_str());

        if !result.success {
            if let Some(node) = node {
                self.tint(doc, node, id, FAILURE_TINT, FAILURE_RESET_AFTER);
            }
            self.record(id, FieldState::Failed);
            let reason = result.error.as_deref().unwrap_or("completion failed");
            return Err(FieldFillError::Provider(reason.to_string()));
        }

        let outcome = Self::write_value(doc, node, id, &result.value);
        match (&outcome, node) {
            (Ok(()), Some(node)) => {
                self.tint(doc, node, id, SUCCESS_TINT, SUCCESS_RESET_AFTER);
                self.record(id, FieldState::Filled);
            }
            _ => self.record(id, FieldState::Failed),
        }
        outcome
    }

    /// Clear, focus, assign, then notify listeners as if the user typed.
    fn write_value(doc: &mut Document, node: Option<NodeId>, id: &FieldId, value: &str) -> Result<()> {
        let node = node.ok_or_else(|| {
            FieldFillError::Apply(format!("no element carries marker {id}"))
        })?;
        if value.is_empty() {
            return Err(FieldFillError::Apply(format!("empty completion for {id}")));
        }

        doc.set_value(node, "")?;
        doc.focus(node);
        doc.set_value(node, value)?;
        for kind in [EventKind::Input, EventKind::Change] {
            let path = doc.dispatch_event(node, kind, true);
            trace!(field = %id, event = kind.as_str(), reached = path.len(), "dispatched event");
        }
        Ok(())
    }

    fn record(&self, id: &FieldId, state: FieldState) {
        if let Err(e) = self.tracker.advance(id, state) {
            debug!(field = %id, error = %e, "untracked transition");
        }
    }

    /// Tint the background now and restore the prior inline value later.
    fn tint(&self, doc: &mut Document, node: NodeId, id: &FieldId, color: &'static str, after: Duration) {
        let prior = doc
            .style_property(node, BACKGROUND)
            .filter(|bg| bg != SUCCESS_TINT && bg != FAILURE_TINT);
        doc.set_style_property(node, BACKGROUND, Some(color));

        let document = self.document.clone();
        let tracker = self.tracker.clone();
        let id = id.clone();
        self.timers.schedule(after, async move {
            let mut doc = document.lock().await;
            if !doc.is_connected(node) {
                debug!(field = %id, "node detached before reset");
                return;
            }
            if doc.style_property(node, BACKGROUND).as_deref() == Some(color) {
                doc.set_style_property(node, BACKGROUND, prior.as_deref());
            }
            if let Err(e) = tracker.advance(&id, FieldState::Cleared) {
                debug!(field = %id, error = %e, "untracked transition");
            }
        });
    }
}
