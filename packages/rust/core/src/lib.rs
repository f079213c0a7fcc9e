//! Fill pipeline for fieldfill.
//!
//! This crate ties the scanner, the completion provider and the DOM together
//! into the two cooperating contexts of a fill session:
//! - the page side ([`page::PageSession`]): scan, dispatch, apply, banner
//! - the background side ([`coordinator::Coordinator`]): fan-out to the provider
//!
//! The two sides talk over a typed request/response [`bus`].

pub mod banner;
pub mod bus;
pub mod coordinator;
pub mod executor;
pub mod orchestrator;
pub mod page;
pub mod protocol;
pub mod state;
pub mod timers;

use std::sync::Arc;

use fieldfill_dom::Document;

/// The page DOM, shared between the session and its deferred visual resets.
pub type SharedDocument = Arc<tokio::sync::Mutex<Document>>;

/// Wrap a parsed document for use by a [`page::PageSession`].
pub fn share(doc: Document) -> SharedDocument {
    Arc::new(tokio::sync::Mutex::new(doc))
}
