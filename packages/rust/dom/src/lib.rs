//! In-memory host document for the fill pipeline.
//!
//! HTML is parsed with `scraper` and copied into an owned, mutable node arena.
//! The [`Document`] exposes the slice of browser behaviour the scanner and the
//! fill executor rely on:
//! - tree navigation, attributes and `textContent`
//! - inline-style driven computed style and a nominal bounding box ([`style`])
//! - live form-control values and focus
//! - synthetic event dispatch with bubbling ([`DispatchedEvent`])
//! - node removal, liveness checks and serialization back to HTML

mod document;
mod event;
mod parse;
mod serialize;
pub mod style;

pub use document::{Document, Element, Node, NodeData, NodeId};
pub use event::{DispatchedEvent, EventKind};
pub use style::{ComputedStyle, Display, Rect, Visibility};
