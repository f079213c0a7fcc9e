//! Which candidate elements may be filled.

use fieldfill_dom::{Display, Document, NodeId, Visibility};

/// Longest pre-filled value still treated as empty.
pub const MAX_PREFILLED_CHARS: usize = 3;

/// Why a candidate was skipped. Logged, never surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    Disabled,
    ReadOnly,
    HiddenAttribute,
    DisplayNone,
    VisibilityHidden,
    ZeroSize,
    AlreadyFilled,
}

impl std::fmt::Display for Ineligible {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::Disabled => "disabled",
            Self::ReadOnly => "read-only",
            Self::HiddenAttribute => "hidden attribute",
            Self::DisplayNone => "display: none",
            Self::VisibilityHidden => "visibility: hidden",
            Self::ZeroSize => "zero-size bounding box",
            Self::AlreadyFilled => "already has content",
        };
        f.write_str(reason)
    }
}

/// Check every eligibility rule, returning the first one that fails.
pub fn check(doc: &Document, id: NodeId) -> Result<(), Ineligible> {
    if doc.has_attr(id, "disabled") {
        return Err(Ineligible::Disabled);
    }
    if doc.has_attr(id, "readonly") {
        return Err(Ineligible::ReadOnly);
    }
    if doc.has_attr(id, "hidden") {
        return Err(Ineligible::HiddenAttribute);
    }

    let style = doc.computed_style(id);
    if style.display == Display::None {
        return Err(Ineligible::DisplayNone);
    }
    if style.visibility == Visibility::Hidden {
        return Err(Ineligible::VisibilityHidden);
    }

    if doc.bounding_box(id).is_empty() {
        return Err(Ineligible::ZeroSize);
    }

    if doc.value(id).chars().count() > MAX_PREFILLED_CHARS {
        return Err(Ineligible::AlreadyFilled);
    }

    Ok(())
}
