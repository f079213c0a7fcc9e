//! Core domain types carried between the scanner, the background
//! orchestrator and the fill executor.

use serde::{Deserialize, Serialize};

/// Attribute used to re-locate a scanned element across the async boundary.
pub const FIELD_MARKER_ATTR: &str = "data-ai-field-id";

// ---------------------------------------------------------------------------
// FieldId
// ---------------------------------------------------------------------------

/// Opaque field identifier (`field_<n>`), unique within one scan session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub String);

impl FieldId {
    /// Build the identifier for the `n`-th field of a session.
    pub fn from_index(n: u64) -> Self {
        Self(format!("field_{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// FieldKind
// ---------------------------------------------------------------------------

/// Semantic field type, resolved once at detection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Email,
    Tel,
    Url,
    Search,
    Password,
    Textarea,
}

impl FieldKind {
    /// Map an `<input type=...>` attribute to a kind.
    ///
    /// An absent type is a plain text input; any type outside the
    /// text-like set is not a fill candidate and yields `None`.
    pub fn from_input_type(ty: Option<&str>) -> Option<Self> {
        let Some(ty) = ty else {
            return Some(Self::Text);
        };
        match ty.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "email" => Some(Self::Email),
            "tel" => Some(Self::Tel),
            "url" => Some(Self::Url),
            "search" => Some(Self::Search),
            "password" => Some(Self::Password),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Tel => "tel",
            Self::Url => "url",
            Self::Search => "search",
            Self::Password => "password",
            Self::Textarea => "textarea",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FieldDescriptor
// ---------------------------------------------------------------------------

/// One candidate form field as seen at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: FieldId,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Lowercase element name (`input` or `textarea`).
    pub tag_name: String,
    pub name: String,
    pub placeholder: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Human-readable label, possibly empty.
    pub label: String,
    /// Surrounding text, at most [`FieldDescriptor::MAX_CONTEXT_CHARS`] characters.
    pub context: String,
}

impl FieldDescriptor {
    /// Upper bound on `context` length, in characters.
    pub const MAX_CONTEXT_CHARS: usize = 300;
}

// ---------------------------------------------------------------------------
// FillResult
// ---------------------------------------------------------------------------

/// Outcome of one field's completion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillResult {
    pub field_id: FieldId,
    pub success: bool,
    pub value: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl FillResult {
    pub fn filled(field_id: FieldId, value: impl Into<String>) -> Self {
        Self {
            field_id,
            success: true,
            value: value.into(),
            error: None,
        }
    }

    pub fn failed(field_id: FieldId, error: impl Into<String>) -> Self {
        Self {
            field_id,
            success: false,
            value: String::new(),
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// FillSummary
// ---------------------------------------------------------------------------

/// Tally produced by the fill executor after applying a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillSummary {
    pub success_count: usize,
    pub error_count: usize,
}

impl FillSummary {
    /// User-facing summary line, e.g. `"2 fields filled successfully, 1 errors."`.
    pub fn message(&self) -> String {
        if self.error_count > 0 {
            format!(
                "{} fields filled successfully, {} errors.",
                self.success_count, self.error_count
            )
        } else {
            format!("{} fields filled successfully.", self.success_count)
        }
    }
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
