//! Inline-style handling, computed style and nominal geometry.
//!
//! Only inline `style` attributes, the `hidden` attribute and the UA defaults
//! for non-rendered elements are taken into account. There is no cascade from
//! stylesheets and no layout; sizes come from inline `width`/`height` or a
//! per-tag default.

use crate::document::{Document, NodeId};

/// Tags the UA stylesheet never renders.
const NON_RENDERED_TAGS: &[&str] = &["head", "script", "style", "template", "title", "meta", "link"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    None,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// The two computed properties the scanner looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputedStyle {
    pub display: Display,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn is_empty(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// Split a `style` attribute into lowercase property names and trimmed values.
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim();
            (!name.is_empty()).then(|| (name, value.to_string()))
        })
        .collect()
}

fn serialize_declarations(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(k, v)| format!("{k}: {v};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a CSS length to pixels. `None` for `auto`, percentages of unknown
/// containers and anything else we can't resolve, except that any zero is 0.
fn parse_length(value: &str) -> Option<f64> {
    let v = value.trim().to_ascii_lowercase();
    let numeric = v.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
    let n: f64 = numeric.trim().parse().ok()?;
    if n == 0.0 {
        return Some(0.0);
    }
    if v.ends_with("px") || numeric.len() == v.len() {
        return Some(n);
    }
    None
}

fn default_size(tag: &str) -> Rect {
    match tag {
        "input" => Rect {
            width: 150.0,
            height: 21.0,
        },
        "textarea" => Rect {
            width: 180.0,
            height: 36.0,
        },
        _ => Rect {
            width: 100.0,
            height: 18.0,
        },
    }
}

impl Document {
    /// Inline style value for `property`, if declared.
    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attr(id, "style")?;
        parse_declarations(style)
            .into_iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(property))
            .map(|(_, v)| v)
    }

    /// Set (or with `None`, remove) one inline style property.
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: Option<&str>) {
        let property = property.to_ascii_lowercase();
        let mut decls = self
            .attr(id, "style")
            .map(parse_declarations)
            .unwrap_or_default();
        decls.retain(|(k, _)| *k != property);
        if let Some(v) = value {
            decls.push((property, v.to_string()));
        }

        if decls.is_empty() {
            self.remove_attr(id, "style");
        } else {
            let style = serialize_declarations(&decls);
            self.set_attr(id, "style", &style);
        }
    }

    fn own_display(&self, id: NodeId) -> Display {
        let Some(el) = self.element(id) else {
            return Display::Other;
        };
        if let Some(d) = self.style_property(id, "display") {
            return if d.eq_ignore_ascii_case("none") {
                Display::None
            } else {
                Display::Other
            };
        }
        let hidden_input = el.tag == "input"
            && el.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden"));
        if el.attr("hidden").is_some() || hidden_input || NON_RENDERED_TAGS.contains(&el.tag.as_str())
        {
            Display::None
        } else {
            Display::Other
        }
    }

    /// Computed `display` is the element's own; `visibility` inherits.
    pub fn computed_style(&self, id: NodeId) -> ComputedStyle {
        let visibility = std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| self.style_property(n, "visibility"))
            .map(|v| match v.to_ascii_lowercase().as_str() {
                "hidden" | "collapse" => Visibility::Hidden,
                _ => Visibility::Visible,
            })
            .unwrap_or(Visibility::Visible);

        ComputedStyle {
            display: self.own_display(id),
            visibility,
        }
    }

    /// Nominal border box. Empty when detached or when the element or any
    /// ancestor is not rendered.
    pub fn bounding_box(&self, id: NodeId) -> Rect {
        let Some(el) = self.element(id) else {
            return Rect::default();
        };
        if !self.is_connected(id) {
            return Rect::default();
        }
        let not_rendered = std::iter::once(id)
            .chain(self.ancestors(id))
            .any(|n| self.own_display(n) == Display::None);
        if not_rendered {
            return Rect::default();
        }

        let mut rect = default_size(&el.tag);
        if let Some(w) = self.style_property(id, "width").and_then(|v| parse_length(&v)) {
            rect.width = w;
        }
        if let Some(h) = self.style_property(id, "height").and_then(|v| parse_length(&v)) {
            rect.height = h;
        }
        rect
    }
}
