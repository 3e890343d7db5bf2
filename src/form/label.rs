use crate::dom::document::DocumentTree;
use crate::error::FormError;
use crate::form::config::ExtractConfig;

/// Where a control's label text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    /// `label[for=<id>]`
    ForAttribute,
    /// A label inside the nearest field wrapper
    Wrapper,
    /// An enclosing `<label>`
    Enclosing,
    AriaLabel,
    None,
}

/// Raw label text plus its origin. The text is untouched so the required
/// marker scan sees what the page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLabel {
    pub text: String,
    pub source: LabelSource,
}

impl RawLabel {
    fn none() -> Self {
        Self {
            text: String::new(),
            source: LabelSource::None,
        }
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        !marker.is_empty() && self.text.contains(marker)
    }

    pub fn normalized(&self, marker: &str) -> String {
        normalize_label(&self.text, marker)
    }
}

/// Strip the marker glyph, trim, and collapse whitespace runs.
pub fn normalize_label(raw: &str, marker: &str) -> String {
    let stripped = if marker.is_empty() {
        raw.to_string()
    } else {
        raw.replace(marker, " ")
    };
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace without touching any glyphs. Used for option text.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `label[for]` texts keyed by their target id, collected once per pass.
pub struct LabelIndex {
    by_target: Vec<(String, String)>,
}

impl LabelIndex {
    pub fn build<D: DocumentTree>(doc: &D) -> Result<Self, FormError> {
        let by_target = doc
            .select(None, "label[for]")?
            .iter()
            .filter_map(|label| {
                let target = doc.attr(label, "for")?;
                let target = target.trim();
                if target.is_empty() {
                    None
                } else {
                    Some((target.to_string(), doc.text(label)))
                }
            })
            .collect();
        Ok(Self { by_target })
    }

    /// First label pointing at `id`, in document order.
    pub fn for_id(&self, id: &str) -> Option<&str> {
        self.by_target
            .iter()
            .find(|(target, _)| target == id)
            .map(|(_, text)| text.as_str())
    }
}

/// Run the label association chain for one control; first hit wins.
pub fn associate_label<D: DocumentTree>(
    doc: &D,
    control: &D::Node,
    index: &LabelIndex,
    config: &ExtractConfig,
) -> Result<RawLabel, FormError> {
    if let Some(text) = doc
        .attr(control, "id")
        .and_then(|id| index.for_id(id.trim()).map(str::to_string))
        .filter(|t| !t.trim().is_empty())
    {
        return Ok(RawLabel {
            text,
            source: LabelSource::ForAttribute,
        });
    }

    if let Some(text) = wrapper_label(doc, control, config)? {
        return Ok(RawLabel {
            text,
            source: LabelSource::Wrapper,
        });
    }

    if let Some(label) = doc.closest(control, "label")? {
        let text = doc.text(&label);
        if !text.trim().is_empty() {
            return Ok(RawLabel {
                text,
                source: LabelSource::Enclosing,
            });
        }
    }

    if let Some(text) = doc.attr(control, "aria-label").filter(|t| !t.trim().is_empty()) {
        return Ok(RawLabel {
            text,
            source: LabelSource::AriaLabel,
        });
    }

    Ok(RawLabel::none())
}

/// First non-empty label inside the nearest field wrapper of `control`.
pub fn wrapper_label<D: DocumentTree>(
    doc: &D,
    control: &D::Node,
    config: &ExtractConfig,
) -> Result<Option<String>, FormError> {
    if config.field_wrapper_selectors.is_empty() {
        return Ok(None);
    }

    let Some(wrapper) = doc.closest(control, &config.wrapper_selector_group())? else {
        return Ok(None);
    };

    Ok(doc
        .select(Some(&wrapper), &config.label_selector)?
        .iter()
        .map(|label| doc.text(label))
        .find(|text| !text.trim().is_empty()))
}

/// Native `required` or `aria-required="true"` on the control.
pub fn has_required_attr<D: DocumentTree>(doc: &D, control: &D::Node) -> bool {
    doc.has_attr(control, "required")
        || doc
            .attr(control, "aria-required")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}
