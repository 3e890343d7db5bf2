use scraper::{ElementRef, Html, Node, Selector};

use crate::dom::document::DocumentTree;
use crate::error::FormError;

/// Elements whose text never contributes to a label.
const SKIP_TEXT_TAGS: &[&str] = &["select", "option", "textarea", "script", "style"];

/// A parsed HTML page.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    pub fn parse_fragment(source: &str) -> Self {
        Self {
            html: Html::parse_fragment(source),
        }
    }

    /// Borrowed view used for querying.
    pub fn tree(&self) -> HtmlTree<'_> {
        HtmlTree { html: &self.html }
    }

    /// Whether any element carries `identifier` as its `id` or `name`.
    pub fn contains_identifier(&self, identifier: &str) -> bool {
        let Ok(selector) = Selector::parse("[id], [name]") else {
            return false;
        };
        self.html.select(&selector).any(|el| {
            el.value().attr("id") == Some(identifier) || el.value().attr("name") == Some(identifier)
        })
    }
}

/// `DocumentTree` over a scraper `Html`.
#[derive(Clone, Copy)]
pub struct HtmlTree<'a> {
    html: &'a Html,
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, FormError> {
    Selector::parse(selector).map_err(|e| FormError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

impl<'a> DocumentTree for HtmlTree<'a> {
    type Node = ElementRef<'a>;

    fn select(&self, scope: Option<&Self::Node>, selector: &str) -> Result<Vec<Self::Node>, FormError> {
        let selector = parse_selector(selector)?;
        let found = match scope {
            Some(root) => root.select(&selector).filter(|el| el != root).collect(),
            None => self.html.select(&selector).collect(),
        };
        Ok(found)
    }

    fn closest(&self, node: &Self::Node, selector: &str) -> Result<Option<Self::Node>, FormError> {
        let selector = parse_selector(selector)?;
        Ok(node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| selector.matches(el)))
    }

    fn tag(&self, node: &Self::Node) -> String {
        node.value().name().to_ascii_lowercase()
    }

    fn attr(&self, node: &Self::Node, name: &str) -> Option<String> {
        node.value().attr(name).map(str::to_string)
    }

    fn text(&self, node: &Self::Node) -> String {
        let mut out = String::new();
        collect_text(*node, &mut out);
        out
    }

    fn is_visible(&self, node: &Self::Node) -> bool {
        if node.value().name().eq_ignore_ascii_case("input")
            && node
                .value()
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"))
        {
            return false;
        }

        std::iter::once(*node)
            .chain(node.ancestors().filter_map(ElementRef::wrap))
            .all(|el| !hides_itself(el))
    }
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    let name = child_el.value().name();
                    if !SKIP_TEXT_TAGS.iter().any(|t| name.eq_ignore_ascii_case(t)) {
                        collect_text(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Element-local hiding: the `hidden` attribute or an inline style that
/// removes it from rendering.
fn hides_itself(el: ElementRef<'_>) -> bool {
    if el.value().attr("hidden").is_some() {
        return true;
    }

    let Some(style) = el.value().attr("style") else {
        return false;
    };

    style_hides(style)
}

pub(crate) fn style_hides(style: &str) -> bool {
    style.split(';').any(|decl| {
        let Some((prop, value)) = decl.split_once(':') else {
            return false;
        };
        let prop = prop.trim().to_ascii_lowercase();
        let value = value
            .trim()
            .trim_end_matches("!important")
            .trim()
            .to_ascii_lowercase();

        match prop.as_str() {
            "display" => value == "none",
            "visibility" => value == "hidden" || value == "collapse",
            "opacity" => value.parse::<f32>().is_ok_and(|o| o <= 0.0),
            _ => false,
        }
    })
}
