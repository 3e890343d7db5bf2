use crate::error::FormError;

/// Read-only view of a parsed document, as much as field extraction needs.
///
/// Extraction is written against this trait so it can run over any tree that
/// can answer selector queries: a parsed HTML string, a snapshot of a live
/// page, or a synthetic tree built in a test.
pub trait DocumentTree {
    type Node: Clone + PartialEq;

    /// All elements matching `selector`, in document order. With a scope,
    /// only descendants of that node are considered.
    fn select(&self, scope: Option<&Self::Node>, selector: &str) -> Result<Vec<Self::Node>, FormError>;

    /// Nearest ancestor of `node` (excluding `node` itself) matching `selector`.
    fn closest(&self, node: &Self::Node, selector: &str) -> Result<Option<Self::Node>, FormError>;

    /// Lowercase tag name.
    fn tag(&self, node: &Self::Node) -> String;

    fn attr(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Visible text of the node, skipping nested form controls and scripts.
    fn text(&self, node: &Self::Node) -> String;

    /// Whether the node renders, judged from it and its ancestors.
    fn is_visible(&self, node: &Self::Node) -> bool;

    fn has_attr(&self, node: &Self::Node, name: &str) -> bool {
        self.attr(node, name).is_some()
    }
}
