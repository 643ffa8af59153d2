#![forbid(unsafe_code)]

//! The bounded DOM surface the engine is allowed to touch.
//!
//! Every effect the engine produces and every query it makes flows through
//! [`DomSurface`]. The trait *is* the spec's "declared, bounded set of DOM
//! selectors and class names": class toggles on root/body/targets, inline
//! style properties with important precedence, one managed stylesheet slot,
//! autoplay neutralization, pointer probing for the magnifier, and the two
//! floating aids (magnifier box, reading mask).
//!
//! Implementations absorb host failures: a stale node (removed between
//! query and mutation) makes the operation a no-op, never an error. Nothing
//! here returns `Result` by design — the engine must be safely callable at
//! arbitrary frequency against a document that changes under it.
//!
//! [`FakeDom`] is the always-available in-memory implementation used by the
//! test suites and headless hosts, in the same spirit as an in-memory
//! storage backend: full structural introspection, no platform.

use std::collections::{BTreeMap, BTreeSet};

/// Axis-aligned box in viewport coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// The configurable list of CSS selectors identifying content containers.
///
/// External configuration, swappable per host: `generic` covers ordinary
/// text-bearing tags, `host` carries host-specific class selectors (for a
/// forum, things like `.Post-body`). Used for apply targeting, mutation
/// filtering, and the dynamic stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSelectors {
    pub generic: Vec<String>,
    pub host: Vec<String>,
}

impl Default for ContentSelectors {
    fn default() -> Self {
        Self {
            generic: [
                "p",
                // Exclude this widget's own chrome from content treatment.
                "div:not([class*=\"visor\"])",
                "li",
                "td",
                "th",
                "article",
                "section",
                "span",
                "a",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            host: Vec::new(),
        }
    }
}

impl ContentSelectors {
    /// Selectors with host-specific extensions appended.
    #[must_use]
    pub fn with_host(host: impl IntoIterator<Item = String>) -> Self {
        let mut selectors = Self::default();
        selectors.host.extend(host);
        selectors
    }

    /// Iterate over every selector, generic first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.generic
            .iter()
            .map(String::as_str)
            .chain(self.host.iter().map(String::as_str))
    }

    /// Comma-joined selector list, as consumed by `querySelectorAll`.
    #[must_use]
    pub fn css_list(&self) -> String {
        self.iter().collect::<Vec<_>>().join(", ")
    }

    /// Comma-joined descendant list (`sel *`), used by the dynamic
    /// stylesheet so late-inserted children inherit numeric effects.
    #[must_use]
    pub fn descendant_css_list(&self) -> String {
        self.iter()
            .map(|s| format!("{s} *"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The bounded set of DOM effects and queries the engine owns.
///
/// All operations are infallible at this boundary; implementations skip
/// stale nodes and swallow host errors (logging them if they care).
pub trait DomSurface {
    /// Handle to a live element. Cheap to clone; may go stale.
    type Node: Clone;

    /// The root element (`<html>`).
    fn root(&self) -> Self::Node;

    /// The page body.
    fn body(&self) -> Self::Node;

    fn add_class(&mut self, node: &Self::Node, class: &str);

    fn remove_class(&mut self, node: &Self::Node, class: &str);

    /// Set an inline style property with important precedence.
    fn set_style_important(&mut self, node: &Self::Node, property: &str, value: &str);

    /// Remove an inline style property.
    fn clear_style(&mut self, node: &Self::Node, property: &str);

    /// Recompute the current content-element set. The result changes call
    /// to call as the host mutates its document.
    fn query_content(&mut self, selectors: &ContentSelectors) -> Vec<Self::Node>;

    /// Whether `node` matches, or contains a descendant matching, the
    /// content selectors. Used to filter structural mutations.
    fn matches_or_contains(&self, node: &Self::Node, selectors: &ContentSelectors) -> bool;

    /// Create or replace the managed stylesheet with the given id.
    fn put_stylesheet(&mut self, id: &str, css: &str);

    /// Remove the managed stylesheet with the given id, if present.
    fn remove_stylesheet(&mut self, id: &str);

    /// Pause and strip the autoplay attribute from every currently-present
    /// autoplay media element. Returns how many were neutralized.
    fn neutralize_autoplay_media(&mut self) -> usize;

    /// Topmost element under the pointer, with the engine's own floating
    /// aids excluded from the probe.
    fn element_at(&mut self, x: f64, y: f64) -> Option<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Lowercase tag name.
    fn tag_name(&self, node: &Self::Node) -> String;

    /// Subtree text content (untrimmed, as the host reports it).
    fn text_content(&self, node: &Self::Node) -> String;

    /// Whether `node` is the document root or body.
    fn is_document_root(&self, node: &Self::Node) -> bool;

    /// Whether `node` belongs to this widget's own UI.
    fn is_widget_ui(&self, node: &Self::Node) -> bool;

    fn bounding_rect(&self, node: &Self::Node) -> Rect;

    fn viewport(&self) -> Viewport;

    fn set_magnifier_text(&mut self, text: &str);

    /// Rendered size of the magnifier box after the last
    /// [`set_magnifier_text`](Self::set_magnifier_text).
    fn magnifier_size(&self) -> (f64, f64);

    fn place_magnifier(&mut self, x: f64, y: f64);

    fn hide_magnifier(&mut self);

    /// Position the reading-mask band (top edge, viewport coordinates).
    fn place_reading_mask(&mut self, top: f64);
}

// ---------------------------------------------------------------------------
// FakeDom
// ---------------------------------------------------------------------------

/// Handle into a [`FakeDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default)]
struct FakeNode {
    tag: String,
    text: String,
    classes: BTreeSet<String>,
    styles: BTreeMap<String, String>,
    parent: Option<usize>,
    rect: Rect,
    /// Marked as matching the content selectors. FakeDom matches by
    /// explicit marks; a CSS selector engine is out of scope here.
    content: bool,
    widget_ui: bool,
    autoplay: bool,
    removed: bool,
}

/// Structural snapshot of every effect the engine owns, for idempotence
/// comparisons: run a pass, snapshot, run it again, snapshot, assert equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectSnapshot {
    pub classes: BTreeMap<usize, BTreeSet<String>>,
    pub styles: BTreeMap<usize, BTreeMap<String, String>>,
    pub stylesheets: BTreeMap<String, String>,
}

/// In-memory [`DomSurface`] with full introspection.
///
/// Node 0 is the root (`html`), node 1 the body. Tests build a document
/// with [`element`](Self::element) and friends, drive the engine, then
/// inspect classes/styles/stylesheets directly.
#[derive(Debug)]
pub struct FakeDom {
    nodes: Vec<FakeNode>,
    stylesheets: BTreeMap<String, String>,
    viewport: Viewport,
    hit: Option<usize>,
    magnifier_text: String,
    magnifier_pos: Option<(f64, f64)>,
    magnifier_visible: bool,
    magnifier_size: (f64, f64),
    mask_top: Option<f64>,
}

impl Default for FakeDom {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDom {
    /// An empty document: root + body, nothing else.
    #[must_use]
    pub fn new() -> Self {
        let root = FakeNode {
            tag: "html".to_string(),
            ..FakeNode::default()
        };
        let body = FakeNode {
            tag: "body".to_string(),
            parent: Some(0),
            ..FakeNode::default()
        };
        Self {
            nodes: vec![root, body],
            stylesheets: BTreeMap::new(),
            viewport: Viewport::default(),
            hit: None,
            magnifier_text: String::new(),
            magnifier_pos: None,
            magnifier_visible: false,
            magnifier_size: (400.0, 120.0),
            mask_top: None,
        }
    }

    // -- document construction -------------------------------------------

    /// Add an element under `parent`.
    pub fn element(&mut self, tag: &str, parent: NodeId) -> NodeId {
        self.nodes.push(FakeNode {
            tag: tag.to_ascii_lowercase(),
            parent: Some(parent.0),
            ..FakeNode::default()
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Add an element marked as matching the content selectors.
    pub fn content_element(&mut self, tag: &str, parent: NodeId) -> NodeId {
        let id = self.element(tag, parent);
        self.nodes[id.0].content = true;
        id
    }

    /// Set the subtree text content reported for a node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.nodes[node.0].text = text.to_string();
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.nodes[node.0].rect = rect;
    }

    /// Mark a node as part of the widget's own UI.
    pub fn mark_widget_ui(&mut self, node: NodeId) {
        self.nodes[node.0].widget_ui = true;
    }

    /// Add an autoplay media element under `parent`.
    pub fn autoplay_media(&mut self, tag: &str, parent: NodeId) -> NodeId {
        let id = self.element(tag, parent);
        self.nodes[id.0].autoplay = true;
        id
    }

    /// Simulate the host removing a node: every later engine operation on
    /// it becomes a no-op.
    pub fn remove_node(&mut self, node: NodeId) {
        self.nodes[node.0].removed = true;
    }

    /// Choose what [`DomSurface::element_at`] returns.
    pub fn set_hit(&mut self, node: Option<NodeId>) {
        self.hit = node.map(|n| n.0);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Fix the size the magnifier box reports after text is set.
    pub fn set_magnifier_box_size(&mut self, width: f64, height: f64) {
        self.magnifier_size = (width, height);
    }

    // -- introspection ----------------------------------------------------

    #[must_use]
    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn body_id(&self) -> NodeId {
        NodeId(1)
    }

    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes[node.0].classes.contains(class)
    }

    /// Classes on the body, sorted.
    #[must_use]
    pub fn body_classes(&self) -> Vec<String> {
        self.nodes[1].classes.iter().cloned().collect()
    }

    #[must_use]
    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.nodes[node.0].styles.get(property).map(String::as_str)
    }

    #[must_use]
    pub fn stylesheet(&self, id: &str) -> Option<&str> {
        self.stylesheets.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn magnifier_visible(&self) -> bool {
        self.magnifier_visible
    }

    #[must_use]
    pub fn magnifier_text(&self) -> &str {
        &self.magnifier_text
    }

    #[must_use]
    pub fn magnifier_pos(&self) -> Option<(f64, f64)> {
        self.magnifier_pos
    }

    #[must_use]
    pub fn mask_top(&self) -> Option<f64> {
        self.mask_top
    }

    #[must_use]
    pub fn is_autoplay(&self, node: NodeId) -> bool {
        self.nodes[node.0].autoplay
    }

    /// Snapshot every owned effect for idempotence comparison. Nodes with
    /// no classes and no styles are omitted so snapshots compare equal
    /// across cosmetically different histories.
    #[must_use]
    pub fn effect_snapshot(&self) -> EffectSnapshot {
        let mut classes = BTreeMap::new();
        let mut styles = BTreeMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if node.removed {
                continue;
            }
            if !node.classes.is_empty() {
                classes.insert(i, node.classes.clone());
            }
            if !node.styles.is_empty() {
                styles.insert(i, node.styles.clone());
            }
        }
        EffectSnapshot {
            classes,
            styles,
            stylesheets: self.stylesheets.clone(),
        }
    }

    fn live(&self, node: &NodeId) -> Option<&FakeNode> {
        self.nodes.get(node.0).filter(|n| !n.removed)
    }

    fn is_descendant_of(&self, node: usize, ancestor: usize) -> bool {
        let mut cursor = self.nodes[node].parent;
        while let Some(i) = cursor {
            if i == ancestor {
                return true;
            }
            cursor = self.nodes[i].parent;
        }
        false
    }
}

impl DomSurface for FakeDom {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn body(&self) -> NodeId {
        NodeId(1)
    }

    fn add_class(&mut self, node: &NodeId, class: &str) {
        if self.live(node).is_some() {
            self.nodes[node.0].classes.insert(class.to_string());
        }
    }

    fn remove_class(&mut self, node: &NodeId, class: &str) {
        if self.live(node).is_some() {
            self.nodes[node.0].classes.remove(class);
        }
    }

    fn set_style_important(&mut self, node: &NodeId, property: &str, value: &str) {
        if self.live(node).is_some() {
            self.nodes[node.0]
                .styles
                .insert(property.to_string(), value.to_string());
        }
    }

    fn clear_style(&mut self, node: &NodeId, property: &str) {
        if self.live(node).is_some() {
            self.nodes[node.0].styles.remove(property);
        }
    }

    fn query_content(&mut self, _selectors: &ContentSelectors) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.content && !n.removed)
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    fn matches_or_contains(&self, node: &NodeId, _selectors: &ContentSelectors) -> bool {
        if self.live(node).is_none() {
            return false;
        }
        if self.nodes[node.0].content {
            return true;
        }
        self.nodes
            .iter()
            .enumerate()
            .any(|(i, n)| n.content && !n.removed && self.is_descendant_of(i, node.0))
    }

    fn put_stylesheet(&mut self, id: &str, css: &str) {
        self.stylesheets.insert(id.to_string(), css.to_string());
    }

    fn remove_stylesheet(&mut self, id: &str) {
        self.stylesheets.remove(id);
    }

    fn neutralize_autoplay_media(&mut self) -> usize {
        let mut count = 0;
        for node in &mut self.nodes {
            if node.autoplay && !node.removed {
                node.autoplay = false;
                count += 1;
            }
        }
        count
    }

    fn element_at(&mut self, _x: f64, _y: f64) -> Option<NodeId> {
        let hit = self.hit?;
        if self.nodes[hit].removed {
            None
        } else {
            Some(NodeId(hit))
        }
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.live(node)?.parent.map(NodeId)
    }

    fn tag_name(&self, node: &NodeId) -> String {
        self.live(node).map(|n| n.tag.clone()).unwrap_or_default()
    }

    fn text_content(&self, node: &NodeId) -> String {
        self.live(node).map(|n| n.text.clone()).unwrap_or_default()
    }

    fn is_document_root(&self, node: &NodeId) -> bool {
        node.0 == 0 || node.0 == 1
    }

    fn is_widget_ui(&self, node: &NodeId) -> bool {
        self.live(node).is_some_and(|n| n.widget_ui)
    }

    fn bounding_rect(&self, node: &NodeId) -> Rect {
        self.live(node).map(|n| n.rect).unwrap_or_default()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_magnifier_text(&mut self, text: &str) {
        self.magnifier_text = text.to_string();
        self.magnifier_visible = true;
    }

    fn magnifier_size(&self) -> (f64, f64) {
        self.magnifier_size
    }

    fn place_magnifier(&mut self, x: f64, y: f64) {
        self.magnifier_pos = Some((x, y));
        self.magnifier_visible = true;
    }

    fn hide_magnifier(&mut self) {
        self.magnifier_visible = false;
        self.magnifier_pos = None;
    }

    fn place_reading_mask(&mut self, top: f64) {
        self.mask_top = Some(top);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn selectors_default_excludes_widget_chrome() {
        let selectors = ContentSelectors::default();
        assert!(selectors.css_list().contains("div:not([class*=\"visor\"])"));
        assert!(selectors.host.is_empty());
    }

    #[test]
    fn selectors_host_extension_appends() {
        let selectors = ContentSelectors::with_host(vec![".Post-body".to_string()]);
        let list = selectors.css_list();
        assert!(list.ends_with(".Post-body"));
        assert!(selectors.descendant_css_list().contains(".Post-body *"));
    }

    #[test]
    fn stale_nodes_are_skipped_not_fatal() {
        let mut dom = FakeDom::new();
        let body = dom.body_id();
        let p = dom.content_element("p", body);
        dom.remove_node(p);
        // None of these may panic or have an effect.
        dom.add_class(&p, "visor-x");
        dom.set_style_important(&p, "font-size", "120%");
        assert!(!dom.has_class(p, "visor-x"));
        assert!(dom.style(p, "font-size").is_none());
        assert!(dom.query_content(&ContentSelectors::default()).is_empty());
    }

    #[test]
    fn matches_or_contains_sees_descendants() {
        let mut dom = FakeDom::new();
        let body = dom.body_id();
        let wrapper = dom.element("div", body);
        let inner = dom.content_element("p", wrapper);
        let selectors = ContentSelectors::default();
        assert!(dom.matches_or_contains(&wrapper, &selectors));
        assert!(dom.matches_or_contains(&inner, &selectors));
        let bare = dom.element("div", body);
        assert!(!dom.matches_or_contains(&bare, &selectors));
    }

    #[test]
    fn neutralize_counts_only_live_autoplay_media() {
        let mut dom = FakeDom::new();
        let body = dom.body_id();
        let v1 = dom.autoplay_media("video", body);
        let v2 = dom.autoplay_media("audio", body);
        dom.remove_node(v2);
        assert_eq!(dom.neutralize_autoplay_media(), 1);
        assert!(!dom.is_autoplay(v1));
        // Second pass finds nothing left.
        assert_eq!(dom.neutralize_autoplay_media(), 0);
    }

    #[test]
    fn effect_snapshot_ignores_effect_free_nodes() {
        let mut dom = FakeDom::new();
        let body = dom.body_id();
        let _quiet = dom.element("p", body);
        let loud = dom.content_element("p", body);
        dom.add_class(&loud, "visor-x");
        let snapshot = dom.effect_snapshot();
        assert_eq!(snapshot.classes.len(), 1);
        assert!(snapshot.styles.is_empty());
    }
}
