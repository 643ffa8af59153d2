#![forbid(unsafe_code)]

//! Cursor-following text magnifier.
//!
//! On each (rate-limited) pointer sample the magnifier re-derives everything
//! from the live DOM: it resolves the text block under the pointer,
//! estimates which word the pointer is near, extracts a bounded window of
//! words around that estimate, and positions the floating display next to
//! the pointer without letting it leave the viewport.
//!
//! # Word-index estimate
//!
//! The pointer's position inside the block's bounding box is reduced to
//! fractions `x, y ∈ [0, 1]` and combined as
//! `floor(word_count × (vertical_weight·y + horizontal_weight·x))`.
//! Block text reads top-to-bottom first, so the vertical fraction carries
//! most of the weight (0.7 vs 0.3 by default). These are tuned, empirical
//! constants — they live in [`MagnifierParams`] as named, overridable
//! parameters, not laws.
//!
//! # Invariants
//!
//! 1. The selected window never exceeds `window_words` words and only falls
//!    short when the block itself has fewer words.
//! 2. An ellipsis marker appears on a side exactly when words were cut off
//!    on that side.
//! 3. The placed box never extends past any viewport edge (flipping
//!    horizontally/vertically before clamping).
//! 4. No persistent DOM mutation: hide/show/position of the floating
//!    display only.

use crate::dom::{DomSurface, Rect, Viewport};

/// Block-level tags a magnified text window may be extracted from. Walking
/// up to one of these keeps the window a coherent block rather than a
/// disconnected inline fragment.
pub const BLOCK_TAGS: [&str; 14] = [
    "p", "div", "article", "section", "li", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6", "span",
];

/// Anchor tags also count as acceptable containers: link text is often the
/// exact thing a low-vision user is trying to read.
const INLINE_CONTAINER_TAGS: [&str; 1] = ["a"];

/// Tuned parameters of the magnifier heuristic.
#[derive(Debug, Clone)]
pub struct MagnifierParams {
    /// Number of words in the rendered window. Default: 20.
    pub window_words: usize,

    /// Words included before the estimated pointer word. Default: 8.
    pub words_before: usize,

    /// Weight of the vertical position fraction in the word-index estimate.
    /// Default: 0.7 (line progression dominates).
    pub vertical_weight: f64,

    /// Weight of the horizontal position fraction. Default: 0.3.
    pub horizontal_weight: f64,

    /// Horizontal gap between the pointer and the box. Default: 20 px.
    pub pointer_gap: f64,

    /// Vertical rise of the box above the pointer. Default: 10 px.
    pub pointer_rise: f64,

    /// Minimum distance kept from every viewport edge. Default: 20 px.
    pub viewport_margin: f64,

    /// Minimum interval between processed pointer samples (ms); bounds work
    /// during fast movement. Consumed by the host event layer. Default: 10.
    pub sample_debounce_ms: u64,
}

impl Default for MagnifierParams {
    fn default() -> Self {
        Self {
            window_words: 20,
            words_before: 8,
            vertical_weight: 0.7,
            horizontal_weight: 0.3,
            pointer_gap: 20.0,
            pointer_rise: 10.0,
            viewport_margin: 20.0,
            sample_debounce_ms: 10,
        }
    }
}

/// A bounded run of words selected around the estimated reading position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordWindow {
    /// First word index, inclusive.
    pub start: usize,
    /// Past-the-end word index.
    pub end: usize,
    /// Words exist before `start`.
    pub truncated_front: bool,
    /// Words exist after `end`.
    pub truncated_back: bool,
}

impl WordWindow {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Trim and collapse internal whitespace runs to single spaces.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Estimate the word index nearest the pointer from its position fractions
/// within the block. Returns `None` for an empty block.
#[must_use]
pub fn estimate_word_index(
    word_count: usize,
    fraction_x: f64,
    fraction_y: f64,
    params: &MagnifierParams,
) -> Option<usize> {
    if word_count == 0 {
        return None;
    }
    let fx = fraction_x.clamp(0.0, 1.0);
    let fy = fraction_y.clamp(0.0, 1.0);
    let blended = params.vertical_weight * fy + params.horizontal_weight * fx;
    let estimate = (word_count as f64 * blended).floor() as usize;
    Some(estimate.min(word_count - 1))
}

/// Select the window of words around `index`.
///
/// The window starts `words_before` words ahead of the estimate and runs for
/// `window_words`; when the end of the text clamps it short, it shifts back
/// to use the full intended size if the content allows.
#[must_use]
pub fn select_window(word_count: usize, index: usize, params: &MagnifierParams) -> WordWindow {
    let mut start = index.saturating_sub(params.words_before);
    let end = word_count.min(start + params.window_words);
    if end - start < params.window_words {
        start = end.saturating_sub(params.window_words);
    }
    WordWindow {
        start,
        end,
        truncated_front: start > 0,
        truncated_back: end < word_count,
    }
}

/// Render the window's text, with ellipsis markers on the truncated sides.
#[must_use]
pub fn window_text(words: &[&str], window: &WordWindow) -> String {
    let mut text = String::new();
    if window.truncated_front {
        text.push_str("... ");
    }
    text.push_str(&words[window.start..window.end].join(" "));
    if window.truncated_back {
        text.push_str(" ...");
    }
    text
}

/// Position the box near the pointer: offset right and above, flipped when
/// that would cross an edge, then clamped so it never leaves the viewport.
#[must_use]
pub fn place_box(
    pointer_x: f64,
    pointer_y: f64,
    box_width: f64,
    box_height: f64,
    viewport: Viewport,
    params: &MagnifierParams,
) -> (f64, f64) {
    let margin = params.viewport_margin;
    let mut left = pointer_x + params.pointer_gap;
    let mut top = pointer_y - box_height - params.pointer_rise;

    if left + box_width > viewport.width - margin {
        left = pointer_x - box_width - params.pointer_gap;
    }
    if top < margin {
        top = pointer_y + params.pointer_gap;
    }
    if top + box_height > viewport.height - margin {
        top = viewport.height - box_height - margin;
    }

    (left.max(margin), top.max(margin))
}

/// Pointer-driven magnifier over a [`DomSurface`].
#[derive(Debug, Clone, Default)]
pub struct Magnifier {
    params: MagnifierParams,
}

impl Magnifier {
    #[must_use]
    pub fn new(params: MagnifierParams) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn params(&self) -> &MagnifierParams {
        &self.params
    }

    /// Process one pointer sample: resolve the block under the pointer,
    /// select the word window, and show the box — or hide it when there is
    /// nothing readable under the pointer.
    pub fn sample<D: DomSurface>(&self, x: f64, y: f64, dom: &mut D) {
        let Some(block) = self.resolve_block(x, y, dom) else {
            dom.hide_magnifier();
            return;
        };

        let text = normalize_text(&dom.text_content(&block));
        if text.is_empty() {
            dom.hide_magnifier();
            return;
        }
        let words: Vec<&str> = text.split(' ').collect();

        let rect = dom.bounding_rect(&block);
        let (fx, fy) = position_fractions(x, y, rect);
        let Some(index) = estimate_word_index(words.len(), fx, fy, &self.params) else {
            dom.hide_magnifier();
            return;
        };
        let window = select_window(words.len(), index, &self.params);
        dom.set_magnifier_text(&window_text(&words, &window));

        let (width, height) = dom.magnifier_size();
        let (left, top) = place_box(x, y, width, height, dom.viewport(), &self.params);
        dom.place_magnifier(left, top);
    }

    /// Find the block-level text container under the pointer.
    ///
    /// Walks up from the hit element to the nearest ancestor with non-empty
    /// trimmed text, then — if that ancestor is not block-level — further up
    /// to the nearest block-level ancestor.
    fn resolve_block<D: DomSurface>(&self, x: f64, y: f64, dom: &mut D) -> Option<D::Node> {
        let hit = dom.element_at(x, y)?;
        if dom.is_document_root(&hit) || dom.is_widget_ui(&hit) {
            return None;
        }

        // Nearest ancestor with any text at all.
        let mut container = Some(hit);
        while let Some(node) = container.clone() {
            if dom.is_document_root(&node) {
                return None;
            }
            if !dom.text_content(&node).trim().is_empty() {
                break;
            }
            container = dom.parent(&node);
        }
        let container = container?;

        // Promote inline fragments to their enclosing block.
        if is_container_tag(&dom.tag_name(&container)) {
            return Some(container);
        }
        let mut cursor = dom.parent(&container);
        while let Some(node) = cursor.clone() {
            if dom.is_document_root(&node) {
                break;
            }
            if BLOCK_TAGS.contains(&dom.tag_name(&node).as_str()) {
                return Some(node);
            }
            cursor = dom.parent(&node);
        }
        Some(container)
    }
}

fn is_container_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag) || INLINE_CONTAINER_TAGS.contains(&tag)
}

fn position_fractions(x: f64, y: f64, rect: Rect) -> (f64, f64) {
    let fx = if rect.width > 0.0 {
        ((x - rect.x) / rect.width).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let fy = if rect.height > 0.0 {
        ((y - rect.y) / rect.height).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (fx, fy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::FakeDom;
    use pretty_assertions::assert_eq;

    fn params() -> MagnifierParams {
        MagnifierParams::default()
    }

    #[test]
    fn normalize_collapses_whitespace_runs() {
        assert_eq!(
            normalize_text("  one \n\t two   three "),
            "one two three".to_string()
        );
        assert_eq!(normalize_text("   "), String::new());
    }

    #[test]
    fn short_block_is_shown_whole_without_ellipsis() {
        let words = ["alpha", "beta", "gamma", "delta", "epsilon"];
        for index in 0..words.len() {
            let window = select_window(words.len(), index, &params());
            assert_eq!((window.start, window.end), (0, 5));
            assert!(!window.truncated_front);
            assert!(!window.truncated_back);
            assert_eq!(window_text(&words, &window), "alpha beta gamma delta epsilon");
        }
    }

    #[test]
    fn long_block_always_yields_a_full_window() {
        for index in 0..100 {
            let window = select_window(100, index, &params());
            assert_eq!(window.len(), 20, "short window at index {index}");
            assert_eq!(window.truncated_front, window.start > 0);
            assert_eq!(window.truncated_back, window.end < 100);
        }
    }

    #[test]
    fn window_is_biased_before_the_estimate() {
        let window = select_window(100, 50, &params());
        assert_eq!(window.start, 42);
        assert_eq!(window.end, 62);
        assert!(window.truncated_front);
        assert!(window.truncated_back);
    }

    #[test]
    fn end_clamp_shifts_window_back_to_full_size() {
        let window = select_window(100, 99, &params());
        assert_eq!((window.start, window.end), (80, 100));
        assert!(window.truncated_front);
        assert!(!window.truncated_back);
    }

    #[test]
    fn ellipsis_markers_follow_truncation() {
        let words: Vec<&str> = (0..30).map(|_| "w").collect();
        let head = select_window(30, 0, &params());
        let text = window_text(&words, &head);
        assert!(!text.starts_with("... "));
        assert!(text.ends_with(" ..."));

        let tail = select_window(30, 29, &params());
        let text = window_text(&words, &tail);
        assert!(text.starts_with("... "));
        assert!(!text.ends_with(" ..."));
    }

    #[test]
    fn estimate_favors_vertical_position() {
        let p = params();
        // Top-left corner: first word.
        assert_eq!(estimate_word_index(100, 0.0, 0.0, &p), Some(0));
        // Bottom-left beats right-edge-of-first-line.
        let bottom_left = estimate_word_index(100, 0.0, 1.0, &p).unwrap();
        let top_right = estimate_word_index(100, 1.0, 0.0, &p).unwrap();
        assert!(bottom_left > top_right);
        assert_eq!(bottom_left, 70);
        assert_eq!(top_right, 30);
        // Bottom-right corner clamps to the last word.
        assert_eq!(estimate_word_index(100, 1.0, 1.0, &p), Some(99));
    }

    #[test]
    fn estimate_is_none_for_empty_block() {
        assert_eq!(estimate_word_index(0, 0.5, 0.5, &params()), None);
    }

    #[test]
    fn box_sits_right_and_above_by_default() {
        let viewport = Viewport {
            width: 1000.0,
            height: 800.0,
        };
        let (left, top) = place_box(100.0, 400.0, 300.0, 100.0, viewport, &params());
        assert_eq!(left, 120.0);
        assert_eq!(top, 290.0);
    }

    #[test]
    fn box_flips_left_near_the_right_edge() {
        let viewport = Viewport {
            width: 1000.0,
            height: 800.0,
        };
        let (left, _) = place_box(900.0, 400.0, 300.0, 100.0, viewport, &params());
        assert_eq!(left, 580.0);
    }

    #[test]
    fn box_flips_below_near_the_top_edge() {
        let viewport = Viewport {
            width: 1000.0,
            height: 800.0,
        };
        let (_, top) = place_box(100.0, 50.0, 300.0, 100.0, viewport, &params());
        assert_eq!(top, 70.0);
    }

    #[test]
    fn box_never_leaves_the_viewport() {
        let viewport = Viewport {
            width: 1000.0,
            height: 800.0,
        };
        let p = params();
        for &(x, y) in &[
            (0.0, 0.0),
            (999.0, 0.0),
            (0.0, 799.0),
            (999.0, 799.0),
            (500.0, 780.0),
        ] {
            let (left, top) = place_box(x, y, 300.0, 100.0, viewport, &p);
            assert!(left >= p.viewport_margin, "left {left} at ({x}, {y})");
            assert!(top >= p.viewport_margin, "top {top} at ({x}, {y})");
            assert!(top + 100.0 <= viewport.height - p.viewport_margin + f64::EPSILON);
        }
    }

    // -- DOM-driven sampling ---------------------------------------------

    fn text_fixture() -> (FakeDom, crate::dom::NodeId) {
        let mut dom = FakeDom::new();
        let body = dom.body_id();
        let article = dom.element("article", body);
        dom.set_text(article, "one two three four five six seven eight nine ten");
        dom.set_rect(article, Rect::new(0.0, 0.0, 400.0, 100.0));
        (dom, article)
    }

    #[test]
    fn sample_shows_window_for_text_block() {
        let (mut dom, article) = text_fixture();
        dom.set_hit(Some(article));
        Magnifier::default().sample(10.0, 10.0, &mut dom);
        assert!(dom.magnifier_visible());
        assert_eq!(dom.magnifier_text(), "one two three four five six seven eight nine ten");
        assert!(dom.magnifier_pos().is_some());
    }

    #[test]
    fn sample_hides_when_nothing_is_hit() {
        let (mut dom, _) = text_fixture();
        dom.set_hit(None);
        Magnifier::default().sample(10.0, 10.0, &mut dom);
        assert!(!dom.magnifier_visible());
    }

    #[test]
    fn sample_hides_over_document_root_and_own_ui() {
        let (mut dom, _) = text_fixture();
        let body = dom.body_id();
        dom.set_hit(Some(body));
        Magnifier::default().sample(10.0, 10.0, &mut dom);
        assert!(!dom.magnifier_visible());

        let own = dom.element("div", body);
        dom.set_text(own, "panel text");
        dom.mark_widget_ui(own);
        dom.set_hit(Some(own));
        Magnifier::default().sample(10.0, 10.0, &mut dom);
        assert!(!dom.magnifier_visible());
    }

    #[test]
    fn sample_walks_up_to_text_bearing_ancestor() {
        let (mut dom, article) = text_fixture();
        let empty_child = dom.element("i", article);
        dom.set_hit(Some(empty_child));
        Magnifier::default().sample(10.0, 10.0, &mut dom);
        assert!(dom.magnifier_visible());
        assert!(dom.magnifier_text().starts_with("one two"));
    }

    #[test]
    fn inline_fragment_is_promoted_to_enclosing_block() {
        let mut dom = FakeDom::new();
        let body = dom.body_id();
        let li = dom.element("li", body);
        dom.set_text(li, "item text with several words in it");
        dom.set_rect(li, Rect::new(0.0, 0.0, 200.0, 20.0));
        let code = dom.element("code", li);
        dom.set_text(code, "words");
        dom.set_rect(code, Rect::new(50.0, 0.0, 40.0, 20.0));

        dom.set_hit(Some(code));
        Magnifier::default().sample(60.0, 10.0, &mut dom);
        // The window comes from the <li> block, not the inline fragment.
        assert_eq!(dom.magnifier_text(), "item text with several words in it");
    }

    #[test]
    fn whitespace_only_block_hides() {
        let mut dom = FakeDom::new();
        let body = dom.body_id();
        let div = dom.element("div", body);
        dom.set_text(div, "   \n\t  ");
        dom.set_hit(Some(div));
        Magnifier::default().sample(10.0, 10.0, &mut dom);
        assert!(!dom.magnifier_visible());
    }
}
