#![forbid(unsafe_code)]

//! [`DomSurface`] over the live document via `web-sys`.
//!
//! Every host error is absorbed here: a stale element, a selector the
//! engine is not allowed to use, a missing `<head>` — all become no-ops
//! (logged at debug level where useful), never failures. The engine above
//! this boundary is infallible by contract.

use visor_core::dom::{ContentSelectors, DomSurface, Rect, Viewport};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, Window};

use crate::css::{EFFECT_CSS, EFFECT_STYLESHEET_ID, MAGNIFIER_ID, READING_MASK_ID, WIDGET_UI_SELECTOR};

/// The live-document surface. Owns the widget's floating aid elements
/// (reading mask, magnifier box), which it creates on attach and removes on
/// detach.
pub struct WebDom {
    window: Window,
    document: Document,
    root: Element,
    body: HtmlElement,
    mask: HtmlElement,
    magnifier: HtmlElement,
}

impl WebDom {
    /// Attach to the current document: grab root/body, create the floating
    /// aids if they are not already present, and inject the effect
    /// stylesheet. Idempotent — a second attach reuses existing elements.
    pub fn attach() -> Result<Self, wasm_bindgen::JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let root = document.document_element().ok_or("no document element")?;
        let body = document.body().ok_or("no body")?;

        let mask = Self::ensure_aid(&document, &body, READING_MASK_ID)?;
        let magnifier = Self::ensure_aid(&document, &body, MAGNIFIER_ID)?;

        let mut dom = Self {
            window,
            document,
            root,
            body,
            mask,
            magnifier,
        };
        dom.put_stylesheet(EFFECT_STYLESHEET_ID, EFFECT_CSS);
        Ok(dom)
    }

    /// Remove everything attach created: the floating aids and the effect
    /// stylesheet. Called on widget teardown.
    pub fn detach(&mut self) {
        self.mask.remove();
        self.magnifier.remove();
        self.remove_stylesheet(EFFECT_STYLESHEET_ID);
    }

    fn ensure_aid(
        document: &Document,
        body: &HtmlElement,
        id: &str,
    ) -> Result<HtmlElement, wasm_bindgen::JsValue> {
        if let Some(existing) = document.get_element_by_id(id) {
            return existing.dyn_into::<HtmlElement>().map_err(Into::into);
        }
        let element = document.create_element("div")?;
        element.set_id(id);
        element.set_attribute("aria-hidden", "true")?;
        body.append_child(&element)?;
        element.dyn_into::<HtmlElement>().map_err(Into::into)
    }

    /// Inline-style helper; skips elements without a CSS style declaration
    /// (the "missing DOM target" recovery path).
    fn styled(node: &Element) -> Option<&HtmlElement> {
        node.dyn_ref::<HtmlElement>()
    }

    fn set_display(element: &HtmlElement, value: &str) {
        let _ = element.style().set_property("display", value);
    }
}

impl DomSurface for WebDom {
    type Node = Element;

    fn root(&self) -> Element {
        self.root.clone()
    }

    fn body(&self) -> Element {
        let body: &Element = self.body.as_ref();
        body.clone()
    }

    fn add_class(&mut self, node: &Element, class: &str) {
        let _ = node.class_list().add_1(class);
    }

    fn remove_class(&mut self, node: &Element, class: &str) {
        let _ = node.class_list().remove_1(class);
    }

    fn set_style_important(&mut self, node: &Element, property: &str, value: &str) {
        if let Some(element) = Self::styled(node) {
            let _ = element
                .style()
                .set_property_with_priority(property, value, "important");
        }
    }

    fn clear_style(&mut self, node: &Element, property: &str) {
        if let Some(element) = Self::styled(node) {
            let _ = element.style().remove_property(property);
        }
    }

    fn query_content(&mut self, selectors: &ContentSelectors) -> Vec<Element> {
        let list = match self.document.query_selector_all(&selectors.css_list()) {
            Ok(list) => list,
            Err(e) => {
                tracing::debug!(?e, "content selector list rejected by host");
                return Vec::new();
            }
        };
        let mut nodes = Vec::with_capacity(list.length() as usize);
        for i in 0..list.length() {
            if let Some(node) = list.item(i) {
                if let Ok(element) = node.dyn_into::<Element>() {
                    // Never treat the widget's own UI as content.
                    if element
                        .closest(WIDGET_UI_SELECTOR)
                        .ok()
                        .flatten()
                        .is_none()
                    {
                        nodes.push(element);
                    }
                }
            }
        }
        nodes
    }

    fn matches_or_contains(&self, node: &Element, selectors: &ContentSelectors) -> bool {
        if node.closest(WIDGET_UI_SELECTOR).ok().flatten().is_some() {
            return false;
        }
        let list = selectors.css_list();
        if node.matches(&list).unwrap_or(false) {
            return true;
        }
        node.query_selector(&list).ok().flatten().is_some()
    }

    fn put_stylesheet(&mut self, id: &str, css: &str) {
        if let Some(existing) = self.document.get_element_by_id(id) {
            existing.set_text_content(Some(css));
            return;
        }
        let Ok(style) = self.document.create_element("style") else {
            return;
        };
        style.set_id(id);
        style.set_text_content(Some(css));
        if let Some(head) = self.document.head() {
            let _ = head.append_child(&style);
        }
    }

    fn remove_stylesheet(&mut self, id: &str) {
        if let Some(existing) = self.document.get_element_by_id(id) {
            existing.remove();
        }
    }

    fn neutralize_autoplay_media(&mut self) -> usize {
        let Ok(list) = self
            .document
            .query_selector_all("video[autoplay], audio[autoplay]")
        else {
            return 0;
        };
        let mut count = 0;
        for i in 0..list.length() {
            let Some(node) = list.item(i) else { continue };
            let Ok(media) = node.dyn_into::<web_sys::HtmlMediaElement>() else {
                continue;
            };
            let _ = media.pause();
            let _ = media.remove_attribute("autoplay");
            count += 1;
        }
        count
    }

    fn element_at(&mut self, x: f64, y: f64) -> Option<Element> {
        // Hide the magnifier for the probe so it does not hit itself.
        Self::set_display(&self.magnifier, "none");
        let hit = self.document.element_from_point(x as f32, y as f32);
        Self::set_display(&self.magnifier, "");
        hit
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn tag_name(&self, node: &Element) -> String {
        node.tag_name().to_ascii_lowercase()
    }

    fn text_content(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn is_document_root(&self, node: &Element) -> bool {
        node.is_same_node(Some(self.root.as_ref())) || node.is_same_node(Some(self.body.as_ref()))
    }

    fn is_widget_ui(&self, node: &Element) -> bool {
        node.closest(WIDGET_UI_SELECTOR).ok().flatten().is_some()
    }

    fn bounding_rect(&self, node: &Element) -> Rect {
        let rect = node.get_bounding_client_rect();
        Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
    }

    fn viewport(&self) -> Viewport {
        let width = self
            .window
            .inner_width()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let height = self
            .window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        Viewport { width, height }
    }

    fn set_magnifier_text(&mut self, text: &str) {
        self.magnifier.set_text_content(Some(text));
        Self::set_display(&self.magnifier, "block");
    }

    fn magnifier_size(&self) -> (f64, f64) {
        (
            f64::from(self.magnifier.offset_width()),
            f64::from(self.magnifier.offset_height()),
        )
    }

    fn place_magnifier(&mut self, x: f64, y: f64) {
        let style = self.magnifier.style();
        let _ = style.set_property("left", &format!("{x}px"));
        let _ = style.set_property("top", &format!("{y}px"));
        Self::set_display(&self.magnifier, "block");
    }

    fn hide_magnifier(&mut self) {
        Self::set_display(&self.magnifier, "none");
    }

    fn place_reading_mask(&mut self, top: f64) {
        let _ = self.mask.style().set_property("top", &format!("{top}px"));
    }
}
