#![forbid(unsafe_code)]

//! The composition root: one store, one apply cycle, one watcher, one
//! magnifier, one reading mask.
//!
//! [`WidgetController`] is an explicit instance object — whoever starts the
//! widget owns it and calls [`destroy`](WidgetController::destroy) when
//! done. There is no module-level singleton and no ambient wiring: the host
//! layer feeds events in (`pointer_moved`, `content_mutated`, `navigated`,
//! `tick`) and the controller translates them into store mutations and
//! apply passes.
//!
//! # Ordering guarantee
//!
//! Every mutation path is write-then-apply, synchronously, and every
//! watcher-driven pass applies the *current* snapshot — never a captured
//! one. The most recently written settings value is therefore always the
//! one on screen.

use crate::apply::ApplyEngine;
use crate::dom::{ContentSelectors, DomSurface};
use crate::magnifier::{Magnifier, MagnifierParams};
use crate::settings::{SettingUpdate, Settings};
use crate::store::{SettingsStore, StorageBackend};
use crate::watcher::{ChangeWatcher, WatcherConfig};

/// Host-tunable configuration for the whole widget.
#[derive(Debug, Clone, Default)]
pub struct WidgetConfig {
    /// Content-container selectors (apply targeting, mutation filtering).
    pub selectors: ContentSelectors,
    pub watcher: WatcherConfig,
    pub magnifier: MagnifierParams,
    /// How far above the pointer the reading-mask band sits, in px.
    pub mask_offset: MaskOffset,
}

/// Vertical offset of the reading-mask band relative to the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskOffset(pub f64);

impl Default for MaskOffset {
    fn default() -> Self {
        Self(60.0)
    }
}

/// Owns the engine components and runs their one logical thread of control.
#[derive(Debug)]
pub struct WidgetController<D: DomSurface, S: StorageBackend> {
    dom: D,
    store: SettingsStore<S>,
    engine: ApplyEngine,
    watcher: ChangeWatcher,
    magnifier: Magnifier,
    selectors: ContentSelectors,
    mask_offset: f64,
    started: bool,
}

impl<D: DomSurface, S: StorageBackend> WidgetController<D, S> {
    #[must_use]
    pub fn new(dom: D, backend: S, config: WidgetConfig) -> Self {
        Self {
            dom,
            store: SettingsStore::new(backend),
            engine: ApplyEngine::new(config.selectors.clone()),
            watcher: ChangeWatcher::new(config.watcher),
            magnifier: Magnifier::new(config.magnifier),
            selectors: config.selectors,
            mask_offset: config.mask_offset.0,
            started: false,
        }
    }

    /// Load persisted settings and run the initial apply pass. Idempotent.
    pub fn start(&mut self, now: u64) {
        if self.started {
            return;
        }
        self.store.load();
        self.apply_now(now);
        self.started = true;
        tracing::debug!(backend = %self.store.backend_name(), "widget started");
    }

    /// The current canonical snapshot.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.store.settings()
    }

    /// Apply one settings mutation: write, persist, re-apply. Returns the
    /// new snapshot.
    pub fn update(&mut self, update: &SettingUpdate, now: u64) -> &Settings {
        self.store.update(update);
        self.apply_now(now);
        self.store.settings()
    }

    /// Return every setting to its default and re-apply.
    pub fn reset(&mut self, now: u64) -> &Settings {
        self.store.reset();
        self.apply_now(now);
        self.store.settings()
    }

    /// Pointer-move path: reposition the reading mask and re-sample the
    /// magnifier, each only when its flag is enabled.
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        self.mask_update(y);
        self.magnifier_sample(x, y);
    }

    /// Reading-mask half of the pointer path. Cheap; the host calls this on
    /// every raw pointer event.
    pub fn mask_update(&mut self, y: f64) {
        if self.store.settings().reading_mask {
            self.dom.place_reading_mask(y - self.mask_offset);
        }
    }

    /// Magnifier half of the pointer path. The host rate-limits calls per
    /// [`MagnifierParams::sample_debounce_ms`].
    pub fn magnifier_sample(&mut self, x: f64, y: f64) {
        if self.store.settings().text_magnifier {
            self.magnifier.sample(x, y, &mut self.dom);
        }
    }

    /// Structural-mutation path: schedules a debounced re-apply when the
    /// added node matches (or contains) a content container; anything else
    /// — including this widget's own repositioning — is ignored.
    pub fn content_mutated(&mut self, added: &D::Node, now: u64) {
        if self.dom.matches_or_contains(added, &self.selectors) {
            self.watcher.on_mutation(now);
        }
    }

    /// Navigation path (history push/replace, back/forward, hash change).
    pub fn navigated(&mut self, now: u64) {
        self.watcher.on_navigation(now);
    }

    /// Timer path: re-applies the current snapshot when the watcher says a
    /// pass is due. Returns whether a pass ran.
    pub fn tick(&mut self, now: u64) -> bool {
        if !self.watcher.poll(now) {
            return false;
        }
        self.apply_now(now);
        true
    }

    /// Tear down every effect this widget owns. Safe to call repeatedly;
    /// after destroy the document is back in its unmodified state.
    pub fn destroy(&mut self) {
        self.engine.clear(&mut self.dom);
        self.dom.hide_magnifier();
        self.started = false;
        tracing::debug!("widget destroyed");
    }

    /// The DOM surface, for host-layer wiring and test inspection.
    #[must_use]
    pub fn dom(&self) -> &D {
        &self.dom
    }

    #[must_use]
    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    /// Magnifier parameters, for host-layer rate limiting.
    #[must_use]
    pub fn magnifier_params(&self) -> &MagnifierParams {
        self.magnifier.params()
    }

    fn apply_now(&mut self, now: u64) {
        self.engine.apply(self.store.settings(), &mut self.dom);
        // The box is positioned with inline styles, which outlive the body
        // class the apply pass removes; hide it explicitly once disabled.
        if !self.store.settings().text_magnifier {
            self.dom.hide_magnifier();
        }
        self.watcher.note_applied(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::FakeDom;
    use crate::settings::{NumericSetting, ToggleFeature};
    use crate::store::MemoryStorage;
    use pretty_assertions::assert_eq;

    fn controller() -> WidgetController<FakeDom, MemoryStorage> {
        let mut dom = FakeDom::new();
        let body = dom.body_id();
        dom.content_element("p", body);
        WidgetController::new(dom, MemoryStorage::new(), WidgetConfig::default())
    }

    #[test]
    fn fresh_start_applies_defaults_without_effects() {
        let mut c = controller();
        c.start(0);
        assert!(c.dom().body_classes().is_empty());
        assert_eq!(c.settings(), &Settings::default());
    }

    #[test]
    fn start_is_idempotent() {
        let mut c = controller();
        c.start(0);
        c.update(&SettingUpdate::Toggle(ToggleFeature::DarkMode), 1);
        c.start(2);
        assert!(c.settings().dark_mode, "restart must not reload over live state");
    }

    #[test]
    fn update_is_write_then_apply() {
        let mut c = controller();
        c.start(0);
        let snapshot = c.update(&SettingUpdate::Numeric(NumericSetting::FontSize, 150), 1);
        assert_eq!(snapshot.font_size, 150);
        assert_eq!(c.dom().style(c.dom().body_id(), "font-size"), Some("150%"));
    }

    #[test]
    fn reset_clears_everything() {
        let mut c = controller();
        c.start(0);
        c.update(&SettingUpdate::Toggle(ToggleFeature::HighContrast), 1);
        c.update(&SettingUpdate::Numeric(NumericSetting::FontSize, 140), 2);
        c.reset(3);
        assert_eq!(c.settings(), &Settings::default());
        assert!(c.dom().body_classes().is_empty());
        assert!(c.dom().style(c.dom().body_id(), "font-size").is_none());
    }

    #[test]
    fn mask_only_moves_when_enabled() {
        let mut c = controller();
        c.start(0);
        c.pointer_moved(10.0, 200.0);
        assert_eq!(c.dom().mask_top(), None);

        c.update(&SettingUpdate::Toggle(ToggleFeature::ReadingMask), 1);
        c.pointer_moved(10.0, 200.0);
        assert_eq!(c.dom().mask_top(), Some(140.0));
    }

    #[test]
    fn magnifier_only_samples_when_enabled() {
        let mut c = controller();
        c.start(0);
        let hit = {
            let dom = c.dom_mut();
            let body = dom.body_id();
            let p = dom.content_element("p", body);
            dom.set_text(p, "some words to magnify");
            dom.set_rect(p, crate::dom::Rect::new(0.0, 0.0, 100.0, 20.0));
            dom.set_hit(Some(p));
            p
        };
        c.pointer_moved(5.0, 5.0);
        assert!(!c.dom().magnifier_visible());

        c.update(&SettingUpdate::Toggle(ToggleFeature::TextMagnifier), 1);
        c.pointer_moved(5.0, 5.0);
        assert!(c.dom().magnifier_visible());
        let _ = hit;
    }

    #[test]
    fn disabling_the_magnifier_hides_the_box() {
        let mut c = controller();
        c.start(0);
        c.update(&SettingUpdate::Toggle(ToggleFeature::TextMagnifier), 1);
        {
            let dom = c.dom_mut();
            let body = dom.body_id();
            let p = dom.content_element("p", body);
            dom.set_text(p, "words under the pointer");
            dom.set_rect(p, crate::dom::Rect::new(0.0, 0.0, 100.0, 20.0));
            dom.set_hit(Some(p));
        }
        c.pointer_moved(5.0, 5.0);
        assert!(c.dom().magnifier_visible());

        c.update(&SettingUpdate::Toggle(ToggleFeature::TextMagnifier), 2);
        assert!(!c.dom().magnifier_visible());
    }

    #[test]
    fn unmatched_mutation_is_ignored() {
        let mut c = controller();
        c.start(0);
        let body = c.dom().body_id();
        let bare = c.dom_mut().element("div", body);
        c.content_mutated(&bare, 10);
        assert!(!c.tick(500));
    }

    #[test]
    fn matched_mutation_reapplies_after_debounce() {
        let mut c = controller();
        c.start(0);
        c.update(&SettingUpdate::Numeric(NumericSetting::FontSize, 130), 5);

        // Host inserts new content containing a content element.
        let (wrapper, inner) = {
            let dom = c.dom_mut();
            let body = dom.body_id();
            let wrapper = dom.element("div", body);
            let inner = dom.content_element("p", wrapper);
            (wrapper, inner)
        };
        c.content_mutated(&wrapper, 10);
        assert!(!c.tick(50), "must wait out the quiet delay");
        assert!(c.tick(110));
        assert_eq!(c.dom().style(inner, "font-size"), Some("130%"));
    }

    #[test]
    fn navigation_reapplies_to_replacement_content() {
        let mut c = controller();
        c.start(0);
        c.update(&SettingUpdate::Numeric(NumericSetting::FontSize, 120), 5);
        c.navigated(1000);

        // Host replaces content after the navigation event.
        let fresh = {
            let dom = c.dom_mut();
            let body = dom.body_id();
            dom.content_element("article", body)
        };
        assert!(!c.tick(1100));
        assert!(c.tick(1200));
        assert_eq!(c.dom().style(fresh, "font-size"), Some("120%"));
    }

    #[test]
    fn fallback_tick_reasserts_effects() {
        let mut c = controller();
        c.start(0);
        c.update(&SettingUpdate::Toggle(ToggleFeature::HighContrast), 5);
        // A change path nothing observed: class stripped by the host.
        {
            let dom = c.dom_mut();
            let body = dom.body_id();
            dom.remove_class(&body, "visor-high-contrast");
        }
        assert!(c.tick(5 + 2000));
        assert!(c
            .dom()
            .body_classes()
            .contains(&"visor-high-contrast".to_string()));
    }

    #[test]
    fn destroy_restores_pristine_document_and_is_idempotent() {
        let mut c = controller();
        c.start(0);
        c.update(&SettingUpdate::Toggle(ToggleFeature::DarkMode), 1);
        c.update(&SettingUpdate::Numeric(NumericSetting::FontSize, 150), 2);
        c.destroy();
        assert!(c.dom().body_classes().is_empty());
        assert!(c.dom().style(c.dom().root_id(), "font-size").is_none());
        assert!(!c.dom().magnifier_visible());
        c.destroy();
        assert!(c.dom().body_classes().is_empty());
    }

    #[test]
    fn settings_persist_across_instances() {
        let mut dom = FakeDom::new();
        let body = dom.body_id();
        dom.content_element("p", body);
        let mut first = WidgetController::new(dom, MemoryStorage::new(), WidgetConfig::default());
        first.start(0);
        first.update(&SettingUpdate::Toggle(ToggleFeature::DyslexiaFont), 1);
        let record = serde_json::to_string(first.settings()).unwrap();

        let mut dom = FakeDom::new();
        let body = dom.body_id();
        dom.content_element("p", body);
        let mut second = WidgetController::new(
            dom,
            MemoryStorage::with_record(record),
            WidgetConfig::default(),
        );
        second.start(0);
        assert!(second.settings().dyslexia_font);
        assert!(second
            .dom()
            .body_classes()
            .contains(&"visor-dyslexia-font".to_string()));
    }
}
