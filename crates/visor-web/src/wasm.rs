#![forbid(unsafe_code)]

//! JS-facing widget surface.
//!
//! The external panel owns markup, icons, and translations; it drives this
//! API with catalog ids and reads back the settings snapshot to render its
//! controls. Unknown ids are discarded (returning `false`), matching the
//! engine's policy of clamping/discarding invalid input at the boundary
//! instead of surfacing errors.

use std::cell::RefCell;
use std::rc::Rc;

use visor_core::controller::{WidgetConfig, WidgetController};
use visor_core::dom::ContentSelectors;
use visor_core::settings::{NumericSetting, SettingUpdate, TextAlign, ToggleFeature};
use wasm_bindgen::prelude::*;

use crate::dom::WebDom;
use crate::hooks::{EventHooks, SharedController, now_ms};
use crate::storage::{DEFAULT_STORAGE_KEY, LocalStorage};

/// The accessibility overlay, as seen from JS.
///
/// An explicit instance object: the embedding page constructs it, calls
/// [`start`](VisorWidget::start) once the document is ready, and calls
/// [`destroy`](VisorWidget::destroy) to remove every trace. No globals, no
/// self-installation.
#[wasm_bindgen]
pub struct VisorWidget {
    storage_key: String,
    host_selectors: Vec<String>,
    controller: Option<SharedController>,
    hooks: Option<EventHooks>,
}

#[wasm_bindgen]
impl VisorWidget {
    /// Create an unstarted widget.
    ///
    /// `storage_key` defaults to `"visor-settings"`. `host_selectors` is
    /// the host-specific extension of the content-container selector list
    /// (e.g. `[".Post-body", ".CommentPost"]` for a forum).
    #[wasm_bindgen(constructor)]
    pub fn new(storage_key: Option<String>, host_selectors: Option<Vec<String>>) -> Self {
        Self {
            storage_key: storage_key.unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
            host_selectors: host_selectors.unwrap_or_default(),
            controller: None,
            hooks: None,
        }
    }

    /// Attach to the document, load persisted settings, run the initial
    /// apply pass, and install the event hooks. Idempotent.
    pub fn start(&mut self) -> Result<(), JsValue> {
        if self.controller.is_some() {
            return Ok(());
        }

        let dom = WebDom::attach()?;
        let config = WidgetConfig {
            selectors: ContentSelectors::with_host(self.host_selectors.iter().cloned()),
            ..WidgetConfig::default()
        };
        let backend = LocalStorage::new(self.storage_key.clone());
        let controller: SharedController =
            Rc::new(RefCell::new(WidgetController::new(dom, backend, config)));

        let now = web_sys::window().map(|w| now_ms(&w)).unwrap_or(0);
        controller.borrow_mut().start(now);

        self.hooks = Some(EventHooks::install(controller.clone())?);
        self.controller = Some(controller);
        Ok(())
    }

    /// Remove every subscription and every DOM effect. Safe to call
    /// repeatedly; `start` may be called again afterwards.
    pub fn destroy(&mut self) {
        if let Some(mut hooks) = self.hooks.take() {
            hooks.remove();
        }
        if let Some(controller) = self.controller.take() {
            let mut c = controller.borrow_mut();
            c.destroy();
            c.dom_mut().detach();
        }
    }

    /// Invert a boolean feature by catalog id. Returns `false` for an
    /// unknown id (discarded, per the error-handling policy).
    pub fn toggle(&mut self, feature_id: &str) -> bool {
        let Some(feature) = ToggleFeature::from_id(feature_id) else {
            return false;
        };
        self.apply(SettingUpdate::Toggle(feature))
    }

    /// Set a numeric setting by catalog id; the value is clamped to the
    /// declared range. Returns `false` for an unknown id.
    #[wasm_bindgen(js_name = setNumeric)]
    pub fn set_numeric(&mut self, setting_id: &str, value: i32) -> bool {
        let Some(setting) = NumericSetting::from_id(setting_id) else {
            return false;
        };
        self.apply(SettingUpdate::Numeric(setting, value))
    }

    /// Select a text alignment (`"left"`, `"center"`, `"right"`,
    /// `"default"`). Selecting the active one again returns the group to
    /// default. Returns `false` for an unknown value.
    #[wasm_bindgen(js_name = setAlignment)]
    pub fn set_alignment(&mut self, value: &str) -> bool {
        let Some(align) = TextAlign::from_id(value) else {
            return false;
        };
        self.apply(SettingUpdate::Align(align))
    }

    /// Change the UI locale tag. Normalized on write; consumed by the
    /// external translation tables, no DOM effect.
    #[wasm_bindgen(js_name = setLanguage)]
    pub fn set_language(&mut self, tag: &str) -> bool {
        self.apply(SettingUpdate::Language(tag.to_string()))
    }

    /// Return every setting to its default.
    pub fn reset(&mut self) {
        if let Some(controller) = &self.controller {
            let now = web_sys::window().map(|w| now_ms(&w)).unwrap_or(0);
            controller.borrow_mut().reset(now);
        }
    }

    /// The current settings snapshot as a JSON string, for the panel to
    /// render its control states.
    #[wasm_bindgen(js_name = settingsJson)]
    pub fn settings_json(&self) -> String {
        match &self.controller {
            Some(controller) => serde_json::to_string(controller.borrow().settings())
                .unwrap_or_else(|_| "{}".to_string()),
            None => "{}".to_string(),
        }
    }

    /// Whether `start` has run (and `destroy` has not).
    #[wasm_bindgen(js_name = isStarted)]
    pub fn is_started(&self) -> bool {
        self.controller.is_some()
    }

    fn apply(&mut self, update: SettingUpdate) -> bool {
        let Some(controller) = &self.controller else {
            return false;
        };
        let now = web_sys::window().map(|w| now_ms(&w)).unwrap_or(0);
        controller.borrow_mut().update(&update, now);
        true
    }
}
