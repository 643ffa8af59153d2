#![forbid(unsafe_code)]

//! DOM event wiring with a symmetric install/remove lifecycle.
//!
//! [`EventHooks`] owns every subscription the widget needs from the host
//! page: pointer movement, structural mutations, navigation, and the
//! scheduler tick. Installation and removal are strictly symmetric — after
//! [`remove`](EventHooks::remove) no listener, observer, timer, or patched
//! history function survives, and calling it twice is safe.
//!
//! Navigation detection deserves a note: `popstate` and `hashchange` are
//! plain listeners, but programmatic `history.pushState`/`replaceState`
//! fire no event at all, so those two functions are wrapped while the hooks
//! are installed and restored verbatim on removal. The wrapper delegates to
//! the original first, then notifies the controller.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect};
use visor_core::controller::WidgetController;
use wasm_bindgen::prelude::*;
use web_sys::{Document, MutationObserver, MutationObserverInit, Window};

use crate::dom::WebDom;
use crate::storage::LocalStorage;

/// The controller as shared by every event handler.
pub type SharedController = Rc<RefCell<WidgetController<WebDom, LocalStorage>>>;

/// Scheduler tick interval (ms). Fine enough to honor the watcher's
/// debounce deadlines; the watcher itself decides when work happens.
const TICK_INTERVAL_MS: i32 = 100;

/// Current time in milliseconds, from the host's monotonic clock.
pub(crate) fn now_ms(window: &Window) -> u64 {
    window.performance().map(|p| p.now()).unwrap_or(0.0) as u64
}

/// Wrapped `history.pushState`/`replaceState`, restored on removal.
struct HistoryPatch {
    history: Object,
    original_push: Function,
    original_replace: Function,
    // Held for their lifetime; dropped (and thereby invalidated) after the
    // originals are restored.
    _push_wrapper: Closure<dyn FnMut(JsValue, JsValue, JsValue)>,
    _replace_wrapper: Closure<dyn FnMut(JsValue, JsValue, JsValue)>,
}

impl HistoryPatch {
    fn install(window: &Window, controller: SharedController) -> Result<Self, JsValue> {
        let history: Object = window.history()?.unchecked_into();
        let history_value: JsValue = history.clone().into();

        let original_push: Function =
            Reflect::get(&history, &JsValue::from_str("pushState"))?.dyn_into()?;
        let original_replace: Function =
            Reflect::get(&history, &JsValue::from_str("replaceState"))?.dyn_into()?;

        let push_wrapper = Self::wrapper(
            window.clone(),
            controller.clone(),
            original_push.clone(),
            history_value.clone(),
        );
        let replace_wrapper = Self::wrapper(
            window.clone(),
            controller,
            original_replace.clone(),
            history_value,
        );

        Reflect::set(
            &history,
            &JsValue::from_str("pushState"),
            push_wrapper.as_ref().unchecked_ref(),
        )?;
        Reflect::set(
            &history,
            &JsValue::from_str("replaceState"),
            replace_wrapper.as_ref().unchecked_ref(),
        )?;

        Ok(Self {
            history,
            original_push,
            original_replace,
            _push_wrapper: push_wrapper,
            _replace_wrapper: replace_wrapper,
        })
    }

    fn wrapper(
        window: Window,
        controller: SharedController,
        original: Function,
        history_value: JsValue,
    ) -> Closure<dyn FnMut(JsValue, JsValue, JsValue)> {
        Closure::wrap(Box::new(move |state: JsValue, title: JsValue, url: JsValue| {
            let args = Array::of3(&state, &title, &url);
            if let Err(e) = original.apply(&history_value, &args) {
                tracing::debug!(?e, "history call rejected by host");
            }
            if let Ok(mut c) = controller.try_borrow_mut() {
                c.navigated(now_ms(&window));
            }
        }) as Box<dyn FnMut(JsValue, JsValue, JsValue)>)
    }

    fn remove(self) {
        let _ = Reflect::set(
            &self.history,
            &JsValue::from_str("pushState"),
            &self.original_push,
        );
        let _ = Reflect::set(
            &self.history,
            &JsValue::from_str("replaceState"),
            &self.original_replace,
        );
    }
}

/// Every live subscription the widget holds on the host page.
pub struct EventHooks {
    window: Window,
    document: Document,
    pointer: Option<Closure<dyn FnMut(web_sys::MouseEvent)>>,
    magnify: Option<Closure<dyn FnMut()>>,
    magnify_timeout: Rc<Cell<Option<i32>>>,
    observer: Option<MutationObserver>,
    observer_cb: Option<Closure<dyn FnMut(Array, MutationObserver)>>,
    popstate: Option<Closure<dyn FnMut(web_sys::Event)>>,
    hashchange: Option<Closure<dyn FnMut(web_sys::Event)>>,
    tick: Option<Closure<dyn FnMut()>>,
    tick_handle: Option<i32>,
    history: Option<HistoryPatch>,
}

impl EventHooks {
    /// Install every subscription. The controller must already be started.
    pub fn install(controller: SharedController) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let mut hooks = Self {
            window: window.clone(),
            document,
            pointer: None,
            magnify: None,
            magnify_timeout: Rc::new(Cell::new(None)),
            observer: None,
            observer_cb: None,
            popstate: None,
            hashchange: None,
            tick: None,
            tick_handle: None,
            history: None,
        };

        hooks.install_pointer(controller.clone())?;
        hooks.install_observer(controller.clone())?;
        hooks.install_navigation(controller.clone())?;
        hooks.install_tick(controller)?;
        Ok(hooks)
    }

    fn install_pointer(&mut self, controller: SharedController) -> Result<(), JsValue> {
        let last_pos = Rc::new(Cell::new((0.0_f64, 0.0_f64)));

        // Trailing-edge magnifier sample: runs once the pointer has been
        // quiet for the configured debounce, on the last seen position.
        let magnify = {
            let controller = controller.clone();
            let last_pos = last_pos.clone();
            let pending = self.magnify_timeout.clone();
            Closure::wrap(Box::new(move || {
                pending.set(None);
                let (x, y) = last_pos.get();
                if let Ok(mut c) = controller.try_borrow_mut() {
                    c.magnifier_sample(x, y);
                }
            }) as Box<dyn FnMut()>)
        };

        let pointer = {
            let window = self.window.clone();
            let pending = self.magnify_timeout.clone();
            let magnify_fn: Function = magnify.as_ref().unchecked_ref::<Function>().clone();
            Closure::wrap(Box::new(move |event: web_sys::MouseEvent| {
                let x = f64::from(event.client_x());
                let y = f64::from(event.client_y());
                last_pos.set((x, y));

                let Ok(mut c) = controller.try_borrow_mut() else {
                    return;
                };
                // The mask tracks every raw sample; the magnifier is
                // debounced to bound work during fast movement.
                c.mask_update(y);
                let debounce = c.magnifier_params().sample_debounce_ms as i32;
                drop(c);

                if let Some(handle) = pending.take() {
                    window.clear_timeout_with_handle(handle);
                }
                match window.set_timeout_with_callback_and_timeout_and_arguments_0(
                    &magnify_fn,
                    debounce,
                ) {
                    Ok(handle) => pending.set(Some(handle)),
                    Err(e) => tracing::debug!(?e, "could not schedule magnifier sample"),
                }
            }) as Box<dyn FnMut(web_sys::MouseEvent)>)
        };

        self.document
            .add_event_listener_with_callback("mousemove", pointer.as_ref().unchecked_ref())?;
        self.pointer = Some(pointer);
        self.magnify = Some(magnify);
        Ok(())
    }

    fn install_observer(&mut self, controller: SharedController) -> Result<(), JsValue> {
        let window = self.window.clone();
        let callback = Closure::wrap(Box::new(move |records: Array, _obs: MutationObserver| {
            let now = now_ms(&window);
            let Ok(mut c) = controller.try_borrow_mut() else {
                return;
            };
            for record in records.iter() {
                let Ok(record) = record.dyn_into::<web_sys::MutationRecord>() else {
                    continue;
                };
                let added = record.added_nodes();
                for i in 0..added.length() {
                    let Some(node) = added.item(i) else { continue };
                    let Ok(element) = node.dyn_into::<web_sys::Element>() else {
                        continue;
                    };
                    // The controller filters against the content selectors;
                    // unmatched additions (including this widget's own
                    // repositioning) schedule nothing.
                    c.content_mutated(&element, now);
                }
            }
        }) as Box<dyn FnMut(Array, MutationObserver)>);

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        let body = self.document.body().ok_or("no body")?;
        observer.observe_with_options(body.as_ref(), &options)?;

        self.observer = Some(observer);
        self.observer_cb = Some(callback);
        Ok(())
    }

    fn install_navigation(&mut self, controller: SharedController) -> Result<(), JsValue> {
        let popstate = {
            let window = self.window.clone();
            let controller = controller.clone();
            Closure::wrap(Box::new(move |_event: web_sys::Event| {
                if let Ok(mut c) = controller.try_borrow_mut() {
                    c.navigated(now_ms(&window));
                }
            }) as Box<dyn FnMut(web_sys::Event)>)
        };
        let hashchange = {
            let window = self.window.clone();
            let controller = controller.clone();
            Closure::wrap(Box::new(move |_event: web_sys::Event| {
                if let Ok(mut c) = controller.try_borrow_mut() {
                    c.navigated(now_ms(&window));
                }
            }) as Box<dyn FnMut(web_sys::Event)>)
        };

        self.window
            .add_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref())?;
        self.window
            .add_event_listener_with_callback("hashchange", hashchange.as_ref().unchecked_ref())?;
        self.popstate = Some(popstate);
        self.hashchange = Some(hashchange);

        self.history = Some(HistoryPatch::install(&self.window, controller)?);
        Ok(())
    }

    fn install_tick(&mut self, controller: SharedController) -> Result<(), JsValue> {
        let window = self.window.clone();
        let tick = Closure::wrap(Box::new(move || {
            if let Ok(mut c) = controller.try_borrow_mut() {
                c.tick(now_ms(&window));
            }
        }) as Box<dyn FnMut()>);

        let handle = self.window.set_interval_with_callback_and_timeout_and_arguments_0(
            tick.as_ref().unchecked_ref(),
            TICK_INTERVAL_MS,
        )?;
        self.tick = Some(tick);
        self.tick_handle = Some(handle);
        Ok(())
    }

    /// Remove every subscription. Safe to call repeatedly; nothing fires
    /// after this returns.
    pub fn remove(&mut self) {
        if let Some(handle) = self.tick_handle.take() {
            self.window.clear_interval_with_handle(handle);
        }
        self.tick = None;

        if let Some(handle) = self.magnify_timeout.take() {
            self.window.clear_timeout_with_handle(handle);
        }
        if let Some(pointer) = self.pointer.take() {
            let _ = self
                .document
                .remove_event_listener_with_callback("mousemove", pointer.as_ref().unchecked_ref());
        }
        self.magnify = None;

        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self.observer_cb = None;

        if let Some(popstate) = self.popstate.take() {
            let _ = self
                .window
                .remove_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref());
        }
        if let Some(hashchange) = self.hashchange.take() {
            let _ = self.window.remove_event_listener_with_callback(
                "hashchange",
                hashchange.as_ref().unchecked_ref(),
            );
        }

        if let Some(history) = self.history.take() {
            history.remove();
        }
    }
}

impl Drop for EventHooks {
    fn drop(&mut self) {
        self.remove();
    }
}
