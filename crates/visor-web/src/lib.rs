#![forbid(unsafe_code)]

//! Web/WASM frontend for the Visor accessibility overlay.
//!
//! This crate is intentionally host-specific (web/WASM). It supplies the
//! three things `visor-core` leaves to the host:
//! - a [`DomSurface`](visor_core::dom::DomSurface) over the live document
//!   (`dom::WebDom`),
//! - a [`StorageBackend`](visor_core::store::StorageBackend) over
//!   `localStorage` (`storage::LocalStorage`),
//! - event wiring with a symmetric install/remove lifecycle
//!   (`hooks::EventHooks`),
//!
//! plus the static effect stylesheet ([`css`]) and the JS-facing
//! [`VisorWidget`] exported via `wasm-bindgen`.

pub mod css;

#[cfg(target_arch = "wasm32")]
pub mod dom;
#[cfg(target_arch = "wasm32")]
pub mod hooks;
#[cfg(target_arch = "wasm32")]
pub mod storage;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::VisorWidget;

/// Native builds compile this crate as a stub so `cargo check --workspace`
/// stays green on non-wasm targets. The engine itself lives in
/// `visor-core` and is fully exercised there.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct VisorWidget;

#[cfg(not(target_arch = "wasm32"))]
impl VisorWidget {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}
