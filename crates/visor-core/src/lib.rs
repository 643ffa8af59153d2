#![forbid(unsafe_code)]

//! Host-agnostic settings-application engine for the Visor accessibility
//! overlay.
//!
//! `visor-core` owns the canonical settings state and everything needed to
//! keep it applied to a document that changes underneath it — without any
//! platform dependency. The web host adapter (`visor-web`) supplies a
//! [`DomSurface`] and a [`StorageBackend`]; everything else lives here and
//! runs identically under native tests.
//!
//! # Primary responsibilities
//!
//! - **Settings**: the flat preference record, its ranges, and its
//!   per-kind mutation rules (clamp / invert / exclusive-toggle).
//! - **FeatureCatalog**: immutable descriptors mapping every feature to the
//!   DOM effect it owns.
//! - **SettingsStore**: load/merge/validate/save/reset over pluggable
//!   storage, degrading silently to defaults.
//! - **ApplyEngine**: idempotent reset-then-apply translation of settings
//!   into DOM effects across the current content-element set.
//! - **ChangeWatcher**: pure deadline policy deciding when the host page
//!   changed enough to warrant a re-apply (debounce, navigation delay,
//!   bounded-staleness fallback).
//! - **Magnifier**: pointer-driven text-window selection and
//!   viewport-clamped placement, with named tunable parameters.
//! - **WidgetController**: the composition root with an explicit
//!   `start`/`destroy` lifecycle.
//!
//! # Design principles
//!
//! - **No platform I/O**: the DOM and storage are traits; [`FakeDom`] and
//!   [`MemoryStorage`](store::MemoryStorage) make the whole engine testable
//!   headless.
//! - **Idempotent by construction**: every apply pass clears the effects it
//!   owns before re-deriving them, so redundant passes are harmless.
//! - **Silent degradation**: storage and DOM failures never escape; the
//!   worst outcome is default settings or a skipped element.

pub mod apply;
pub mod catalog;
pub mod controller;
pub mod dom;
pub mod magnifier;
pub mod settings;
pub mod store;
pub mod watcher;

pub use apply::{ApplyEngine, DYNAMIC_FONTSIZE_STYLESHEET};
pub use catalog::{Effect, FeatureCatalog, FeatureDescriptor, FeatureKind, INVERT_ROOT_CLASS};
pub use controller::{MaskOffset, WidgetConfig, WidgetController};
pub use dom::{ContentSelectors, DomSurface, FakeDom, NodeId, Rect, Viewport};
pub use magnifier::{BLOCK_TAGS, Magnifier, MagnifierParams, WordWindow};
pub use settings::{
    NumericRange, NumericSetting, SettingUpdate, Settings, TextAlign, ToggleFeature,
    normalize_locale,
};
pub use store::{
    FileStorage, MemoryStorage, SettingsStore, StorageBackend, StorageError, StorageResult,
    UnavailableStorage,
};
pub use watcher::{ChangeWatcher, WatcherConfig};
