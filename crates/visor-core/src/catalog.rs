#![forbid(unsafe_code)]

//! Static catalog of every feature the engine can apply.
//!
//! The catalog is the contract between the engine and whatever panel drives
//! it: one [`FeatureDescriptor`] per toggle/slider, naming its id, kind, and
//! the DOM effect it maps to. The engine consumes the catalog; it never
//! mutates it.
//!
//! The catalog is also the source of truth for the *clear phase*: the set of
//! body classes returned by [`FeatureCatalog::body_classes`] is exactly the
//! set an apply pass removes before re-applying, which is what makes passes
//! idempotent regardless of prior state.

use crate::settings::{NumericRange, NumericSetting, ToggleFeature};

/// What kind of control a feature is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// On/off flag.
    Boolean,
    /// Member of an exclusive group (text alignment).
    ExclusiveGroup,
    /// Numeric slider with a declared range.
    Numeric,
}

/// The DOM effect a feature maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// A class toggled on `<body>`.
    BodyClass(&'static str),
    /// A class toggled on the root element (`<html>`).
    RootClass(&'static str),
    /// An inline style property applied with important precedence.
    Style(&'static str),
}

/// Immutable description of one feature. External input to the engine.
#[derive(Debug, Clone, Copy)]
pub struct FeatureDescriptor {
    /// Stable id, matching the settings field name.
    pub id: &'static str,
    pub kind: FeatureKind,
    /// Declared range for numeric features.
    pub range: Option<NumericRange>,
    pub effect: Effect,
}

/// Root class for color inversion. Lives on `<html>` so the overlay covers
/// fixed-position content as well.
pub const INVERT_ROOT_CLASS: &str = "visor-invert";

const fn numeric(setting: NumericSetting, effect: Effect) -> FeatureDescriptor {
    FeatureDescriptor {
        id: setting.id(),
        kind: FeatureKind::Numeric,
        range: Some(setting.range()),
        effect,
    }
}

const fn boolean(feature: ToggleFeature, effect: Effect) -> FeatureDescriptor {
    FeatureDescriptor {
        id: feature.id(),
        kind: FeatureKind::Boolean,
        range: None,
        effect,
    }
}

static DESCRIPTORS: [FeatureDescriptor; 19] = [
    numeric(NumericSetting::FontSize, Effect::Style("font-size")),
    numeric(NumericSetting::LineHeight, Effect::Style("line-height")),
    numeric(NumericSetting::LetterSpacing, Effect::Style("letter-spacing")),
    numeric(NumericSetting::ContentScale, Effect::Style("zoom")),
    numeric(NumericSetting::ColumnWidth, Effect::Style("max-width")),
    FeatureDescriptor {
        id: "text_align",
        kind: FeatureKind::ExclusiveGroup,
        range: None,
        effect: Effect::Style("text-align"),
    },
    boolean(
        ToggleFeature::ReadingMask,
        Effect::BodyClass("visor-reading-mask"),
    ),
    boolean(
        ToggleFeature::HighContrast,
        Effect::BodyClass("visor-high-contrast"),
    ),
    boolean(ToggleFeature::DarkMode, Effect::BodyClass("visor-dark-mode")),
    boolean(
        ToggleFeature::DyslexiaFont,
        Effect::BodyClass("visor-dyslexia-font"),
    ),
    boolean(
        ToggleFeature::HighlightLinks,
        Effect::BodyClass("visor-highlight-links"),
    ),
    boolean(
        ToggleFeature::HideImages,
        Effect::BodyClass("visor-hide-images"),
    ),
    boolean(
        ToggleFeature::HighlightHeadings,
        Effect::BodyClass("visor-highlight-headings"),
    ),
    boolean(
        ToggleFeature::TextMagnifier,
        Effect::BodyClass("visor-text-magnifier"),
    ),
    boolean(
        ToggleFeature::FocusOutline,
        Effect::BodyClass("visor-focus-outline"),
    ),
    boolean(
        ToggleFeature::ReduceMotion,
        Effect::BodyClass("visor-reduce-motion"),
    ),
    boolean(
        ToggleFeature::LargeCursor,
        Effect::BodyClass("visor-large-cursor"),
    ),
    boolean(
        ToggleFeature::StopAutoplay,
        Effect::BodyClass("visor-stop-autoplay"),
    ),
    boolean(ToggleFeature::InvertColors, Effect::RootClass(INVERT_ROOT_CLASS)),
];

/// Read-only access to the feature descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureCatalog;

impl FeatureCatalog {
    /// All descriptors, in catalog order.
    #[must_use]
    pub fn descriptors() -> &'static [FeatureDescriptor] {
        &DESCRIPTORS
    }

    /// Look up a descriptor by id.
    #[must_use]
    pub fn get(id: &str) -> Option<&'static FeatureDescriptor> {
        DESCRIPTORS.iter().find(|d| d.id == id)
    }

    /// The body class a boolean feature maps to, if it maps to one.
    #[must_use]
    pub fn body_class(feature: ToggleFeature) -> Option<&'static str> {
        match Self::get(feature.id())?.effect {
            Effect::BodyClass(class) => Some(class),
            Effect::RootClass(_) | Effect::Style(_) => None,
        }
    }

    /// Every body class the engine owns. The clear phase removes all of
    /// these unconditionally.
    pub fn body_classes() -> impl Iterator<Item = &'static str> {
        DESCRIPTORS.iter().filter_map(|d| match d.effect {
            Effect::BodyClass(class) => Some(class),
            _ => None,
        })
    }

    /// Every inline style property the engine owns.
    pub fn style_properties() -> impl Iterator<Item = &'static str> {
        DESCRIPTORS.iter().filter_map(|d| match d.effect {
            Effect::Style(prop) => Some(prop),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_toggle_has_a_descriptor() {
        for feature in ToggleFeature::ALL {
            let d = FeatureCatalog::get(feature.id())
                .unwrap_or_else(|| panic!("missing descriptor for {:?}", feature));
            assert_eq!(d.kind, FeatureKind::Boolean);
        }
    }

    #[test]
    fn every_numeric_has_a_range() {
        for setting in NumericSetting::ALL {
            let d = FeatureCatalog::get(setting.id()).unwrap();
            assert_eq!(d.kind, FeatureKind::Numeric);
            assert_eq!(d.range, Some(setting.range()));
        }
    }

    #[test]
    fn invert_is_the_only_root_class() {
        let root: Vec<_> = FeatureCatalog::descriptors()
            .iter()
            .filter(|d| matches!(d.effect, Effect::RootClass(_)))
            .collect();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].id, ToggleFeature::InvertColors.id());
    }

    #[test]
    fn body_classes_are_prefixed_and_unique() {
        let classes: Vec<_> = FeatureCatalog::body_classes().collect();
        for class in &classes {
            assert!(class.starts_with("visor-"), "unprefixed class {class}");
        }
        let mut deduped = classes.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), classes.len());
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<_> = FeatureCatalog::descriptors().iter().map(|d| d.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), FeatureCatalog::descriptors().len());
    }
}
