#![forbid(unsafe_code)]

//! The idempotent settings → DOM translation.
//!
//! [`ApplyEngine::apply`] is a total function of (settings, document): it
//! first removes every effect it owns, then re-derives the full effect set
//! from the current settings against the *current* content-element set.
//! Because the clear phase runs unconditionally, two consecutive passes with
//! unchanged settings leave the document in the identical state as one pass,
//! which is what lets the change watcher re-run it at arbitrary frequency.
//!
//! # Decision Rule
//!
//! 1. Clear owned body classes, the root inversion class, owned inline
//!    styles on root/body/targets, and the dynamic stylesheet.
//! 2. Re-query the content-element set from the configured selectors.
//! 3. For each non-neutral numeric setting, write its CSS property with
//!    important precedence; a non-neutral font size also materializes the
//!    dynamic stylesheet so elements inserted before the next pass inherit
//!    the size.
//! 4. Non-default alignment writes `text-align` on every target.
//! 5. Each true boolean flag adds its body class; `stop_autoplay` also
//!    pauses and strips every currently-present autoplay media element.
//! 6. Color inversion toggles the root class (the overlay itself lives in
//!    the static effect stylesheet).
//!
//! Nothing here returns `Result`: stale nodes are skipped at the
//! [`DomSurface`] boundary and a partially failed pass is repaired by the
//! next one.

use crate::catalog::{FeatureCatalog, INVERT_ROOT_CLASS};
use crate::dom::{ContentSelectors, DomSurface};
use crate::settings::{NumericSetting, Settings, ToggleFeature};

/// Id of the managed stylesheet that propagates font size to late-inserted
/// content.
pub const DYNAMIC_FONTSIZE_STYLESHEET: &str = "visor-dynamic-fontsize";

/// Translates a settings snapshot into DOM effects. Stateless between
/// passes; owns only the selector configuration.
#[derive(Debug, Clone)]
pub struct ApplyEngine {
    selectors: ContentSelectors,
}

impl ApplyEngine {
    #[must_use]
    pub fn new(selectors: ContentSelectors) -> Self {
        Self { selectors }
    }

    #[must_use]
    pub fn selectors(&self) -> &ContentSelectors {
        &self.selectors
    }

    /// Run one full apply pass. Safe at arbitrary frequency; never panics.
    pub fn apply<D: DomSurface>(&self, settings: &Settings, dom: &mut D) {
        self.clear(dom);

        let targets = dom.query_content(&self.selectors);
        let root = dom.root();
        let body = dom.body();

        // Numeric effects.
        let font_size = settings.font_size;
        if !NumericSetting::FontSize.range().is_neutral(font_size) {
            let value = format!("{font_size}%");
            dom.set_style_important(&root, "font-size", &value);
            dom.set_style_important(&body, "font-size", &value);
            for target in &targets {
                dom.set_style_important(target, "font-size", &value);
            }
            dom.put_stylesheet(
                DYNAMIC_FONTSIZE_STYLESHEET,
                &dynamic_fontsize_css(&self.selectors, font_size),
            );
        }

        let line_height = settings.line_height;
        if !NumericSetting::LineHeight.range().is_neutral(line_height) {
            let value = format!("{}", f64::from(line_height) / 100.0);
            dom.set_style_important(&body, "line-height", &value);
            for target in &targets {
                dom.set_style_important(target, "line-height", &value);
            }
        }

        let letter_spacing = settings.letter_spacing;
        if !NumericSetting::LetterSpacing
            .range()
            .is_neutral(letter_spacing)
        {
            // Each percent step above neutral widens spacing by 0.05em.
            let value = format!("{}em", f64::from(letter_spacing - 100) * 5.0 / 100.0);
            dom.set_style_important(&body, "letter-spacing", &value);
            for target in &targets {
                dom.set_style_important(target, "letter-spacing", &value);
            }
        }

        let content_scale = settings.content_scale;
        if !NumericSetting::ContentScale.range().is_neutral(content_scale) {
            dom.set_style_important(&body, "zoom", &format!("{content_scale}%"));
        }

        let column_width = settings.column_width;
        if !NumericSetting::ColumnWidth.range().is_neutral(column_width) {
            let value = format!("{column_width}px");
            for target in &targets {
                dom.set_style_important(target, "max-width", &value);
            }
        }

        // Exclusive alignment.
        if let Some(align) = settings.text_align.as_css() {
            for target in &targets {
                dom.set_style_important(target, "text-align", align);
            }
        }

        // Boolean effects.
        for feature in ToggleFeature::ALL {
            if !settings.flag(feature) {
                continue;
            }
            if let Some(class) = FeatureCatalog::body_class(feature) {
                dom.add_class(&body, class);
            }
        }
        if settings.stop_autoplay {
            // One-shot: media inserted after this pass is only neutralized
            // on the next one.
            let neutralized = dom.neutralize_autoplay_media();
            if neutralized > 0 {
                tracing::debug!(neutralized, "paused autoplay media");
            }
        }

        // Color inversion lives on the root element.
        if settings.invert_colors {
            dom.add_class(&root, INVERT_ROOT_CLASS);
        }

        tracing::debug!(targets = targets.len(), "apply pass complete");
    }

    /// Remove every effect this engine owns. Running this alone returns the
    /// document to its unmodified state; `apply` runs it first to stay
    /// idempotent regardless of prior state.
    pub fn clear<D: DomSurface>(&self, dom: &mut D) {
        let root = dom.root();
        let body = dom.body();

        for class in FeatureCatalog::body_classes() {
            dom.remove_class(&body, class);
        }
        dom.remove_class(&root, INVERT_ROOT_CLASS);

        for property in FeatureCatalog::style_properties() {
            dom.clear_style(&root, property);
            dom.clear_style(&body, property);
        }

        let targets = dom.query_content(&self.selectors);
        for target in &targets {
            for property in FeatureCatalog::style_properties() {
                dom.clear_style(target, property);
            }
        }

        dom.remove_stylesheet(DYNAMIC_FONTSIZE_STYLESHEET);
    }
}

/// Stylesheet that keeps a non-neutral font size applied to content inserted
/// between apply passes. Covers both the selectors themselves and their
/// descendants.
fn dynamic_fontsize_css(selectors: &ContentSelectors, font_size: i32) -> String {
    format!(
        "{list} {{ font-size: {font_size}% !important; }}\n\
         {descendants} {{ font-size: {font_size}% !important; }}\n",
        list = selectors.css_list(),
        descendants = selectors.descendant_css_list(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::FakeDom;
    use crate::settings::{SettingUpdate, TextAlign};
    use pretty_assertions::assert_eq;

    fn engine() -> ApplyEngine {
        ApplyEngine::new(ContentSelectors::default())
    }

    fn dom_with_targets(count: usize) -> (FakeDom, Vec<crate::dom::NodeId>) {
        let mut dom = FakeDom::new();
        let body = dom.body_id();
        let targets = (0..count).map(|_| dom.content_element("p", body)).collect();
        (dom, targets)
    }

    #[test]
    fn defaults_produce_no_effects() {
        let (mut dom, _) = dom_with_targets(3);
        engine().apply(&Settings::default(), &mut dom);
        assert!(dom.body_classes().is_empty());
        assert_eq!(dom.effect_snapshot(), FakeDom::new().effect_snapshot());
    }

    #[test]
    fn apply_twice_equals_apply_once() {
        let (mut dom, _) = dom_with_targets(4);
        let mut settings = Settings::default();
        settings.apply_update(&SettingUpdate::Numeric(NumericSetting::FontSize, 130));
        settings.apply_update(&SettingUpdate::Toggle(ToggleFeature::HighContrast));
        settings.apply_update(&SettingUpdate::Align(TextAlign::Center));

        let engine = engine();
        engine.apply(&settings, &mut dom);
        let once = dom.effect_snapshot();
        engine.apply(&settings, &mut dom);
        assert_eq!(dom.effect_snapshot(), once);
    }

    #[test]
    fn font_size_hits_root_body_targets_and_stylesheet() {
        let (mut dom, targets) = dom_with_targets(2);
        let mut settings = Settings::default();
        settings.font_size = 150;
        engine().apply(&settings, &mut dom);

        assert_eq!(dom.style(dom.root_id(), "font-size"), Some("150%"));
        assert_eq!(dom.style(dom.body_id(), "font-size"), Some("150%"));
        for target in &targets {
            assert_eq!(dom.style(*target, "font-size"), Some("150%"));
        }
        let css = dom.stylesheet(DYNAMIC_FONTSIZE_STYLESHEET).unwrap();
        assert!(css.contains("font-size: 150% !important"));
        assert!(css.contains("p *"));
    }

    #[test]
    fn returning_to_neutral_removes_numeric_effects() {
        let (mut dom, targets) = dom_with_targets(1);
        let mut settings = Settings::default();
        settings.font_size = 150;
        let engine = engine();
        engine.apply(&settings, &mut dom);

        settings.font_size = 100;
        engine.apply(&settings, &mut dom);
        assert!(dom.style(dom.root_id(), "font-size").is_none());
        assert!(dom.style(targets[0], "font-size").is_none());
        assert!(dom.stylesheet(DYNAMIC_FONTSIZE_STYLESHEET).is_none());
    }

    #[test]
    fn line_height_and_letter_spacing_values() {
        let (mut dom, targets) = dom_with_targets(1);
        let mut settings = Settings::default();
        settings.line_height = 150;
        settings.letter_spacing = 150;
        engine().apply(&settings, &mut dom);

        assert_eq!(dom.style(dom.body_id(), "line-height"), Some("1.5"));
        assert_eq!(dom.style(targets[0], "letter-spacing"), Some("2.5em"));
    }

    #[test]
    fn content_scale_zooms_body_only() {
        let (mut dom, targets) = dom_with_targets(1);
        let mut settings = Settings::default();
        settings.content_scale = 120;
        engine().apply(&settings, &mut dom);
        assert_eq!(dom.style(dom.body_id(), "zoom"), Some("120%"));
        assert!(dom.style(targets[0], "zoom").is_none());
    }

    #[test]
    fn column_width_caps_targets() {
        let (mut dom, targets) = dom_with_targets(2);
        let mut settings = Settings::default();
        settings.column_width = 800;
        engine().apply(&settings, &mut dom);
        for target in &targets {
            assert_eq!(dom.style(*target, "max-width"), Some("800px"));
        }
        assert!(dom.style(dom.body_id(), "max-width").is_none());
    }

    #[test]
    fn alignment_is_applied_and_cleared() {
        let (mut dom, targets) = dom_with_targets(1);
        let mut settings = Settings::default();
        settings.text_align = TextAlign::Right;
        let engine = engine();
        engine.apply(&settings, &mut dom);
        assert_eq!(dom.style(targets[0], "text-align"), Some("right"));

        settings.text_align = TextAlign::Default;
        engine.apply(&settings, &mut dom);
        assert!(dom.style(targets[0], "text-align").is_none());
    }

    #[test]
    fn single_flag_adds_single_class() {
        let (mut dom, _) = dom_with_targets(1);
        let mut settings = Settings::default();
        settings.high_contrast = true;
        engine().apply(&settings, &mut dom);
        assert_eq!(dom.body_classes(), vec!["visor-high-contrast".to_string()]);
    }

    #[test]
    fn invert_toggles_root_class() {
        let (mut dom, _) = dom_with_targets(0);
        let mut settings = Settings::default();
        settings.invert_colors = true;
        let engine = engine();
        engine.apply(&settings, &mut dom);
        assert!(dom.has_class(dom.root_id(), INVERT_ROOT_CLASS));
        assert!(dom.body_classes().is_empty());

        settings.invert_colors = false;
        engine.apply(&settings, &mut dom);
        assert!(!dom.has_class(dom.root_id(), INVERT_ROOT_CLASS));
    }

    #[test]
    fn stop_autoplay_neutralizes_present_media_once() {
        let mut dom = FakeDom::new();
        let body = dom.body_id();
        let video = dom.autoplay_media("video", body);
        let mut settings = Settings::default();
        settings.stop_autoplay = true;

        let engine = engine();
        engine.apply(&settings, &mut dom);
        assert!(!dom.is_autoplay(video));
        assert!(dom
            .body_classes()
            .contains(&"visor-stop-autoplay".to_string()));

        // Media inserted after the pass is untouched until the next pass.
        let late = dom.autoplay_media("audio", body);
        assert!(dom.is_autoplay(late));
        engine.apply(&settings, &mut dom);
        assert!(!dom.is_autoplay(late));
    }

    #[test]
    fn clear_alone_restores_pristine_document() {
        let (mut dom, _) = dom_with_targets(3);
        let mut settings = Settings::default();
        settings.font_size = 120;
        settings.dark_mode = true;
        settings.invert_colors = true;
        let engine = engine();
        engine.apply(&settings, &mut dom);
        engine.clear(&mut dom);

        let pristine = {
            let (mut fresh, _) = dom_with_targets(3);
            fresh.effect_snapshot()
        };
        assert_eq!(dom.effect_snapshot(), pristine);
    }
}
