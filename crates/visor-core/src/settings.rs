#![forbid(unsafe_code)]

//! The canonical settings record and its mutation rules.
//!
//! [`Settings`] is a flat record whose keys are fixed by the feature catalog:
//! five numeric adjustments, one exclusive text-alignment group, thirteen
//! boolean flags, and a locale tag. The record is always complete and always
//! valid:
//!
//! 1. Every numeric field is clamped to its declared range on every write
//!    and again after deserialization.
//! 2. `text_align` is always one of its four variants.
//! 3. Missing fields in a persisted record fall back to per-field defaults,
//!    so partial or legacy records merge cleanly on load.
//!
//! Mutations go through [`Settings::apply_update`], which implements the
//! per-kind rules: clamp for numerics, invert for booleans, and the
//! select-again-to-deselect rule for the alignment group.

use serde::{Deserialize, Serialize};

/// Inclusive range for a numeric setting, with its neutral (no-effect) value
/// and the step used by increment/decrement controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericRange {
    pub min: i32,
    pub max: i32,
    /// Value at which the setting produces no DOM effect.
    pub neutral: i32,
    pub step: i32,
}

impl NumericRange {
    /// Clamp `value` into `[min, max]`.
    #[must_use]
    pub const fn clamp(&self, value: i32) -> i32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Whether `value` is the neutral (no-effect) value.
    #[must_use]
    pub const fn is_neutral(&self, value: i32) -> bool {
        value == self.neutral
    }
}

/// Exclusive text-alignment group. At most one non-default value is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Default,
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// CSS `text-align` value, or `None` for the default (host-controlled)
    /// alignment.
    #[must_use]
    pub const fn as_css(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Left => Some("left"),
            Self::Center => Some("center"),
            Self::Right => Some("right"),
        }
    }

    /// Parse a catalog id (`"left"`, `"center"`, `"right"`, `"default"`).
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "default" => Some(Self::Default),
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// The five numeric adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericSetting {
    /// Percent of host font size. Range 80–150, neutral 100.
    FontSize,
    /// Percent; written as a unitless multiplier. Range 100–200, neutral 100.
    LineHeight,
    /// Percent; written as `(v - 100) * 0.05` em. Range 100–150, neutral 100.
    LetterSpacing,
    /// Percent zoom of the page body. Range 80–130, neutral 100.
    ContentScale,
    /// Maximum text-column width in pixels. Range 400–1200, neutral 600.
    ColumnWidth,
}

impl NumericSetting {
    pub const ALL: [Self; 5] = [
        Self::FontSize,
        Self::LineHeight,
        Self::LetterSpacing,
        Self::ContentScale,
        Self::ColumnWidth,
    ];

    /// Declared range for this setting.
    #[must_use]
    pub const fn range(self) -> NumericRange {
        match self {
            Self::FontSize => NumericRange {
                min: 80,
                max: 150,
                neutral: 100,
                step: 1,
            },
            Self::LineHeight => NumericRange {
                min: 100,
                max: 200,
                neutral: 100,
                step: 1,
            },
            Self::LetterSpacing => NumericRange {
                min: 100,
                max: 150,
                neutral: 100,
                step: 1,
            },
            Self::ContentScale => NumericRange {
                min: 80,
                max: 130,
                neutral: 100,
                step: 1,
            },
            Self::ColumnWidth => NumericRange {
                min: 400,
                max: 1200,
                neutral: 600,
                step: 50,
            },
        }
    }

    /// Catalog id for this setting.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::FontSize => "font_size",
            Self::LineHeight => "line_height",
            Self::LetterSpacing => "letter_spacing",
            Self::ContentScale => "content_scale",
            Self::ColumnWidth => "column_width",
        }
    }

    /// Parse a catalog id.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }
}

/// The boolean feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleFeature {
    ReadingMask,
    HighContrast,
    DarkMode,
    DyslexiaFont,
    HighlightLinks,
    HideImages,
    HighlightHeadings,
    TextMagnifier,
    FocusOutline,
    ReduceMotion,
    LargeCursor,
    StopAutoplay,
    InvertColors,
}

impl ToggleFeature {
    pub const ALL: [Self; 13] = [
        Self::ReadingMask,
        Self::HighContrast,
        Self::DarkMode,
        Self::DyslexiaFont,
        Self::HighlightLinks,
        Self::HideImages,
        Self::HighlightHeadings,
        Self::TextMagnifier,
        Self::FocusOutline,
        Self::ReduceMotion,
        Self::LargeCursor,
        Self::StopAutoplay,
        Self::InvertColors,
    ];

    /// Catalog id for this flag.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::ReadingMask => "reading_mask",
            Self::HighContrast => "high_contrast",
            Self::DarkMode => "dark_mode",
            Self::DyslexiaFont => "dyslexia_font",
            Self::HighlightLinks => "highlight_links",
            Self::HideImages => "hide_images",
            Self::HighlightHeadings => "highlight_headings",
            Self::TextMagnifier => "text_magnifier",
            Self::FocusOutline => "focus_outline",
            Self::ReduceMotion => "reduce_motion",
            Self::LargeCursor => "large_cursor",
            Self::StopAutoplay => "stop_autoplay",
            Self::InvertColors => "invert_colors",
        }
    }

    /// Parse a catalog id.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.id() == id)
    }
}

/// A single mutation of the settings record.
///
/// Each variant carries the per-kind rule described in the module docs.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingUpdate {
    /// Set a numeric setting; the value is clamped to its declared range.
    Numeric(NumericSetting, i32),
    /// Select an alignment. Selecting the currently active value returns the
    /// group to [`TextAlign::Default`].
    Align(TextAlign),
    /// Invert a boolean flag.
    Toggle(ToggleFeature),
    /// Change the UI locale tag (normalized on write; no DOM effect).
    Language(String),
}

fn default_percent() -> i32 {
    100
}

fn default_column_width() -> i32 {
    600
}

fn default_language() -> String {
    "en".to_string()
}

/// The canonical user-preference record.
///
/// Serialized as a flat JSON object. Unknown fields in a persisted record are
/// ignored; missing fields take their defaults, so loading a record written
/// by an older build merges rather than fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(default = "default_percent")]
    pub font_size: i32,
    #[serde(default = "default_percent")]
    pub line_height: i32,
    #[serde(default = "default_percent")]
    pub letter_spacing: i32,
    #[serde(default = "default_percent")]
    pub content_scale: i32,
    #[serde(default = "default_column_width")]
    pub column_width: i32,
    pub text_align: TextAlign,
    #[serde(default = "default_language")]
    pub language: String,
    pub reading_mask: bool,
    pub high_contrast: bool,
    pub dark_mode: bool,
    pub dyslexia_font: bool,
    pub highlight_links: bool,
    pub hide_images: bool,
    pub highlight_headings: bool,
    pub text_magnifier: bool,
    pub focus_outline: bool,
    pub reduce_motion: bool,
    pub large_cursor: bool,
    pub stop_autoplay: bool,
    pub invert_colors: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_size: default_percent(),
            line_height: default_percent(),
            letter_spacing: default_percent(),
            content_scale: default_percent(),
            column_width: default_column_width(),
            text_align: TextAlign::Default,
            language: default_language(),
            reading_mask: false,
            high_contrast: false,
            dark_mode: false,
            dyslexia_font: false,
            highlight_links: false,
            hide_images: false,
            highlight_headings: false,
            text_magnifier: false,
            focus_outline: false,
            reduce_motion: false,
            large_cursor: false,
            stop_autoplay: false,
            invert_colors: false,
        }
    }
}

impl Settings {
    /// Read a numeric setting.
    #[must_use]
    pub const fn numeric(&self, setting: NumericSetting) -> i32 {
        match setting {
            NumericSetting::FontSize => self.font_size,
            NumericSetting::LineHeight => self.line_height,
            NumericSetting::LetterSpacing => self.letter_spacing,
            NumericSetting::ContentScale => self.content_scale,
            NumericSetting::ColumnWidth => self.column_width,
        }
    }

    fn numeric_mut(&mut self, setting: NumericSetting) -> &mut i32 {
        match setting {
            NumericSetting::FontSize => &mut self.font_size,
            NumericSetting::LineHeight => &mut self.line_height,
            NumericSetting::LetterSpacing => &mut self.letter_spacing,
            NumericSetting::ContentScale => &mut self.content_scale,
            NumericSetting::ColumnWidth => &mut self.column_width,
        }
    }

    /// Read a boolean flag.
    #[must_use]
    pub const fn flag(&self, feature: ToggleFeature) -> bool {
        match feature {
            ToggleFeature::ReadingMask => self.reading_mask,
            ToggleFeature::HighContrast => self.high_contrast,
            ToggleFeature::DarkMode => self.dark_mode,
            ToggleFeature::DyslexiaFont => self.dyslexia_font,
            ToggleFeature::HighlightLinks => self.highlight_links,
            ToggleFeature::HideImages => self.hide_images,
            ToggleFeature::HighlightHeadings => self.highlight_headings,
            ToggleFeature::TextMagnifier => self.text_magnifier,
            ToggleFeature::FocusOutline => self.focus_outline,
            ToggleFeature::ReduceMotion => self.reduce_motion,
            ToggleFeature::LargeCursor => self.large_cursor,
            ToggleFeature::StopAutoplay => self.stop_autoplay,
            ToggleFeature::InvertColors => self.invert_colors,
        }
    }

    fn flag_mut(&mut self, feature: ToggleFeature) -> &mut bool {
        match feature {
            ToggleFeature::ReadingMask => &mut self.reading_mask,
            ToggleFeature::HighContrast => &mut self.high_contrast,
            ToggleFeature::DarkMode => &mut self.dark_mode,
            ToggleFeature::DyslexiaFont => &mut self.dyslexia_font,
            ToggleFeature::HighlightLinks => &mut self.highlight_links,
            ToggleFeature::HideImages => &mut self.hide_images,
            ToggleFeature::HighlightHeadings => &mut self.highlight_headings,
            ToggleFeature::TextMagnifier => &mut self.text_magnifier,
            ToggleFeature::FocusOutline => &mut self.focus_outline,
            ToggleFeature::ReduceMotion => &mut self.reduce_motion,
            ToggleFeature::LargeCursor => &mut self.large_cursor,
            ToggleFeature::StopAutoplay => &mut self.stop_autoplay,
            ToggleFeature::InvertColors => &mut self.invert_colors,
        }
    }

    /// Apply one mutation in place, enforcing the per-kind rules.
    pub fn apply_update(&mut self, update: &SettingUpdate) {
        match update {
            SettingUpdate::Numeric(setting, raw) => {
                *self.numeric_mut(*setting) = setting.range().clamp(*raw);
            }
            SettingUpdate::Align(choice) => {
                self.text_align = if self.text_align == *choice {
                    TextAlign::Default
                } else {
                    *choice
                };
            }
            SettingUpdate::Toggle(feature) => {
                let slot = self.flag_mut(*feature);
                *slot = !*slot;
            }
            SettingUpdate::Language(tag) => {
                self.language = normalize_locale(tag);
            }
        }
    }

    /// Re-establish the record invariants after deserialization: clamp every
    /// numeric field and normalize the locale tag.
    pub fn validate(&mut self) {
        for setting in NumericSetting::ALL {
            let clamped = setting.range().clamp(self.numeric(setting));
            *self.numeric_mut(setting) = clamped;
        }
        self.language = normalize_locale(&self.language);
    }

    /// Whether any setting differs from its default.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Normalize a locale tag: trimmed, lowercased, `_` separators replaced with
/// `-`. Empty tags fall back to `"en"`.
#[must_use]
pub fn normalize_locale(tag: &str) -> String {
    let normalized: String = tag
        .trim()
        .chars()
        .map(|c| if c == '_' { '-' } else { c.to_ascii_lowercase() })
        .collect();
    if normalized.is_empty() {
        "en".to_string()
    } else {
        normalized
    }
}
