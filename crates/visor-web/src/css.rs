#![forbid(unsafe_code)]

//! The static effect stylesheet.
//!
//! One rule block per owned body/root class. Panel chrome, icons, and fonts
//! are external concerns; this sheet only implements the visual effects the
//! engine toggles. It is injected once under [`EFFECT_STYLESHEET_ID`] when
//! the widget attaches and removed on teardown.
//!
//! Two structural notes:
//!
//! - Color inversion is an overlay, not a per-element filter: a fixed white
//!   layer composited with `mix-blend-mode: difference` inverts everything
//!   beneath it in one pass, and media elements opt back out so photos and
//!   video keep their true colors instead of being inverted twice.
//! - The reading mask and magnifier boxes are always present in the DOM;
//!   their visibility is gated on the corresponding body class so a single
//!   class toggle shows or hides them.

/// Id of the injected effect stylesheet element.
pub const EFFECT_STYLESHEET_ID: &str = "visor-effects";

/// Element id of the reading-mask band.
pub const READING_MASK_ID: &str = "visor-reading-mask";

/// Element id of the magnifier box.
pub const MAGNIFIER_ID: &str = "visor-magnifier";

/// Selector matching every element owned by this widget's own UI. The
/// magnifier must never magnify the widget itself, and mutations under
/// these elements never trigger re-applies.
pub const WIDGET_UI_SELECTOR: &str =
    "#visor-widget-root, #visor-reading-mask, #visor-magnifier";

/// The full effect stylesheet.
pub const EFFECT_CSS: &str = r#"
/* Readable font */
body.visor-dyslexia-font *:not([class*="fa"]) {
    font-family: 'Lexend', Arial, sans-serif !important;
}

/* Link underlining */
body.visor-highlight-links a {
    text-decoration: underline !important;
    text-decoration-thickness: 2px !important;
    text-underline-offset: 2px !important;
}

/* Image hiding */
body.visor-hide-images img {
    opacity: 0 !important;
    visibility: hidden !important;
}

/* Heading highlight */
body.visor-highlight-headings h1,
body.visor-highlight-headings h2,
body.visor-highlight-headings h3,
body.visor-highlight-headings h4,
body.visor-highlight-headings h5,
body.visor-highlight-headings h6 {
    position: relative !important;
    padding-left: 20px !important;
}

body.visor-highlight-headings h1::before,
body.visor-highlight-headings h2::before,
body.visor-highlight-headings h3::before,
body.visor-highlight-headings h4::before,
body.visor-highlight-headings h5::before,
body.visor-highlight-headings h6::before {
    content: '' !important;
    position: absolute !important;
    left: 0 !important;
    top: 0 !important;
    bottom: 0 !important;
    width: 4px !important;
    background: #2563eb !important;
}

/* High contrast */
body.visor-high-contrast {
    background: #000 !important;
    color: #fff !important;
}

body.visor-high-contrast * {
    background-color: #000 !important;
    color: #fff !important;
    border-color: #fff !important;
}

body.visor-high-contrast a {
    color: #ffff00 !important;
}

body.visor-high-contrast button {
    background: #fff !important;
    color: #000 !important;
}

/* Dark mode */
body.visor-dark-mode {
    background: #1a1a1a !important;
    color: #e0e0e0 !important;
}

body.visor-dark-mode * {
    background-color: #1a1a1a !important;
    color: #e0e0e0 !important;
    border-color: #444 !important;
}

body.visor-dark-mode a {
    color: #66b3ff !important;
}

/* Focus outline */
body.visor-focus-outline *:focus {
    outline: 6px solid #ff0000 !important;
    outline-offset: 6px !important;
}

/* Reduced motion */
body.visor-reduce-motion * {
    animation: none !important;
    transition: none !important;
}

/* Large cursor */
body.visor-large-cursor * {
    cursor: url('data:image/svg+xml;utf8,<svg xmlns="http://www.w3.org/2000/svg" width="48" height="48" viewBox="0 0 48 48"><path fill="black" stroke="white" stroke-width="2" d="M8 8 L28 20 L20 24 L24 36 L20 38 L16 26 L8 30 Z"/></svg>') 0 0, auto !important;
}

/* Color inversion: one overlay, media excluded */
html.visor-invert::before {
    content: "";
    position: fixed;
    inset: 0;
    background: #fff;
    mix-blend-mode: difference;
    pointer-events: none;
    z-index: 2147483647;
}

html.visor-invert img,
html.visor-invert video {
    mix-blend-mode: normal;
}

/* Reading mask */
#visor-reading-mask {
    position: fixed;
    left: 0;
    right: 0;
    height: 120px;
    pointer-events: none;
    z-index: 999998;
    display: none;
}

#visor-reading-mask::before,
#visor-reading-mask::after {
    content: '';
    position: absolute;
    left: 0;
    right: 0;
    background: rgba(0, 0, 0, 0.3);
}

#visor-reading-mask::before {
    top: -100vh;
    height: 100vh;
}

#visor-reading-mask::after {
    bottom: -100vh;
    height: 100vh;
}

body.visor-reading-mask #visor-reading-mask {
    display: block;
}

/* Magnifier box */
#visor-magnifier {
    position: fixed;
    width: 400px;
    max-width: 90vw;
    padding: 20px;
    background: rgba(255, 255, 255, 0.98);
    border: 2px solid #2563eb;
    border-radius: 8px;
    box-shadow: 0 8px 32px rgba(0, 0, 0, 0.2);
    pointer-events: none;
    z-index: 999997;
    display: none;
    font-size: 150%;
    line-height: 1.6;
    word-wrap: break-word;
    color: #000;
}

body.visor-text-magnifier #visor-magnifier {
    display: block;
}
"#;
