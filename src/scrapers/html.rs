//! Small selector helpers shared by the extractors.
//!
//! All cascades in this crate are plain slices of CSS selectors tried in
//! order; these helpers implement "first non-empty match wins" over such a
//! slice.

use scraper::{ElementRef, Html, Node, Selector};

/// Parse `css`, ignoring selectors the engine does not understand.
pub fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Concatenated text of `element` with whitespace runs collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first element matched by any selector in `selectors` whose
/// text is non-empty. Selectors are tried in order; within a selector,
/// matches are scanned in document order and empty ones are skipped.
pub fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let sel = selector(css)?;
        document
            .select(&sel)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

/// Non-empty `content` of the first `<meta>` matching one of the
/// `(attribute, value)` pairs, e.g. `("property", "og:title")`. Same rule
/// as [`first_text`]: pairs in order, empty matches skipped.
pub fn meta_content(document: &Html, attrs: &[(&str, &str)]) -> Option<String> {
    attrs.iter().find_map(|(attr, value)| {
        let sel = selector(&format!(r#"meta[{attr}="{value}"]"#))?;
        document
            .select(&sel)
            .filter_map(|meta| meta.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_string)
    })
}

/// Visible page text: every text node outside `<script>`, `<style>`,
/// `<noscript>` and `<template>`, whitespace-collapsed.
pub fn visible_text(document: &Html) -> String {
    let mut parts = Vec::new();
    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(|a| a.value().as_element())
            .any(|e| matches!(e.name(), "script" | "style" | "noscript" | "template"));
        if !hidden {
            parts.push(&**text);
        }
    }
    collapse_whitespace(&parts.join(" "))
}
