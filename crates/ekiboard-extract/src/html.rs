//! Small `scraper` helpers shared by the page extractors.

use scraper::{ElementRef, Selector};

use crate::error::{ExtractError, Result};

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ExtractError::Selector(format!("{css}: {e:?}")))
}

/// Concatenated text of an element with every text node trimmed.
pub(crate) fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

/// First descendant of `el` matching `sel`.
pub(crate) fn first<'a>(el: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    el.select(sel).next()
}

/// Direct element children of `el` that are `<div>`s carrying `class`.
pub(crate) fn child_divs_with_class<'a>(el: ElementRef<'a>, class: &str) -> Vec<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| c.value().name() == "div" && c.value().classes().any(|k| k == class))
        .collect()
}
