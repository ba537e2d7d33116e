//! DOM element bindings.
//!
//! Everything the viewer touches on the page is resolved once at startup. A
//! missing element is logged and left as `None`; the features that need it are
//! skipped rather than failing the whole page.

use std::fmt::Debug;
use tracing::warn;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement};

// ── Helpers ──

pub fn document() -> Document {
    gloo_utils::document()
}

pub fn window() -> web_sys::Window {
    gloo_utils::window()
}

pub fn by_id(id: &str) -> Option<Element> {
    document().get_element_by_id(id)
}

pub fn query(selector: &str) -> Option<Element> {
    document().query_selector(selector).ok()?
}

pub fn query_all(selector: &str) -> Vec<Element> {
    let Ok(nodes) = document().query_selector_all(selector) else {
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

/// Query all matching elements within a parent element.
pub fn query_all_within(parent: &Element, selector: &str) -> Vec<Element> {
    let Ok(nodes) = parent.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

pub fn create_element(tag: &str) -> Option<Element> {
    document().create_element(tag).ok()
}

/// Log a failed DOM call and hand back its value when there is one.
pub fn warn_on_err<T, E: Debug>(op: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("{op}: {err:?}");
            None
        }
    }
}

pub fn add_class(el: &Element, cls: &str) {
    warn_on_err("add class", el.class_list().add_1(cls));
}

pub fn remove_class(el: &Element, cls: &str) {
    warn_on_err("remove class", el.class_list().remove_1(cls));
}

pub fn toggle_class(el: &Element, cls: &str) -> bool {
    el.class_list().toggle(cls).unwrap_or(false)
}

/// Inline style on any element that is an `HtmlElement`. Empty values are
/// skipped so unset config colors leave the stylesheet in charge.
pub fn set_style(el: &Element, property: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    if let Some(html) = el.dyn_ref::<HtmlElement>() {
        warn_on_err(property, html.style().set_property(property, value));
    }
}

pub fn set_hidden(el: &Element, hidden: bool) {
    if let Some(html) = el.dyn_ref::<HtmlElement>() {
        html.set_hidden(hidden);
    }
}

// ── Elements struct ──

/// Page elements used by the viewer. Clone-friendly; the inner handles are
/// references into the JS heap.
#[derive(Clone)]
pub struct Elements {
    // Header
    pub header_title: Option<Element>,

    // Sidebar
    pub sidebar: Option<Element>,
    pub panel_content: Option<Element>,
    pub toggle_panel_btn: Option<Element>,
    pub filter_div: Option<Element>,
    pub layer_div: Option<Element>,
    pub filter_panels: Vec<Element>,

    // Map tools
    pub topbar: Option<Element>,
    pub distance_button: Option<Element>,
    pub area_button: Option<Element>,

    // Shell
    pub shell: Option<Element>,
    pub loader: Option<Element>,
}

macro_rules! find_el {
    ($id:expr) => {{
        let el = by_id($id);
        if el.is_none() {
            warn!("missing element #{}", $id);
        }
        el
    }};
}

macro_rules! find_query {
    ($selector:expr) => {{
        let el = query($selector);
        if el.is_none() {
            warn!("missing element {}", $selector);
        }
        el
    }};
}

impl Elements {
    pub fn bind() -> Self {
        Self {
            header_title: find_el!("header-title"),

            sidebar: find_el!("sidebar"),
            panel_content: find_el!("panel-content"),
            toggle_panel_btn: find_el!("toggle-panel-btn"),
            filter_div: find_el!("filterDiv"),
            layer_div: find_el!("layerDiv"),
            filter_panels: query_all(".layerDiv1"),

            topbar: find_el!("topbar"),
            distance_button: find_el!("distanceButton"),
            area_button: find_el!("areaButton"),

            shell: find_query!("calcite-shell"),
            loader: find_query!("calcite-loader"),
        }
    }

    /// The button element for a measurement tool, by its id.
    pub fn measurement_button(&self, id: &str) -> Option<&Element> {
        [&self.distance_button, &self.area_button]
            .into_iter()
            .flatten()
            .find(|el| el.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warn_on_err_keeps_the_value_and_drops_the_error() {
        assert_eq!(warn_on_err::<_, String>("set attribute", Ok(7)), Some(7));
        assert_eq!(warn_on_err::<u8, _>("insert before", Err("NotFoundError".to_owned())), None);
    }
}
