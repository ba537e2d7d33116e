//! Page decoration: config colors, header, icons, loader.

use crate::dom::{self, Elements};
use cv_api_types::ViewerConfig;
use tracing::warn;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlImageElement};

pub const SUBTITLE: &str = "CAMA Viewer";
pub const LOGO_ALT: &str = "QDS Logo";
pub const LOGO_SIZE_PX: u32 = 50;
pub const RESET_ICON_ID: &str = "resetFilters";
pub const SEARCH_CONTAINER_ID: &str = "search-widget-container";

/// Config colors. Runs before the map loads so the shell never flashes the
/// stylesheet defaults.
pub fn apply_colors(els: &Elements, config: &ViewerConfig) {
    if let Some(header) = &els.header_title {
        dom::set_style(header, "background-color", config.css_header_background.as_deref().unwrap_or_default());
    }
    if let Some(view) = dom::by_id("viewDiv") {
        dom::set_style(&view, "background-color", config.css_view_background.as_deref().unwrap_or_default());
    }
    for panel in &els.filter_panels {
        dom::set_style(panel, "background-color", config.css_layer_filter_color.as_deref().unwrap_or_default());
        dom::set_style(panel, "color", config.css_layer_filter_text_color.as_deref().unwrap_or_default());
    }
}

fn calcite_icon(icon: &str) -> Option<Element> {
    let el = dom::create_element("calcite-icon")?;
    dom::warn_on_err("icon attribute", el.set_attribute("icon", icon));
    dom::set_style(&el, "cursor", "pointer");
    Some(el)
}

fn append(parent: &Option<Element>, child: &Element, what: &str) -> bool {
    match parent {
        Some(parent) => dom::warn_on_err(what, parent.append_child(child)).is_some(),
        None => {
            warn!("no container for the {what}");
            false
        }
    }
}

/// The icon that clears every filter, placed in the filter panel.
pub fn add_reset_icon(els: &Elements) -> Option<Element> {
    let icon = calcite_icon("reset")?;
    icon.set_id(RESET_ICON_ID);
    dom::set_style(&icon, "margin-left", "200px");
    dom::set_style(&icon, "margin-top", "2px");
    append(&els.filter_div, &icon, "reset icon").then_some(icon)
}

/// The legend toggle, placed in the layer panel.
pub fn add_legend_icon(els: &Elements) -> Option<Element> {
    let icon = calcite_icon("legend")?;
    dom::warn_on_err("legend icon scale", icon.set_attribute("scale", "m"));
    dom::warn_on_err("legend icon theme", icon.set_attribute("theme", "dark"));
    dom::set_style(&icon, "margin-left", "170px");
    append(&els.layer_div, &icon, "legend icon").then_some(icon)
}

/// A slot for the search widget right after the header heading.
pub fn add_search_container(els: &Elements) -> Option<Element> {
    let header = els.header_title.as_ref()?;
    let container = dom::create_element("div")?;
    container.set_id(SEARCH_CONTAINER_ID);
    dom::set_style(&container, "border-radius", "25px");

    let anchor = header.query_selector("h2").ok().flatten().and_then(|h2| h2.next_sibling());
    dom::warn_on_err("search container", header.insert_before(&container, anchor.as_ref()))?;
    Some(container)
}

/// Title, subtitle and logo. Runs once the web map has loaded.
pub fn decorate_header(els: &Elements, config: &ViewerConfig) {
    let Some(header) = &els.header_title else {
        return;
    };

    let heading = match header.query_selector("h2").ok().flatten() {
        Some(h2) => Some(h2),
        None => dom::create_element("h2").and_then(|h2| header.append_child(&h2).ok().map(|_| h2)),
    };
    if let Some(heading) = &heading {
        heading.set_text_content(config.title.as_deref());
    }

    if let Some(subtitle) = dom::create_element("h6") {
        subtitle.set_id("cama-viewer");
        subtitle.set_text_content(Some(SUBTITLE));
        dom::set_style(&subtitle, "justify-content", "center");
        let before = dom::by_id(SEARCH_CONTAINER_ID);
        dom::warn_on_err("subtitle", header.insert_before(&subtitle, before.as_deref()));
    }

    let Some(image) = config.image.as_deref().filter(|image| !image.is_empty()) else {
        return;
    };
    let logo = dom::create_element("img").and_then(|el| el.dyn_into::<HtmlImageElement>().ok());
    if let Some(logo) = logo {
        logo.set_src(image);
        logo.set_alt(LOGO_ALT);
        logo.set_width(LOGO_SIZE_PX);
        logo.set_height(LOGO_SIZE_PX);
        dom::warn_on_err("logo", header.insert_before(&logo, heading.as_deref()));
    }
}

pub fn show_shell(els: &Elements) {
    if let Some(shell) = &els.shell {
        dom::set_hidden(shell, false);
    }
    if let Some(loader) = &els.loader {
        dom::set_hidden(loader, true);
    }
}
