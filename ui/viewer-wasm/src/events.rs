//! Event binding.
//!
//! Wires page and SDK callbacks to the session. Closures are leaked with
//! `forget()`; they live as long as the page.

use crate::bridge::{self, sdk};
use crate::dom::{self, Elements};
use crate::state::Session;
use cv_api_types::LayerRole;
use cv_viewer_core::basemap::{BaseLayerVisibility, ParcelStyle, SimpleRenderer};
use cv_viewer_core::layer_list::{LABEL_OPACITY, LAYER_OPACITY, ListItemTreatment, SettingsPanel};
use cv_viewer_core::view_state::MeasurementTool;
use serde::Serialize;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Element;

/// Helper: attach a sync click handler.
macro_rules! on_click {
    ($el:expr, $cb:expr) => {{
        let cb = Closure::wrap(Box::new($cb) as Box<dyn FnMut(web_sys::MouseEvent)>);
        if let Err(err) = $el.add_event_listener_with_callback("click", cb.as_ref().unchecked_ref()) {
            warn!("bind click: {err:?}");
        }
        cb.forget();
    }};
}

/// Page controls: reset, sidebar, legend, measurement.
pub fn bind_events(els: &Elements, session: &Session, reset_icon: Option<&Element>, legend_icon: Option<&Element>) {
    // ── Filters ──
    if let Some(reset) = reset_icon {
        let session = session.clone();
        on_click!(reset, move |_: web_sys::MouseEvent| {
            session.filters.reset_all();
        });
    }

    // ── Sidebar ──
    if let Some(toggle) = &els.toggle_panel_btn {
        let els2 = els.clone();
        let session = session.clone();
        let btn = toggle.clone();
        on_click!(toggle, move |_: web_sys::MouseEvent| {
            dom::toggle_class(&btn, "rotated");
            if let Some(content) = &els2.panel_content {
                dom::toggle_class(content, "collapsed");
            }
            let layout = session.view.borrow_mut().toggle_sidebar();
            if let Some(sidebar) = &els2.sidebar {
                dom::set_style(sidebar, "width", &format!("{}px", layout.width_px));
            }
            sdk::set_view_padding(layout.view_padding_left);
        });
    }

    // ── Legend ──
    if let Some(legend) = legend_icon {
        let session = session.clone();
        on_click!(legend, move |_: web_sys::MouseEvent| {
            let visible = session.view.borrow_mut().toggle_legend();
            sdk::show_legend(visible);
        });
    }

    // ── Measurement ──
    for (tool, button) in [
        (MeasurementTool::Distance, &els.distance_button),
        (MeasurementTool::Area, &els.area_button),
    ] {
        let Some(button) = button else {
            continue;
        };
        let els2 = els.clone();
        let session = session.clone();
        on_click!(button, move |_: web_sys::MouseEvent| {
            let change = session.view.borrow_mut().toggle_measurement(tool);
            if change.removed.is_some() {
                sdk::stop_measurement();
            }
            for active in dom::query_all(".active") {
                dom::remove_class(&active, "active");
            }
            if let Some(tool) = change.activated {
                sdk::start_measurement(tool_name(tool), tool.unit());
                if let Some(button) = els2.measurement_button(tool.button_id()) {
                    dom::add_class(button, "active");
                }
            }
        });
    }
}

fn tool_name(tool: MeasurementTool) -> &'static str {
    match tool {
        MeasurementTool::Distance => "distance",
        MeasurementTool::Area => "area",
    }
}

// ── Basemap ──

/// Apply exclusivity and the parcel style for one observation of the base
/// layers.
pub fn reconcile_basemaps(session: &Session, layers: &[BaseLayerVisibility]) {
    let update = session.basemaps.borrow_mut().reconcile(layers);
    for title in &update.hide {
        debug!(layer = %title, "hiding base layer");
        sdk::set_base_layer_visible(title, false);
    }

    let Some(parcels) = session.config.role_title(&LayerRole::parcels()) else {
        return;
    };
    let renderer = match update.parcel_style {
        ParcelStyle::OrthoHighlight => match bridge::to_js(&SimpleRenderer::ortho_highlight()) {
            Ok(renderer) => renderer,
            Err(err) => {
                warn!("parcel renderer: {err:#}");
                return;
            }
        },
        ParcelStyle::Original => JsValue::NULL,
    };
    sdk::set_layer_renderer(parcels, &renderer);
}

pub fn watch_basemaps(session: &Session) {
    reconcile_basemaps(session, &bridge::base_layers_from(sdk::base_layers()));

    let session = session.clone();
    let cb = Closure::wrap(Box::new(move |layers: JsValue| {
        reconcile_basemaps(&session, &bridge::base_layers_from(layers));
    }) as Box<dyn FnMut(JsValue)>);
    sdk::watch_base_layers(cb.as_ref().unchecked_ref());
    cb.forget();
}

// ── Layer list ──

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum ItemTreatment<'a> {
    Hidden,
    Plain,
    Settings { panel: &'a SettingsPanel },
}

pub fn create_layer_list(session: &Session, container: &str) {
    let policy = session.layer_list.clone();
    let treatment = Closure::wrap(Box::new(move |title: String, child_count: u32| -> JsValue {
        let treatment = policy.treatment(&title, child_count as usize);
        let shape = match &treatment {
            ListItemTreatment::Hidden => ItemTreatment::Hidden,
            ListItemTreatment::Plain => ItemTreatment::Plain,
            ListItemTreatment::WithSettings(panel) => ItemTreatment::Settings { panel },
        };
        bridge::to_js(&shape).unwrap_or_else(|err| {
            warn!(layer = %title, "layer list item: {err:#}");
            JsValue::NULL
        })
    }) as Box<dyn FnMut(String, u32) -> JsValue>);

    let on_slider = Closure::wrap(Box::new(move |layer_id: String, slider: String, raw: f64| {
        match slider.as_str() {
            "layerOpacity" => sdk::set_layer_opacity(&layer_id, LAYER_OPACITY.quantize(raw)),
            "labelOpacity" => sdk::set_label_opacity(&layer_id, LABEL_OPACITY.quantize(raw)),
            other => warn!("unknown slider {other}"),
        }
    }) as Box<dyn FnMut(String, String, f64)>);

    sdk::create_layer_list(container, treatment.as_ref().unchecked_ref(), on_slider.as_ref().unchecked_ref());
    treatment.forget();
    on_slider.forget();
}
