//! CAMA Viewer WASM front-end.
//!
//! Loads the viewer config named in the URL, decorates the page, and hands
//! the map to the SDK bridge. Filtering, navigation and basemap rules come
//! from `cv-viewer-core`; this crate only binds them to the DOM and the SDK.

pub mod api;
pub mod bridge;
pub mod combobox;
pub mod dom;
pub mod events;
pub mod page;
pub mod state;

use cv_map_client::MapService;
use cv_viewer_core::search::search_sources;
use cv_viewer_core::view_state::SIDEBAR_WIDTH_PX;
use cv_viewer_core::{FeatureLookup, NavigationOutcome, UrlParams, attach_all, navigate_to};
use state::Session;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

const VIEW_CONTAINER: &str = "viewDiv";
const LAYER_LIST_CONTAINER: &str = "layers-container";

/// WASM entry point, called when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    init().await
}

fn fatal(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

async fn init() -> Result<(), JsValue> {
    let search = dom::window().location().search().unwrap_or_default();
    let params = UrlParams::parse(&search);
    let config = api::load_config(params.config_path()).await;

    let els = dom::Elements::bind();
    page::apply_colors(&els, &config);
    let reset_icon = page::add_reset_icon(&els);
    let legend_icon = page::add_legend_icon(&els);

    let widgets = combobox::bind_comboboxes(&config);
    let filters = cv_viewer_core::build_filter_panel(&config, &widgets);
    let session = Session::new(config, filters);
    events::bind_events(&els, &session, reset_icon.as_ref(), legend_icon.as_ref());

    bridge::create_view(session.config.webmap_id(), VIEW_CONTAINER, SIDEBAR_WIDTH_PX)
        .await
        .map_err(fatal)?;

    if let Some(container) = page::add_search_container(&els) {
        bridge::sdk::create_search(&container);
    }
    events::watch_basemaps(&session);
    events::create_layer_list(&session, LAYER_LIST_CONTAINER);

    bridge::when_webmap().await.map_err(fatal)?;
    page::decorate_header(&els, &session.config);
    page::show_shell(&els);

    {
        let session = session.clone();
        spawn_local(async move {
            attach_all(&*session.map, &session.filters).await;
        });
    }

    let sources = search_sources(&session.config, &session.map.layers());
    match bridge::to_js(&sources) {
        Ok(sources) => bridge::sdk::set_search_sources(&sources),
        Err(err) => warn!("search sources: {err:#}"),
    }

    if let Some(lookup) = params.query {
        spawn_local(navigate(session, lookup));
    }

    info!("viewer ready");
    Ok(())
}

async fn navigate(session: Session, lookup: FeatureLookup) {
    let outcome = navigate_to(&*session.map, &session.config, &lookup).await;
    if outcome != NavigationOutcome::Navigated {
        warn!(layer = %lookup.layer, field = %lookup.field, "url query: {outcome:?}");
    }
}
