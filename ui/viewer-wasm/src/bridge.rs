//! Bindings to the mapping SDK.
//!
//! The SDK is driven through a thin JS shim (`static/viewer-bridge.js`) that
//! exposes `window.cvBridge`. The shim holds the SDK objects; everything that
//! decides what to do with them lives on the Rust side.

use anyhow::anyhow;
use async_trait::async_trait;
use cv_api_types::Feature;
use cv_filter::Predicate;
use cv_map_client::{DistinctValuesQuery, FeatureLayerSpec, LayerHandle, LayerView, MapService};
use cv_viewer_core::basemap::BaseLayerVisibility;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

pub mod sdk {
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = cvBridge, js_name = createView, catch)]
        pub fn create_view(webmap_id: &str, container: &str, padding_left: u32) -> Result<js_sys::Promise, JsValue>;

        #[wasm_bindgen(js_namespace = cvBridge, js_name = whenWebMap, catch)]
        pub fn when_webmap() -> Result<js_sys::Promise, JsValue>;

        #[wasm_bindgen(js_namespace = cvBridge, js_name = addFeatureLayer, catch)]
        pub fn add_feature_layer(spec: &JsValue) -> Result<js_sys::Promise, JsValue>;

        #[wasm_bindgen(js_namespace = cvBridge, js_name = whenLayerView, catch)]
        pub fn when_layer_view(layer_id: &str) -> Result<js_sys::Promise, JsValue>;

        #[wasm_bindgen(js_namespace = cvBridge, js_name = setLayerFilter)]
        pub fn set_layer_filter(layer_id: &str, where_clause: &str);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = queryDistinct, catch)]
        pub fn query_distinct(layer_id: &str, query: &JsValue) -> Result<js_sys::Promise, JsValue>;

        #[wasm_bindgen(js_namespace = cvBridge, js_name = queryFeatures, catch)]
        pub fn query_features(layer_id: &str, where_clause: &str) -> Result<js_sys::Promise, JsValue>;

        #[wasm_bindgen(js_namespace = cvBridge, js_name = goTo, catch)]
        pub fn go_to(feature: &JsValue) -> Result<js_sys::Promise, JsValue>;

        #[wasm_bindgen(js_namespace = cvBridge, js_name = allLayers)]
        pub fn all_layers() -> JsValue;

        #[wasm_bindgen(js_namespace = cvBridge, js_name = baseLayers)]
        pub fn base_layers() -> JsValue;

        #[wasm_bindgen(js_namespace = cvBridge, js_name = watchBaseLayers)]
        pub fn watch_base_layers(callback: &js_sys::Function);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = setBaseLayerVisible)]
        pub fn set_base_layer_visible(title: &str, visible: bool);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = setLayerRenderer)]
        pub fn set_layer_renderer(title: &str, renderer: &JsValue);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = createLayerList)]
        pub fn create_layer_list(container: &str, treatment: &js_sys::Function, on_slider: &js_sys::Function);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = setLayerOpacity)]
        pub fn set_layer_opacity(layer_id: &str, value: f64);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = setLabelOpacity)]
        pub fn set_label_opacity(layer_id: &str, value: f64);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = createSearch)]
        pub fn create_search(container: &web_sys::Element);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = setSearchSources)]
        pub fn set_search_sources(sources: &JsValue);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = showLegend)]
        pub fn show_legend(visible: bool);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = setViewPadding)]
        pub fn set_view_padding(left: u32);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = startMeasurement)]
        pub fn start_measurement(tool: &str, unit: &str);

        #[wasm_bindgen(js_namespace = cvBridge, js_name = stopMeasurement)]
        pub fn stop_measurement();
    }
}

// ── Conversions ──

fn describe(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            js_sys::Reflect::get(err, &JsValue::from_str("message"))
                .ok()
                .and_then(|message| message.as_string())
        })
        .unwrap_or_else(|| format!("{err:?}"))
}

pub fn js_error(call: &str, err: JsValue) -> anyhow::Error {
    anyhow!("{call}: {}", describe(&err))
}

/// Plain JS objects, not `Map`s, so the SDK accepts them as property bags.
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| anyhow!("serialize: {err}"))
}

pub fn from_js<T: DeserializeOwned>(value: JsValue) -> anyhow::Result<T> {
    serde_wasm_bindgen::from_value(value).map_err(|err| anyhow!("deserialize: {err}"))
}

async fn settle(call: &str, promise: Result<js_sys::Promise, JsValue>) -> anyhow::Result<JsValue> {
    let promise = promise.map_err(|err| js_error(call, err))?;
    JsFuture::from(promise).await.map_err(|err| js_error(call, err))
}

// ── View ──

pub async fn create_view(webmap_id: &str, container: &str, padding_left: u32) -> anyhow::Result<()> {
    settle("createView", sdk::create_view(webmap_id, container, padding_left)).await?;
    Ok(())
}

pub async fn when_webmap() -> anyhow::Result<()> {
    settle("whenWebMap", sdk::when_webmap()).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct BaseLayerState {
    title: String,
    visible: bool,
}

pub fn base_layers_from(value: JsValue) -> Vec<BaseLayerVisibility> {
    match from_js::<Vec<BaseLayerState>>(value) {
        Ok(layers) => layers
            .into_iter()
            .map(|layer| BaseLayerVisibility::new(&layer.title, layer.visible))
            .collect(),
        Err(err) => {
            warn!("base layers: {err:#}");
            Vec::new()
        }
    }
}

// ── MapService ──

pub struct SdkLayerView {
    layer: LayerHandle,
    filter: RefCell<Predicate>,
}

impl SdkLayerView {
    pub fn new(layer: LayerHandle) -> Self {
        Self {
            layer,
            filter: RefCell::new(Predicate::match_all()),
        }
    }
}

impl LayerView for SdkLayerView {
    fn set_filter(&self, predicate: &Predicate) {
        sdk::set_layer_filter(&self.layer.id, &predicate.to_where());
        *self.filter.borrow_mut() = predicate.clone();
    }

    fn filter(&self) -> Predicate {
        self.filter.borrow().clone()
    }
}

#[derive(Debug, Default)]
pub struct SdkMapService;

#[async_trait(?Send)]
impl MapService for SdkMapService {
    async fn add_feature_layer(&self, spec: FeatureLayerSpec) -> anyhow::Result<LayerHandle> {
        let spec = to_js(&spec)?;
        let handle = settle("addFeatureLayer", sdk::add_feature_layer(&spec)).await?;
        from_js(handle)
    }

    async fn when_layer_view(&self, layer: &LayerHandle) -> anyhow::Result<Rc<dyn LayerView>> {
        settle("whenLayerView", sdk::when_layer_view(&layer.id)).await?;
        debug!(layer = %layer.title, "layer view ready");
        Ok(Rc::new(SdkLayerView::new(layer.clone())))
    }

    async fn query_distinct(
        &self,
        layer: &LayerHandle,
        query: &DistinctValuesQuery,
    ) -> anyhow::Result<Vec<Feature>> {
        let query = to_js(query)?;
        let rows = settle("queryDistinct", sdk::query_distinct(&layer.id, &query)).await?;
        from_js(rows)
    }

    async fn query_features(&self, layer: &LayerHandle, predicate: &Predicate) -> anyhow::Result<Vec<Feature>> {
        let rows = settle("queryFeatures", sdk::query_features(&layer.id, &predicate.to_where())).await?;
        from_js(rows)
    }

    async fn go_to(&self, feature: &Feature) -> anyhow::Result<()> {
        let feature = to_js(feature)?;
        settle("goTo", sdk::go_to(&feature)).await?;
        Ok(())
    }

    fn layers(&self) -> Vec<LayerHandle> {
        from_js(sdk::all_layers()).unwrap_or_else(|err| {
            warn!("allLayers: {err:#}");
            Vec::new()
        })
    }
}
