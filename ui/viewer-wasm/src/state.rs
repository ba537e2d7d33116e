//! Per-page state.
//!
//! WASM is single-threaded, so shared pieces are `Rc`/`RefCell`. One `Session`
//! is built at startup and cloned into each event handler.

use crate::bridge::SdkMapService;
use cv_api_types::ViewerConfig;
use cv_viewer_core::FilterPanel;
use cv_viewer_core::basemap::BasemapExclusivity;
use cv_viewer_core::layer_list::LayerListPolicy;
use cv_viewer_core::view_state::ViewState;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone)]
pub struct Session {
    pub config: Rc<ViewerConfig>,
    pub map: Rc<SdkMapService>,
    pub filters: Rc<FilterPanel>,
    pub view: Rc<RefCell<ViewState>>,
    pub basemaps: Rc<RefCell<BasemapExclusivity>>,
    pub layer_list: Rc<LayerListPolicy>,
}

impl Session {
    pub fn new(config: ViewerConfig, filters: FilterPanel) -> Self {
        let basemaps = BasemapExclusivity::from_config(&config);
        let layer_list = LayerListPolicy::from_config(&config);
        Self {
            config: Rc::new(config),
            map: Rc::new(SdkMapService),
            filters: Rc::new(filters),
            view: Rc::new(RefCell::new(ViewState::default())),
            basemaps: Rc::new(RefCell::new(basemaps)),
            layer_list: Rc::new(layer_list),
        }
    }
}
