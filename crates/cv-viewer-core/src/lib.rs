//! Viewer behavior independent of the browser: combobox filters, URL
//! navigation, basemap exclusivity, layer-list and search setup, and the
//! page's toggle state.

pub mod basemap;
pub mod controller;
pub mod layer_list;
pub mod navigation;
pub mod search;
pub mod view_state;

pub use controller::{AttachPhase, FilterPanel, LayerFilterController, MAX_SELECTED_ITEMS};
pub use navigation::{FeatureLookup, NavigationOutcome, UrlParams, navigate_to};

use cv_api_types::ViewerConfig;
use cv_map_client::{MapService, SelectionRegistry};
use futures_util::future::join_all;
use tracing::{info, warn};

/// One controller per configured layer, resolved against the page's widgets.
pub fn build_filter_panel(config: &ViewerConfig, widgets: &SelectionRegistry) -> FilterPanel {
    for problem in config.validate() {
        warn!("viewer config: {problem}");
    }

    let panel = FilterPanel::default();
    for descriptor in &config.layers {
        panel.add(LayerFilterController::new(descriptor.clone(), widgets));
    }
    panel
}

/// Attach every controller. Each chain runs independently, so a slow or
/// failing layer does not hold up the others.
pub async fn attach_all<M>(map: &M, panel: &FilterPanel) -> Vec<AttachPhase>
where
    M: MapService + ?Sized,
{
    let phases = join_all(
        panel
            .controllers()
            .into_iter()
            .map(|controller| controller.attach(map)),
    )
    .await;

    let ready = phases
        .iter()
        .filter(|phase| **phase == AttachPhase::Populated)
        .count();
    info!(ready, total = phases.len(), "layer filters attached");
    phases
}
