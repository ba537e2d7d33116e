//! Search widget sources.

use cv_api_types::{LayerRole, ViewerConfig};
use cv_map_client::LayerHandle;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSource {
    pub layer_id: String,
    pub name: String,
    pub search_fields: Vec<String>,
    pub display_field: String,
    pub out_fields: Vec<String>,
    pub placeholder: String,
    pub max_suggestions: u32,
    pub max_results: u32,
    pub search_all_enabled: bool,
    pub exact_match: bool,
}

/// One source per map layer playing the parcels role.
pub fn search_sources(config: &ViewerConfig, layers: &[LayerHandle]) -> Vec<SearchSource> {
    let Some(parcels) = config.role_title(&LayerRole::parcels()) else {
        return Vec::new();
    };
    let settings = &config.search;

    layers
        .iter()
        .filter(|layer| layer.title == parcels)
        .map(|layer| SearchSource {
            layer_id: layer.id.clone(),
            name: layer.title.clone(),
            search_fields: settings.search_fields.clone(),
            display_field: settings.display_field.clone(),
            out_fields: vec!["*".to_owned()],
            placeholder: settings.placeholder.clone(),
            max_suggestions: settings.max_suggestions,
            max_results: settings.max_results,
            search_all_enabled: true,
            exact_match: settings.exact_match,
        })
        .collect()
}
