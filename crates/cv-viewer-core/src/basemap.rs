//! Ortho/basemap exclusivity and the parcel outline swap.

use cv_api_types::ViewerConfig;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseLayerVisibility {
    pub title: String,
    pub visible: bool,
}

impl BaseLayerVisibility {
    pub fn new(title: &str, visible: bool) -> Self {
        Self {
            title: title.to_owned(),
            visible,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParcelStyle {
    /// Whatever renderer the parcel layer was published with.
    Original,
    /// Translucent fill with a bright outline, legible over imagery.
    OrthoHighlight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineSymbol {
    pub width: f32,
    pub color: [u8; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillSymbol {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub color: [f32; 4],
    pub outline: OutlineSymbol,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleRenderer {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub symbol: FillSymbol,
}

impl SimpleRenderer {
    pub fn ortho_highlight() -> Self {
        Self {
            kind: "simple",
            symbol: FillSymbol {
                kind: "simple-fill",
                color: [255.0, 255.0, 255.0, 0.1],
                outline: OutlineSymbol {
                    width: 1.0,
                    color: [5, 252, 207],
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasemapUpdate {
    /// Exclusive layers that must be switched off.
    pub hide: Vec<String>,
    pub parcel_style: ParcelStyle,
}

/// Keeps at most one ortho/basemap layer visible.
///
/// Remembers each exclusive layer's visibility from the previous observation
/// so a layer that just turned on wins over the ones already on.
#[derive(Debug, Clone)]
pub struct BasemapExclusivity {
    exclusive: Vec<String>,
    ortho: Vec<String>,
    was_visible: HashMap<String, bool>,
}

impl BasemapExclusivity {
    pub fn new(exclusive: Vec<String>, ortho: Vec<String>) -> Self {
        Self {
            exclusive,
            ortho,
            was_visible: HashMap::new(),
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.exclusive_basemap_titles(), config.ortho_titles.clone())
    }

    pub fn any_ortho_visible(&self, layers: &[BaseLayerVisibility]) -> bool {
        layers
            .iter()
            .any(|layer| layer.visible && self.ortho.contains(&layer.title))
    }

    /// Work out which layers to hide after a visibility change and which
    /// parcel style fits the resulting state.
    pub fn reconcile(&mut self, layers: &[BaseLayerVisibility]) -> BasemapUpdate {
        let exclusive: Vec<&BaseLayerVisibility> = layers
            .iter()
            .filter(|layer| self.exclusive.contains(&layer.title))
            .collect();

        let newly_visible = exclusive
            .iter()
            .find(|layer| layer.visible && !self.was_visible.get(&layer.title).copied().unwrap_or(false))
            .map(|layer| layer.title.clone());

        let hide: Vec<String> = match newly_visible.as_deref() {
            Some(winner) => exclusive
                .iter()
                .filter(|layer| layer.visible && layer.title != winner)
                .map(|layer| layer.title.clone())
                .collect(),
            None => Vec::new(),
        };

        let settled: Vec<BaseLayerVisibility> = layers
            .iter()
            .map(|layer| BaseLayerVisibility {
                title: layer.title.clone(),
                visible: layer.visible && !hide.contains(&layer.title),
            })
            .collect();

        for layer in settled.iter().filter(|layer| self.exclusive.contains(&layer.title)) {
            self.was_visible.insert(layer.title.clone(), layer.visible);
        }

        let parcel_style = if self.any_ortho_visible(&settled) {
            ParcelStyle::OrthoHighlight
        } else {
            ParcelStyle::Original
        };

        BasemapUpdate { hide, parcel_style }
    }
}
