//! How each layer-list entry is presented.

use cv_api_types::{LayerRole, ViewerConfig};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SliderSpec {
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub initial: f64,
    pub precision: u32,
}

impl SliderSpec {
    /// Clamp to the slider range and round to its precision.
    pub fn quantize(&self, raw: f64) -> f64 {
        if raw.is_nan() {
            return self.initial;
        }
        let scale = 10_f64.powi(self.precision as i32);
        (raw.clamp(self.min, self.max) * scale).round() / scale
    }
}

pub const LAYER_OPACITY: SliderSpec = SliderSpec {
    label: "Layer Opacity (%)",
    min: 0.0,
    max: 1.0,
    initial: 0.75,
    precision: 2,
};

pub const LABEL_OPACITY: SliderSpec = SliderSpec {
    label: "Label Opacity (%)",
    min: 0.0,
    max: 1.0,
    initial: 1.0,
    precision: 2,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPanel {
    pub title: &'static str,
    pub icon_class: &'static str,
    pub layer_opacity: SliderSpec,
    pub label_opacity: SliderSpec,
}

impl Default for SettingsPanel {
    fn default() -> Self {
        Self {
            title: "Change layer settings",
            icon_class: "esri-icon-sliders-horizontal",
            layer_opacity: LAYER_OPACITY,
            label_opacity: LABEL_OPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListItemTreatment {
    /// Removed from the list with no actions or panel.
    Hidden,
    /// Group entries keep the SDK defaults.
    Plain,
    WithSettings(SettingsPanel),
}

#[derive(Debug, Clone, Default)]
pub struct LayerListPolicy {
    hidden_titles: Vec<String>,
}

impl LayerListPolicy {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            hidden_titles: config
                .role_title(&LayerRole::centerline())
                .map(|title| vec![title.to_owned()])
                .unwrap_or_default(),
        }
    }

    pub fn treatment(&self, title: &str, child_count: usize) -> ListItemTreatment {
        if self.hidden_titles.iter().any(|hidden| hidden == title) {
            ListItemTreatment::Hidden
        } else if child_count > 0 {
            ListItemTreatment::Plain
        } else {
            ListItemTreatment::WithSettings(SettingsPanel::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centerline_is_hidden_and_leaves_get_sliders() {
        let policy = LayerListPolicy::from_config(&ViewerConfig::default());

        assert_eq!(policy.treatment("Centerline", 0), ListItemTreatment::Hidden);
        assert_eq!(policy.treatment("Zoning Districts", 2), ListItemTreatment::Plain);
        match policy.treatment("Zoning", 0) {
            ListItemTreatment::WithSettings(panel) => {
                assert_eq!(panel.layer_opacity.initial, 0.75);
                assert_eq!(panel.label_opacity.initial, 1.0);
            }
            other => panic!("expected settings panel, got {other:?}"),
        }
    }

    #[test]
    fn centerline_title_follows_role_mapping() {
        let mut config = ViewerConfig::default();
        config
            .layer_roles
            .insert("centerline".to_owned(), "Road Centerlines".to_owned());
        let policy = LayerListPolicy::from_config(&config);

        assert_eq!(policy.treatment("Road Centerlines", 0), ListItemTreatment::Hidden);
        assert_ne!(policy.treatment("Centerline", 0), ListItemTreatment::Hidden);
    }

    #[test]
    fn slider_values_are_clamped_and_rounded() {
        assert_eq!(LAYER_OPACITY.quantize(0.756), 0.76);
        assert_eq!(LAYER_OPACITY.quantize(1.4), 1.0);
        assert_eq!(LAYER_OPACITY.quantize(-0.2), 0.0);
        assert_eq!(LABEL_OPACITY.quantize(f64::NAN), 1.0);
    }
}
