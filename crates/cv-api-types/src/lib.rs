use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_WEBMAP_ID: &str = "54a2ab42be274473af199afc614fdf78";
pub const DEFAULT_VIEWER_PATH: &str = "cama/North_Haven.json";

pub const ROLE_PARCELS: &str = "parcels";
pub const ROLE_CENTERLINE: &str = "centerline";

const DEFAULT_ROLE_TITLES: [(&str, &str); 2] = [
    (ROLE_PARCELS, "Parcel Boundaries"),
    (ROLE_CENTERLINE, "Centerline"),
];

const DEFAULT_ORTHO_TITLES: [&str; 3] = ["Ortho 2012", "Ortho 2016", "Ortho 2019"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed viewer config: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("layer #{index} ({title:?}) is missing `{field}`")]
    MissingLayerField {
        index: usize,
        title: String,
        field: &'static str,
    },
    #[error("layer #{index} ({title:?}) uses the same combobox `{id}` twice")]
    DuplicateCombobox { index: usize, title: String, id: String },
}

/// Stable semantic key for a layer, independent of its display title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerRole(pub String);

impl LayerRole {
    pub fn parcels() -> Self {
        Self(ROLE_PARCELS.to_owned())
    }

    pub fn centerline() -> Self {
        Self(ROLE_CENTERLINE.to_owned())
    }
}

/// One entry of the `layers` array: a feature layer plus the two comboboxes
/// that filter it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerDescriptor {
    pub url: String,
    pub title: String,
    pub field_name: String,
    pub is_visible: bool,
    pub order_by_field: Option<String>,
    pub combobox1: String,
    pub combobox2: String,
    pub role: Option<LayerRole>,
}

impl Default for LayerDescriptor {
    fn default() -> Self {
        Self {
            url: String::new(),
            title: String::new(),
            field_name: String::new(),
            is_visible: true,
            order_by_field: None,
            combobox1: String::new(),
            combobox2: String::new(),
            role: None,
        }
    }
}

impl LayerDescriptor {
    /// Sort key for the distinct-value query; falls back to the filter field.
    pub fn order_by(&self) -> &str {
        match self.order_by_field.as_deref() {
            Some(field) if !field.trim().is_empty() => field,
            _ => &self.field_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSettings {
    pub search_fields: Vec<String>,
    pub display_field: String,
    pub placeholder: String,
    pub max_suggestions: u32,
    pub max_results: u32,
    pub exact_match: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            search_fields: vec!["Uniqueid".to_owned(), "Owner".to_owned(), "Location".to_owned()],
            display_field: "Location".to_owned(),
            placeholder: "Search UniqueID, Owner, or Location".to_owned(),
            max_suggestions: 6,
            max_results: 300,
            exact_match: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    pub webmap_id: Option<String>,
    pub layers: Vec<LayerDescriptor>,
    pub css_header_background: Option<String>,
    pub css_view_background: Option<String>,
    pub css_layer_filter_color: Option<String>,
    pub css_layer_filter_text_color: Option<String>,
    pub image: Option<String>,
    pub title: Option<String>,
    pub basemap_title: Option<String>,
    pub layer_roles: BTreeMap<String, String>,
    pub ortho_titles: Vec<String>,
    pub search: SearchSettings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            webmap_id: None,
            layers: Vec::new(),
            css_header_background: None,
            css_view_background: None,
            css_layer_filter_color: None,
            css_layer_filter_text_color: None,
            image: None,
            title: None,
            basemap_title: None,
            layer_roles: BTreeMap::new(),
            ortho_titles: DEFAULT_ORTHO_TITLES.iter().map(|t| (*t).to_owned()).collect(),
            search: SearchSettings::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Configured web map id, or the fallback when absent or blank.
    pub fn webmap_id(&self) -> &str {
        match self.webmap_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => DEFAULT_WEBMAP_ID,
        }
    }

    /// Display title of the layer playing `role`.
    ///
    /// Resolution order: a descriptor tagged with the role, the `layerRoles`
    /// map, then the built-in role titles.
    pub fn role_title(&self, role: &LayerRole) -> Option<&str> {
        if let Some(layer) = self
            .layers
            .iter()
            .find(|layer| layer.role.as_ref() == Some(role))
        {
            return Some(layer.title.as_str());
        }

        if let Some(title) = self.layer_roles.get(&role.0) {
            return Some(title.as_str());
        }

        DEFAULT_ROLE_TITLES
            .iter()
            .find(|(key, _)| *key == role.0)
            .map(|(_, title)| *title)
    }

    /// Titles of base layers that are mutually exclusive with each other.
    pub fn exclusive_basemap_titles(&self) -> Vec<String> {
        let mut titles = self.ortho_titles.clone();
        if let Some(basemap) = self.basemap_title.as_deref() {
            if !basemap.is_empty() && !titles.iter().any(|t| t == basemap) {
                titles.push(basemap.to_owned());
            }
        }
        titles
    }

    /// Every structural problem with the layer manifest. The viewer only logs
    /// these; the config service refuses to publish a config that has any.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut problems = Vec::new();

        for (index, layer) in self.layers.iter().enumerate() {
            let required = [
                ("url", &layer.url),
                ("fieldName", &layer.field_name),
                ("combobox1", &layer.combobox1),
                ("combobox2", &layer.combobox2),
            ];
            for (field, value) in required {
                if value.trim().is_empty() {
                    problems.push(ConfigError::MissingLayerField {
                        index,
                        title: layer.title.clone(),
                        field,
                    });
                }
            }

            if !layer.combobox1.is_empty() && layer.combobox1 == layer.combobox2 {
                problems.push(ConfigError::DuplicateCombobox {
                    index,
                    title: layer.title.clone(),
                    id: layer.combobox1.clone(),
                });
            }
        }

        problems
    }
}

/// A single attribute value as returned by a feature query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    /// The value as a selectable choice: `None` for null and empty strings.
    pub fn as_choice(&self) -> Option<String> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Text(text) if text.is_empty() => None,
            AttributeValue::Text(text) => Some(text.clone()),
            AttributeValue::Bool(flag) => Some(flag.to_string()),
            AttributeValue::Integer(number) => Some(number.to_string()),
            AttributeValue::Float(number) if number.is_nan() => None,
            AttributeValue::Float(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                Some(format!("{}", *number as i64))
            }
            AttributeValue::Float(number) => Some(number.to_string()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_owned())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub geometry: Option<serde_json::Value>,
}

impl Feature {
    pub fn with_attributes<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        Self {
            attributes: attributes
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            geometry: None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NORTH_HAVEN: &str = r##"{
        "webmapId": "abc123",
        "cssHeaderBackground": "#1d3557",
        "cssLayerFilterColor": "#f1faee",
        "title": "North Haven",
        "basemapTitle": "Town Basemap",
        "layers": [
            {
                "url": "https://example.test/FeatureServer/0",
                "title": "Zoning",
                "fieldName": "Zoning",
                "isVisible": false,
                "orderByField": "Zoning",
                "combobox1": "zoningCombo1",
                "combobox2": "zoningCombo2"
            },
            {
                "url": "https://example.test/FeatureServer/1",
                "title": "Land Use",
                "fieldName": "Use_Code",
                "combobox1": "useCombo1",
                "combobox2": "useCombo2",
                "role": "land-use"
            }
        ]
    }"##;

    #[test]
    fn parses_layer_manifest() {
        let config = ViewerConfig::from_json(NORTH_HAVEN).expect("config should parse");

        assert_eq!(config.webmap_id(), "abc123");
        assert_eq!(config.layers.len(), 2);
        assert!(!config.layers[0].is_visible);
        assert!(config.layers[1].is_visible);
        assert_eq!(config.layers[1].order_by(), "Use_Code");
        assert_eq!(config.layers[1].role, Some(LayerRole("land-use".to_owned())));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn empty_object_falls_back_to_defaults() {
        let config = ViewerConfig::from_json("{}").expect("empty config should parse");

        assert_eq!(config.webmap_id(), DEFAULT_WEBMAP_ID);
        assert!(config.layers.is_empty());
        assert_eq!(config.ortho_titles.len(), 3);
        assert_eq!(config.search.max_results, 300);
    }

    #[test]
    fn blank_webmap_id_uses_fallback() {
        let config = ViewerConfig::from_json(r#"{"webmapId": "  "}"#).expect("config should parse");
        assert_eq!(config.webmap_id(), DEFAULT_WEBMAP_ID);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = ViewerConfig::from_json("{\"layers\": [").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn role_title_prefers_tagged_descriptor_then_map_then_builtin() {
        let mut config = ViewerConfig::default();
        assert_eq!(config.role_title(&LayerRole::parcels()), Some("Parcel Boundaries"));

        config
            .layer_roles
            .insert(ROLE_PARCELS.to_owned(), "Parcels 2024".to_owned());
        assert_eq!(config.role_title(&LayerRole::parcels()), Some("Parcels 2024"));

        config.layers.push(LayerDescriptor {
            title: "Town Parcels".to_owned(),
            role: Some(LayerRole::parcels()),
            ..LayerDescriptor::default()
        });
        assert_eq!(config.role_title(&LayerRole::parcels()), Some("Town Parcels"));

        assert_eq!(config.role_title(&LayerRole("wetlands".to_owned())), None);
    }

    #[test]
    fn exclusive_titles_include_configured_basemap_once() {
        let mut config = ViewerConfig::default();
        config.basemap_title = Some("Ortho 2016".to_owned());
        assert_eq!(config.exclusive_basemap_titles().len(), 3);

        config.basemap_title = Some("Town Basemap".to_owned());
        let titles = config.exclusive_basemap_titles();
        assert_eq!(titles.len(), 4);
        assert_eq!(titles.last().map(String::as_str), Some("Town Basemap"));
    }

    #[test]
    fn validate_reports_missing_and_duplicate_fields() {
        let config = ViewerConfig::from_json(
            r#"{"layers": [{"title": "Broken", "url": "u", "combobox1": "a", "combobox2": "a"}]}"#,
        )
        .expect("config should parse");

        let problems = config.validate();
        assert_eq!(problems.len(), 2);
        assert!(matches!(
            problems[0],
            ConfigError::MissingLayerField { field: "fieldName", .. }
        ));
        assert!(matches!(problems[1], ConfigError::DuplicateCombobox { .. }));
    }

    #[test]
    fn attribute_choices_skip_null_and_empty() {
        assert_eq!(AttributeValue::Null.as_choice(), None);
        assert_eq!(AttributeValue::from("").as_choice(), None);
        assert_eq!(AttributeValue::from("R1").as_choice().as_deref(), Some("R1"));
        assert_eq!(AttributeValue::Integer(100).as_choice().as_deref(), Some("100"));
        assert_eq!(AttributeValue::Float(12.0).as_choice().as_deref(), Some("12"));
        assert_eq!(AttributeValue::Float(1.5).as_choice().as_deref(), Some("1.5"));
    }

    #[test]
    fn feature_attributes_deserialize_untagged() {
        let feature: Feature = serde_json::from_str(
            r#"{"attributes": {"Zoning": "R1", "Acres": 2.5, "UniqueId": 100, "Owner": null}}"#,
        )
        .expect("feature should parse");

        assert_eq!(feature.attribute("Zoning"), Some(&AttributeValue::from("R1")));
        assert_eq!(feature.attribute("Acres"), Some(&AttributeValue::Float(2.5)));
        assert_eq!(feature.attribute("UniqueId"), Some(&AttributeValue::Integer(100)));
        assert_eq!(feature.attribute("Owner"), Some(&AttributeValue::Null));
    }
}
