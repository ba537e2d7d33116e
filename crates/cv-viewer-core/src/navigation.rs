//! URL parameters and query-driven navigation.
//!
//! `?viewer=<path>` picks the configuration file and
//! `?query=<layer>,<field>,<value>` zooms to the first matching feature once
//! the view is ready.

use cv_api_types::{DEFAULT_VIEWER_PATH, LayerRole, ViewerConfig};
use cv_filter::{FieldName, Predicate};
use cv_map_client::{LayerHandle, MapService};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
    pub viewer: Option<String>,
    pub query: Option<FeatureLookup>,
}

impl UrlParams {
    /// Parse a `location.search` string, with or without the leading `?`.
    pub fn parse(search: &str) -> Self {
        let mut params = Self::default();
        let raw = search.trim_start_matches('?');

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "viewer" if !value.trim().is_empty() => params.viewer = Some(value.into_owned()),
                "query" => params.query = FeatureLookup::parse(&value),
                _ => {}
            }
        }

        params
    }

    pub fn config_path(&self) -> &str {
        self.viewer.as_deref().unwrap_or(DEFAULT_VIEWER_PATH)
    }
}

/// `Layer,Field,Value`. The value keeps any further commas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLookup {
    pub layer: String,
    pub field: String,
    pub value: String,
}

impl FeatureLookup {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, ',');
        let layer = parts.next()?.trim();
        let field = parts.next()?.trim();
        let value = parts.next()?;
        if layer.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self {
            layer: layer.to_owned(),
            field: field.to_owned(),
            value: value.to_owned(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Navigated,
    LayerNotFound,
    InvalidField,
    NoMatch,
    QueryFailed,
}

/// Find a map layer by role key first, then by display title.
pub fn resolve_layer<M>(map: &M, config: &ViewerConfig, token: &str) -> Option<LayerHandle>
where
    M: MapService + ?Sized,
{
    let role = LayerRole(token.to_owned());
    if let Some(title) = config.role_title(&role) {
        if let Some(layer) = map.find_layer_by_title(title) {
            return Some(layer);
        }
    }
    map.find_layer_by_title(token)
}

/// Run the lookup's equality query and move the view to the first hit.
/// Nothing here is fatal: every miss is logged and reported as an outcome.
pub async fn navigate_to<M>(map: &M, config: &ViewerConfig, lookup: &FeatureLookup) -> NavigationOutcome
where
    M: MapService + ?Sized,
{
    let Some(layer) = resolve_layer(map, config, &lookup.layer) else {
        debug!(layer = %lookup.layer, "query layer not on the map");
        return NavigationOutcome::LayerNotFound;
    };

    let field = match FieldName::parse(&lookup.field) {
        Ok(field) => field,
        Err(err) => {
            warn!(layer = %lookup.layer, "ignoring query parameter: {err}");
            return NavigationOutcome::InvalidField;
        }
    };

    let predicate = Predicate::equals(&field, lookup.value.as_str());
    let features = match map.query_features(&layer, &predicate).await {
        Ok(features) => features,
        Err(err) => {
            warn!(layer = %layer.title, "navigation query failed: {err:#}");
            return NavigationOutcome::QueryFailed;
        }
    };

    let Some(feature) = features.first() else {
        debug!(layer = %layer.title, filter = %predicate, "no feature matched");
        return NavigationOutcome::NoMatch;
    };

    match map.go_to(feature).await {
        Ok(()) => NavigationOutcome::Navigated,
        Err(err) => {
            warn!(layer = %layer.title, "go-to failed: {err:#}");
            NavigationOutcome::QueryFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_api_types::{AttributeValue, Feature};
    use cv_map_client::InMemoryMapService;

    fn parcel_map() -> InMemoryMapService {
        InMemoryMapService::new().with_map_layer(
            "Parcel Boundaries",
            vec![
                Feature::with_attributes([("UniqueId", "099"), ("Owner", "Smith")]),
                Feature::with_attributes([("UniqueId", "100"), ("Owner", "O'Brien")]),
            ],
        )
    }

    #[test]
    fn parses_viewer_and_query_parameters() {
        let params = UrlParams::parse("?viewer=cama/Branford.json&query=Parcel%20Boundaries,UniqueId,100");

        assert_eq!(params.config_path(), "cama/Branford.json");
        assert_eq!(
            params.query,
            Some(FeatureLookup {
                layer: "Parcel Boundaries".to_owned(),
                field: "UniqueId".to_owned(),
                value: "100".to_owned(),
            })
        );
    }

    #[test]
    fn missing_viewer_uses_default_path() {
        assert_eq!(UrlParams::parse("").config_path(), DEFAULT_VIEWER_PATH);
        assert_eq!(UrlParams::parse("?viewer=").config_path(), DEFAULT_VIEWER_PATH);
    }

    #[test]
    fn incomplete_lookup_is_dropped() {
        assert_eq!(UrlParams::parse("?query=Parcel%20Boundaries,UniqueId").query, None);
        assert_eq!(FeatureLookup::parse(",UniqueId,100"), None);
    }

    #[test]
    fn lookup_value_keeps_commas() {
        let lookup = FeatureLookup::parse("Parcel Boundaries,Location,12 Main St, Unit 4")
            .expect("three parts");
        assert_eq!(lookup.value, "12 Main St, Unit 4");
    }

    #[tokio::test]
    async fn navigates_to_first_match() {
        let map = parcel_map();
        let params = UrlParams::parse("query=Parcel%20Boundaries,UniqueId,100");
        let lookup = params.query.expect("lookup parsed");

        let outcome = navigate_to(&map, &ViewerConfig::default(), &lookup).await;
        assert_eq!(outcome, NavigationOutcome::Navigated);
        let target = map.navigated().expect("view moved");
        assert_eq!(target.attribute("Owner"), Some(&AttributeValue::from("O'Brien")));
    }

    #[tokio::test]
    async fn role_key_resolves_to_titled_layer() {
        let map = parcel_map();
        let lookup = FeatureLookup::parse("parcels,Owner,O'Brien").expect("three parts");

        let outcome = navigate_to(&map, &ViewerConfig::default(), &lookup).await;
        assert_eq!(outcome, NavigationOutcome::Navigated);
    }

    #[tokio::test]
    async fn misses_leave_the_view_alone() {
        let map = parcel_map();
        let config = ViewerConfig::default();

        let no_match = FeatureLookup::parse("Parcel Boundaries,UniqueId,999").expect("parsed");
        assert_eq!(navigate_to(&map, &config, &no_match).await, NavigationOutcome::NoMatch);

        let no_layer = FeatureLookup::parse("Hydrants,UniqueId,100").expect("parsed");
        assert_eq!(navigate_to(&map, &config, &no_layer).await, NavigationOutcome::LayerNotFound);

        let bad_field = FeatureLookup::parse("Parcel Boundaries,1=1 --,x").expect("parsed");
        assert_eq!(navigate_to(&map, &config, &bad_field).await, NavigationOutcome::InvalidField);

        assert!(map.navigated().is_none());
    }
}
