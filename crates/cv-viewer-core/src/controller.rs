//! Layer-filter controller.
//!
//! Binds one layer descriptor to a map layer and its two comboboxes. Setup
//! runs as a chain of awaits: layer added, layer view ready, distinct-value
//! query, population, sentinel, listeners. Any failed step leaves the
//! controller inert instead of surfacing an error.

use cv_api_types::LayerDescriptor;
use cv_filter::{DistinctValueSet, FieldName, Predicate, selection_predicate};
use cv_map_client::{
    DetachedSelection, DistinctValuesQuery, FeatureLayerSpec, LayerHandle, LayerView, MapService,
    SelectionItem, SelectionRegistry, SelectionWidget,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Combobox `maxItems` applied to both widgets.
pub const MAX_SELECTED_ITEMS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachPhase {
    #[default]
    Pending,
    LayerAdded,
    ViewReady,
    Populated,
    Failed,
}

#[derive(Default)]
struct ControllerState {
    layer: Option<LayerHandle>,
    view: Option<Rc<dyn LayerView>>,
    values: DistinctValueSet,
    applied: Predicate,
}

pub struct LayerFilterController {
    descriptor: LayerDescriptor,
    field: Option<FieldName>,
    primary: Rc<dyn SelectionWidget>,
    secondary: Rc<dyn SelectionWidget>,
    state: RefCell<ControllerState>,
}

impl LayerFilterController {
    pub fn new(descriptor: LayerDescriptor, widgets: &SelectionRegistry) -> Rc<Self> {
        let field = match FieldName::parse(&descriptor.field_name) {
            Ok(field) => Some(field),
            Err(err) => {
                warn!(layer = %descriptor.title, "filter disabled: {err}");
                None
            }
        };

        let primary = resolve_widget(widgets, &descriptor.combobox1, &descriptor.title);
        let secondary = resolve_widget(widgets, &descriptor.combobox2, &descriptor.title);
        primary.set_max_items(MAX_SELECTED_ITEMS);
        secondary.set_max_items(MAX_SELECTED_ITEMS);

        Rc::new(Self {
            descriptor,
            field,
            primary,
            secondary,
            state: RefCell::new(ControllerState::default()),
        })
    }

    pub fn layer(&self) -> Option<LayerHandle> {
        self.state.borrow().layer.clone()
    }

    pub fn values(&self) -> Vec<String> {
        self.state.borrow().values.values().to_vec()
    }

    /// The predicate most recently written to the layer view.
    pub fn applied_filter(&self) -> Predicate {
        self.state.borrow().applied.clone()
    }

    /// Add the layer to `map`, populate both comboboxes, and start listening.
    pub async fn attach<M>(self: Rc<Self>, map: &M) -> AttachPhase
    where
        M: MapService + ?Sized,
    {
        let title = self.descriptor.title.clone();

        let layer = match map
            .add_feature_layer(FeatureLayerSpec::from(&self.descriptor))
            .await
        {
            Ok(layer) => layer,
            Err(err) => {
                warn!(layer = %title, "could not add feature layer: {err:#}");
                return self.set_phase(AttachPhase::Failed);
            }
        };
        self.state.borrow_mut().layer = Some(layer.clone());
        self.set_phase(AttachPhase::LayerAdded);

        let view = match map.when_layer_view(&layer).await {
            Ok(view) => view,
            Err(err) => {
                warn!(layer = %title, "layer view never became ready: {err:#}");
                return self.set_phase(AttachPhase::Failed);
            }
        };
        self.state.borrow_mut().view = Some(view);
        self.set_phase(AttachPhase::ViewReady);

        let values = self.discover_values(map, &layer).await;
        for value in values.values() {
            self.primary.append_item(SelectionItem::choice(value));
            self.secondary.append_item(SelectionItem::choice(value));
        }
        self.primary.append_item(SelectionItem::show_all());
        self.secondary.append_item(SelectionItem::show_all());
        debug!(layer = %title, count = values.len(), "comboboxes populated");
        self.state.borrow_mut().values = values;

        Self::register_listeners(&self);
        self.set_phase(AttachPhase::Populated)
    }

    /// Rebuild the predicate from both comboboxes and apply it to the view.
    pub fn recompute_filter(&self) -> Predicate {
        let Some(field) = self.field.as_ref() else {
            return Predicate::match_all();
        };

        let first = self.primary.first_selected();
        let second = self.secondary.first_selected();
        let predicate = selection_predicate(field, first.as_deref(), second.as_deref());

        let view = self.state.borrow().view.clone();
        if let Some(view) = view {
            view.set_filter(&predicate);
        }
        debug!(layer = %self.descriptor.title, filter = %predicate, "filter applied");

        self.state.borrow_mut().applied = predicate.clone();
        predicate
    }

    /// Clear both selections and fall back to the match-all filter.
    pub fn reset(&self) -> Predicate {
        self.primary.clear_selection();
        self.secondary.clear_selection();
        self.recompute_filter()
    }

    async fn discover_values<M>(&self, map: &M, layer: &LayerHandle) -> DistinctValueSet
    where
        M: MapService + ?Sized,
    {
        let Some(field) = self.field.clone() else {
            return DistinctValueSet::new();
        };

        let order_by = FieldName::parse(self.descriptor.order_by()).unwrap_or_else(|err| {
            warn!(layer = %self.descriptor.title, "ignoring orderByField: {err}");
            field.clone()
        });

        let query = DistinctValuesQuery::new(field.clone(), order_by);
        match map.query_distinct(layer, &query).await {
            Ok(features) => DistinctValueSet::from_features(&field, &features),
            Err(err) => {
                warn!(layer = %self.descriptor.title, "distinct-value query failed: {err:#}");
                DistinctValueSet::new()
            }
        }
    }

    fn register_listeners(this: &Rc<Self>) {
        for widget in [&this.primary, &this.secondary] {
            let weak = Rc::downgrade(this);
            widget.on_change(Rc::new(move || {
                if let Some(controller) = weak.upgrade() {
                    controller.recompute_filter();
                }
            }));
        }
    }

    fn set_phase(&self, phase: AttachPhase) -> AttachPhase {
        trace!(layer = %self.descriptor.title, ?phase, "attach phase");
        phase
    }
}

fn resolve_widget(widgets: &SelectionRegistry, id: &str, layer: &str) -> Rc<dyn SelectionWidget> {
    widgets.widget(id).unwrap_or_else(|| {
        warn!(layer, combobox = id, "combobox not found; using a detached widget");
        Rc::new(DetachedSelection::new(id))
    })
}

/// Every controller on the page, driven together by the reset control.
#[derive(Default)]
pub struct FilterPanel {
    controllers: RefCell<Vec<Rc<LayerFilterController>>>,
}

impl FilterPanel {
    pub fn add(&self, controller: Rc<LayerFilterController>) {
        self.controllers.borrow_mut().push(controller);
    }

    pub fn controllers(&self) -> Vec<Rc<LayerFilterController>> {
        self.controllers.borrow().clone()
    }

    pub fn reset_all(&self) {
        for controller in self.controllers() {
            controller.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_api_types::{AttributeValue, Feature};
    use cv_filter::SHOW_ALL_VALUE;
    use cv_map_client::{InMemoryMapService, InMemorySelection};

    const ZONING_URL: &str = "https://example.test/FeatureServer/2";

    struct Fixture {
        map: InMemoryMapService,
        first: Rc<InMemorySelection>,
        second: Rc<InMemorySelection>,
        controller: Rc<LayerFilterController>,
    }

    fn zoning_descriptor() -> LayerDescriptor {
        LayerDescriptor {
            url: ZONING_URL.to_owned(),
            title: "Zoning".to_owned(),
            field_name: "Zoning".to_owned(),
            order_by_field: Some("Zoning".to_owned()),
            combobox1: "zoning1".to_owned(),
            combobox2: "zoning2".to_owned(),
            ..LayerDescriptor::default()
        }
    }

    fn zoning_features(values: &[&str]) -> Vec<Feature> {
        values
            .iter()
            .map(|value| Feature::with_attributes([("Zoning", *value)]))
            .collect()
    }

    fn fixture(descriptor: LayerDescriptor, features: Vec<Feature>) -> Fixture {
        fixture_on(InMemoryMapService::new().with_source(ZONING_URL, features), descriptor)
    }

    fn fixture_on(map: InMemoryMapService, descriptor: LayerDescriptor) -> Fixture {
        let first = Rc::new(InMemorySelection::new("zoning1"));
        let second = Rc::new(InMemorySelection::new("zoning2"));
        let mut widgets = SelectionRegistry::default();
        widgets.register(first.clone());
        widgets.register(second.clone());
        let controller = LayerFilterController::new(descriptor, &widgets);
        Fixture {
            map,
            first,
            second,
            controller,
        }
    }

    async fn attached(values: &[&str]) -> Fixture {
        let fx = fixture(zoning_descriptor(), zoning_features(values));
        let phase = fx.controller.clone().attach(&fx.map).await;
        assert_eq!(phase, AttachPhase::Populated);
        fx
    }

    #[tokio::test]
    async fn attach_populates_both_widgets_with_distinct_values_and_sentinel() {
        let fx = attached(&["R1", "R1", "C2", ""]).await;

        for widget in [&fx.first, &fx.second] {
            assert_eq!(widget.values(), ["R1", "C2", SHOW_ALL_VALUE]);
            assert_eq!(widget.items().last().map(|item| item.label.as_str()), Some("Show All"));
            assert_eq!(widget.max_items(), Some(MAX_SELECTED_ITEMS));
        }
        assert_eq!(fx.controller.values(), ["R1", "C2"]);
    }

    #[tokio::test]
    async fn attach_issues_one_ordered_distinct_query() {
        let fx = attached(&["R1"]).await;

        let queries = fx.map.distinct_queries();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].return_distinct_values);
        assert_eq!(queries[0].out_fields[0].as_str(), "Zoning");
        assert_eq!(queries[0].order_by_fields[0].as_str(), "Zoning");
    }

    #[tokio::test]
    async fn selections_compose_with_or() {
        let fx = attached(&["R1", "C2"]).await;
        let view = fx.map.layer_view("Zoning").expect("layer view exists");

        fx.first.select(&["R1"]);
        assert_eq!(view.filter().to_where(), "Zoning = 'R1'");

        fx.second.select(&["C2"]);
        assert_eq!(view.filter().to_where(), "Zoning = 'R1' OR Zoning = 'C2'");

        fx.second.select(&[SHOW_ALL_VALUE]);
        assert_eq!(view.filter().to_where(), "Zoning = 'R1'");

        fx.first.select(&[SHOW_ALL_VALUE]);
        assert!(view.filter().is_match_all());
    }

    #[tokio::test]
    async fn only_first_selected_item_participates() {
        let fx = attached(&["R1", "C2"]).await;

        fx.first.select(&["C2", "R1"]);
        assert_eq!(fx.controller.applied_filter().to_where(), "Zoning = 'C2'");
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let fx = attached(&["R1", "C2"]).await;
        fx.first.select(&["R1"]);
        fx.second.select(&["C2"]);

        let once = fx.controller.recompute_filter();
        let twice = fx.controller.recompute_filter();
        assert_eq!(once, twice);
        assert_eq!(fx.map.layer_view("Zoning").map(|view| view.filter()), Some(twice));
    }

    #[tokio::test]
    async fn reset_always_matches_all() {
        let fx = attached(&["R1", "C2"]).await;
        fx.first.select(&["R1"]);
        fx.second.select(&["C2"]);

        assert!(fx.controller.reset().is_match_all());
        assert_eq!(fx.first.first_selected(), None);
        assert_eq!(fx.second.first_selected(), None);
        assert!(fx.map.layer_view("Zoning").expect("view").filter().is_match_all());

        assert!(fx.controller.reset().is_match_all());
    }

    #[tokio::test]
    async fn quoted_values_stay_well_formed() {
        let mut descriptor = zoning_descriptor();
        descriptor.field_name = "Owner".to_owned();
        descriptor.order_by_field = None;
        let features = vec![Feature::with_attributes([("Owner", "O'Brien")])];
        let fx = fixture(descriptor, features);
        fx.controller.clone().attach(&fx.map).await;

        fx.first.select(&["O'Brien"]);
        assert_eq!(fx.controller.applied_filter().to_where(), "Owner = 'O''Brien'");
    }

    #[tokio::test]
    async fn missing_field_leaves_only_sentinel() {
        let mut descriptor = zoning_descriptor();
        descriptor.field_name = "Land_Use".to_owned();
        let fx = fixture(descriptor, zoning_features(&["R1", "C2"]));

        assert_eq!(fx.controller.clone().attach(&fx.map).await, AttachPhase::Populated);
        assert_eq!(fx.first.values(), [SHOW_ALL_VALUE]);
        assert_eq!(fx.second.values(), [SHOW_ALL_VALUE]);
    }

    #[tokio::test]
    async fn invalid_field_name_skips_query_and_filters_nothing() {
        let mut descriptor = zoning_descriptor();
        descriptor.field_name = "Zoning' OR 1=1".to_owned();
        let fx = fixture(descriptor, zoning_features(&["R1"]));

        fx.controller.clone().attach(&fx.map).await;
        assert!(fx.map.distinct_queries().is_empty());
        assert_eq!(fx.first.values(), [SHOW_ALL_VALUE]);

        fx.first.select(&["R1"]);
        assert!(fx.controller.applied_filter().is_match_all());
    }

    #[tokio::test]
    async fn unreachable_layer_degrades_to_empty_state() {
        let mut descriptor = zoning_descriptor();
        descriptor.url = "https://offline.test/FeatureServer/0".to_owned();
        let fx = fixture(descriptor, Vec::new());

        assert_eq!(fx.controller.clone().attach(&fx.map).await, AttachPhase::Failed);
        assert!(fx.first.values().is_empty());
        assert!(fx.controller.layer().is_some());
    }

    #[tokio::test]
    async fn failed_distinct_query_still_offers_show_all() {
        let map = InMemoryMapService::new()
            .with_source(ZONING_URL, zoning_features(&["R1", "C2"]))
            .with_failing_distinct(ZONING_URL);
        let fx = fixture_on(map, zoning_descriptor());

        assert_eq!(fx.controller.clone().attach(&fx.map).await, AttachPhase::Populated);
        assert_eq!(fx.first.values(), [SHOW_ALL_VALUE]);
        assert_eq!(fx.second.values(), [SHOW_ALL_VALUE]);
        assert!(fx.controller.values().is_empty());

        fx.first.select(&[SHOW_ALL_VALUE]);
        assert!(fx.controller.applied_filter().is_match_all());
    }

    #[tokio::test]
    async fn unresolved_combobox_uses_detached_widget() {
        let mut descriptor = zoning_descriptor();
        descriptor.combobox2 = "notOnThisPage".to_owned();
        let fx = fixture(descriptor, zoning_features(&["R1"]));

        assert_eq!(fx.controller.clone().attach(&fx.map).await, AttachPhase::Populated);
        assert!(fx.second.values().is_empty());

        fx.first.select(&["R1"]);
        assert_eq!(fx.controller.applied_filter().to_where(), "Zoning = 'R1'");
    }

    #[tokio::test]
    async fn numeric_values_become_text_choices() {
        let features = vec![
            Feature::with_attributes([("Zoning", AttributeValue::Integer(3))]),
            Feature::with_attributes([("Zoning", AttributeValue::Null)]),
        ];
        let fx = fixture(zoning_descriptor(), features);
        fx.controller.clone().attach(&fx.map).await;

        assert_eq!(fx.first.values(), ["3", SHOW_ALL_VALUE]);
    }

    #[tokio::test]
    async fn panel_reset_clears_every_controller() {
        let fx = attached(&["R1", "C2"]).await;
        let panel = FilterPanel::default();
        panel.add(fx.controller.clone());

        fx.first.select(&["R1"]);
        panel.reset_all();
        assert!(fx.controller.applied_filter().is_match_all());
    }
}
