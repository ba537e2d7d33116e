//! In-process map and widget implementations.
//!
//! Feature sources are registered per URL and returned in insertion order,
//! which stands in for the service-side `orderByFields` sort.

use crate::{
    ChangeListener, DistinctValuesQuery, FeatureLayerSpec, LayerHandle, LayerView, MapService,
    SelectionItem, SelectionWidget,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use cv_api_types::Feature;
use cv_filter::Predicate;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::debug;

#[derive(Default)]
pub struct InMemoryLayerView {
    filter: RefCell<Predicate>,
}

impl LayerView for InMemoryLayerView {
    fn set_filter(&self, predicate: &Predicate) {
        *self.filter.borrow_mut() = predicate.clone();
    }

    fn filter(&self) -> Predicate {
        self.filter.borrow().clone()
    }
}

struct MemoryLayer {
    handle: LayerHandle,
    url: String,
    view: Rc<InMemoryLayerView>,
}

#[derive(Default)]
struct MapState {
    sources: HashMap<String, Vec<Feature>>,
    layers: Vec<MemoryLayer>,
    failing_distinct: HashSet<String>,
    distinct_queries: Vec<DistinctValuesQuery>,
    navigated: Option<Feature>,
}

#[derive(Default)]
pub struct InMemoryMapService {
    state: RefCell<MapState>,
}

impl InMemoryMapService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `url` reachable, serving `features`.
    pub fn with_source(self, url: &str, features: Vec<Feature>) -> Self {
        self.state.borrow_mut().sources.insert(url.to_owned(), features);
        self
    }

    /// Keep `url` reachable but reject distinct-value queries against it.
    pub fn with_failing_distinct(self, url: &str) -> Self {
        self.state.borrow_mut().failing_distinct.insert(url.to_owned());
        self
    }

    /// A layer that is already part of the web map, such as parcels.
    pub fn with_map_layer(self, title: &str, features: Vec<Feature>) -> Self {
        let url = format!("memory://{title}");
        {
            let mut state = self.state.borrow_mut();
            state.sources.insert(url.clone(), features);
            push_layer(&mut state, title, &url);
        }
        self
    }

    pub fn layer_view(&self, title: &str) -> Option<Rc<InMemoryLayerView>> {
        self.state
            .borrow()
            .layers
            .iter()
            .find(|layer| layer.handle.title == title)
            .map(|layer| layer.view.clone())
    }

    pub fn distinct_queries(&self) -> Vec<DistinctValuesQuery> {
        self.state.borrow().distinct_queries.clone()
    }

    pub fn navigated(&self) -> Option<Feature> {
        self.state.borrow().navigated.clone()
    }

    fn layer_url(&self, layer: &LayerHandle) -> Result<String> {
        self.state
            .borrow()
            .layers
            .iter()
            .find(|candidate| candidate.handle == *layer)
            .map(|entry| entry.url.clone())
            .ok_or_else(|| anyhow!("unknown layer {}", layer.id))
    }

    fn source_for(&self, layer: &LayerHandle) -> Result<Vec<Feature>> {
        let url = self.layer_url(layer)?;
        self.state
            .borrow()
            .sources
            .get(&url)
            .cloned()
            .ok_or_else(|| anyhow!("feature layer unreachable: {url}"))
    }
}

fn push_layer(state: &mut MapState, title: &str, url: &str) -> LayerHandle {
    let handle = LayerHandle {
        id: format!("layer-{}", state.layers.len()),
        title: title.to_owned(),
    };
    state.layers.push(MemoryLayer {
        handle: handle.clone(),
        url: url.to_owned(),
        view: Rc::new(InMemoryLayerView::default()),
    });
    handle
}

#[async_trait(?Send)]
impl MapService for InMemoryMapService {
    async fn add_feature_layer(&self, spec: FeatureLayerSpec) -> Result<LayerHandle> {
        let mut state = self.state.borrow_mut();
        let handle = push_layer(&mut state, &spec.title, &spec.url);
        debug!(layer = %handle.id, title = %spec.title, "added in-memory feature layer");
        Ok(handle)
    }

    async fn when_layer_view(&self, layer: &LayerHandle) -> Result<Rc<dyn LayerView>> {
        self.source_for(layer)?;
        let state = self.state.borrow();
        let entry = state
            .layers
            .iter()
            .find(|candidate| candidate.handle == *layer)
            .ok_or_else(|| anyhow!("unknown layer {}", layer.id))?;
        let view: Rc<dyn LayerView> = entry.view.clone();
        Ok(view)
    }

    async fn query_distinct(&self, layer: &LayerHandle, query: &DistinctValuesQuery) -> Result<Vec<Feature>> {
        let features = self.source_for(layer)?;
        self.state.borrow_mut().distinct_queries.push(query.clone());
        let url = self.layer_url(layer)?;
        if self.state.borrow().failing_distinct.contains(&url) {
            return Err(anyhow!("distinct-value query rejected: {url}"));
        }

        Ok(features
            .into_iter()
            .map(|feature| {
                let attributes = query
                    .out_fields
                    .iter()
                    .filter_map(|field| {
                        feature
                            .attribute(field.as_str())
                            .map(|value| (field.as_str().to_owned(), value.clone()))
                    })
                    .collect();
                Feature {
                    attributes,
                    geometry: None,
                }
            })
            .collect())
    }

    async fn query_features(&self, layer: &LayerHandle, predicate: &Predicate) -> Result<Vec<Feature>> {
        let features = self.source_for(layer)?;
        Ok(features
            .into_iter()
            .filter(|feature| predicate.matches(feature))
            .collect())
    }

    async fn go_to(&self, feature: &Feature) -> Result<()> {
        self.state.borrow_mut().navigated = Some(feature.clone());
        Ok(())
    }

    fn layers(&self) -> Vec<LayerHandle> {
        self.state
            .borrow()
            .layers
            .iter()
            .map(|layer| layer.handle.clone())
            .collect()
    }
}

pub struct InMemorySelection {
    id: String,
    items: RefCell<Vec<SelectionItem>>,
    selected: RefCell<Vec<String>>,
    listeners: RefCell<Vec<ChangeListener>>,
    max_items: Cell<Option<u32>>,
}

impl InMemorySelection {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            items: RefCell::new(Vec::new()),
            selected: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            max_items: Cell::new(None),
        }
    }

    pub fn items(&self) -> Vec<SelectionItem> {
        self.items.borrow().clone()
    }

    pub fn values(&self) -> Vec<String> {
        self.items.borrow().iter().map(|item| item.value.clone()).collect()
    }

    pub fn max_items(&self) -> Option<u32> {
        self.max_items.get()
    }

    /// Simulate the user picking `values` and fire the change event.
    pub fn select(&self, values: &[&str]) {
        *self.selected.borrow_mut() = values.iter().map(|value| (*value).to_owned()).collect();
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            listener();
        }
    }
}

impl SelectionWidget for InMemorySelection {
    fn id(&self) -> &str {
        &self.id
    }

    fn append_item(&self, item: SelectionItem) {
        self.items.borrow_mut().push(item);
    }

    fn first_selected(&self) -> Option<String> {
        self.selected.borrow().first().cloned()
    }

    fn clear_selection(&self) {
        self.selected.borrow_mut().clear();
    }

    fn on_change(&self, listener: ChangeListener) {
        self.listeners.borrow_mut().push(listener);
    }

    fn set_max_items(&self, max_items: u32) {
        self.max_items.set(Some(max_items));
    }
}
