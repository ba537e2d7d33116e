use anyhow::Result;
use async_trait::async_trait;
use cv_api_types::{Feature, LayerDescriptor};
use cv_filter::{FieldName, Predicate, SHOW_ALL_LABEL, SHOW_ALL_VALUE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

mod memory;

pub use memory::{InMemoryLayerView, InMemoryMapService, InMemorySelection};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerHandle {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureLayerSpec {
    pub url: String,
    pub title: String,
    pub visible: bool,
    pub popup_enabled: bool,
}

impl From<&LayerDescriptor> for FeatureLayerSpec {
    fn from(descriptor: &LayerDescriptor) -> Self {
        Self {
            url: descriptor.url.clone(),
            title: descriptor.title.clone(),
            visible: descriptor.is_visible,
            popup_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinctValuesQuery {
    pub out_fields: Vec<FieldName>,
    pub order_by_fields: Vec<FieldName>,
    pub return_distinct_values: bool,
}

impl DistinctValuesQuery {
    pub fn new(field: FieldName, order_by: FieldName) -> Self {
        Self {
            out_fields: vec![field],
            order_by_fields: vec![order_by],
            return_distinct_values: true,
        }
    }
}

/// The rendered view of one layer; owns the layer's active filter.
pub trait LayerView {
    fn set_filter(&self, predicate: &Predicate);
    fn filter(&self) -> Predicate;
}

/// The hosted map: layers, queries, and navigation.
#[async_trait(?Send)]
pub trait MapService {
    async fn add_feature_layer(&self, spec: FeatureLayerSpec) -> Result<LayerHandle>;
    async fn when_layer_view(&self, layer: &LayerHandle) -> Result<Rc<dyn LayerView>>;
    async fn query_distinct(&self, layer: &LayerHandle, query: &DistinctValuesQuery) -> Result<Vec<Feature>>;
    async fn query_features(&self, layer: &LayerHandle, predicate: &Predicate) -> Result<Vec<Feature>>;
    async fn go_to(&self, feature: &Feature) -> Result<()>;
    fn layers(&self) -> Vec<LayerHandle>;

    fn find_layer_by_title(&self, title: &str) -> Option<LayerHandle> {
        self.layers().into_iter().find(|layer| layer.title == title)
    }
}

pub type ChangeListener = Rc<dyn Fn()>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionItem {
    pub value: String,
    pub label: String,
}

impl SelectionItem {
    /// An attribute value shown under its own name.
    pub fn choice(value: &str) -> Self {
        Self {
            value: value.to_owned(),
            label: value.to_owned(),
        }
    }

    pub fn show_all() -> Self {
        Self {
            value: SHOW_ALL_VALUE.to_owned(),
            label: SHOW_ALL_LABEL.to_owned(),
        }
    }
}

/// A page-owned selection list, such as a combobox.
pub trait SelectionWidget {
    fn id(&self) -> &str;
    fn append_item(&self, item: SelectionItem);
    /// Value of the first selected item; the widget is used as single-select.
    fn first_selected(&self) -> Option<String>;
    /// Programmatic clear. Does not fire change listeners.
    fn clear_selection(&self);
    fn on_change(&self, listener: ChangeListener);

    fn set_max_items(&self, _max_items: u32) {}
}

/// Stand-in for a widget id that did not resolve on the page.
pub struct DetachedSelection {
    id: String,
}

impl DetachedSelection {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_owned() }
    }
}

impl SelectionWidget for DetachedSelection {
    fn id(&self) -> &str {
        &self.id
    }

    fn append_item(&self, _item: SelectionItem) {}

    fn first_selected(&self) -> Option<String> {
        None
    }

    fn clear_selection(&self) {}

    fn on_change(&self, _listener: ChangeListener) {}
}

#[derive(Default)]
pub struct SelectionRegistry {
    widgets: HashMap<String, Rc<dyn SelectionWidget>>,
}

impl SelectionRegistry {
    pub fn register(&mut self, widget: Rc<dyn SelectionWidget>) {
        self.widgets.insert(widget.id().to_owned(), widget);
    }

    pub fn widget(&self, id: &str) -> Option<Rc<dyn SelectionWidget>> {
        self.widgets.get(id).cloned()
    }
}
