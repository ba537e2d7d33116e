//! `calcite-combobox` elements as selection widgets.

use crate::dom;
use cv_api_types::ViewerConfig;
use cv_map_client::{ChangeListener, SelectionItem, SelectionRegistry, SelectionWidget};
use js_sys::{Array, Reflect};
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Element;

const ITEM_TAG: &str = "calcite-combobox-item";
const CHANGE_EVENT: &str = "calciteComboboxChange";

pub struct CalciteCombobox {
    id: String,
    element: Element,
}

impl CalciteCombobox {
    pub fn bind(id: &str) -> Option<Self> {
        let element = dom::by_id(id)?;
        Some(Self {
            id: id.to_owned(),
            element,
        })
    }

    fn set_prop(target: &JsValue, name: &str, value: &JsValue) {
        if let Err(err) = Reflect::set(target, &JsValue::from_str(name), value) {
            warn!("set {name}: {err:?}");
        }
    }
}

impl SelectionWidget for CalciteCombobox {
    fn id(&self) -> &str {
        &self.id
    }

    fn append_item(&self, item: SelectionItem) {
        let Some(el) = dom::create_element(ITEM_TAG) else {
            warn!(widget = %self.id, "could not create {ITEM_TAG}");
            return;
        };
        Self::set_prop(&el, "value", &JsValue::from_str(&item.value));
        Self::set_prop(&el, "textLabel", &JsValue::from_str(&item.label));
        if let Err(err) = self.element.append_child(&el) {
            warn!(widget = %self.id, "append item: {err:?}");
        }
    }

    fn first_selected(&self) -> Option<String> {
        let selected = Reflect::get(&self.element, &JsValue::from_str("selectedItems")).ok()?;
        let selected = selected.dyn_into::<Array>().ok()?;
        let first = selected.get(0);
        if first.is_undefined() {
            return None;
        }
        Reflect::get(&first, &JsValue::from_str("value"))
            .ok()?
            .as_string()
    }

    fn clear_selection(&self) {
        for item in dom::query_all_within(&self.element, ITEM_TAG) {
            Self::set_prop(&item, "selected", &JsValue::FALSE);
        }
        Self::set_prop(&self.element, "selectedItems", &Array::new());
    }

    fn on_change(&self, listener: ChangeListener) {
        let cb = Closure::wrap(Box::new(move |_: web_sys::Event| {
            listener();
        }) as Box<dyn FnMut(_)>);
        if let Err(err) = self
            .element
            .add_event_listener_with_callback(CHANGE_EVENT, cb.as_ref().unchecked_ref())
        {
            warn!(widget = %self.id, "listen for {CHANGE_EVENT}: {err:?}");
        }
        cb.forget();
    }

    fn set_max_items(&self, max_items: u32) {
        Self::set_prop(&self.element, "maxItems", &JsValue::from(max_items));
    }
}

/// Every combobox the config refers to that exists on the page.
pub fn bind_comboboxes(config: &ViewerConfig) -> SelectionRegistry {
    let mut registry = SelectionRegistry::default();
    let ids = config
        .layers
        .iter()
        .flat_map(|layer| [layer.combobox1.as_str(), layer.combobox2.as_str()])
        .filter(|id| !id.is_empty());

    for id in ids {
        if let Some(combobox) = CalciteCombobox::bind(id) {
            registry.register(Rc::new(combobox));
        }
    }
    registry
}
