//! User-visible API of the storage cell

use std::cell::RefCell;
use std::rc::Rc;

use gloo_utils::format::JsValueSerdeExt;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use lscell::{CellBuilder, CellOptions, PersistentCell};

use crate::storage::WebStorage;

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_js(value: Option<&Value>) -> JsValue {
    value
        .and_then(|value| JsValue::from_serde(value).ok())
        .unwrap_or(JsValue::NULL)
}

/// A `localStorage`-backed value
#[wasm_bindgen]
pub struct JsCell {
    cell: PersistentCell<Value, WebStorage>,
    onchange: Rc<RefCell<Option<js_sys::Function>>>,
}

#[wasm_bindgen]
impl JsCell {
    /// `initial` and `options` may be `undefined`. Options use the same
    /// field names as `CellOptions`, e.g. `{ encoding: "json" }`.
    #[wasm_bindgen(constructor)]
    pub fn new(key: String, initial: JsValue, options: JsValue) -> Result<JsCell, JsValue> {
        let options: CellOptions = if options.is_undefined() || options.is_null() {
            CellOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };

        let builder = CellBuilder::new(key).options(options);
        let builder = if initial.is_undefined() {
            builder
        } else {
            builder.initial(initial.into_serde::<Value>().map_err(to_js_error)?)
        };

        let storage = WebStorage::local().map_err(to_js_error)?;
        let cell = builder.build(storage).map_err(to_js_error)?;

        let onchange: Rc<RefCell<Option<js_sys::Function>>> = Rc::default();
        {
            let onchange = Rc::clone(&onchange);
            cell.subscribe(move |_, value| {
                // Cloned out so the callback may replace `onchange`
                let callback = onchange.borrow().clone();
                if let Some(callback) = callback {
                    if let Err(err) = callback.call1(&JsValue::NULL, &to_js(value)) {
                        crate::console_log!("onchange callback failed: {:?}", err);
                    }
                }
            });
        }

        Ok(JsCell { cell, onchange })
    }

    #[wasm_bindgen(getter)]
    pub fn key(&self) -> String {
        self.cell.key().to_owned()
    }

    #[wasm_bindgen(getter)]
    pub fn value(&self) -> JsValue {
        self.cell.with_value(to_js)
    }

    /// Called with the new value after every change
    #[wasm_bindgen(setter)]
    pub fn set_onchange(&self, value: Option<js_sys::Function>) {
        *self.onchange.borrow_mut() = value;
    }

    /// Accepts a new value, or a function from the previous value to the new one
    pub fn set(&self, value: JsValue) -> Result<(), JsValue> {
        let next = match value.dyn_ref::<js_sys::Function>() {
            Some(updater) => {
                let previous = self.value();
                updater.call1(&JsValue::NULL, &previous)?
            }
            None => value,
        };
        let next: Value = next.into_serde().map_err(to_js_error)?;
        self.cell.set(next);
        Ok(())
    }

    pub fn clear(&self) {
        self.cell.clear();
    }

    pub fn hydrate(&self) -> bool {
        self.cell.hydrate()
    }
}
