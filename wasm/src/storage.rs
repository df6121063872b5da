//! Browser storage as a `KeyValueStore`

use lscell::{KeyValueStore, StoreError};
use wasm_bindgen::JsValue;

/// `localStorage` or `sessionStorage` of the current window
#[derive(Debug, Clone)]
pub struct WebStorage {
    storage: web_sys::Storage,
}

impl WebStorage {
    pub fn local() -> Result<Self, StoreError> {
        let storage = web_sys::window()
            .ok_or(StoreError::NotAvailable)?
            .local_storage()
            .map_err(|_| StoreError::NotAvailable)?
            .ok_or(StoreError::NotAvailable)?;
        Ok(Self { storage })
    }

    pub fn session() -> Result<Self, StoreError> {
        let storage = web_sys::window()
            .ok_or(StoreError::NotAvailable)?
            .session_storage()
            .map_err(|_| StoreError::NotAvailable)?
            .ok_or(StoreError::NotAvailable)?;
        Ok(Self { storage })
    }
}

/// DOMExceptions (e.g. `QuotaExceededError`) carry their reason in `name`/`message`
fn rejected(err: JsValue) -> StoreError {
    let reason = js_sys::Reflect::get(&err, &JsValue::from_str("name"))
        .ok()
        .and_then(|name| name.as_string())
        .unwrap_or_else(|| format!("{:?}", err));
    StoreError::Rejected(reason)
}

impl KeyValueStore for WebStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage.get_item(key).map_err(rejected)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage.set_item(key, value).map_err(rejected)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.storage.remove_item(key).map_err(rejected)
    }
}
