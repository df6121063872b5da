#![deny(unused_must_use)]

//! Values that live in memory and are written through to a persistent
//! string key-value store.
//!
//! ```
//! use lscell::{MemoryStore, PersistentCell};
//!
//! let store = MemoryStore::new();
//! let cell = PersistentCell::with_initial(&store, "volume", 5u8).unwrap();
//! cell.update(|prev| prev.copied().unwrap_or_default() + 1);
//! assert_eq!(cell.read(), Some(6));
//!
//! cell.clear();
//! assert_eq!(cell.read(), Some(5));
//! ```

mod cell;
mod error;
mod file_store;
mod memory_store;
mod observer;
mod options;
mod store;

use serde::{de::DeserializeOwned, Serialize};

pub use lscell_codec as codec;
pub use lscell_codec::Encoding;

pub use self::cell::{Clearer, PersistentCell, Phase, SetAction, Setter};
pub use self::error::CellError;
pub use self::file_store::FileStore;
pub use self::memory_store::MemoryStore;
pub use self::observer::SubscriptionId;
pub use self::options::{CellBuilder, CellOptions, SeedPolicy};
pub use self::store::{KeyValueStore, StoreError};

/// Current value, setter and clear function for `key`, with default options
pub fn create<T, S>(
    store: S,
    key: &str,
    initial: Option<T>,
) -> Result<(Option<T>, Setter<T, S>, Clearer<T, S>), CellError>
where
    T: Serialize + DeserializeOwned + Clone + 'static,
    S: KeyValueStore,
{
    let builder = CellBuilder::new(key);
    let builder = match initial {
        Some(value) => builder.initial(value),
        None => builder,
    };
    Ok(builder.build(store)?.split())
}
