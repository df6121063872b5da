use serde::{de::DeserializeOwned, Deserialize, Serialize};

use lscell_codec::Encoding;

use crate::cell::PersistentCell;
use crate::error::CellError;
use crate::store::KeyValueStore;

/// What `hydrate` does when the store has no entry for the key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Never write during hydration
    #[default]
    ReadOnly,
    /// Write the initial value, if there is one
    SeedInitial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CellOptions {
    pub encoding: Encoding,
    pub seed: SeedPolicy,
    /// Run `hydrate` as part of construction
    pub hydrate_on_build: bool,
}

impl CellOptions {
    /// Parse options from JSON, e.g. `{"encoding": "json", "seed": "seed_initial"}`.
    /// Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

pub struct CellBuilder<T> {
    key: String,
    initial: Option<T>,
    options: CellOptions,
}

impl<T> CellBuilder<T> {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            initial: None,
            options: CellOptions::default(),
        }
    }

    pub fn initial(mut self, value: T) -> Self {
        self.initial = Some(value);
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.options.encoding = encoding;
        self
    }

    pub fn seed(mut self, seed: SeedPolicy) -> Self {
        self.options.seed = seed;
        self
    }

    pub fn hydrate_on_build(mut self, hydrate: bool) -> Self {
        self.options.hydrate_on_build = hydrate;
        self
    }

    /// Replaces everything set through the individual option setters
    pub fn options(mut self, options: CellOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build<S>(self, store: S) -> Result<PersistentCell<T, S>, CellError>
    where
        T: Serialize + DeserializeOwned + Clone + 'static,
        S: KeyValueStore,
    {
        let Self {
            key,
            initial,
            options,
        } = self;
        PersistentCell::open(key, store, initial, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_from_partial_json() {
        let options = CellOptions::from_json(r#"{"seed": "seed_initial"}"#).unwrap();
        assert_eq!(
            options,
            CellOptions {
                encoding: Encoding::Mixed,
                seed: SeedPolicy::SeedInitial,
                hydrate_on_build: false,
            }
        );

        let options =
            CellOptions::from_json(r#"{"encoding": "json", "hydrate_on_build": true}"#).unwrap();
        assert_eq!(options.encoding, Encoding::Json);
        assert_eq!(options.seed, SeedPolicy::ReadOnly);
        assert!(options.hydrate_on_build);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(CellOptions::from_json(r#"{"seed": "sometimes"}"#).is_err());
    }
}
