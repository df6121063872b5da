//! A value kept in memory and written through to a key-value store.
//!
//! The in-memory value is decided once at construction: stored value, else
//! the initial value, else empty (`None`). After that the store is only read
//! again by [`PersistentCell::hydrate`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{de::DeserializeOwned, Serialize};

use lscell_codec::{decode, encode};

use crate::error::CellError;
use crate::observer::{Listeners, SubscriptionId};
use crate::options::{CellOptions, SeedPolicy};
use crate::store::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Uninitialized,
    Hydrated,
}

/// New value for a cell: either the value itself, or computed from the previous one
pub enum SetAction<'a, T> {
    Value(T),
    Update(Box<dyn FnOnce(Option<&T>) -> T + 'a>),
}
impl<'a, T> SetAction<'a, T> {
    pub fn update(f: impl FnOnce(Option<&T>) -> T + 'a) -> Self {
        Self::Update(Box::new(f))
    }
}
impl<T> From<T> for SetAction<'_, T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

struct Inner<T, S> {
    store: S,
    options: CellOptions,
    initial: Option<T>,
    value: Option<T>,
    phase: Phase,
    listeners: Listeners<Listener<T, S>>,
}

/// Change callback. Gets the cell it is registered on, so it never needs to
/// own a handle to it.
type Listener<T, S> = dyn Fn(&PersistentCell<T, S>, Option<&T>);

pub struct PersistentCell<T, S> {
    key: Rc<str>,
    inner: Rc<RefCell<Inner<T, S>>>,
}

impl<T, S> Clone for PersistentCell<T, S> {
    fn clone(&self) -> Self {
        Self {
            key: Rc::clone(&self.key),
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, S> fmt::Debug for PersistentCell<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("PersistentCell")
            .field("key", &self.key)
            .field("phase", &inner.phase)
            .field("options", &inner.options)
            .finish_non_exhaustive()
    }
}

/// Read and decode the stored entry. Read and decode failures are logged
/// and reported as a missing entry.
fn load<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(raw) => raw?,
        Err(err) => {
            log::warn!("Unable to read {:?}: {}", key, err);
            return None;
        }
    };

    match decode(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("Ignoring stored value of {:?}: {}", key, err);
            None
        }
    }
}

impl<T, S> PersistentCell<T, S>
where
    T: Serialize + DeserializeOwned + Clone + 'static,
    S: KeyValueStore,
{
    /// Cell without an initial value
    pub fn new(store: S, key: impl Into<String>) -> Result<Self, CellError> {
        Self::open(key.into(), store, None, CellOptions::default())
    }

    pub fn with_initial(store: S, key: impl Into<String>, initial: T) -> Result<Self, CellError> {
        Self::open(key.into(), store, Some(initial), CellOptions::default())
    }

    pub(crate) fn open(
        key: String,
        store: S,
        initial: Option<T>,
        options: CellOptions,
    ) -> Result<Self, CellError> {
        if key.is_empty() {
            return Err(CellError::EmptyKey);
        }

        let value = load(&store, &key).or_else(|| initial.clone());
        log::debug!("Opened cell {:?} (stored or initial: {})", key, value.is_some());

        let cell = Self {
            key: key.into(),
            inner: Rc::new(RefCell::new(Inner {
                store,
                options,
                initial,
                value,
                phase: Phase::Uninitialized,
                listeners: Listeners::default(),
            })),
        };

        if options.hydrate_on_build {
            cell.hydrate();
        }

        Ok(cell)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn options(&self) -> CellOptions {
        self.inner.borrow().options
    }

    pub fn phase(&self) -> Phase {
        self.inner.borrow().phase
    }

    pub fn initial(&self) -> Option<T> {
        self.inner.borrow().initial.clone()
    }

    /// Current in-memory value. Does not touch the store.
    pub fn read(&self) -> Option<T> {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value without cloning it.
    ///
    /// Panics if `f` writes to this cell.
    pub fn with_value<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.inner.borrow().value.as_ref())
    }

    /// Set the value, logging store failures
    pub fn set(&self, value: T) {
        self.apply(SetAction::Value(value));
    }

    /// Compute the value from the previous one, logging store failures
    pub fn update(&self, f: impl FnOnce(Option<&T>) -> T) {
        self.apply(SetAction::update(f));
    }

    pub fn apply<'a>(&self, action: impl Into<SetAction<'a, T>>)
    where
        T: 'a,
    {
        if let Err(err) = self.try_apply(action) {
            log::warn!("Failed to persist {:?}: {}", self.key, err);
        }
    }

    pub fn try_set(&self, value: T) -> Result<(), CellError> {
        self.try_apply(SetAction::Value(value))
    }

    pub fn try_update(&self, f: impl FnOnce(Option<&T>) -> T) -> Result<(), CellError> {
        self.try_apply(SetAction::update(f))
    }

    /// Update the in-memory value, then persist it.
    ///
    /// The in-memory value changes even when persisting fails.
    pub fn try_apply<'a>(&self, action: impl Into<SetAction<'a, T>>) -> Result<(), CellError>
    where
        T: 'a,
    {
        let action: SetAction<'a, T> = action.into();
        let next = match action {
            SetAction::Value(value) => value,
            SetAction::Update(f) => {
                // No borrow is held while `f` runs, it may use the cell
                let previous = self.read();
                f(previous.as_ref())
            }
        };

        let result = {
            let mut inner = self.inner.borrow_mut();
            let result = inner.persist(&self.key, &next);
            inner.value = Some(next);
            result
        };

        self.notify();
        result
    }

    /// Reset to the initial value and remove the stored entry, logging store failures
    pub fn clear(&self) {
        if let Err(err) = self.try_clear() {
            log::warn!("Failed to remove {:?}: {}", self.key, err);
        }
    }

    pub fn try_clear(&self) -> Result<(), CellError> {
        let result = {
            let mut inner = self.inner.borrow_mut();
            inner.value = inner.initial.clone();
            inner.store.remove(&self.key)
        };
        log::debug!("Cleared {:?}", self.key);

        self.notify();
        result.map_err(CellError::from)
    }

    /// Re-read the store once after construction.
    ///
    /// A stored value replaces the in-memory one. Without a stored value the
    /// [`SeedPolicy`] decides whether the initial value is written. Returns
    /// `false` if the cell was already hydrated.
    pub fn hydrate(&self) -> bool {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            if inner.phase == Phase::Hydrated {
                return false;
            }
            inner.phase = Phase::Hydrated;
            inner.resync(&self.key)
        };
        log::debug!("Hydrated {:?}, changed: {}", self.key, changed);

        if changed {
            self.notify();
        }
        true
    }

    /// Register `f` to run after every in-memory change.
    ///
    /// `f` is called with this cell and its new value, and may read, write,
    /// clear, subscribe or unsubscribe through that handle.
    pub fn subscribe(
        &self,
        f: impl Fn(&PersistentCell<T, S>, Option<&T>) + 'static,
    ) -> SubscriptionId {
        self.inner.borrow_mut().listeners.add(Rc::new(f))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().listeners.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Current value, a setter and a clear function, all sharing this cell
    pub fn split(&self) -> (Option<T>, Setter<T, S>, Clearer<T, S>) {
        (
            self.read(),
            Setter { cell: self.clone() },
            Clearer { cell: self.clone() },
        )
    }

    fn notify(&self) {
        let (callbacks, value) = {
            let inner = self.inner.borrow();
            (inner.listeners.snapshot(), inner.value.clone())
        };
        for callback in callbacks {
            callback(self, value.as_ref());
        }
    }
}

impl<T, S> Inner<T, S>
where
    T: Serialize + DeserializeOwned,
    S: KeyValueStore,
{
    fn persist(&self, key: &str, value: &T) -> Result<(), CellError> {
        let raw = encode(value, self.options.encoding)?;
        self.store.set(key, &raw)?;
        log::debug!("Stored {:?} = {:?}", key, raw);
        Ok(())
    }

    /// Returns true if the in-memory value was replaced
    fn resync(&mut self, key: &str) -> bool {
        let raw = match self.store.get(key) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("Unable to read {:?} during hydration: {}", key, err);
                return false;
            }
        };

        match raw {
            Some(raw) => {
                let current = self
                    .value
                    .as_ref()
                    .and_then(|value| encode(value, self.options.encoding).ok());
                if current.as_deref() == Some(raw.as_str()) {
                    return false;
                }
                match decode(&raw) {
                    Ok(value) => {
                        self.value = Some(value);
                        true
                    }
                    Err(err) => {
                        log::warn!("Ignoring stored value of {:?}: {}", key, err);
                        false
                    }
                }
            }
            None => {
                if self.options.seed == SeedPolicy::SeedInitial {
                    if let Some(initial) = &self.initial {
                        if let Err(err) = self.persist(key, initial) {
                            log::warn!("Failed to seed {:?}: {}", key, err);
                        }
                    }
                }
                false
            }
        }
    }
}

/// Setter half of [`PersistentCell::split`]
pub struct Setter<T, S> {
    cell: PersistentCell<T, S>,
}

impl<T, S> Clone for Setter<T, S> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T, S> Setter<T, S>
where
    T: Serialize + DeserializeOwned + Clone + 'static,
    S: KeyValueStore,
{
    pub fn set(&self, value: T) {
        self.cell.set(value);
    }

    pub fn update(&self, f: impl FnOnce(Option<&T>) -> T) {
        self.cell.update(f);
    }

    pub fn call<'a>(&self, action: impl Into<SetAction<'a, T>>)
    where
        T: 'a,
    {
        self.cell.apply(action);
    }

    pub fn try_set(&self, value: T) -> Result<(), CellError> {
        self.cell.try_set(value)
    }

    pub fn try_update(&self, f: impl FnOnce(Option<&T>) -> T) -> Result<(), CellError> {
        self.cell.try_update(f)
    }
}

/// Clear half of [`PersistentCell::split`]
pub struct Clearer<T, S> {
    cell: PersistentCell<T, S>,
}

impl<T, S> Clone for Clearer<T, S> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T, S> Clearer<T, S>
where
    T: Serialize + DeserializeOwned + Clone + 'static,
    S: KeyValueStore,
{
    pub fn clear(&self) {
        self.cell.clear();
    }

    pub fn try_clear(&self) -> Result<(), CellError> {
        self.cell.try_clear()
    }
}
