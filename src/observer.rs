use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);
impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}
impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Change callbacks, in subscription order
pub(crate) struct Listeners<C: ?Sized> {
    callbacks: Vec<(SubscriptionId, Rc<C>)>,
}

impl<C: ?Sized> Default for Listeners<C> {
    fn default() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }
}

impl<C: ?Sized> Listeners<C> {
    pub fn add(&mut self, callback: Rc<C>) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.callbacks.push((id, callback));
        id
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(other, _)| *other != id);
        self.callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Callbacks to run for one change. Taken as a copy so that they can
    /// subscribe or unsubscribe while being run.
    pub fn snapshot(&self) -> Vec<Rc<C>> {
        self.callbacks
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect()
    }
}
