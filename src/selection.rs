//! Selected item keys.
//!
//! Set semantics (duplicates are ignored) with insertion order kept, so that
//! link/unlink can treat the first selected key as the source. Every mutating
//! call notifies subscribers synchronously before it returns.

use std::sync::RwLock;

use graphnote_types::ItemKey;

use crate::events::{read, write, Subject, SubscriptionId};

#[derive(Default)]
pub struct SelectionSet {
    keys: RwLock<Vec<ItemKey>>,
    changes: Subject<SelectionSet>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, key: ItemKey) {
        self.add_all([key]);
    }

    /// Add several keys with a single change notification.
    pub fn add_all(&self, keys: impl IntoIterator<Item = ItemKey>) {
        {
            let mut selected = write(&self.keys);
            for key in keys {
                if !selected.contains(&key) {
                    selected.push(key);
                }
            }
        }
        self.changes.notify(self);
    }

    /// Empty the selection, returning what was selected.
    pub fn clear(&self) -> Vec<ItemKey> {
        let cleared = std::mem::take(&mut *write(&self.keys));
        self.changes.notify(self);
        cleared
    }

    pub fn count(&self) -> usize {
        read(&self.keys).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.keys).is_empty()
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        read(&self.keys).contains(key)
    }

    pub fn keys(&self) -> Vec<ItemKey> {
        read(&self.keys).clone()
    }

    pub fn subscribe(
        &self,
        handler: impl Fn(&SelectionSet) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.changes.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.changes.unsubscribe(id)
    }
}
