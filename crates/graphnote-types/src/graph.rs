//! Graph projection - a bounded local copy of the server graph.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// KEYS & ASSOCIATIONS
// ============================================================================

/// Opaque, globally unique item identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Fresh key for items created on the client before a `merge`.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Smallest possible key, used as a range bound.
    fn lowest() -> Self {
        Self(String::new())
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ItemKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Directed link `source -> target`.
///
/// Serialized as a two-element array `["source", "target"]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(ItemKey, ItemKey)", into = "(ItemKey, ItemKey)")]
pub struct Association {
    pub source: ItemKey,
    pub target: ItemKey,
}

impl Association {
    pub fn new(source: ItemKey, target: ItemKey) -> Self {
        Self { source, target }
    }

    pub fn touches(&self, key: &ItemKey) -> bool {
        &self.source == key || &self.target == key
    }
}

impl From<(ItemKey, ItemKey)> for Association {
    fn from((source, target): (ItemKey, ItemKey)) -> Self {
        Self { source, target }
    }
}

impl From<Association> for (ItemKey, ItemKey) {
    fn from(link: Association) -> Self {
        (link.source, link.target)
    }
}

// ============================================================================
// PROJECTION
// ============================================================================

/// Items and associations around some context, as last fetched.
///
/// Links whose endpoints fall outside the fetched neighborhood may be absent;
/// links to removed items never survive a [`GraphProjection::remove`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphProjection {
    #[serde(default)]
    items: BTreeMap<ItemKey, Value>,
    #[serde(default)]
    links: BTreeSet<Association>,
}

impl GraphProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &BTreeMap<ItemKey, Value> {
        &self.items
    }

    pub fn links(&self) -> &BTreeSet<Association> {
        &self.links
    }

    pub fn get(&self, key: &ItemKey) -> Option<&Value> {
        self.items.get(key)
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.items.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn item_keys(&self) -> Vec<ItemKey> {
        self.items.keys().cloned().collect()
    }

    /// Insert or overwrite an item, returning its key.
    pub fn set(&mut self, key: ItemKey, value: Value) -> ItemKey {
        self.items.insert(key.clone(), value);
        key
    }

    pub fn associate(&mut self, source: ItemKey, target: ItemKey) {
        self.links.insert(Association::new(source, target));
    }

    pub fn disassociate(&mut self, source: &ItemKey, target: &ItemKey) -> bool {
        self.links
            .remove(&Association::new(source.clone(), target.clone()))
    }

    /// Drop the items and every association incident to them.
    pub fn remove<'a>(&mut self, keys: impl IntoIterator<Item = &'a ItemKey>) {
        let keys: HashSet<&ItemKey> = keys.into_iter().collect();
        if keys.is_empty() {
            return;
        }
        self.items.retain(|key, _| !keys.contains(key));
        self.links
            .retain(|link| !keys.contains(&link.source) && !keys.contains(&link.target));
    }

    /// Copy of this projection with `keys` removed.
    pub fn without<'a>(&self, keys: impl IntoIterator<Item = &'a ItemKey>) -> Self {
        let mut copy = self.clone();
        copy.remove(keys);
        copy
    }

    fn targets_of<'a>(&'a self, parent: &'a ItemKey) -> impl Iterator<Item = &'a ItemKey> + 'a {
        self.links
            .range(Association::new(parent.clone(), ItemKey::lowest())..)
            .take_while(move |link| &link.source == parent)
            .map(|link| &link.target)
    }

    /// Locally known items linked from `parent`.
    pub fn linked(&self, parent: &ItemKey) -> Vec<ItemKey> {
        self.targets_of(parent)
            .filter(|key| self.items.contains_key(*key))
            .cloned()
            .collect()
    }

    /// Children of `parent` whose value is the string `name`.
    pub fn search(&self, parent: &ItemKey, name: &str) -> Vec<ItemKey> {
        self.linked(parent)
            .into_iter()
            .filter(|key| self.items.get(key).and_then(Value::as_str) == Some(name))
            .collect()
    }

    /// Fold another projection into this one; its values win.
    pub fn merge(&mut self, other: GraphProjection) {
        self.items.extend(other.items);
        self.links.extend(other.links);
    }

    /// Items reachable from `roots` within `depth` outgoing hops, with the
    /// links between them.
    pub fn neighborhood(&self, roots: &[ItemKey], depth: usize) -> GraphProjection {
        let mut included: BTreeSet<ItemKey> = roots
            .iter()
            .filter(|key| self.items.contains_key(*key))
            .cloned()
            .collect();
        let mut frontier: Vec<ItemKey> = included.iter().cloned().collect();

        for _ in 0..depth {
            let mut next = Vec::new();
            for parent in &frontier {
                for child in self.targets_of(parent) {
                    if self.items.contains_key(child) && included.insert(child.clone()) {
                        next.push(child.clone());
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        let items = included
            .iter()
            .filter_map(|key| self.items.get(key).map(|v| (key.clone(), v.clone())))
            .collect();
        let links = self
            .links
            .iter()
            .filter(|link| included.contains(&link.source) && included.contains(&link.target))
            .cloned()
            .collect();

        GraphProjection { items, links }
    }
}
