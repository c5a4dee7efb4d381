//! Service item vocabulary.
//!
//! Bookkeeping items (root, visible-context marker, type markers) are stored
//! in the graph like any other item but never reach a view. Every filter
//! depends on their keys, so resolution either succeeds completely or fails
//! with a fatal configuration error.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use graphnote_client::{GraphApi, RemoteGraphClient};
use graphnote_types::{GraphProjection, ItemKey, RemoteValue};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::events::{read, write};

// =============================================================================
// VOCABULARY
// =============================================================================

/// User-visible item types, each backed by a marker item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Tag,
    Note,
}

impl ItemType {
    pub const ALL: [ItemType; 2] = [ItemType::Tag, ItemType::Note];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Tag => "tag",
            ItemType::Note => "note",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tag" => Ok(ItemType::Tag),
            "note" => Ok(ItemType::Note),
            other => Err(format!("unknown item type '{other}'")),
        }
    }
}

/// Names of the service items, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceName {
    Root,
    VisibleItem,
    ItemType,
    Tag,
    Note,
}

impl ServiceName {
    pub const ALL: [ServiceName; 5] = [
        ServiceName::Root,
        ServiceName::VisibleItem,
        ServiceName::ItemType,
        ServiceName::Tag,
        ServiceName::Note,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Root => "root",
            ServiceName::VisibleItem => "visibleItem",
            ServiceName::ItemType => "itemtype",
            ServiceName::Tag => "tag",
            ServiceName::Note => "note",
        }
    }

    /// Type markers hang under `itemtype` as well as under root.
    pub fn is_type_marker(&self) -> bool {
        matches!(self, ServiceName::Tag | ServiceName::Note)
    }
}

/// Resolved service item keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceItems {
    pub root: ItemKey,
    pub visible_item: ItemKey,
    pub itemtype: ItemKey,
    pub tag: ItemKey,
    pub note: ItemKey,
}

impl ServiceItems {
    pub fn get(&self, name: ServiceName) -> &ItemKey {
        match name {
            ServiceName::Root => &self.root,
            ServiceName::VisibleItem => &self.visible_item,
            ServiceName::ItemType => &self.itemtype,
            ServiceName::Tag => &self.tag,
            ServiceName::Note => &self.note,
        }
    }

    pub fn marker_for(&self, item_type: ItemType) -> &ItemKey {
        match item_type {
            ItemType::Tag => &self.tag,
            ItemType::Note => &self.note,
        }
    }

    pub fn keys(&self) -> Vec<ItemKey> {
        ServiceName::ALL
            .iter()
            .map(|name| self.get(*name).clone())
            .collect()
    }

    /// Context of the main view right after bootstrap.
    pub fn default_context(&self) -> Vec<ItemKey> {
        vec![
            self.visible_item.clone(),
            self.tag.clone(),
            self.note.clone(),
        ]
    }

    fn from_lookup(
        root: ItemKey,
        mut lookup: impl FnMut(ServiceName) -> Option<ItemKey>,
    ) -> std::result::Result<Self, ConfigError> {
        let mut take = |name: ServiceName| {
            lookup(name).ok_or_else(|| ConfigError::MissingServiceItem {
                name: name.as_str(),
                root: root.clone(),
            })
        };
        Ok(Self {
            visible_item: take(ServiceName::VisibleItem)?,
            itemtype: take(ServiceName::ItemType)?,
            tag: take(ServiceName::Tag)?,
            note: take(ServiceName::Note)?,
            root,
        })
    }
}

// =============================================================================
// FILTERING
// =============================================================================

/// Remove service keys from a fetched payload.
///
/// Graph payloads lose the items and their incident links; key lists lose the
/// keys; scalars pass through. Applying it twice changes nothing.
pub fn filter_service_items(value: RemoteValue, service_keys: &HashSet<ItemKey>) -> RemoteValue {
    match value {
        RemoteValue::Graph(graph) => RemoteValue::Graph(graph.without(service_keys)),
        RemoteValue::List(values) => RemoteValue::List(
            values
                .into_iter()
                .filter(|value| match value {
                    Value::String(key) => !service_keys.contains(&ItemKey::from(key.as_str())),
                    _ => true,
                })
                .collect(),
        ),
        scalar @ RemoteValue::Scalar(_) => scalar,
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

pub struct ServiceItemRegistry {
    root_key: ItemKey,
    resolved: RwLock<Option<ServiceItems>>,
}

impl ServiceItemRegistry {
    pub fn new(root_key: ItemKey) -> Self {
        Self {
            root_key,
            resolved: RwLock::new(None),
        }
    }

    pub fn root_key(&self) -> &ItemKey {
        &self.root_key
    }

    pub fn get(&self) -> Option<ServiceItems> {
        read(&self.resolved).clone()
    }

    pub fn require(&self) -> std::result::Result<ServiceItems, ConfigError> {
        self.get().ok_or(ConfigError::NotResolved)
    }

    /// Keys to hide from every view. The root is hidden even before
    /// resolution.
    pub fn service_keys(&self) -> HashSet<ItemKey> {
        match read(&self.resolved).as_ref() {
            Some(items) => items.keys().into_iter().collect(),
            None => HashSet::from([self.root_key.clone()]),
        }
    }

    pub fn filter(&self, value: RemoteValue) -> RemoteValue {
        filter_service_items(value, &self.service_keys())
    }

    /// Initialize the vocabulary on an empty repository, discover it otherwise.
    pub async fn resolve(
        &self,
        client: &dyn RemoteGraphClient,
        first_fetch: &RemoteValue,
    ) -> Result<ServiceItems> {
        let items = if first_fetch.is_empty_repository() {
            self.initialize(client).await?
        } else {
            self.discover(client).await?
        };
        *write(&self.resolved) = Some(items.clone());
        Ok(items)
    }

    async fn initialize(&self, client: &dyn RemoteGraphClient) -> Result<ServiceItems> {
        let (fragment, items) = self.initial_fragment()?;
        info!(root = %self.root_key, items = fragment.item_count(), "initializing service items");
        client.merge(&fragment).await?;
        Ok(items)
    }

    /// Sub-graph holding the whole vocabulary, submitted as one merge.
    fn initial_fragment(&self) -> Result<(GraphProjection, ServiceItems)> {
        let mut fragment = GraphProjection::new();
        fragment.set(self.root_key.clone(), json!(ServiceName::Root.as_str()));

        let mut itemtype: Option<ItemKey> = None;
        let mut created = Vec::new();
        for name in ServiceName::ALL.into_iter().skip(1) {
            let key = fragment.set(ItemKey::generate(), json!(name.as_str()));
            fragment.associate(self.root_key.clone(), key.clone());
            if name == ServiceName::ItemType {
                itemtype = Some(key.clone());
            }
            if name.is_type_marker() {
                if let Some(parent) = &itemtype {
                    fragment.associate(parent.clone(), key.clone());
                }
            }
            created.push((name, key));
        }

        let items = ServiceItems::from_lookup(self.root_key.clone(), |wanted| {
            created
                .iter()
                .find(|(name, _)| *name == wanted)
                .map(|(_, key)| key.clone())
        })?;
        Ok((fragment, items))
    }

    async fn discover(&self, client: &dyn RemoteGraphClient) -> Result<ServiceItems> {
        let mut found = Vec::new();
        for name in ServiceName::ALL.into_iter().skip(1) {
            let matches = client.search(&self.root_key, name.as_str()).await?;
            debug!(name = name.as_str(), matches = matches.len(), "service item search");
            if let Some(first) = matches.into_iter().next() {
                found.push((name, first));
            }
        }

        let items = ServiceItems::from_lookup(self.root_key.clone(), |wanted| {
            found
                .iter()
                .find(|(name, _)| *name == wanted)
                .map(|(_, key)| key.clone())
        })?;
        info!(root = %self.root_key, "service items discovered");
        Ok(items)
    }
}
