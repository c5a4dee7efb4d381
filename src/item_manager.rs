//! Item manager: owns the cached graph projection.
//!
//! Every operation that touches the server ends the same way: re-fetch the
//! neighborhood of the current context, filter it, replace the cached
//! projection wholesale and emit `UpdateView`. The cache is only replaced
//! after a successful fetch, so a failed call leaves the last good projection
//! in place.
//!
//! Overlapping operations are not serialized. A reload that refreshes the
//! current context is dropped when the context changed while it was in
//! flight, so a mutation never reverts a context switch.

use std::sync::{Arc, RwLock};

use graphnote_client::{GraphApi, RemoteGraphClient};
use graphnote_types::{GraphProjection, ItemKey, RemoteValue};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::GraphnoteConfig;
use crate::error::{ItemError, Result};
use crate::events::{
    read, write, EditorPayload, ItemsDelta, Subject, SubscriptionId, ViewEvent, ViewEventEmitter,
};
use crate::selection::SelectionSet;
use crate::service_items::{ItemType, ServiceItemRegistry, ServiceItems};

const EDIT_TITLE: &str = "Edit item";

/// Whether a reload may move the visible context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reload {
    /// Make the fetched context the visible one.
    Switch,
    /// Refresh the visible context; skipped if it moved meanwhile.
    Refresh,
}

#[derive(Default)]
struct CacheState {
    /// Keys the main view is rooted at; the first one is the primary context.
    context: Vec<ItemKey>,
    graph: Arc<GraphProjection>,
}

pub struct ItemManager {
    client: Arc<dyn RemoteGraphClient>,
    registry: ServiceItemRegistry,
    selection: Arc<SelectionSet>,
    events: ViewEventEmitter,
    depth: usize,
    state: RwLock<CacheState>,
    graph_changes: Subject<GraphProjection>,
}

impl ItemManager {
    pub fn new(
        client: Arc<dyn RemoteGraphClient>,
        config: &GraphnoteConfig,
        selection: Arc<SelectionSet>,
        events: ViewEventEmitter,
    ) -> Self {
        Self {
            client,
            registry: ServiceItemRegistry::new(config.root_key.clone()),
            selection,
            events,
            depth: config.depth,
            state: RwLock::new(CacheState::default()),
            graph_changes: Subject::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn registry(&self) -> &ServiceItemRegistry {
        &self.registry
    }

    pub fn service_items(&self) -> Option<ServiceItems> {
        self.registry.get()
    }

    pub fn events(&self) -> &ViewEventEmitter {
        &self.events
    }

    /// Current context keys.
    pub fn context(&self) -> Vec<ItemKey> {
        read(&self.state).context.clone()
    }

    /// Snapshot of the cached projection, valid until the next reload.
    pub fn graph(&self) -> Arc<GraphProjection> {
        Arc::clone(&read(&self.state).graph)
    }

    pub fn item_keys(&self) -> Vec<ItemKey> {
        read(&self.state).graph.item_keys()
    }

    pub fn item_count(&self) -> usize {
        read(&self.state).graph.item_count()
    }

    /// Keys linked from `parent` in the cached projection.
    pub fn visible_linked(&self, parent: &ItemKey) -> Vec<ItemKey> {
        read(&self.state).graph.linked(parent)
    }

    /// Called with the new projection after every replacement.
    pub fn subscribe(
        &self,
        handler: impl Fn(&GraphProjection) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.graph_changes.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.graph_changes.unsubscribe(id)
    }

    // -------------------------------------------------------------------------
    // Bootstrap
    // -------------------------------------------------------------------------

    /// Resolve the service vocabulary, then prime the main view.
    ///
    /// First run and steady state differ only in how the vocabulary is
    /// obtained; the final reload is the same.
    pub async fn load_repo(&self) -> Result<ServiceItems> {
        let root = self.registry.root_key().clone();
        let first_fetch = self
            .client
            .get_graph(std::slice::from_ref(&root), 1)
            .await?;
        debug!(
            kind = first_fetch.kind(),
            empty = first_fetch.is_empty_repository(),
            "root neighborhood fetched"
        );

        let items = self
            .registry
            .resolve(self.client.as_ref(), &first_fetch)
            .await?;

        self.reload(items.default_context(), Reload::Switch).await?;
        self.update_view(ItemsDelta::empty());
        info!(root = %root, "repository loaded");
        Ok(items)
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Show the children of the first key.
    ///
    /// `expand` lists them in the secondary view and leaves the cache alone;
    /// otherwise the first key becomes the visible context.
    pub async fn show_children(&self, keys: &[ItemKey], expand: bool) -> Result<()> {
        let first = keys.first().ok_or(ItemError::EmptyKeys {
            operation: "show_children",
        })?;

        if expand {
            let fetched = self
                .client
                .get_graph(std::slice::from_ref(first), 1)
                .await?;
            let mut graph = self.registry.filter(fetched).into_graph_or_empty()?;
            let label = graph
                .get(first)
                .map(display_value)
                .unwrap_or_else(|| first.to_string());
            graph.remove([first]);

            self.events.emit(ViewEvent::ShowList {
                title: format!("Show children for {label} context"),
                values: graph.items().clone(),
            });
        } else {
            info!(context = %first, "switching visible context");
            self.reload(vec![first.clone()], Reload::Switch).await?;
            self.update_view(ItemsDelta::empty());
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Create an item of `item_type` linked to the primary context, its type
    /// marker and whatever was selected; the new item becomes the selection.
    ///
    /// The selection only moves to the new key once the cache holds it. If
    /// either remote call fails the previous selection is restored.
    pub async fn create_item(&self, item_type: ItemType) -> Result<ItemKey> {
        let items = self.registry.require()?;
        let previous = self.selection.clear();

        let mut parents = vec![self.primary_context(&items)];
        parents.push(items.marker_for(item_type).clone());
        parents.extend(previous.iter().cloned());

        let key = match self.client.create_and_link_item(&parents).await {
            Ok(key) => key,
            Err(err) => {
                warn!(%item_type, error = %err, "create failed, restoring selection");
                self.selection.add_all(previous);
                return Err(err.into());
            }
        };

        if let Err(err) = self.reload(self.context(), Reload::Refresh).await {
            warn!(%item_type, %key, error = %err, "reload after create failed, restoring selection");
            self.selection.add_all(previous);
            return Err(err);
        }

        self.selection.add(key.clone());
        self.events
            .emit(ViewEvent::AddSelection { key: key.clone() });
        self.update_view(ItemsDelta::created(item_type, key.clone()));
        Ok(key)
    }

    /// Open a cached item for editing. No remote call.
    pub fn edit_item(&self, key: &ItemKey) -> Result<EditorPayload> {
        let value = read(&self.state)
            .graph
            .get(key)
            .cloned()
            .ok_or_else(|| ItemError::NotFound { key: key.clone() })?;

        let payload = EditorPayload {
            value,
            key: key.clone(),
            title: EDIT_TITLE.to_string(),
        };
        self.events.emit(ViewEvent::ShowEditor(payload.clone()));
        Ok(payload)
    }

    pub async fn save_item(&self, value: Value, key: &ItemKey) -> Result<ItemKey> {
        let saved = self.client.set(value, Some(key)).await?;
        self.events.emit(ViewEvent::SaveEditor);
        self.reload_view().await?;
        Ok(saved)
    }

    pub async fn remove_items(&self, keys: &[ItemKey]) -> Result<()> {
        self.client.remove(keys).await?;
        self.reload_view().await
    }

    pub async fn link_items(&self, source: &ItemKey, targets: &[ItemKey]) -> Result<()> {
        self.client.associate(source, targets).await?;
        self.reload_view().await
    }

    pub async fn unlink_items(&self, source: &ItemKey, targets: &[ItemKey]) -> Result<()> {
        self.client.set_disassociate(source, targets).await?;
        self.reload_view().await
    }

    /// Drop items from the main view until the next reload. No remote call.
    pub fn hide_items(&self, keys: &[ItemKey]) {
        let graph = {
            let mut state = write(&self.state);
            state.graph = Arc::new(state.graph.without(keys));
            Arc::clone(&state.graph)
        };
        self.graph_changes.notify(&graph);
        self.update_view(ItemsDelta::empty());
    }

    // -------------------------------------------------------------------------
    // Reload
    // -------------------------------------------------------------------------

    fn primary_context(&self, items: &ServiceItems) -> ItemKey {
        read(&self.state)
            .context
            .first()
            .cloned()
            .unwrap_or_else(|| items.visible_item.clone())
    }

    async fn reload_view(&self) -> Result<()> {
        if self.reload(self.context(), Reload::Refresh).await? {
            self.update_view(ItemsDelta::empty());
        }
        Ok(())
    }

    /// Fetch, filter and replace the cached projection for `context`.
    ///
    /// Returns false when a [`Reload::Refresh`] was dropped because the
    /// visible context changed while the fetch was in flight.
    async fn reload(&self, context: Vec<ItemKey>, mode: Reload) -> Result<bool> {
        let fetched = self.client.get_graph(&context, self.depth).await?;
        let graph = Arc::new(self.project(fetched, &context)?);

        {
            let mut state = write(&self.state);
            if mode == Reload::Refresh && state.context != context {
                debug!(stale = ?context, current = ?state.context, "context moved, refresh dropped");
                return Ok(false);
            }
            state.context = context;
            state.graph = Arc::clone(&graph);
        }
        debug!(items = graph.item_count(), links = graph.links().len(), "projection replaced");

        self.graph_changes.notify(&graph);
        Ok(true)
    }

    /// Service items and the context keys themselves never reach the view.
    fn project(&self, fetched: RemoteValue, context: &[ItemKey]) -> Result<GraphProjection> {
        let mut graph = self.registry.filter(fetched).into_graph_or_empty()?;
        graph.remove(context);
        Ok(graph)
    }

    fn update_view(&self, delta: ItemsDelta) {
        self.events.emit(ViewEvent::UpdateView {
            graph: self.graph(),
            delta,
        });
    }
}

/// Human label for an item value.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
