//! Composition root.
//!
//! Builds and wires every component, then hands the wired graph to whoever
//! drives it (a view layer, the CLI, tests). Nothing is global: two `App`s in
//! one process are fully independent.

use std::sync::Arc;

use graphnote_client::RemoteGraphClient;
use tracing::{debug, info};

use crate::action::{default_actions, ActionContext, ActionRegistry};
use crate::config::GraphnoteConfig;
use crate::editor::{EditorSession, EditorState};
use crate::error::Result;
use crate::events::{ViewEventEmitter, ViewEventReceiver};
use crate::item_manager::ItemManager;
use crate::selection::SelectionSet;
use crate::service_items::ServiceItems;

const SAVE_ACTION: &str = "itemSave";

pub struct App {
    config: GraphnoteConfig,
    selection: Arc<SelectionSet>,
    editor: Arc<EditorState>,
    items: Arc<ItemManager>,
    actions: ActionRegistry,
}

impl App {
    /// Wire the components. The receiver is the view layer's end of the
    /// event stream.
    pub fn new(config: GraphnoteConfig, client: Arc<dyn RemoteGraphClient>) -> (Self, ViewEventReceiver) {
        let (events, receiver) = ViewEventEmitter::new();
        let selection = Arc::new(SelectionSet::new());
        let editor = Arc::new(EditorState::new());
        let items = Arc::new(ItemManager::new(
            client,
            &config,
            Arc::clone(&selection),
            events,
        ));
        let actions = ActionRegistry::new(ActionContext::new(
            Arc::clone(&items),
            Arc::clone(&selection),
            Arc::clone(&editor),
        ));

        let app = Self {
            config,
            selection,
            editor,
            items,
            actions,
        };
        (app, receiver)
    }

    /// Register the default actions and load the repository.
    pub async fn start(&self) -> Result<ServiceItems> {
        self.actions.register_all(default_actions())?;
        let service_items = self.items.load_repo().await?;
        info!(
            actions = self.actions.all().len(),
            enabled = self.actions.enabled_ids().len(),
            "graphnote started"
        );
        Ok(service_items)
    }

    pub async fn apply(&self, id: &str) -> Result<()> {
        self.actions.apply(id).await
    }

    /// Hide the editor. Unsaved edits are saved first; if that fails the
    /// session stays open and the error is returned.
    pub async fn close_editor(&self) -> Result<Option<EditorSession>> {
        if self.editor.is_dirty() {
            debug!("saving editor before close");
            self.apply(SAVE_ACTION).await?;
        }
        Ok(self.editor.close())
    }

    pub fn config(&self) -> &GraphnoteConfig {
        &self.config
    }

    pub fn selection(&self) -> &Arc<SelectionSet> {
        &self.selection
    }

    pub fn editor(&self) -> &Arc<EditorState> {
        &self.editor
    }

    pub fn items(&self) -> &Arc<ItemManager> {
        &self.items
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }
}
