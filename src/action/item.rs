//! Item actions. Each one delegates to the [`ItemManager`] and, where the
//! selection no longer points at anything meaningful afterwards, clears it.
//!
//! [`ItemManager`]: crate::item_manager::ItemManager

use async_trait::async_trait;
use tracing::debug;

use super::{Action, ActionContext, ActionMeta, Triggers};
use crate::error::{ActionError, ItemError, Result};
use crate::service_items::ItemType;

const GROUP: &str = "item";

// =============================================================================
// CREATE
// =============================================================================

pub struct CreateItem {
    meta: ActionMeta,
    item_type: ItemType,
}

impl CreateItem {
    pub fn note() -> Self {
        Self {
            meta: ActionMeta {
                id: "itemCreateNote",
                label: "Note",
                icon: "mdi mdi-note-plus-outline",
                group: GROUP,
            },
            item_type: ItemType::Note,
        }
    }

    pub fn tag() -> Self {
        Self {
            meta: ActionMeta {
                id: "itemCreateTag",
                label: "Tag",
                icon: "mdi mdi-tag-plus",
                group: GROUP,
            },
            item_type: ItemType::Tag,
        }
    }
}

#[async_trait]
impl Action for CreateItem {
    fn meta(&self) -> &ActionMeta {
        &self.meta
    }

    fn triggers(&self) -> Triggers {
        Triggers::GRAPH
    }

    /// Needs the type markers, which exist once the repository is loaded.
    fn evaluate(&self, ctx: &ActionContext) -> bool {
        ctx.items.service_items().is_some()
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        ctx.items.create_item(self.item_type).await?;
        Ok(())
    }
}

// =============================================================================
// EDIT / SAVE
// =============================================================================

const ITEM_EDIT: ActionMeta = ActionMeta {
    id: "itemEdit",
    label: "Edit",
    icon: "mdi mdi-pencil",
    group: GROUP,
};

pub struct EditItem;

#[async_trait]
impl Action for EditItem {
    fn meta(&self) -> &ActionMeta {
        &ITEM_EDIT
    }

    fn triggers(&self) -> Triggers {
        Triggers::SELECTION
    }

    fn evaluate(&self, ctx: &ActionContext) -> bool {
        ctx.selection.count() == 1
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        let keys = ctx.selection.keys();
        let key = keys
            .first()
            .ok_or(ItemError::EmptyKeys { operation: "edit" })?;
        let payload = ctx.items.edit_item(key)?;
        ctx.editor.open(payload);
        Ok(())
    }
}

const ITEM_SAVE: ActionMeta = ActionMeta {
    id: "itemSave",
    label: "Save",
    icon: "mdi mdi-content-save",
    group: GROUP,
};

pub struct SaveItem;

#[async_trait]
impl Action for SaveItem {
    fn meta(&self) -> &ActionMeta {
        &ITEM_SAVE
    }

    fn triggers(&self) -> Triggers {
        Triggers::EDITOR
    }

    fn evaluate(&self, ctx: &ActionContext) -> bool {
        ctx.editor.is_dirty()
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        let session = ctx
            .editor
            .current()
            .filter(|session| session.dirty)
            .ok_or(ActionError::NothingToSave)?;
        ctx.items
            .save_item(session.value.clone(), &session.key)
            .await?;
        if !ctx.editor.mark_saved(&session.key, &session.value) {
            debug!(key = %session.key, "editor changed during save, still dirty");
        }
        Ok(())
    }
}

// =============================================================================
// LINK / UNLINK
// =============================================================================

/// Links (or unlinks) the first selected item to every other selected item.
pub struct LinkItems {
    meta: ActionMeta,
    unlink: bool,
}

impl LinkItems {
    pub fn link() -> Self {
        Self {
            meta: ActionMeta {
                id: "itemLink",
                label: "Link",
                icon: "mdi mdi-link-variant",
                group: GROUP,
            },
            unlink: false,
        }
    }

    pub fn unlink() -> Self {
        Self {
            meta: ActionMeta {
                id: "itemUnlink",
                label: "Unlink",
                icon: "mdi mdi-link-variant-off",
                group: GROUP,
            },
            unlink: true,
        }
    }
}

#[async_trait]
impl Action for LinkItems {
    fn meta(&self) -> &ActionMeta {
        &self.meta
    }

    fn triggers(&self) -> Triggers {
        Triggers::SELECTION
    }

    fn evaluate(&self, ctx: &ActionContext) -> bool {
        ctx.selection.count() >= 2
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        let keys = ctx.selection.keys();
        let (source, targets) = keys.split_first().ok_or(ItemError::EmptyKeys {
            operation: self.meta.id,
        })?;
        if self.unlink {
            ctx.items.unlink_items(source, targets).await
        } else {
            ctx.items.link_items(source, targets).await
        }
    }
}

// =============================================================================
// NAVIGATION
// =============================================================================

/// Shows the children of the selection, either listed beside the main view
/// (`itemExpand`) or as the new visible context (`itemShowChildren`).
pub struct ShowChildren {
    meta: ActionMeta,
    expand: bool,
}

impl ShowChildren {
    pub fn expand() -> Self {
        Self {
            meta: ActionMeta {
                id: "itemExpand",
                label: "Expand",
                icon: "mdi mdi-arrow-expand-all",
                group: GROUP,
            },
            expand: true,
        }
    }

    pub fn switch_context() -> Self {
        Self {
            meta: ActionMeta {
                id: "itemShowChildren",
                label: "Show children",
                icon: "mdi mdi-subdirectory-arrow-right",
                group: GROUP,
            },
            expand: false,
        }
    }
}

#[async_trait]
impl Action for ShowChildren {
    fn meta(&self) -> &ActionMeta {
        &self.meta
    }

    fn triggers(&self) -> Triggers {
        Triggers::SELECTION
    }

    fn evaluate(&self, ctx: &ActionContext) -> bool {
        let selected = ctx.selection.count();
        if self.expand {
            selected > 0
        } else {
            selected == 1
        }
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        let keys = ctx.selection.keys();
        ctx.items.show_children(&keys, self.expand).await
    }
}

// =============================================================================
// HIDE / REMOVE
// =============================================================================

const ITEM_HIDE: ActionMeta = ActionMeta {
    id: "itemHide",
    label: "Hide",
    icon: "mdi mdi-eye-off",
    group: GROUP,
};

pub struct HideItems;

#[async_trait]
impl Action for HideItems {
    fn meta(&self) -> &ActionMeta {
        &ITEM_HIDE
    }

    fn triggers(&self) -> Triggers {
        Triggers::SELECTION
    }

    fn evaluate(&self, ctx: &ActionContext) -> bool {
        !ctx.selection.is_empty()
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        let keys = ctx.selection.keys();
        ctx.items.hide_items(&keys);
        ctx.selection.clear();
        Ok(())
    }
}

const ITEM_REMOVE: ActionMeta = ActionMeta {
    id: "itemRemove",
    label: "Remove",
    icon: "mdi mdi-delete",
    group: GROUP,
};

pub struct RemoveItems;

#[async_trait]
impl Action for RemoveItems {
    fn meta(&self) -> &ActionMeta {
        &ITEM_REMOVE
    }

    fn triggers(&self) -> Triggers {
        Triggers::SELECTION
    }

    fn evaluate(&self, ctx: &ActionContext) -> bool {
        !ctx.selection.is_empty()
    }

    /// The selection survives a failed removal.
    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        let keys = ctx.selection.keys();
        ctx.items.remove_items(&keys).await?;
        ctx.selection.clear();
        Ok(())
    }
}
