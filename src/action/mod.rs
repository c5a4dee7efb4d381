//! User-invocable actions with reactive enablement.
//!
//! Each action is a two-state machine (`enabled` / `disabled`). `evaluate`
//! is the only transition function; the [`ActionRegistry`] runs it once at
//! registration and again whenever one of the subjects named by the action's
//! [`Triggers`] fires.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use bitflags::bitflags;

use crate::editor::EditorState;
use crate::error::Result;
use crate::item_manager::ItemManager;
use crate::selection::SelectionSet;

pub mod item;
pub mod registry;
pub mod select;

pub use registry::{ActionRegistry, RegisteredAction};

bitflags! {
    /// Change subjects an action re-evaluates on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Triggers: u8 {
        const NONE = 0;

        /// Selection added to or cleared.
        const SELECTION = 1 << 0;

        /// Cached projection replaced.
        const GRAPH = 1 << 1;

        /// Editor session opened, edited, saved or closed.
        const EDITOR = 1 << 2;
    }
}

/// Static description shown by the actions panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionMeta {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub group: &'static str,
}

/// Components an action reads and drives.
#[derive(Clone)]
pub struct ActionContext {
    pub items: Arc<ItemManager>,
    pub selection: Arc<SelectionSet>,
    pub editor: Arc<EditorState>,
}

impl ActionContext {
    pub fn new(
        items: Arc<ItemManager>,
        selection: Arc<SelectionSet>,
        editor: Arc<EditorState>,
    ) -> Self {
        Self {
            items,
            selection,
            editor,
        }
    }

    /// Non-owning handle for handlers stored inside the subjects themselves.
    pub fn downgrade(&self) -> WeakActionContext {
        WeakActionContext {
            items: Arc::downgrade(&self.items),
            selection: Arc::downgrade(&self.selection),
            editor: Arc::downgrade(&self.editor),
        }
    }
}

#[derive(Clone)]
pub struct WeakActionContext {
    items: Weak<ItemManager>,
    selection: Weak<SelectionSet>,
    editor: Weak<EditorState>,
}

impl WeakActionContext {
    pub fn upgrade(&self) -> Option<ActionContext> {
        Some(ActionContext {
            items: self.items.upgrade()?,
            selection: self.selection.upgrade()?,
            editor: self.editor.upgrade()?,
        })
    }
}

#[async_trait]
pub trait Action: Send + Sync {
    fn meta(&self) -> &ActionMeta;

    fn triggers(&self) -> Triggers;

    /// Whether the action may run against the current state.
    fn evaluate(&self, ctx: &ActionContext) -> bool;

    async fn execute(&self, ctx: &ActionContext) -> Result<()>;
}

/// The action set of the editor, in menu order.
pub fn default_actions() -> Vec<Arc<dyn Action>> {
    let actions: [Arc<dyn Action>; 13] = [
        Arc::new(select::SelectNone),
        Arc::new(select::SelectInvert),
        Arc::new(select::SelectChildren),
        Arc::new(item::CreateItem::note()),
        Arc::new(item::CreateItem::tag()),
        Arc::new(item::EditItem),
        Arc::new(item::SaveItem),
        Arc::new(item::LinkItems::link()),
        Arc::new(item::LinkItems::unlink()),
        Arc::new(item::ShowChildren::expand()),
        Arc::new(item::ShowChildren::switch_context()),
        Arc::new(item::HideItems),
        Arc::new(item::RemoveItems),
    ];
    actions.into()
}
