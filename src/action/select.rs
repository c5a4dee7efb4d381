//! Selection actions.

use async_trait::async_trait;
use graphnote_types::ItemKey;

use super::{Action, ActionContext, ActionMeta, Triggers};
use crate::error::Result;

const GROUP: &str = "select";

/// Keys of `universe` not in `selected`, in universe order.
pub fn invert(selected: &[ItemKey], universe: &[ItemKey]) -> Vec<ItemKey> {
    universe
        .iter()
        .filter(|key| !selected.contains(key))
        .cloned()
        .collect()
}

const SELECT_NONE: ActionMeta = ActionMeta {
    id: "selectNone",
    label: "None",
    icon: "mdi mdi-checkbox-blank-outline",
    group: GROUP,
};

pub struct SelectNone;

#[async_trait]
impl Action for SelectNone {
    fn meta(&self) -> &ActionMeta {
        &SELECT_NONE
    }

    fn triggers(&self) -> Triggers {
        Triggers::SELECTION
    }

    fn evaluate(&self, ctx: &ActionContext) -> bool {
        !ctx.selection.is_empty()
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        ctx.selection.clear();
        Ok(())
    }
}

const SELECT_INVERT: ActionMeta = ActionMeta {
    id: "selectInvert",
    label: "Invert",
    icon: "mdi mdi-invert-colors",
    group: GROUP,
};

/// Replace the selection by every other visible item.
///
/// Disabled for an empty and for a full selection, where inverting would
/// select nothing.
pub struct SelectInvert;

#[async_trait]
impl Action for SelectInvert {
    fn meta(&self) -> &ActionMeta {
        &SELECT_INVERT
    }

    fn triggers(&self) -> Triggers {
        Triggers::SELECTION | Triggers::GRAPH
    }

    fn evaluate(&self, ctx: &ActionContext) -> bool {
        let selected = ctx.selection.count();
        selected > 0 && selected < ctx.items.item_count()
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        let unselect = ctx.selection.clear();
        let universe = ctx.items.item_keys();
        ctx.selection.add_all(invert(&unselect, &universe));
        Ok(())
    }
}

const SELECT_CHILDREN: ActionMeta = ActionMeta {
    id: "selectChildren",
    label: "Children",
    icon: "mdi mdi-file-tree",
    group: GROUP,
};

pub struct SelectChildren;

#[async_trait]
impl Action for SelectChildren {
    fn meta(&self) -> &ActionMeta {
        &SELECT_CHILDREN
    }

    fn triggers(&self) -> Triggers {
        Triggers::SELECTION
    }

    fn evaluate(&self, ctx: &ActionContext) -> bool {
        !ctx.selection.is_empty()
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        let parents = ctx.selection.clear();
        let children: Vec<ItemKey> = parents
            .iter()
            .flat_map(|parent| ctx.items.visible_linked(parent))
            .collect();
        ctx.selection.add_all(children);
        Ok(())
    }
}
