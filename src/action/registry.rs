//! Action table keyed by id.
//!
//! Registration evaluates the action once and subscribes exactly one handler
//! per trigger subject. Handlers hold weak references only: subjects live
//! inside the components the handlers read, so a strong reference would keep
//! both alive forever. `unregister` removes the handlers again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use tracing::{debug, info, warn};

use super::{Action, ActionContext, ActionMeta, Triggers, WeakActionContext};
use crate::error::{ActionError, Result};
use crate::events::{read, write, Subject, SubscriptionId};

/// An action plus its current enablement and trigger subscriptions.
pub struct RegisteredAction {
    action: Arc<dyn Action>,
    enabled: AtomicBool,
    subscriptions: Mutex<Vec<(Triggers, SubscriptionId)>>,
}

impl RegisteredAction {
    fn new(action: Arc<dyn Action>) -> Self {
        Self {
            action,
            enabled: AtomicBool::new(false),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &'static str {
        self.action.meta().id
    }

    pub fn meta(&self) -> &ActionMeta {
        self.action.meta()
    }

    pub fn triggers(&self) -> Triggers {
        self.action.triggers()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Run `evaluate` and store the result. Returns true if the state flipped.
    fn reevaluate(&self, ctx: &ActionContext) -> bool {
        let enabled = self.action.evaluate(ctx);
        self.enabled.swap(enabled, Ordering::SeqCst) != enabled
    }

    fn take_subscriptions(&self) -> Vec<(Triggers, SubscriptionId)> {
        std::mem::take(
            &mut *self
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn store_subscriptions(&self, subscriptions: Vec<(Triggers, SubscriptionId)>) {
        *self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = subscriptions;
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for RegisteredAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredAction")
            .field("id", &self.id())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

pub struct ActionRegistry {
    context: ActionContext,
    actions: RwLock<Vec<Arc<RegisteredAction>>>,
    added: Arc<Subject<RegisteredAction>>,
    state_changes: Arc<Subject<RegisteredAction>>,
}

impl ActionRegistry {
    pub fn new(context: ActionContext) -> Self {
        Self {
            context,
            actions: RwLock::new(Vec::new()),
            added: Arc::new(Subject::new()),
            state_changes: Arc::new(Subject::new()),
        }
    }

    pub fn context(&self) -> &ActionContext {
        &self.context
    }

    pub fn register(&self, action: Arc<dyn Action>) -> Result<Arc<RegisteredAction>> {
        let id = action.meta().id;
        if self.get(id).is_some() {
            return Err(ActionError::Duplicate { id: id.to_string() }.into());
        }

        let entry = Arc::new(RegisteredAction::new(action));
        entry.reevaluate(&self.context);

        let subscriptions = self.subscribe_triggers(&entry);
        entry.store_subscriptions(subscriptions);

        write(&self.actions).push(Arc::clone(&entry));
        debug!(
            action = id,
            enabled = entry.is_enabled(),
            triggers = ?entry.triggers(),
            "action registered"
        );
        self.added.notify(&entry);
        Ok(entry)
    }

    pub fn register_all(
        &self,
        actions: impl IntoIterator<Item = Arc<dyn Action>>,
    ) -> Result<()> {
        for action in actions {
            self.register(action)?;
        }
        Ok(())
    }

    /// Remove an action and its trigger handlers.
    pub fn unregister(&self, id: &str) -> Result<Arc<RegisteredAction>> {
        let entry = {
            let mut actions = write(&self.actions);
            let index = actions
                .iter()
                .position(|entry| entry.id() == id)
                .ok_or_else(|| ActionError::Unknown { id: id.to_string() })?;
            actions.remove(index)
        };

        for (trigger, subscription) in entry.take_subscriptions() {
            let removed = if trigger == Triggers::SELECTION {
                self.context.selection.unsubscribe(subscription)
            } else if trigger == Triggers::GRAPH {
                self.context.items.unsubscribe(subscription)
            } else {
                self.context.editor.unsubscribe(subscription)
            };
            if !removed {
                warn!(action = id, ?trigger, "trigger handler was already gone");
            }
        }
        debug!(action = id, "action unregistered");
        Ok(entry)
    }

    /// Execute an enabled action.
    pub async fn apply(&self, id: &str) -> Result<()> {
        let entry = self
            .get(id)
            .ok_or_else(|| ActionError::Unknown { id: id.to_string() })?;
        if !entry.is_enabled() {
            return Err(ActionError::Disabled { id: id.to_string() }.into());
        }

        info!(action = id, "applying action");
        let action = Arc::clone(&entry.action);
        action.execute(&self.context).await.inspect_err(|err| {
            warn!(action = id, error = %err, "action failed");
        })
    }

    pub fn is_enabled(&self, id: &str) -> Result<bool> {
        self.get(id)
            .map(|entry| entry.is_enabled())
            .ok_or_else(|| ActionError::Unknown { id: id.to_string() }.into())
    }

    pub fn get(&self, id: &str) -> Option<Arc<RegisteredAction>> {
        read(&self.actions)
            .iter()
            .find(|entry| entry.id() == id)
            .cloned()
    }

    /// All actions in registration order.
    pub fn all(&self) -> Vec<Arc<RegisteredAction>> {
        read(&self.actions).clone()
    }

    /// Ids of the currently enabled actions.
    pub fn enabled_ids(&self) -> Vec<&'static str> {
        read(&self.actions)
            .iter()
            .filter(|entry| entry.is_enabled())
            .map(|entry| entry.id())
            .collect()
    }

    /// Called for every newly registered action.
    pub fn on_added(
        &self,
        handler: impl Fn(&RegisteredAction) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.added.subscribe(handler)
    }

    /// Called whenever an action flips between enabled and disabled.
    pub fn on_state_change(
        &self,
        handler: impl Fn(&RegisteredAction) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.state_changes.subscribe(handler)
    }

    fn subscribe_triggers(&self, entry: &Arc<RegisteredAction>) -> Vec<(Triggers, SubscriptionId)> {
        let triggers = entry.triggers();
        let mut subscriptions = Vec::new();

        if triggers.contains(Triggers::SELECTION) {
            let handler = self.trigger_handler(entry);
            let id = self.context.selection.subscribe(move |_| handler());
            subscriptions.push((Triggers::SELECTION, id));
        }
        if triggers.contains(Triggers::GRAPH) {
            let handler = self.trigger_handler(entry);
            let id = self.context.items.subscribe(move |_| handler());
            subscriptions.push((Triggers::GRAPH, id));
        }
        if triggers.contains(Triggers::EDITOR) {
            let handler = self.trigger_handler(entry);
            let id = self.context.editor.subscribe(move |_| handler());
            subscriptions.push((Triggers::EDITOR, id));
        }
        subscriptions
    }

    fn trigger_handler(&self, entry: &Arc<RegisteredAction>) -> impl Fn() + Send + Sync + 'static {
        let entry: Weak<RegisteredAction> = Arc::downgrade(entry);
        let context: WeakActionContext = self.context.downgrade();
        let changes = Arc::downgrade(&self.state_changes);
        move || {
            let (Some(entry), Some(context)) = (entry.upgrade(), context.upgrade()) else {
                return;
            };
            if entry.reevaluate(&context) {
                debug!(action = entry.id(), enabled = entry.is_enabled(), "action state changed");
                if let Some(changes) = changes.upgrade() {
                    changes.notify(&entry);
                }
            }
        }
    }
}
