//! Change subjects and the view event stream.
//!
//! Two mechanisms live here:
//!
//! - [`Subject`]: synchronous observer list. `notify` runs every handler
//!   before returning. Handlers are called outside the internal lock, so a
//!   handler may read from (or subscribe to) the subject's owner.
//! - [`ViewEventEmitter`]: non-blocking channel carrying [`ViewEvent`]s to
//!   the excluded view layer. Views render the latest payload; they never
//!   apply events incrementally.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use graphnote_types::{GraphProjection, ItemKey};
use serde::Serialize;
use serde_json::Value;

use crate::service_items::ItemType;

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// SUBJECT
// =============================================================================

/// Handle returned by [`Subject::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Subject<T: ?Sized> {
    handlers: RwLock<Vec<(SubscriptionId, Handler<T>)>>,
    next_id: AtomicU64,
}

impl<T: ?Sized> Default for Subject<T> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T: ?Sized> Subject<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        write(&self.handlers).push((id, Arc::new(handler)));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = write(&self.handlers);
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub fn notify(&self, value: &T) {
        let handlers: Vec<Handler<T>> = read(&self.handlers)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        read(&self.handlers).len()
    }
}

// =============================================================================
// VIEW EVENTS
// =============================================================================

/// Sub-collections touched by the operation behind an `UpdateView`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemsDelta {
    pub tags: Vec<ItemKey>,
    pub notes: Vec<ItemKey>,
}

impl ItemsDelta {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn created(item_type: ItemType, key: ItemKey) -> Self {
        let mut delta = Self::default();
        match item_type {
            ItemType::Tag => delta.tags.push(key),
            ItemType::Note => delta.notes.push(key),
        }
        delta
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.notes.is_empty()
    }
}

/// Payload for opening the editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorPayload {
    pub value: Value,
    pub key: ItemKey,
    pub title: String,
}

/// Events raised toward the view layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ViewEvent {
    AddSelection {
        key: ItemKey,
    },
    ShowEditor(EditorPayload),
    UpdateView {
        graph: Arc<GraphProjection>,
        delta: ItemsDelta,
    },
    SaveEditor,
    ShowList {
        title: String,
        values: BTreeMap<ItemKey, Value>,
    },
}

impl ViewEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ViewEvent::AddSelection { .. } => "addSelection",
            ViewEvent::ShowEditor(_) => "showEditor",
            ViewEvent::UpdateView { .. } => "updateView",
            ViewEvent::SaveEditor => "saveEditor",
            ViewEvent::ShowList { .. } => "showList",
        }
    }
}

// =============================================================================
// EMITTER
// =============================================================================

/// Non-blocking view event emitter.
///
/// `emit()` never blocks and never fails; events sent after the receiver is
/// gone are counted as dropped.
pub struct ViewEventEmitter {
    sender: Sender<ViewEvent>,

    // Stats (atomic, no locks)
    events_emitted: AtomicU64,
    events_dropped: AtomicU64,
}

/// Emitter statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterStats {
    pub emitted: u64,
    pub dropped: u64,
}

impl ViewEventEmitter {
    /// Create an emitter and the receiver handed to the view layer.
    pub fn new() -> (Self, ViewEventReceiver) {
        let (sender, receiver) = unbounded();
        let emitter = Self {
            sender,
            events_emitted: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
        };
        (emitter, ViewEventReceiver { receiver })
    }

    pub fn emit(&self, event: ViewEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {
                self.events_emitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.events_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> EmitterStats {
        EmitterStats {
            emitted: self.events_emitted.load(Ordering::Relaxed),
            dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}

/// View-side end of the event stream.
pub struct ViewEventReceiver {
    receiver: Receiver<ViewEvent>,
}

impl ViewEventReceiver {
    /// Next pending event, if any.
    pub fn try_next(&self) -> Option<ViewEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// All pending events, oldest first.
    pub fn drain(&self) -> Vec<ViewEvent> {
        self.receiver.try_iter().collect()
    }
}
