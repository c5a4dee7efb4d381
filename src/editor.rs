//! Editor buffer shared between the editor view and the save action.

use std::sync::RwLock;

use graphnote_types::ItemKey;
use serde_json::Value;

use crate::events::{read, write, EditorPayload, Subject, SubscriptionId};

/// The item currently open in the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSession {
    pub key: ItemKey,
    pub title: String,
    pub value: Value,
    pub dirty: bool,
}

#[derive(Default)]
pub struct EditorState {
    session: RwLock<Option<EditorSession>>,
    changes: Subject<EditorState>,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an item, replacing any previous session.
    pub fn open(&self, payload: EditorPayload) {
        *write(&self.session) = Some(EditorSession {
            key: payload.key,
            title: payload.title,
            value: payload.value,
            dirty: false,
        });
        self.changes.notify(self);
    }

    /// Replace the buffer value. Returns false when nothing is open.
    pub fn update(&self, value: Value) -> bool {
        let updated = match write(&self.session).as_mut() {
            Some(session) => {
                session.dirty = session.value != value || session.dirty;
                session.value = value;
                true
            }
            None => false,
        };
        if updated {
            self.changes.notify(self);
        }
        updated
    }

    /// Record that `value` was stored for `key`.
    ///
    /// The session stays dirty when it was reopened on another item or edited
    /// again while the save was in flight. Returns whether it is now clean.
    pub fn mark_saved(&self, key: &ItemKey, value: &Value) -> bool {
        let clean = match write(&self.session).as_mut() {
            Some(session) if session.key == *key && session.value == *value => {
                session.dirty = false;
                true
            }
            _ => false,
        };
        self.changes.notify(self);
        clean
    }

    /// Close the session, discarding any unsaved value. Use
    /// [`App::close_editor`](crate::App::close_editor) to save it first.
    pub fn close(&self) -> Option<EditorSession> {
        let closed = write(&self.session).take();
        self.changes.notify(self);
        closed
    }

    pub fn current(&self) -> Option<EditorSession> {
        read(&self.session).clone()
    }

    pub fn is_dirty(&self) -> bool {
        read(&self.session)
            .as_ref()
            .map(|session| session.dirty)
            .unwrap_or(false)
    }

    pub fn subscribe(
        &self,
        handler: impl Fn(&EditorState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.changes.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.changes.unsubscribe(id)
    }
}
