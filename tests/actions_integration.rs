//! Action registry and concrete actions driven through the composition root.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use graphnote::action::select::SelectNone;
use graphnote::{ActionError, App, GraphnoteConfig, GraphnoteError, ItemKey, ViewEvent};
use graphnote_client::{InProcessGraphClient, RemoteGraphClient};
use graphnote_types::{GraphMethod, RemoteValue};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::oneshot;

async fn started() -> (Arc<InProcessGraphClient>, App, graphnote::ViewEventReceiver) {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, events) = App::new(GraphnoteConfig::default(), client.clone());
    app.start().await.unwrap();
    (client, app, events)
}

/// `count` unlinked notes in the main view, nothing selected. Sorted, which
/// is also the projection's key order.
async fn with_notes(app: &App, count: usize) -> Vec<ItemKey> {
    let mut keys = Vec::new();
    for _ in 0..count {
        app.selection().clear();
        app.apply("itemCreateNote").await.unwrap();
        keys.extend(app.selection().keys());
    }
    app.selection().clear();
    keys.sort();
    keys
}

fn enabled(app: &App, id: &str) -> bool {
    app.actions().is_enabled(id).unwrap()
}

/// In-process server whose next neighborhood fetch can be held back.
#[derive(Default)]
struct GatedClient {
    inner: InProcessGraphClient,
    gate: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
}

impl GatedClient {
    /// Hold the next `getGraph`. The first channel fires once it is waiting;
    /// sending on the second lets it through.
    fn hold_next_fetch(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (waiting_tx, waiting_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some((waiting_tx, release_rx));
        (waiting_rx, release_tx)
    }
}

#[async_trait]
impl RemoteGraphClient for GatedClient {
    async fn invoke(
        &self,
        method: GraphMethod,
        args: Vec<Value>,
    ) -> graphnote_client::Result<RemoteValue> {
        if method == GraphMethod::GetGraph {
            let gate = self.gate.lock().unwrap().take();
            if let Some((waiting, release)) = gate {
                let _ = waiting.send(());
                let _ = release.await;
            }
        }
        self.inner.invoke(method, args).await
    }
}

/// One note open in the editor with an unsaved value.
async fn editing(app: &App, value: Value) -> ItemKey {
    let note = with_notes(app, 1).await.remove(0);
    app.selection().add(note.clone());
    app.apply("itemEdit").await.unwrap();
    app.editor().update(value);
    note
}

#[tokio::test]
async fn invert_two_of_four() {
    let (_client, app, _) = started().await;
    let keys = with_notes(&app, 4).await;
    assert_eq!(app.items().item_keys(), keys);

    app.selection().add_all(keys[..2].to_vec());
    assert!(enabled(&app, "selectInvert"));

    app.apply("selectInvert").await.unwrap();

    let mut selected = app.selection().keys();
    selected.sort();
    assert_eq!(selected, keys[2..].to_vec());
    assert!(enabled(&app, "selectInvert"));
}

#[tokio::test]
async fn invert_disabled_for_empty_and_full_selection() {
    let (_client, app, _) = started().await;
    let keys = with_notes(&app, 4).await;

    assert!(!enabled(&app, "selectInvert"));

    app.selection().add_all(keys.clone());
    assert!(!enabled(&app, "selectInvert"));

    let err = app.apply("selectInvert").await.unwrap_err();
    assert!(matches!(
        err,
        GraphnoteError::Action(ActionError::Disabled { .. })
    ));
    assert_eq!(app.selection().count(), 4);
}

#[tokio::test]
async fn invert_follows_graph_changes() {
    let (_client, app, _) = started().await;
    let keys = with_notes(&app, 2).await;

    app.selection().add(keys[0].clone());
    assert!(enabled(&app, "selectInvert"));

    app.items().hide_items(&keys[1..]);
    assert!(!enabled(&app, "selectInvert"));
}

#[tokio::test]
async fn selection_count_drives_enablement() {
    let (_client, app, _) = started().await;
    let keys = with_notes(&app, 3).await;

    let expect = |on: &[&str], off: &[&str]| {
        for id in on {
            assert!(enabled(&app, id), "{id} should be enabled");
        }
        for id in off {
            assert!(!enabled(&app, id), "{id} should be disabled");
        }
    };

    expect(
        &["itemCreateNote", "itemCreateTag"],
        &[
            "selectNone",
            "selectChildren",
            "itemEdit",
            "itemLink",
            "itemUnlink",
            "itemExpand",
            "itemShowChildren",
            "itemHide",
            "itemRemove",
            "itemSave",
        ],
    );

    app.selection().add(keys[0].clone());
    expect(
        &[
            "selectNone",
            "itemEdit",
            "itemExpand",
            "itemShowChildren",
            "itemHide",
            "itemRemove",
        ],
        &["itemLink", "itemUnlink"],
    );

    app.selection().add(keys[1].clone());
    expect(
        &["itemLink", "itemUnlink", "itemExpand"],
        &["itemEdit", "itemShowChildren"],
    );

    app.apply("selectNone").await.unwrap();
    assert!(app.selection().is_empty());
    expect(&[], &["selectNone", "itemHide"]);
}

#[tokio::test]
async fn create_disabled_until_repository_loaded() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, _) = App::new(GraphnoteConfig::default(), client);
    app.actions()
        .register_all(graphnote::action::default_actions())
        .unwrap();

    assert!(!enabled(&app, "itemCreateNote"));
    app.items().load_repo().await.unwrap();
    assert!(enabled(&app, "itemCreateNote"));
}

#[tokio::test]
async fn edit_then_save_round_trip() {
    let (client, app, events) = started().await;
    let keys = with_notes(&app, 1).await;
    let note = keys[0].clone();

    app.selection().add(note.clone());
    events.drain();
    app.apply("itemEdit").await.unwrap();

    assert!(matches!(
        events.drain().as_slice(),
        [ViewEvent::ShowEditor(payload)] if payload.key == note && payload.title == "Edit item"
    ));
    assert!(!enabled(&app, "itemSave"));

    app.editor().update(json!("remember the milk"));
    assert!(enabled(&app, "itemSave"));

    app.apply("itemSave").await.unwrap();

    assert_eq!(client.snapshot().get(&note), Some(&json!("remember the milk")));
    assert_eq!(
        app.items().graph().get(&note),
        Some(&json!("remember the milk"))
    );
    assert!(!enabled(&app, "itemSave"));
    assert!(events
        .drain()
        .iter()
        .any(|event| event == &ViewEvent::SaveEditor));
}

#[tokio::test]
async fn edit_during_save_stays_dirty() {
    let client = Arc::new(GatedClient::default());
    let (app, _events) = App::new(GraphnoteConfig::default(), client.clone());
    app.start().await.unwrap();
    let note = editing(&app, json!("first draft")).await;

    // The save's reload is held until the second edit has landed.
    let (waiting, release) = client.hold_next_fetch();
    let (saved, ()) = tokio::join!(app.apply("itemSave"), async {
        waiting.await.unwrap();
        app.editor().update(json!("second draft"));
        release.send(()).unwrap();
    });
    saved.unwrap();

    assert_eq!(
        client.inner.snapshot().get(&note),
        Some(&json!("first draft"))
    );
    let session = app.editor().current().unwrap();
    assert_eq!(session.value, json!("second draft"));
    assert!(session.dirty);
    assert!(enabled(&app, "itemSave"));
}

#[tokio::test]
async fn closing_dirty_editor_saves_first() {
    let (client, app, _) = started().await;
    let note = editing(&app, json!("keep me")).await;

    let closed = app.close_editor().await.unwrap().unwrap();

    assert_eq!(closed.value, json!("keep me"));
    assert!(!closed.dirty);
    assert_eq!(client.snapshot().get(&note), Some(&json!("keep me")));
    assert!(app.editor().current().is_none());
    assert!(!enabled(&app, "itemSave"));
}

#[tokio::test]
async fn failed_save_keeps_editor_open() {
    let (client, app, _) = started().await;
    editing(&app, json!("keep me")).await;

    client.fail_next(GraphMethod::Set);
    assert!(app.close_editor().await.is_err());

    let session = app.editor().current().unwrap();
    assert_eq!(session.value, json!("keep me"));
    assert!(session.dirty);

    // Clean sessions close without a remote call.
    app.apply("itemSave").await.unwrap();
    client.clear_calls();
    assert!(app.close_editor().await.unwrap().is_some());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn edit_of_stale_selection_is_a_miss() {
    let (_client, app, _) = started().await;
    app.selection().add(ItemKey::from("gone"));

    let err = app.apply("itemEdit").await.unwrap_err();

    assert!(matches!(err, GraphnoteError::Item(_)));
    assert!(app.editor().current().is_none());
}

#[tokio::test]
async fn link_uses_first_selected_as_source() {
    let (client, app, _) = started().await;
    let keys = with_notes(&app, 3).await;

    app.selection()
        .add_all([keys[2].clone(), keys[0].clone(), keys[1].clone()]);
    app.apply("itemLink").await.unwrap();

    let mut linked = app.items().visible_linked(&keys[2]);
    linked.sort();
    assert_eq!(linked, vec![keys[0].clone(), keys[1].clone()]);

    app.apply("itemUnlink").await.unwrap();
    assert!(client.snapshot().linked(&keys[2]).is_empty());
}

#[tokio::test]
async fn remove_clears_selection_only_on_success() {
    let (client, app, _) = started().await;
    let keys = with_notes(&app, 2).await;
    app.selection().add(keys[0].clone());

    client.fail_next(GraphMethod::Remove);
    assert!(app.apply("itemRemove").await.is_err());
    assert_eq!(app.selection().keys(), vec![keys[0].clone()]);

    app.apply("itemRemove").await.unwrap();
    assert!(app.selection().is_empty());
    assert_eq!(app.items().item_keys(), vec![keys[1].clone()]);
}

#[tokio::test]
async fn hide_clears_selection_without_remote_call() {
    let (client, app, _) = started().await;
    let keys = with_notes(&app, 2).await;
    app.selection().add(keys[0].clone());
    client.clear_calls();

    app.apply("itemHide").await.unwrap();

    assert!(app.selection().is_empty());
    assert_eq!(app.items().item_keys(), vec![keys[1].clone()]);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn select_children_follows_links() {
    let (_client, app, _) = started().await;
    let keys = with_notes(&app, 3).await;
    app.items().link_items(&keys[0], &keys[1..]).await.unwrap();

    app.selection().add(keys[0].clone());
    app.apply("selectChildren").await.unwrap();

    let mut selected = app.selection().keys();
    selected.sort();
    assert_eq!(selected, keys[1..].to_vec());
}

#[tokio::test]
async fn show_children_action_switches_context() {
    let (_client, app, _) = started().await;
    let keys = with_notes(&app, 2).await;
    app.items().link_items(&keys[0], &keys[1..]).await.unwrap();

    app.selection().add(keys[0].clone());
    app.apply("itemShowChildren").await.unwrap();

    assert_eq!(app.items().context(), vec![keys[0].clone()]);
    assert_eq!(app.items().item_keys(), vec![keys[1].clone()]);
}

// =============================================================================
// REGISTRY
// =============================================================================

#[tokio::test]
async fn unknown_and_duplicate_ids_are_rejected() {
    let (_client, app, _) = started().await;

    assert!(matches!(
        app.apply("nope").await,
        Err(GraphnoteError::Action(ActionError::Unknown { .. }))
    ));
    assert!(matches!(
        app.actions().register(Arc::new(SelectNone)),
        Err(GraphnoteError::Action(ActionError::Duplicate { .. }))
    ));
}

#[tokio::test]
async fn unregister_removes_trigger_handlers() {
    let (_client, app, _) = started().await;
    let entry = app.actions().get("selectNone").unwrap();
    assert_eq!(entry.subscription_count(), 1);

    let removed = app.actions().unregister("selectNone").unwrap();
    assert_eq!(removed.subscription_count(), 0);
    assert!(app.actions().get("selectNone").is_none());

    app.selection().add(ItemKey::from("a"));
    assert!(!removed.is_enabled());
}

#[tokio::test]
async fn registration_notifies_listeners_and_evaluates_once() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, _) = App::new(GraphnoteConfig::default(), client);
    let added = Arc::new(AtomicUsize::new(0));
    let counter = added.clone();
    app.actions().on_added(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    app.selection().add(ItemKey::from("a"));
    let entry = app.actions().register(Arc::new(SelectNone)).unwrap();

    assert_eq!(added.load(Ordering::SeqCst), 1);
    assert!(entry.is_enabled());
    assert_eq!(app.actions().all().len(), 1);
}

#[tokio::test]
async fn state_change_listeners_see_flips_only() {
    let (_client, app, _) = started().await;
    let flips = Arc::new(AtomicUsize::new(0));
    let counter = flips.clone();
    app.actions().on_state_change(move |entry| {
        if entry.id() == "selectNone" {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    app.selection().add(ItemKey::from("a"));
    app.selection().add(ItemKey::from("b"));
    app.selection().clear();

    assert_eq!(flips.load(Ordering::SeqCst), 2);
}
