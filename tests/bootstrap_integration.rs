//! Bootstrap and reload behavior against an in-process graph server.

use std::sync::Arc;

use graphnote::{
    App, GraphnoteConfig, GraphnoteError, ItemKey, ItemType, ItemsDelta, ServiceItems, ViewEvent,
};
use graphnote_client::{ClientError, GraphApi, InProcessGraphClient, RemoteGraphClient};
use graphnote_types::{GraphMethod, RemoteValue};
use pretty_assertions::assert_eq;
use serde_json::json;

fn app_on(client: &Arc<InProcessGraphClient>) -> (App, graphnote::ViewEventReceiver) {
    App::new(GraphnoteConfig::default(), client.clone())
}

fn root() -> ItemKey {
    ItemKey::from(graphnote::config::DEFAULT_ROOT_KEY)
}

fn sorted(mut keys: Vec<ItemKey>) -> Vec<ItemKey> {
    keys.sort();
    keys
}

#[tokio::test]
async fn empty_repository_gets_service_vocabulary() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, _events) = app_on(&client);

    let items = app.start().await.unwrap();
    let server = client.snapshot();

    for (key, name) in [
        (&items.root, "root"),
        (&items.visible_item, "visibleItem"),
        (&items.itemtype, "itemtype"),
        (&items.tag, "tag"),
        (&items.note, "note"),
    ] {
        assert_eq!(server.get(key), Some(&json!(name)));
    }
    assert_eq!(items.root, root());

    assert_eq!(
        sorted(server.linked(&items.root)),
        sorted(vec![
            items.visible_item.clone(),
            items.itemtype.clone(),
            items.tag.clone(),
            items.note.clone(),
        ])
    );
    assert_eq!(
        sorted(server.linked(&items.itemtype)),
        sorted(vec![items.tag.clone(), items.note.clone()])
    );

    // Initialization is a single merge.
    assert_eq!(
        client.calls(),
        vec![
            GraphMethod::GetGraph,
            GraphMethod::Merge,
            GraphMethod::GetGraph
        ]
    );
}

#[tokio::test]
async fn second_bootstrap_discovers_same_keys() {
    let client = Arc::new(InProcessGraphClient::new());

    let (first, _) = app_on(&client);
    let created: ServiceItems = first.start().await.unwrap();

    let (second, _) = app_on(&client);
    let discovered = second.start().await.unwrap();

    assert_eq!(discovered, created);
    assert_eq!(client.snapshot().item_count(), 5);
}

#[tokio::test]
async fn bootstrap_emits_empty_update() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, events) = app_on(&client);
    app.start().await.unwrap();

    let drained = events.drain();
    assert_eq!(drained.len(), 1);
    match &drained[0] {
        ViewEvent::UpdateView { graph, delta } => {
            assert!(graph.is_empty());
            assert_eq!(delta, &ItemsDelta::empty());
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn missing_service_item_aborts_bootstrap() {
    let client = Arc::new(InProcessGraphClient::new());
    client.set(json!("root"), Some(&root())).await.unwrap();
    let (app, _) = app_on(&client);

    let err = app.start().await.unwrap_err();

    assert!(err.is_fatal());
    assert!(app.items().service_items().is_none());
}

#[tokio::test]
async fn service_items_never_reach_the_view() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, _) = app_on(&client);
    let items = app.start().await.unwrap();

    let note = app.items().create_item(ItemType::Note).await.unwrap();
    let tag = app.items().create_item(ItemType::Tag).await.unwrap();

    let graph = app.items().graph();
    for key in items.keys() {
        assert!(!graph.contains(&key));
        assert!(graph.links().iter().all(|link| !link.touches(&key)));
    }
    assert!(graph.contains(&note));
    assert!(graph.contains(&tag));
}

#[tokio::test]
async fn mutations_keep_the_visible_context() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, _) = app_on(&client);
    let items = app.start().await.unwrap();
    let manager = app.items();
    let context = items.default_context();

    let a = manager.create_item(ItemType::Note).await.unwrap();
    assert_eq!(manager.context(), context);
    let b = manager.create_item(ItemType::Tag).await.unwrap();
    assert_eq!(manager.context(), context);

    manager.save_item(json!("first"), &a).await.unwrap();
    assert_eq!(manager.context(), context);
    assert_eq!(manager.graph().get(&a), Some(&json!("first")));

    manager.link_items(&a, &[b.clone()]).await.unwrap();
    assert_eq!(manager.context(), context);
    assert_eq!(manager.visible_linked(&a), vec![b.clone()]);

    manager.unlink_items(&a, &[b.clone()]).await.unwrap();
    assert_eq!(manager.context(), context);
    assert!(manager.visible_linked(&a).is_empty());

    manager.remove_items(&[a.clone()]).await.unwrap();
    assert_eq!(manager.context(), context);
    assert!(!manager.graph().contains(&a));
    assert!(manager.graph().contains(&b));
}

#[tokio::test]
async fn show_children_switches_context() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, events) = app_on(&client);
    app.start().await.unwrap();
    let manager = app.items();

    let tag = manager.create_item(ItemType::Tag).await.unwrap();
    // Created while the tag is selected, so it is linked from it.
    let note = manager.create_item(ItemType::Note).await.unwrap();
    events.drain();

    manager.show_children(&[tag.clone()], false).await.unwrap();

    assert_eq!(manager.context(), vec![tag.clone()]);
    assert_eq!(manager.item_keys(), vec![note.clone()]);
    assert!(matches!(
        events.drain().as_slice(),
        [ViewEvent::UpdateView { .. }]
    ));
}

#[tokio::test]
async fn expand_lists_children_without_touching_cache() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, events) = app_on(&client);
    app.start().await.unwrap();
    let manager = app.items();

    let tag = manager.create_item(ItemType::Tag).await.unwrap();
    manager.save_item(json!("reading"), &tag).await.unwrap();
    app.selection().add(tag.clone());
    let note = manager.create_item(ItemType::Note).await.unwrap();
    let before = manager.graph();
    let context = manager.context();
    events.drain();

    manager.show_children(&[tag.clone()], true).await.unwrap();

    assert_eq!(manager.graph(), before);
    assert_eq!(manager.context(), context);
    match events.drain().as_slice() {
        [ViewEvent::ShowList { title, values }] => {
            assert_eq!(title, "Show children for reading context");
            assert_eq!(values.keys().cloned().collect::<Vec<_>>(), vec![note]);
        }
        other => panic!("unexpected events {other:?}"),
    }
}

#[tokio::test]
async fn create_reports_new_key_in_delta() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, events) = app_on(&client);
    app.start().await.unwrap();
    events.drain();

    let tag = app.items().create_item(ItemType::Tag).await.unwrap();

    let drained = events.drain();
    assert_eq!(drained[0], ViewEvent::AddSelection { key: tag.clone() });
    match &drained[1] {
        ViewEvent::UpdateView { delta, .. } => {
            assert_eq!(delta, &ItemsDelta::created(ItemType::Tag, tag.clone()));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(app.selection().keys(), vec![tag]);
}

#[tokio::test]
async fn failed_create_restores_selection_and_cache() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, _) = app_on(&client);
    app.start().await.unwrap();
    let manager = app.items();

    let a = manager.create_item(ItemType::Note).await.unwrap();
    let before = manager.graph();

    client.fail_next(GraphMethod::CreateAndLinkItem);
    let err = manager.create_item(ItemType::Note).await.unwrap_err();

    assert!(matches!(
        err,
        GraphnoteError::Client(ClientError::Transport { .. })
    ));
    assert_eq!(app.selection().keys(), vec![a]);
    assert_eq!(manager.graph(), before);
}

#[tokio::test]
async fn failed_reload_after_create_restores_selection() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, events) = app_on(&client);
    app.start().await.unwrap();
    let manager = app.items();

    let a = manager.create_item(ItemType::Note).await.unwrap();
    let before = manager.graph();
    events.drain();

    client.fail_next(GraphMethod::GetGraph);
    let err = manager.create_item(ItemType::Note).await.unwrap_err();

    assert!(matches!(
        err,
        GraphnoteError::Client(ClientError::Transport { .. })
    ));
    // The server kept the new item, linked from the old selection.
    assert_eq!(client.snapshot().linked(&a).len(), 1);
    assert_eq!(app.selection().keys(), vec![a]);
    assert_eq!(manager.graph(), before);
    assert!(events.drain().is_empty());
}

#[tokio::test]
async fn failed_reload_after_remove_keeps_last_projection() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, _) = app_on(&client);
    app.start().await.unwrap();
    let manager = app.items();

    let a = manager.create_item(ItemType::Note).await.unwrap();
    let before = manager.graph();

    client.fail_next(GraphMethod::GetGraph);
    assert!(manager.remove_items(&[a.clone()]).await.is_err());

    // Server already dropped the item; the cache still shows it.
    assert!(!client.snapshot().contains(&a));
    assert_eq!(manager.graph(), before);
}

#[tokio::test]
async fn hidden_items_return_on_next_reload() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, _) = app_on(&client);
    app.start().await.unwrap();
    let manager = app.items();

    let a = manager.create_item(ItemType::Note).await.unwrap();
    let b = manager.create_item(ItemType::Note).await.unwrap();

    manager.hide_items(&[a.clone()]);
    assert_eq!(manager.item_keys(), vec![b.clone()]);

    manager.save_item(json!("b"), &b).await.unwrap();
    assert_eq!(manager.item_keys(), sorted(vec![a, b]));
}

#[tokio::test]
async fn invoke_returns_tagged_values() {
    let client = Arc::new(InProcessGraphClient::new());
    let (app, _) = app_on(&client);
    let items = app.start().await.unwrap();

    let neighborhood = client
        .invoke(GraphMethod::GetGraph, vec![json!(root().as_str()), json!(1)])
        .await
        .unwrap();
    assert!(neighborhood.is_graph());

    let matches = client
        .invoke(GraphMethod::Search, vec![json!(root().as_str()), json!("tag")])
        .await
        .unwrap();
    assert_eq!(matches, RemoteValue::List(vec![json!(items.tag.as_str())]));

    let keys = client.search(&root(), "note").await.unwrap();
    assert_eq!(keys, vec![items.note]);
}
