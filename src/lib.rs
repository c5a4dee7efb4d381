//! Graphnote - client-side graph cache and action engine
//!
//! Keeps a bounded local projection of a remote knowledge graph around the
//! visible context, hides the service vocabulary from every view, and drives
//! user actions whose enablement follows the selection, the projection and
//! the editor.
//!
//! ## Layout
//!
//! ```text
//! App (composition root)
//!  ├── ItemManager ── RemoteGraphClient (graphnote-client)
//!  │     └── ServiceItemRegistry
//!  ├── SelectionSet / EditorState   (change subjects)
//!  ├── ActionRegistry ── Action impls
//!  └── ViewEventEmitter ──► ViewEventReceiver (view layer)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use graphnote::{App, GraphnoteConfig};
//! use graphnote_client::InProcessGraphClient;
//!
//! # async fn run() -> graphnote::Result<()> {
//! let client = Arc::new(InProcessGraphClient::new());
//! let (app, events) = App::new(GraphnoteConfig::default(), client);
//! app.start().await?;
//! app.apply("itemCreateNote").await?;
//! for event in events.drain() {
//!     println!("{}", event.name());
//! }
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

pub mod config;

// Change subjects and view events
pub mod events;

pub mod editor;
pub mod selection;

// Graph cache
pub mod item_manager;
pub mod service_items;

// Actions
pub mod action;

pub mod app;

pub use action::{Action, ActionContext, ActionMeta, ActionRegistry, RegisteredAction, Triggers};
pub use app::App;
pub use config::GraphnoteConfig;
pub use editor::{EditorSession, EditorState};
pub use error::{ActionError, ConfigError, GraphnoteError, ItemError, Result};
pub use events::{
    EditorPayload, ItemsDelta, Subject, SubscriptionId, ViewEvent, ViewEventEmitter,
    ViewEventReceiver,
};
pub use item_manager::ItemManager;
pub use selection::SelectionSet;
pub use service_items::{filter_service_items, ItemType, ServiceItemRegistry, ServiceItems};

pub use graphnote_types::{Association, GraphProjection, ItemKey, RemoteValue};
