//! Shared Graph Types for graphnote
//!
//! This crate is the SINGLE SOURCE OF TRUTH for everything crossing the
//! graph endpoint boundary.
//!
//! ## Boundary
//!
//! ```text
//! ┌──────────────────┐  POST /graph/  ┌──────────────────┐
//! │  graphnote core  │  method+args   │  Graph server    │
//! │  (ItemManager)   │ ─────────────► │  (storage)       │
//! │                  │ ◄───────────── │                  │
//! └──────────────────┘   JSON value   └──────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. Keys are opaque strings; the client never parses them
//! 2. A response is graph-shaped only when it carries both `items` and `links`
//! 3. Every remote result is a [`RemoteValue`] and callers match on its tag

pub mod graph;
pub mod wire;

pub use graph::{Association, GraphProjection, ItemKey};
pub use wire::{DecodeError, GraphMethod, RemoteRequest, RemoteValue};
