//! Error handling for the graph cache and action engine
//!
//! One umbrella error with `thiserror` sub-enums per concern, so callers can
//! match on the failure class (transport, configuration, lookup, action).

use graphnote_client::ClientError;
use graphnote_types::{DecodeError, ItemKey};
use thiserror::Error;

/// Main error type for graphnote
#[derive(Error, Debug)]
pub enum GraphnoteError {
    #[error("Remote call failed: {0}")]
    Client(#[from] ClientError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Item error: {0}")]
    Item(#[from] ItemError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),
}

/// Configuration and service-vocabulary errors. Always fatal for bootstrap.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Service item '{name}' not found under root {root}")]
    MissingServiceItem { name: &'static str, root: ItemKey },

    #[error("Service items have not been resolved yet")]
    NotResolved,

    #[error("Invalid endpoint '{value}': {source}")]
    InvalidEndpoint {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid traversal depth '{value}'")]
    InvalidDepth { value: String },
}

/// Item lookup and argument errors
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("Item {key} is not in the current projection")]
    NotFound { key: ItemKey },

    #[error("{operation} requires at least one key")]
    EmptyKeys { operation: &'static str },
}

/// Action registry errors
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Unknown action '{id}'")]
    Unknown { id: String },

    #[error("Action '{id}' is disabled")]
    Disabled { id: String },

    #[error("Action '{id}' is already registered")]
    Duplicate { id: String },

    #[error("Editor has nothing to save")]
    NothingToSave,
}

pub type Result<T> = std::result::Result<T, GraphnoteError>;

impl GraphnoteError {
    /// Fatal errors abort bootstrap instead of degrading filtering.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GraphnoteError::Config(_))
    }
}
