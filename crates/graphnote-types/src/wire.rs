//! Remote call envelope and the tagged response type.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::graph::{GraphProjection, ItemKey};

// ============================================================================
// METHODS
// ============================================================================

/// Graph operations implemented by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphMethod {
    #[serde(rename = "getGraph")]
    GetGraph,
    #[serde(rename = "createAndLinkItem")]
    CreateAndLinkItem,
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "remove")]
    Remove,
    #[serde(rename = "associate")]
    Associate,
    #[serde(rename = "setDisassociate")]
    SetDisassociate,
    #[serde(rename = "merge")]
    Merge,
    #[serde(rename = "search")]
    Search,
}

impl GraphMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphMethod::GetGraph => "getGraph",
            GraphMethod::CreateAndLinkItem => "createAndLinkItem",
            GraphMethod::Set => "set",
            GraphMethod::Remove => "remove",
            GraphMethod::Associate => "associate",
            GraphMethod::SetDisassociate => "setDisassociate",
            GraphMethod::Merge => "merge",
            GraphMethod::Search => "search",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let method = match name {
            "getGraph" => GraphMethod::GetGraph,
            "createAndLinkItem" => GraphMethod::CreateAndLinkItem,
            "set" => GraphMethod::Set,
            "remove" => GraphMethod::Remove,
            "associate" => GraphMethod::Associate,
            "setDisassociate" => GraphMethod::SetDisassociate,
            "merge" => GraphMethod::Merge,
            "search" => GraphMethod::Search,
            _ => return None,
        };
        Some(method)
    }
}

impl fmt::Display for GraphMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// REQUEST ENVELOPE
// ============================================================================

/// Body of a single POST to the graph endpoint.
///
/// `args` carries the JSON-encoded argument array as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub method: String,
    pub args: String,
}

impl RemoteRequest {
    pub fn new(method: GraphMethod, args: &[Value]) -> Result<Self, serde_json::Error> {
        Ok(Self {
            method: method.as_str().to_string(),
            args: serde_json::to_string(args)?,
        })
    }

    pub fn decode_args(&self) -> Result<Vec<Value>, serde_json::Error> {
        serde_json::from_str(&self.args)
    }
}

// ============================================================================
// RESPONSE
// ============================================================================

/// Response decoding failures.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("graph-shaped response failed to decode: {0}")]
    Graph(#[source] serde_json::Error),

    #[error("response object is neither a graph nor a scalar (fields: {fields})")]
    Shape { fields: String },

    #[error("expected {expected}, got {found}")]
    Unexpected {
        expected: &'static str,
        found: &'static str,
    },
}

/// Result of a remote call, tagged by the shape of the decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteValue {
    /// Payload carried both `items` and `links`
    Graph(GraphProjection),
    /// Key, boolean, number, string or null
    Scalar(Value),
    /// Plain array (usually a list of keys)
    List(Vec<Value>),
}

impl RemoteValue {
    /// Classify a decoded JSON response.
    pub fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Object(map) if map.contains_key("items") && map.contains_key("links") => {
                serde_json::from_value(Value::Object(map))
                    .map(RemoteValue::Graph)
                    .map_err(DecodeError::Graph)
            }
            Value::Object(map) => Err(DecodeError::Shape {
                fields: map.keys().cloned().collect::<Vec<_>>().join(","),
            }),
            Value::Array(values) => Ok(RemoteValue::List(values)),
            scalar => Ok(RemoteValue::Scalar(scalar)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RemoteValue::Graph(_) => "graph",
            RemoteValue::Scalar(_) => "scalar",
            RemoteValue::List(_) => "list",
        }
    }

    pub fn is_graph(&self) -> bool {
        matches!(self, RemoteValue::Graph(_))
    }

    /// An empty neighborhood, whatever shape the server chose for it.
    pub fn is_empty_repository(&self) -> bool {
        match self {
            RemoteValue::Graph(graph) => graph.is_empty(),
            RemoteValue::List(values) => values.is_empty(),
            RemoteValue::Scalar(value) => value.is_null(),
        }
    }

    pub fn into_graph(self) -> Result<GraphProjection, DecodeError> {
        match self {
            RemoteValue::Graph(graph) => Ok(graph),
            other => Err(other.unexpected("graph")),
        }
    }

    /// Like [`RemoteValue::into_graph`], but an empty list or null counts as
    /// an empty projection.
    pub fn into_graph_or_empty(self) -> Result<GraphProjection, DecodeError> {
        if !self.is_graph() && self.is_empty_repository() {
            return Ok(GraphProjection::new());
        }
        self.into_graph()
    }

    pub fn into_key(self) -> Result<ItemKey, DecodeError> {
        match self {
            RemoteValue::Scalar(Value::String(key)) => Ok(ItemKey::from(key)),
            other => Err(other.unexpected("key")),
        }
    }

    pub fn into_keys(self) -> Result<Vec<ItemKey>, DecodeError> {
        match self {
            RemoteValue::List(values) => values
                .into_iter()
                .map(|value| match value {
                    Value::String(key) => Ok(ItemKey::from(key)),
                    _ => Err(DecodeError::Unexpected {
                        expected: "key",
                        found: "non-string list entry",
                    }),
                })
                .collect(),
            other => Err(other.unexpected("key list")),
        }
    }

    pub fn into_bool(self) -> Result<bool, DecodeError> {
        match self {
            RemoteValue::Scalar(Value::Bool(flag)) => Ok(flag),
            other => Err(other.unexpected("boolean")),
        }
    }

    fn unexpected(&self, expected: &'static str) -> DecodeError {
        DecodeError::Unexpected {
            expected,
            found: self.kind(),
        }
    }
}
