//! RemoteGraphClient trait: the sole call surface between graphnote and the
//! graph server. The core depends on this crate, never on a transport directly.

pub mod http;
pub mod inprocess;

use async_trait::async_trait;
use graphnote_types::{DecodeError, GraphMethod, GraphProjection, ItemKey, RemoteValue};
use serde_json::{json, Value};
use thiserror::Error;

pub use http::HttpGraphClient;
pub use inprocess::InProcessGraphClient;

/// Client-side failures of a remote call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Bad arguments for {method}: {message}")]
    BadArguments {
        method: GraphMethod,
        message: String,
    },

    #[error("Transport failure during {method}: {message}")]
    Transport {
        method: GraphMethod,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// One atomic request/response round trip per call. No retries, batching
/// or pipelining.
#[async_trait]
pub trait RemoteGraphClient: Send + Sync {
    async fn invoke(&self, method: GraphMethod, args: Vec<Value>) -> Result<RemoteValue>;
}

/// Typed wrappers over [`RemoteGraphClient::invoke`].
///
/// Neighborhood fetches return the raw [`RemoteValue`]; the server may answer
/// an empty neighborhood with a plain list.
#[async_trait]
pub trait GraphApi {
    async fn get_graph(&self, context: &[ItemKey], depth: usize) -> Result<RemoteValue>;

    async fn create_and_link_item(&self, keys: &[ItemKey]) -> Result<ItemKey>;

    async fn set(&self, value: Value, key: Option<&ItemKey>) -> Result<ItemKey>;

    async fn remove(&self, keys: &[ItemKey]) -> Result<RemoteValue>;

    async fn associate(&self, source: &ItemKey, targets: &[ItemKey]) -> Result<RemoteValue>;

    async fn set_disassociate(&self, source: &ItemKey, targets: &[ItemKey])
        -> Result<RemoteValue>;

    async fn merge(&self, fragment: &GraphProjection) -> Result<RemoteValue>;

    async fn search(&self, root: &ItemKey, name: &str) -> Result<Vec<ItemKey>>;
}

/// A single key goes over the wire as a string, several as an array.
fn keys_value(keys: &[ItemKey]) -> Value {
    match keys {
        [single] => json!(single),
        many => json!(many),
    }
}

#[async_trait]
impl<T> GraphApi for T
where
    T: RemoteGraphClient + ?Sized,
{
    async fn get_graph(&self, context: &[ItemKey], depth: usize) -> Result<RemoteValue> {
        self.invoke(GraphMethod::GetGraph, vec![keys_value(context), json!(depth)])
            .await
    }

    async fn create_and_link_item(&self, keys: &[ItemKey]) -> Result<ItemKey> {
        let value = self
            .invoke(GraphMethod::CreateAndLinkItem, vec![json!(keys)])
            .await?;
        Ok(value.into_key()?)
    }

    async fn set(&self, value: Value, key: Option<&ItemKey>) -> Result<ItemKey> {
        let result = self
            .invoke(GraphMethod::Set, vec![value, json!(key)])
            .await?;
        Ok(result.into_key()?)
    }

    async fn remove(&self, keys: &[ItemKey]) -> Result<RemoteValue> {
        self.invoke(GraphMethod::Remove, vec![json!(keys)]).await
    }

    async fn associate(&self, source: &ItemKey, targets: &[ItemKey]) -> Result<RemoteValue> {
        self.invoke(GraphMethod::Associate, vec![json!(source), json!(targets)])
            .await
    }

    async fn set_disassociate(
        &self,
        source: &ItemKey,
        targets: &[ItemKey],
    ) -> Result<RemoteValue> {
        self.invoke(
            GraphMethod::SetDisassociate,
            vec![json!(source), json!(targets)],
        )
        .await
    }

    async fn merge(&self, fragment: &GraphProjection) -> Result<RemoteValue> {
        self.invoke(GraphMethod::Merge, vec![serde_json::to_value(fragment)?])
            .await
    }

    async fn search(&self, root: &ItemKey, name: &str) -> Result<Vec<ItemKey>> {
        let value = self
            .invoke(GraphMethod::Search, vec![json!(root), json!(name)])
            .await?;
        Ok(value.into_keys()?)
    }
}
