//! InProcessGraphClient: serves the graph methods from an in-memory store.
//!
//! Responses are produced as JSON and classified through
//! [`RemoteValue::decode`], exactly as an HTTP response would be, so the
//! dual-return contract is exercised without a server.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use graphnote_types::{GraphMethod, GraphProjection, ItemKey, RemoteValue};
use serde_json::{json, Value};
use tracing::debug;

use crate::{ClientError, RemoteGraphClient, Result};

/// In-memory graph server.
#[derive(Default)]
pub struct InProcessGraphClient {
    store: Mutex<GraphProjection>,
    fail_next: Mutex<HashSet<GraphMethod>>,
    calls: Mutex<Vec<GraphMethod>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InProcessGraphClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing server graph.
    pub fn with_graph(graph: GraphProjection) -> Self {
        Self {
            store: Mutex::new(graph),
            ..Default::default()
        }
    }

    /// Copy of the whole server-side graph.
    pub fn snapshot(&self) -> GraphProjection {
        lock(&self.store).clone()
    }

    /// Make the next call of `method` fail as a transport error.
    pub fn fail_next(&self, method: GraphMethod) {
        lock(&self.fail_next).insert(method);
    }

    /// Methods invoked so far, in call order.
    pub fn calls(&self) -> Vec<GraphMethod> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn dispatch(&self, method: GraphMethod, args: &[Value]) -> Result<Value> {
        let mut store = lock(&self.store);
        let value = match method {
            GraphMethod::GetGraph => {
                let roots = keys_arg(method, args.first())?;
                let depth = args.get(1).and_then(Value::as_u64).unwrap_or(1) as usize;
                let graph = store.neighborhood(&roots, depth);
                if graph.is_empty() {
                    json!([])
                } else {
                    serde_json::to_value(graph)?
                }
            }
            GraphMethod::CreateAndLinkItem => {
                let parents: Vec<ItemKey> = keys_arg(method, args.first())?
                    .into_iter()
                    .filter(|parent| store.contains(parent))
                    .collect();
                let key = store.set(ItemKey::generate(), json!(""));
                for parent in parents {
                    store.associate(parent, key.clone());
                }
                json!(key)
            }
            GraphMethod::Set => {
                let value = args.first().cloned().unwrap_or(Value::Null);
                let key = match args.get(1) {
                    Some(Value::String(key)) => ItemKey::from(key.as_str()),
                    _ => ItemKey::generate(),
                };
                json!(store.set(key, value))
            }
            GraphMethod::Remove => {
                let keys = keys_arg(method, args.first())?;
                store.remove(&keys);
                json!(true)
            }
            GraphMethod::Associate => {
                let source = key_arg(method, args.first())?;
                for target in keys_arg(method, args.get(1))? {
                    store.associate(source.clone(), target);
                }
                json!(true)
            }
            GraphMethod::SetDisassociate => {
                let source = key_arg(method, args.first())?;
                for target in keys_arg(method, args.get(1))? {
                    store.disassociate(&source, &target);
                }
                json!(true)
            }
            GraphMethod::Merge => {
                let fragment: GraphProjection =
                    serde_json::from_value(args.first().cloned().unwrap_or(Value::Null))?;
                store.merge(fragment);
                json!(true)
            }
            GraphMethod::Search => {
                let root = key_arg(method, args.first())?;
                let name = args
                    .get(1)
                    .and_then(Value::as_str)
                    .ok_or_else(|| bad(method, "missing name"))?;
                json!(store.search(&root, name))
            }
        };
        Ok(value)
    }
}

#[async_trait]
impl RemoteGraphClient for InProcessGraphClient {
    async fn invoke(&self, method: GraphMethod, args: Vec<Value>) -> Result<RemoteValue> {
        lock(&self.calls).push(method);
        if lock(&self.fail_next).remove(&method) {
            return Err(ClientError::Transport {
                method,
                message: "injected failure".to_string(),
            });
        }

        debug!(%method, args = args.len(), "in-process graph call");
        let response = self.dispatch(method, &args)?;
        Ok(RemoteValue::decode(response)?)
    }
}

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

fn bad(method: GraphMethod, message: &str) -> ClientError {
    ClientError::BadArguments {
        method,
        message: message.to_string(),
    }
}

fn key_arg(method: GraphMethod, arg: Option<&Value>) -> Result<ItemKey> {
    arg.and_then(Value::as_str)
        .map(ItemKey::from)
        .ok_or_else(|| bad(method, "expected a key"))
}

/// A key or an array of keys.
fn keys_arg(method: GraphMethod, arg: Option<&Value>) -> Result<Vec<ItemKey>> {
    match arg {
        Some(Value::String(key)) => Ok(vec![ItemKey::from(key.as_str())]),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| key_arg(method, Some(value)))
            .collect(),
        _ => Err(bad(method, "expected a key or key list")),
    }
}
