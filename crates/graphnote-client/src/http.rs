//! HTTP transport - every call is one form POST to `<base>/graph/`.

use async_trait::async_trait;
use graphnote_types::{GraphMethod, RemoteRequest, RemoteValue};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::{ClientError, RemoteGraphClient, Result};

/// Graph client talking to the server's single generic endpoint.
#[derive(Clone)]
pub struct HttpGraphClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpGraphClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080/`.
    pub fn new(base_url: &str) -> Result<Self> {
        let endpoint = Url::parse(base_url)?.join("graph/")?;
        Ok(Self {
            endpoint,
            client: reqwest::Client::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteGraphClient for HttpGraphClient {
    async fn invoke(&self, method: GraphMethod, args: Vec<Value>) -> Result<RemoteValue> {
        let request = RemoteRequest::new(method, &args)?;
        debug!(%method, endpoint = %self.endpoint, "graph request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(%method, status, "graph request rejected");
            return Err(ClientError::Server { status, message });
        }

        let body: Value = response.json().await?;
        Ok(RemoteValue::decode(body)?)
    }
}
