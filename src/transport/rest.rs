//! reqwest-backed transport

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{BulkResponse, Connector, IndexStats, SearchResponse, Transport};
use crate::config::ConnectionConfig;
use crate::error::{AdapterError, TransportError};
use crate::http::{check_response, create_client};

/// Talks to the engine over HTTP(S)
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    user: String,
    password: Option<String>,
}

impl HttpTransport {
    /// Create a transport with a new HTTP client
    pub fn new(config: &ConnectionConfig) -> Result<Self, AdapterError> {
        let base_url = config.base_url()?;
        let client = create_client(config)?;

        debug!("HTTP transport for {}", base_url);

        Ok(Self {
            client,
            base_url,
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::UnexpectedResponse(format!("bad request path {path}: {e}")))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<RequestBuilder, TransportError> {
        let builder = self.client.request(method, self.url(path)?);
        Ok(match &self.password {
            Some(password) => builder.basic_auth(&self.user, Some(password)),
            None => builder,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, TransportError> {
        let response = check_response(builder.send().await?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_ack(&self, builder: RequestBuilder) -> Result<(), TransportError> {
        check_response(builder.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn index_exists(&self, index: &str) -> Result<bool, TransportError> {
        let response = self.request(reqwest::Method::HEAD, index)?.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => check_response(response).await.map(|_| true),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), TransportError> {
        self.send_ack(self.request(reqwest::Method::PUT, index)?.json(body)).await
    }

    async fn delete_index(&self, index: &str) -> Result<(), TransportError> {
        self.send_ack(self.request(reqwest::Method::DELETE, index)?).await
    }

    async fn get_mapping(&self, index: &str) -> Result<Value, TransportError> {
        let path = format!("{index}/_mapping");
        self.send_json(self.request(reqwest::Method::GET, &path)?).await
    }

    async fn bulk(&self, index: &str, body: Vec<u8>) -> Result<BulkResponse, TransportError> {
        let path = format!("{index}/_bulk");
        let builder = self
            .request(reqwest::Method::POST, &path)?
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        self.send_json(builder).await
    }

    async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse, TransportError> {
        let path = format!("{index}/_search");
        self.send_json(self.request(reqwest::Method::POST, &path)?.json(body)).await
    }

    async fn put_settings(&self, index: &str, body: &Value) -> Result<(), TransportError> {
        let path = format!("{index}/_settings");
        self.send_ack(self.request(reqwest::Method::PUT, &path)?.json(body)).await
    }

    async fn refresh(&self, index: &str) -> Result<(), TransportError> {
        let path = format!("{index}/_refresh");
        self.send_ack(self.request(reqwest::Method::POST, &path)?).await
    }

    async fn stats(&self, index: &str) -> Result<IndexStats, TransportError> {
        let path = format!("{index}/_stats");
        self.send_json(self.request(reqwest::Method::GET, &path)?).await
    }

    async fn warmup(&self, index: &str) -> Result<(), TransportError> {
        let path = format!("_plugins/_knn/warmup/{index}");
        self.send_ack(self.request(reqwest::Method::GET, &path)?).await
    }
}

/// Builds an [`HttpTransport`] per session
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Transport>, AdapterError> {
        Ok(Arc::new(HttpTransport::new(config)?))
    }
}
