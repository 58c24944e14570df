//! HTTP client for the hosted order document store.

use super::RemoteStore;
use crate::canonical::from_document;
use crate::reference::{ReferenceDetails, ReferenceKind, RemoteReference, RemoteReferenceStore};
use crate::{error::Result, Error, OrderRecord};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Timeout for a whole request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing the connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote store reached over the `repairdesk-server` REST API.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CreatedReference {
    id: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Send a request and turn non-success statuses into engine errors.
    async fn send(&self, builder: RequestBuilder, subject: &str) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, subject, &body))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| Error::Network(format!("invalid response body: {e}")))
}

fn normalize_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "remote url must start with http:// or https://, got {url:?}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Map an HTTP failure status to the engine taxonomy.
fn status_error(status: StatusCode, subject: &str, body: &str) -> Error {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::NOT_FOUND => Error::NotFound(subject.to_string()),
        StatusCode::CONFLICT => Error::Conflict(subject.to_string()),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Error::invalid("document", format!("{subject}: {detail}"))
        }
        _ => Error::Network(format!("remote responded {status}: {detail}")),
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn create(&self, record: &OrderRecord) -> Result<()> {
        let builder = self.request(Method::POST, "/orders").json(record);
        self.send(builder, &record.id).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<OrderRecord>> {
        let builder = self.request(Method::GET, &format!("/orders/{id}"));
        match self.send(builder, id).await {
            Ok(response) => {
                let document: Value = read_json(response).await?;
                from_document(document).map(Some)
            }
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update(&self, id: &str, record: &OrderRecord) -> Result<()> {
        let builder = self
            .request(Method::PUT, &format!("/orders/{id}"))
            .json(record);
        self.send(builder, id).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("/orders/{id}"));
        self.send(builder, id).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<OrderRecord>> {
        let response = self
            .send(self.request(Method::GET, "/orders"), "orders")
            .await?;
        let documents: Vec<Value> = read_json(response).await?;
        documents.into_iter().map(from_document).collect()
    }
}

#[async_trait]
impl RemoteReferenceStore for HttpRemoteStore {
    async fn list_remote(&self, kind: ReferenceKind) -> Result<Vec<RemoteReference>> {
        let path = format!("/{}", kind.path());
        let response = self.send(self.request(Method::GET, &path), kind.path()).await?;
        read_json(response).await
    }

    async fn create_remote(&self, kind: ReferenceKind, details: &ReferenceDetails) -> Result<String> {
        let path = format!("/{}", kind.path());
        let builder = self.request(Method::POST, &path).json(details);
        let response = self.send(builder, kind.path()).await?;
        let created: CreatedReference = read_json(response).await?;
        Ok(created.id)
    }

    async fn update_remote(
        &self,
        kind: ReferenceKind,
        remote_id: &str,
        details: &ReferenceDetails,
    ) -> Result<()> {
        let path = format!("/{}/{remote_id}", kind.path());
        let builder = self.request(Method::PUT, &path).json(details);
        self.send(builder, remote_id).await?;
        Ok(())
    }
}
