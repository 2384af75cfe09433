//! HTTP backend for the remote document store.
//!
//! Speaks the store's document API: `GET|PUT|DELETE
//! {endpoint}/v1/projects/{project}/{collection}/{id}`, authenticated
//! with a bearer token from the service-account credentials file.
//! Responses are classified into the loom error taxonomy so the shared
//! retry policy can decide what is worth retrying.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use loom_core::{defaults, DocumentRecord, DocumentStore, Error, Result, Settings};

use crate::manager::Connector;

/// Credential material loaded from the service-account file.
#[derive(Debug, Deserialize)]
struct Credentials {
    token: String,
}

/// Remote document store reached over HTTP.
#[derive(Debug)]
pub struct RestDocumentStore {
    client: Client,
    base_url: String,
}

impl RestDocumentStore {
    /// Build a client for the given endpoint, project, and credentials
    /// file. Does not touch the network; [`RestConnector`] verifies the
    /// session with a ping.
    pub fn new(endpoint: &str, project_id: &str, credentials_path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(credentials_path).map_err(|e| {
            Error::Config(format!(
                "Cannot read credentials file {}: {}",
                credentials_path, e
            ))
        })?;
        let credentials: Credentials = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!(
                "Malformed credentials file {}: {}",
                credentials_path, e
            ))
        })?;

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", credentials.token))
            .map_err(|_| {
                Error::Config("Credential token is not a valid header value".to_string())
            })?;
        bearer.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(Duration::from_secs(defaults::STORE_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Connection(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/v1/projects/{}",
                endpoint.trim_end_matches('/'),
                project_id
            ),
        })
    }

    fn doc_url(&self, collection: &str, id: &str) -> Result<String> {
        validate_segment("collection", collection)?;
        validate_segment("document id", id)?;
        Ok(format!("{}/{}/{}", self.base_url, collection, id))
    }
}

/// Path segments must be non-empty and slash-free; anything else is a
/// malformed request, rejected before it reaches the network.
fn validate_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains('/') {
        return Err(Error::PermanentStore(format!(
            "Invalid {}: {:?}",
            kind, value
        )));
    }
    Ok(())
}

/// Map an HTTP status to the error taxonomy.
fn classify_status(status: StatusCode, body: &str) -> Error {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };
    match status.as_u16() {
        401 | 403 => Error::PermanentStore(format!("access denied ({})", detail)),
        408 | 429 => Error::TransientStore(detail),
        500..=599 => Error::TransientStore(detail),
        _ => Error::PermanentStore(detail),
    }
}

/// Map a request-level transport failure.
///
/// Timeouts are worth retrying on the existing session; a refused
/// connection means the session itself is unusable.
fn classify_transport(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::TransientStore(format!("request timed out: {}", e))
    } else if e.is_connect() {
        Error::Connection(format!("store unreachable: {}", e))
    } else {
        Error::TransientStore(e.to_string())
    }
}

async fn error_body(resp: Response) -> String {
    resp.text().await.unwrap_or_default()
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<DocumentRecord>> {
        let url = self.doc_url(collection, id)?;
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_transport)?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let record = resp.json::<DocumentRecord>().await.map_err(|e| {
                    Error::Serialization(format!("Invalid document payload: {}", e))
                })?;
                Ok(Some(record))
            }
            status => Err(classify_status(status, &error_body(resp).await)),
        }
    }

    async fn set(&self, collection: &str, record: &DocumentRecord) -> Result<()> {
        let url = self.doc_url(collection, &record.id)?;
        debug!(
            subsystem = "store",
            component = "rest",
            op = "set",
            collection,
            doc_id = %record.id,
            "PUT document"
        );
        let resp = self
            .client
            .put(&url)
            .json(record)
            .send()
            .await
            .map_err(classify_transport)?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(classify_status(status, &error_body(resp).await))
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let url = self.doc_url(collection, id)?;
        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(classify_transport)?;
        let status = resp.status();
        // Deleting an absent document is not an error.
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(classify_status(status, &error_body(resp).await))
        }
    }

    async fn ping(&self) -> Result<()> {
        let url = format!("{}/ping", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_transport)?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(classify_status(status, &error_body(resp).await))
        }
    }
}

/// Production [`Connector`]: dials the HTTP store and verifies the
/// session before handing it to the manager.
pub struct RestConnector;

impl RestConnector {
    fn endpoint() -> String {
        std::env::var("LOOM_STORE_ENDPOINT")
            .unwrap_or_else(|_| defaults::STORE_ENDPOINT.to_string())
    }
}

#[async_trait]
impl Connector for RestConnector {
    async fn connect(&self, settings: &Settings) -> Result<Arc<dyn DocumentStore>> {
        let endpoint = Self::endpoint();
        let store =
            RestDocumentStore::new(&endpoint, &settings.project_id, &settings.credentials_path)?;

        store.ping().await.map_err(|e| match e {
            // A store that answers the dial but refuses the session is a
            // connection failure from the manager's point of view.
            Error::TransientStore(msg) | Error::PermanentStore(msg) => {
                Error::Connection(format!("store refused session: {}", msg))
            }
            other => other,
        })?;

        info!(
            subsystem = "store",
            component = "rest",
            op = "connect",
            endpoint = %endpoint,
            project_id = %settings.project_id,
            "Store endpoint verified"
        );
        Ok(Arc::new(store))
    }
}
