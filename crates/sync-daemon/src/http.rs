//! RemoteTransport over the service's local REST API.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sync_core::RemoteError;
use sync_core::remote::{RemoteTransport, Result};
use tokio::net::TcpStream;
use tracing::debug;

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long the startup reachability probe may take.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Object type used for synced documents.
const OBJECT_TYPE: &str = "note";

#[derive(Debug, Serialize)]
struct CreateObjectRequest<'a> {
    space: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    object_type: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateObjectRequest<'a> {
    space: &'a str,
    name: &'a str,
    content: &'a str,
}

/// Create responses carry the ID either at the top level or nested.
#[derive(Debug, Deserialize)]
struct CreateObjectResponse {
    id: Option<String>,
    object: Option<ObjectRef>,
}

#[derive(Debug, Deserialize)]
struct ObjectRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("workspace-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check that something is listening on the API's host and port.
    pub async fn probe(&self) -> Result<()> {
        let host = self
            .base_url
            .host_str()
            .ok_or_else(|| RemoteError::InvalidArgument("API URL has no host".into()))?;
        let port = self
            .base_url
            .port_or_known_default()
            .ok_or_else(|| RemoteError::InvalidArgument("API URL has no port".into()))?;

        match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                debug!("Probe of {}:{} failed: {}", host, port, e);
                Err(RemoteError::Unavailable)
            }
            Err(_) => Err(RemoteError::Timeout),
        }
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::InvalidArgument(e.to_string()))
    }

    async fn send(&self, request: RequestBuilder, token: &str) -> Result<Response> {
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, error_message(&body)))
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn open_container(&self, token: &str, container_id: &str) -> Result<()> {
        let url = self.url(&format!("api/v1/spaces/{container_id}"))?;
        self.send(self.http.get(url), token).await?;
        Ok(())
    }

    async fn create_object(
        &self,
        token: &str,
        title: &str,
        content: &str,
        container_id: &str,
    ) -> Result<String> {
        let url = self.url("api/v1/objects")?;
        let body = CreateObjectRequest {
            space: container_id,
            name: title,
            object_type: OBJECT_TYPE,
            content,
        };

        let response = self.send(self.http.post(url).json(&body), token).await?;
        let created: CreateObjectResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Unknown(format!("invalid create response: {e}")))?;

        created
            .id
            .or(created.object.map(|object| object.id))
            .ok_or_else(|| RemoteError::Unknown("create response has no object id".into()))
    }

    async fn update_object(
        &self,
        token: &str,
        object_id: &str,
        title: &str,
        content: &str,
        container_id: &str,
    ) -> Result<()> {
        let url = self.url(&format!("api/v1/objects/{object_id}"))?;
        let body = UpdateObjectRequest {
            space: container_id,
            name: title,
            content,
        };

        self.send(self.http.patch(url).json(&body), token).await?;
        Ok(())
    }

    async fn delete_objects(
        &self,
        token: &str,
        object_ids: &[String],
        container_id: &str,
    ) -> Result<()> {
        for object_id in object_ids {
            let url = self.url(&format!("api/v1/objects/{object_id}"))?;
            let request = self.http.delete(url).query(&[("space", container_id)]);
            self.send(request, token).await?;
        }
        Ok(())
    }

    async fn health_check(&self, token: &str) -> Result<()> {
        let url = self.url("api/v1/spaces")?;
        self.send(self.http.get(url), token).await?;
        Ok(())
    }
}

/// Map an HTTP error status onto the remote error taxonomy.
pub fn classify_status(status: StatusCode, message: String) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthenticated,
        StatusCode::FORBIDDEN => RemoteError::PermissionDenied,
        StatusCode::NOT_FOUND | StatusCode::GONE => RemoteError::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteError::InvalidArgument(message)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => RemoteError::Timeout,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => RemoteError::Unavailable,
        s if s.is_server_error() => RemoteError::Internal(message),
        s => RemoteError::Unknown(format!("{s}: {message}")),
    }
}

fn classify_transport(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else if err.is_connect() {
        RemoteError::Unavailable
    } else {
        RemoteError::Unknown(err.to_string())
    }
}

/// Pull a readable message out of an error response body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error.or(parsed.message))
        .unwrap_or_else(|| body.trim().to_string())
}
