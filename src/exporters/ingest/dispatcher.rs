// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, USER_AGENT};
use http::{Method, Request, Response, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use tower::BoxError;
use tracing::debug;

use crate::exporters::http::client::{HttpClient, build_hyper_client};
use crate::exporters::ingest::config::IngestExporterConfig;
use crate::exporters::ingest::errors::IngestError;
use crate::exporters::ingest::payload;
use crate::receivers::file::{Event, EventSink};

/// Longest slice of an error response kept for the log
const MAX_ERROR_BODY: usize = 512;

/// Sends each event to the ingestion endpoint as its own POST request.
#[derive(Clone)]
pub struct HttpDispatcher {
    client: HttpClient,
    endpoint: Uri,
    config: Arc<IngestExporterConfig>,
}

impl HttpDispatcher {
    pub fn new(config: IngestExporterConfig) -> Result<Self, BoxError> {
        config.validate()?;

        let endpoint: Uri = config
            .endpoint
            .parse()
            .map_err(|e| format!("invalid endpoint {}: {}", config.endpoint, e))?;
        let client = build_hyper_client(config.tls_cfg_builder.clone().build()?)?;

        Ok(Self {
            client,
            endpoint,
            config: Arc::new(config),
        })
    }

    /// Send one event. A non-2xx response, a connection failure or running
    /// past the request timeout are all errors.
    pub async fn send(&self, event: &Event) -> Result<(), IngestError> {
        let body = payload::encode(event, &self.config, now_secs())?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(
                USER_AGENT,
                concat!("ratchet-agent/", env!("CARGO_PKG_VERSION")),
            )
            .body(Full::new(body))
            .map_err(|e| IngestError::Build(e.to_string()))?;

        let timeout = self.config.request_timeout;
        let (status, body) = tokio::time::timeout(timeout, self.exchange(req))
            .await
            .map_err(|_| IngestError::Timeout(timeout))??;

        if !status.is_success() {
            let mut text = String::from_utf8_lossy(&body).into_owned();
            if text.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                text.truncate(end);
            }
            return Err(IngestError::Status { status, body: text });
        }

        debug!(path = ?event.source, %status, "Event delivered");
        Ok(())
    }

    async fn exchange(
        &self,
        req: Request<Full<Bytes>>,
    ) -> Result<(http::StatusCode, Bytes), IngestError> {
        let resp: Response<Incoming> = self.client.request(req).await.map_err(|e| {
            if e.is_connect() {
                IngestError::Connect(e.to_string())
            } else {
                IngestError::Request(e.to_string())
            }
        })?;

        let (head, body) = resp.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| IngestError::Request(format!("failed reading response: {}", e)))?
            .to_bytes();

        Ok((head.status, body))
    }
}

impl EventSink for HttpDispatcher {
    async fn dispatch(&self, event: &Event) -> Result<(), BoxError> {
        self.send(event).await.map_err(Into::into)
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
