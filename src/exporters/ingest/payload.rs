// SPDX-License-Identifier: Apache-2.0

//! Request bodies for the ingestion endpoint.
//!
//! Aggregated messages are wrapped in an item envelope:
//!
//! ```json
//! {
//!   "access_token": "...",
//!   "timestamp": 1609495200,
//!   "level": "ERROR",
//!   "title": "first line summary",
//!   "body": "full message, all lines",
//!   "params": { "server.host": "...", "server.log_file": "...", ... }
//! }
//! ```
//!
//! Passthrough lines already are an item and are sent as they were read.

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::exporters::ingest::config::IngestExporterConfig;
use crate::exporters::ingest::errors::IngestError;
use crate::receivers::file::{Event, EventKind};

#[derive(Serialize)]
struct ItemEnvelope<'a> {
    access_token: &'a str,
    timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    body: &'a str,
    params: Map<String, Value>,
}

/// Encode `event` as the body of one ingestion request. `now` is used when
/// the event carries no timestamp.
pub fn encode(event: &Event, config: &IngestExporterConfig, now: i64) -> Result<Bytes, IngestError> {
    match event.kind {
        EventKind::Passthrough => Ok(Bytes::copy_from_slice(event.body.as_bytes())),
        EventKind::Message => {
            let envelope = ItemEnvelope {
                access_token: &config.access_token,
                timestamp: event.timestamp.unwrap_or(now),
                level: event.level.as_deref(),
                title: event.title.as_deref(),
                body: &event.body,
                params: config.tags.to_params(&event.source),
            };
            serde_json::to_vec(&envelope)
                .map(Bytes::from)
                .map_err(|e| IngestError::Build(e.to_string()))
        }
    }
}
