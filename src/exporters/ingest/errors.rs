// SPDX-License-Identifier: Apache-2.0

use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// IngestError is the result of sending one event
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP error resulting in invalid status code
    #[error("HTTP error: {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to build request: {0}")]
    Build(String),
}
