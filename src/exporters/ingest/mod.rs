// SPDX-License-Identifier: Apache-2.0

//! Exporter for the item ingestion API.
//!
//! Every completed event becomes one POST request. Delivery is best effort:
//! a failed request is reported to the caller and not attempted again.

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod payload;

use std::time::Duration;

pub use config::{IngestExporterConfig, ServerTags};
pub use dispatcher::HttpDispatcher;
pub use errors::IngestError;

pub const DEFAULT_ENDPOINT: &str = "http://submit.ratchet.io/api/item/";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Reported as `notifier.name` with every aggregated event
pub const NOTIFIER_NAME: &str = "ratchet-agent";
