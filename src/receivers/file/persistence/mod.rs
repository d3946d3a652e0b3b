// SPDX-License-Identifier: Apache-2.0

//! Persistence for storing file positions and pending messages.
//!
//! Uses JSON file storage with atomic writes for reliable offset tracking.

mod json_file;
mod schema;

pub use json_file::PositionStore;
pub use schema::{PERSISTED_STATE_VERSION, PersistedCursorV1, PersistedStateV1};
