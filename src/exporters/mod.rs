// SPDX-License-Identifier: Apache-2.0

pub mod http;
pub mod ingest;
