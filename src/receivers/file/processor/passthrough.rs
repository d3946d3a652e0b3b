// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use tracing::{debug, warn};

use super::ProcessOutput;
use crate::receivers::file::event::Event;
use crate::receivers::file::parser::JsonParser;

/// Processor for files that already hold one serialized payload per line.
///
/// Each non-empty line is checked for well-formed JSON and forwarded as-is.
/// Malformed lines are still forwarded, with a warning. No state is kept
/// between ticks.
#[derive(Debug, Clone, Default)]
pub struct PassthroughProcessor {
    parser: JsonParser,
}

impl PassthroughProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&self, source: &Path, lines: Vec<String>) -> ProcessOutput {
        let mut events = Vec::with_capacity(lines.len());

        for line in lines {
            let payload = line.trim();
            if payload.is_empty() {
                debug!(path = ?source, "Skipping empty line");
                continue;
            }

            if let Err(e) = self.parser.validate(payload) {
                warn!(
                    path = ?source,
                    error = %e,
                    line = %payload,
                    "Forwarding badly formatted line"
                );
            }

            events.push(Event::passthrough(payload, source));
        }

        ProcessOutput {
            events,
            pending: None,
        }
    }
}
