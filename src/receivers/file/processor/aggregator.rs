// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::{ProcessContext, ProcessOutput};
use crate::receivers::file::event::PendingEvent;
use crate::receivers::file::parser::LineFormat;

/// Processor for free-form logs where one message may span several lines.
///
/// A line recognized by the file's format starts a new message and
/// completes the previous one. Any other line is appended to the message in
/// progress. A message still open at the end of a tick is carried over,
/// unless the file has gone idle, in which case it is completed right away.
pub struct AggregatorProcessor {
    format: Arc<dyn LineFormat>,
}

impl AggregatorProcessor {
    pub fn new(format: Arc<dyn LineFormat>) -> Self {
        Self { format }
    }

    pub fn format_name(&self) -> &str {
        self.format.name()
    }

    pub fn process(
        &self,
        source: &Path,
        lines: Vec<String>,
        prior: Option<PendingEvent>,
        ctx: &ProcessContext,
    ) -> ProcessOutput {
        let mut events = Vec::new();
        let mut current = prior.filter(|p| !p.is_empty());

        for line in lines {
            if let Some(boundary) = self.format.match_boundary(&line) {
                if let Some(done) = current.take() {
                    events.push(done.into_event(source));
                }
                current = Some(PendingEvent::from_boundary(&boundary, ctx.now));
            }

            current
                .get_or_insert_with(|| PendingEvent::untimed(ctx.now))
                .push_line(line);
        }

        if ctx.idle {
            if let Some(done) = current.take() {
                debug!(
                    path = ?source,
                    lines = done.lines.len(),
                    "File idle, flushing pending message"
                );
                events.push(done.into_event(source));
            }
        }

        ProcessOutput {
            events,
            pending: current,
        }
    }
}
