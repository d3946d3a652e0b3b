// SPDX-License-Identifier: Apache-2.0

//! Line processors turn the lines read in one tick into completed events.
//!
//! Two variants exist, chosen per file by its extension:
//! - [`PassthroughProcessor`] for files holding one serialized payload per line
//! - [`AggregatorProcessor`] for free-form logs whose messages may span lines

mod aggregator;
mod passthrough;

pub use aggregator::AggregatorProcessor;
pub use passthrough::PassthroughProcessor;

use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::receivers::file::event::{Event, PendingEvent};
use crate::receivers::file::parser::FormatRegistry;

/// Inputs that are fixed for one file during one scan tick.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    /// Scan start as epoch seconds, used for untimed messages
    pub now: i64,
    /// The file has not been written to for longer than the idle threshold
    pub idle: bool,
}

/// Decides whether a file has gone quiet.
#[derive(Debug, Clone, Copy)]
pub struct IdleCheck {
    pub scan_start: SystemTime,
    pub threshold: Duration,
}

impl IdleCheck {
    /// True when the time from `mtime` to the scan start exceeds the
    /// threshold. A modification time later than the scan start is never idle.
    pub fn is_idle(&self, mtime: SystemTime) -> bool {
        self.scan_start
            .duration_since(mtime)
            .map(|elapsed| elapsed > self.threshold)
            .unwrap_or(false)
    }
}

/// Events completed during a tick, plus the state to carry to the next one.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub events: Vec<Event>,
    pub pending: Option<PendingEvent>,
}

pub enum LineProcessor {
    Passthrough(PassthroughProcessor),
    Aggregator(AggregatorProcessor),
}

impl LineProcessor {
    /// Pick the processor for `path`: files ending in `.{passthrough_extension}`
    /// are passed through, all others are aggregated.
    pub fn select(path: &Path, passthrough_extension: &str, formats: &FormatRegistry) -> Self {
        if is_passthrough(path, passthrough_extension) {
            LineProcessor::Passthrough(PassthroughProcessor::new())
        } else {
            LineProcessor::Aggregator(AggregatorProcessor::new(formats.format_for(path)))
        }
    }

    /// Line format used by an aggregating processor
    pub fn format_name(&self) -> Option<&str> {
        match self {
            LineProcessor::Passthrough(_) => None,
            LineProcessor::Aggregator(a) => Some(a.format_name()),
        }
    }

    pub fn process(
        &self,
        source: &Path,
        lines: Vec<String>,
        prior: Option<PendingEvent>,
        ctx: &ProcessContext,
    ) -> ProcessOutput {
        match self {
            LineProcessor::Passthrough(p) => p.process(source, lines),
            LineProcessor::Aggregator(a) => a.process(source, lines, prior, ctx),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LineProcessor::Passthrough(_) => "passthrough",
            LineProcessor::Aggregator(_) => "aggregator",
        }
    }
}

fn is_passthrough(path: &Path, extension: &str) -> bool {
    let extension = extension.trim_start_matches('.');
    !extension.is_empty() && path.extension().is_some_and(|ext| ext == extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_select_by_extension() {
        let registry = FormatRegistry::builtin().unwrap();

        let p = LineProcessor::select(&PathBuf::from("/srv/log.ratchet"), "ratchet", &registry);
        assert_eq!(p.name(), "passthrough");
        assert_eq!(p.format_name(), None);

        let p = LineProcessor::select(&PathBuf::from("/srv/log.ratchet"), ".ratchet", &registry);
        assert_eq!(p.name(), "passthrough");

        let p = LineProcessor::select(&PathBuf::from("/srv/app.log"), "ratchet", &registry);
        assert_eq!(p.name(), "aggregator");
        assert_eq!(p.format_name(), Some("pylons"));

        let p = LineProcessor::select(&PathBuf::from("/srv/ratchet"), "ratchet", &registry);
        assert_eq!(p.name(), "aggregator");

        let p = LineProcessor::select(&PathBuf::from("/srv/app.log"), "", &registry);
        assert_eq!(p.name(), "aggregator");
    }

    #[test]
    fn test_idle_check() {
        let now = SystemTime::now();
        let check = IdleCheck {
            scan_start: now,
            threshold: Duration::from_secs(1),
        };

        assert!(check.is_idle(now - Duration::from_secs(2)));
        assert!(!check.is_idle(now - Duration::from_millis(500)));
        // Exactly at the threshold is not idle yet
        assert!(!check.is_idle(now - Duration::from_secs(1)));
        // Clock skew: mtime in the future
        assert!(!check.is_idle(now + Duration::from_secs(5)));
    }
}
