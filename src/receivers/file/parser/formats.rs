// SPDX-License-Identifier: Apache-2.0

//! Built-in line formats and per-file format selection.
//!
//! # Supported Formats
//!
//! ## pylons
//!
//! Paste/Pylons/Pyramid default logging layout:
//! ```text
//! 2021-01-01 10:00:00,123 INFO  [app.views] first message
//! ```
//!
//! ## python
//!
//! Python stdlib `logging.basicConfig()` default layout (no timestamp):
//! ```text
//! ERROR:app.worker:job failed
//! ```
//!
//! ## rails
//!
//! Ruby `Logger` default layout used by Rails:
//! ```text
//! E, [2021-01-01T10:00:00.123456 #4242] ERROR -- : boom
//! ```

use std::path::Path;
use std::sync::Arc;

use glob::Pattern;
use tracing::debug;

use super::regex::RegexFormat;
use super::traits::{BoundaryMatch, LineFormat};
use crate::receivers::file::config::{CustomFormat, FormatConfig};
use crate::receivers::file::error::{Error, Result};

pub const PYLONS_FORMAT: &str = "pylons";
pub const PYLONS_PATTERN: &str = r"^(?P<timestamp>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}),(\d+)?\s+(?P<level>[A-Z]+)\s+(?P<title>.*)$";
pub const PYLONS_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const PYTHON_FORMAT: &str = "python";
pub const PYTHON_PATTERN: &str =
    r"^(?P<level>DEBUG|INFO|WARNING|ERROR|CRITICAL):(?P<logger>[^:\s]+):(?P<title>.*)$";

pub const RAILS_FORMAT: &str = "rails";
pub const RAILS_PATTERN: &str = r"^[A-Z], \[(?P<timestamp>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+) #\d+\]\s+(?P<level>[A-Z]+) -- [^:]*: (?P<title>.*)$";
pub const RAILS_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Create the format for Pylons/Paste style logs.
pub fn pylons() -> Result<RegexFormat> {
    Ok(RegexFormat::new(PYLONS_FORMAT, PYLONS_PATTERN)?.with_timestamp_format(PYLONS_TIMESTAMP_FORMAT))
}

/// Create the format for the Python logging default layout.
pub fn python() -> Result<RegexFormat> {
    RegexFormat::new(PYTHON_FORMAT, PYTHON_PATTERN)
}

/// Create the format for Ruby/Rails `Logger` output.
pub fn rails() -> Result<RegexFormat> {
    Ok(RegexFormat::new(RAILS_FORMAT, RAILS_PATTERN)?.with_timestamp_format(RAILS_TIMESTAMP_FORMAT))
}

/// Separator for naming an ordered chain of formats in one selection,
/// e.g. `python+rails`.
pub const FORMAT_CHAIN_SEPARATOR: char = '+';

/// Formats tried in order for one file, the first match wins.
pub struct FormatChain {
    name: String,
    formats: Vec<Arc<dyn LineFormat>>,
}

impl FormatChain {
    pub fn new(formats: Vec<Arc<dyn LineFormat>>) -> Self {
        let name = formats
            .iter()
            .map(|f| f.name())
            .collect::<Vec<_>>()
            .join(&FORMAT_CHAIN_SEPARATOR.to_string());
        Self { name, formats }
    }
}

impl LineFormat for FormatChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn match_boundary(&self, line: &str) -> Option<BoundaryMatch> {
        self.formats.iter().find_map(|f| f.match_boundary(line))
    }
}

/// All registered formats plus the rules that choose the format for a file.
///
/// A selection names one format, or a `+`-joined chain tried in order.
/// Formats that are registered but not selected are never consulted.
pub struct FormatRegistry {
    formats: Vec<Arc<dyn LineFormat>>,
    default: Vec<String>,
    patterns: Vec<(Pattern, Vec<String>)>,
}

impl FormatRegistry {
    /// Registry holding only the built-in formats, with `pylons` as default.
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            formats: vec![Arc::new(pylons()?), Arc::new(python()?), Arc::new(rails()?)],
            default: vec![PYLONS_FORMAT.to_string()],
            patterns: Vec::new(),
        })
    }

    /// Build the registry described by the receiver configuration.
    pub fn from_config(config: &FormatConfig) -> Result<Self> {
        let mut registry = Self::builtin()?;

        for custom in &config.custom {
            registry.register(Arc::new(build_custom(custom)?));
        }

        registry.set_default(&config.default)?;

        for (glob, name) in &config.patterns {
            registry.add_pattern(glob, name)?;
        }

        Ok(registry)
    }

    /// Add a format, replacing any existing format with the same name.
    pub fn register(&mut self, format: Arc<dyn LineFormat>) {
        match self.formats.iter().position(|f| f.name() == format.name()) {
            Some(idx) => self.formats[idx] = format,
            None => self.formats.push(format),
        }
    }

    pub fn set_default(&mut self, selection: &str) -> Result<()> {
        self.default = self.parse_selection(selection)?;
        Ok(())
    }

    /// Route files whose path matches `glob` to `selection`.
    pub fn add_pattern(&mut self, glob: &str, selection: &str) -> Result<()> {
        let names = self.parse_selection(selection)?;
        let pattern = Pattern::new(glob).map_err(|e| Error::InvalidGlob(e.to_string()))?;
        self.patterns.push((pattern, names));
        Ok(())
    }

    /// The format used for `path`: the first matching pattern's selection,
    /// or the default.
    pub fn format_for(&self, path: &Path) -> Arc<dyn LineFormat> {
        let file_name = path.file_name().map(Path::new);
        let names = self
            .patterns
            .iter()
            // Patterns without a separator are matched against the file name
            .find(|(pattern, _)| {
                pattern.matches_path(path) || file_name.is_some_and(|n| pattern.matches_path(n))
            })
            .map(|(_, names)| names)
            .unwrap_or(&self.default);

        // Names were checked when selected and registering never removes
        let mut formats: Vec<Arc<dyn LineFormat>> = names
            .iter()
            .filter_map(|name| self.lookup(name))
            .collect();

        if formats.len() == 1 {
            formats.remove(0)
        } else {
            let chain = FormatChain::new(formats);
            debug!(path = ?path, format = chain.name(), "Format chain selected");
            Arc::new(chain)
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<dyn LineFormat>> {
        self.formats.iter().find(|f| f.name() == name).cloned()
    }

    fn parse_selection(&self, selection: &str) -> Result<Vec<String>> {
        let names: Vec<String> = selection
            .split(FORMAT_CHAIN_SEPARATOR)
            .map(|name| name.trim().to_string())
            .collect();

        for name in &names {
            if self.lookup(name).is_none() {
                return Err(Error::Config(format!("unknown log format: {}", name)));
            }
        }

        Ok(names)
    }
}

fn build_custom(custom: &CustomFormat) -> Result<RegexFormat> {
    let format = RegexFormat::new(custom.name.clone(), &custom.pattern)?;
    Ok(match &custom.timestamp_format {
        Some(ts) => format.with_timestamp_format(ts.clone()),
        None => format,
    })
}
