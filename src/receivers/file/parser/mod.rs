// SPDX-License-Identifier: Apache-2.0

//! Line format recognition.
//!
//! This module provides the formats that decide where a logical log message
//! starts, and extract its timestamp, level and title.
//!
//! # Available Formats
//!
//! - [`RegexFormat`] - Recognize boundaries with a regular expression using named capture groups
//! - [`formats`] - Pre-configured formats (pylons, python, rails) and per-file selection
//! - [`JsonParser`] - Validate pre-serialized JSON payload lines
//!
//! A file is parsed only with the format selected for it (or the chain of
//! formats named as `a+b`), so a continuation line that happens to look like
//! another layout stays part of its message.

pub mod formats;
mod json;
mod level;
mod regex;
mod traits;

pub use formats::{FormatChain, FormatRegistry};
pub use json::JsonParser;
pub use level::Level;
pub use regex::{RegexFormat, parse_timestamp};
pub use traits::{BoundaryMatch, LineFormat, strip_line_ending};
