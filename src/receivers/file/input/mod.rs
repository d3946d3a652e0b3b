// SPDX-License-Identifier: Apache-2.0

pub mod file;

pub use file::{FileId, FileReader, FileStat, ReadChunk};
