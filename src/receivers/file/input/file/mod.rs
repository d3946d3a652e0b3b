// SPDX-License-Identifier: Apache-2.0

mod file_id;
mod reader;

pub use file_id::FileId;
pub use reader::{FileReader, FileStat, ReadChunk};
