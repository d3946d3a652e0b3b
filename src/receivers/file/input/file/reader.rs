// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::file_id::FileId;

/// Size, identity and modification time of an open file, taken from the
/// handle so they describe exactly the file that will be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub file_id: FileId,
    pub size: u64,
    pub mtime: SystemTime,
}

impl FileStat {
    /// Modification time in whole epoch seconds
    pub fn mtime_secs(&self) -> i64 {
        match self.mtime.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        }
    }
}

/// Lines read in one pass, plus where the next read should start.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReadChunk {
    /// Lines with their terminators preserved
    pub lines: Vec<String>,
    /// Offset just past the last consumed byte
    pub end_offset: u64,
}

/// FileReader reads newly appended lines from a single file
pub struct FileReader {
    /// Path to the file
    path: PathBuf,
    /// The open file handle
    file: File,
    /// Stat taken when the file was opened
    stat: FileStat,
    /// Maximum size of a single returned line, longer lines are truncated
    max_line_size: usize,
}

impl FileReader {
    /// Open a file and capture its identity, size and modification time.
    pub fn open(path: impl AsRef<Path>, max_line_size: usize) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let metadata = file.metadata()?;

        let stat = FileStat {
            file_id: FileId::from_file(&file)?,
            size: metadata.len(),
            mtime: metadata.modified()?,
        };

        Ok(Self {
            path,
            file,
            stat,
            max_line_size,
        })
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stat(&self) -> &FileStat {
        &self.stat
    }

    /// Read every complete line from `offset` up to end of file.
    ///
    /// A final line with no terminator is only consumed when
    /// `include_partial` is set; otherwise the returned offset stops in front
    /// of it so the line is read whole once the writer finishes it.
    ///
    /// At most `max_line_size + 1` bytes of a line are buffered. The rest of
    /// a longer line is skipped up to its terminator but still counted in
    /// the returned offset.
    pub fn read_lines_from(&mut self, offset: u64, include_partial: bool) -> io::Result<ReadChunk> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(&self.file);

        let mut chunk = ReadChunk {
            end_offset: offset,
            ..Default::default()
        };
        let limit = (self.max_line_size as u64).saturating_add(1);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let n = (&mut reader).take(limit).read_until(b'\n', &mut buf)?;
            if n == 0 {
                break;
            }

            let mut consumed = n as u64;
            if buf.last() != Some(&b'\n') && n as u64 == limit {
                let (skipped, terminated) = skip_past_newline(&mut reader)?;
                consumed += skipped;
                if terminated {
                    buf.push(b'\n');
                }
            }

            if buf.last() != Some(&b'\n') && !include_partial {
                break;
            }

            chunk.end_offset += consumed;
            chunk.lines.push(self.decode_line(&buf));
        }

        Ok(chunk)
    }

    fn decode_line(&self, raw: &[u8]) -> String {
        let line = String::from_utf8_lossy(raw);
        if line.len() <= self.max_line_size {
            return line.into_owned();
        }

        let mut end = self.max_line_size;
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        let mut truncated = line[..end].to_string();
        if line.ends_with('\n') && !truncated.ends_with('\n') {
            truncated.push('\n');
        }
        truncated
    }
}

/// Discard input through the next `\n`, returning the bytes discarded and
/// whether a terminator was found before end of file.
fn skip_past_newline<R: BufRead>(reader: &mut R) -> io::Result<(u64, bool)> {
    let mut skipped = 0u64;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok((skipped, false));
        }

        match available.iter().position(|b| *b == b'\n') {
            Some(idx) => {
                reader.consume(idx + 1);
                return Ok((skipped + idx as u64 + 1, true));
            }
            None => {
                let len = available.len();
                reader.consume(len);
                skipped += len as u64;
            }
        }
    }
}
