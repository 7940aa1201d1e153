//! File reading utilities for line extraction.

use crate::error::Result;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// A complete line and the byte offset immediately after its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub offset: u64,
}

impl Line {
    pub fn new(text: impl Into<String>, offset: u64) -> Self {
        Self {
            text: text.into(),
            offset,
        }
    }
}

/// Lines read in one pass plus the new cursor.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ReadOutcome {
    pub lines: Vec<Line>,
    pub cursor: u64,
}

/// Seek to `cursor` and read the `file_len - cursor` bytes available at stat
/// time, returning every complete line found.
///
/// The returned cursor stops at the last line boundary; a partial tail is
/// left in the file for the next pass.
pub(crate) async fn read_new_lines(file: &mut File, cursor: u64, file_len: u64) -> Result<ReadOutcome> {
    let bytes_to_read = match calculate_bytes_to_read(file_len, cursor) {
        Some(bytes) => bytes,
        None => {
            return Ok(ReadOutcome {
                lines: Vec::new(),
                cursor,
            });
        }
    };

    file.seek(std::io::SeekFrom::Start(cursor)).await?;

    let mut buf = Vec::with_capacity(bytes_to_read as usize);
    (&mut *file).take(bytes_to_read).read_to_end(&mut buf).await?;

    let (lines, consumed) = split_complete_lines(&buf, cursor);

    Ok(ReadOutcome {
        lines,
        cursor: cursor + consumed,
    })
}

/// Split `buf` on `\n`, trimming one trailing `\r` from each line.
///
/// `base` is the file offset of `buf[0]`. Returns the complete lines and the
/// number of bytes they span; bytes after the last `\n` are not consumed.
pub(crate) fn split_complete_lines(buf: &[u8], base: u64) -> (Vec<Line>, u64) {
    let mut lines = Vec::new();
    let mut start = 0usize;

    for (idx, byte) in buf.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        let mut content = &buf[start..idx];
        if let [rest @ .., b'\r'] = content {
            content = rest;
        }
        let end = idx + 1;
        lines.push(Line {
            text: String::from_utf8_lossy(content).into_owned(),
            offset: base + end as u64,
        });
        start = end;
    }

    (lines, start as u64)
}

/// Detect if the file was truncated or replaced by comparing current size
/// with the cursor
pub(crate) fn detect_file_truncation(current_size: u64, cursor: u64) -> bool {
    current_size < cursor
}

/// Calculate bytes to read based on current size and cursor
pub(crate) fn calculate_bytes_to_read(current_size: u64, cursor: u64) -> Option<u64> {
    if current_size <= cursor {
        None
    } else {
        Some(current_size - cursor)
    }
}
