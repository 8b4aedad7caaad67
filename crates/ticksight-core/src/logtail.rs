//! Read the last N lines of an append-only text stream without
//! loading the whole stream.
//!
//! The log file a subscription replays from can be hundreds of
//! megabytes, so the scan works backwards in fixed-size chunks from
//! the end of the stream, splitting complete lines off as they appear.
//! Lines are returned in chronological order, trimmed, with carriage
//! returns and blank lines dropped.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Bytes read per backwards step.
const CHUNK_SIZE: u64 = 8192;

/// Read the trailing `limit` lines of the file at `path`.
///
/// A missing file yields an empty list rather than an error, matching
/// the replay contract: no history is not a failure.
///
/// # Errors
///
/// Returns an I/O error if the file exists but cannot be read.
pub fn read_last_lines(path: &Path, limit: usize) -> io::Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path)?;
    read_last_lines_from(file, limit)
}

/// Read the trailing `limit` lines from any seekable byte stream.
///
/// # Errors
///
/// Returns an I/O error if seeking or reading fails.
pub fn read_last_lines_from<R: Read + Seek>(mut reader: R, limit: usize) -> io::Result<Vec<String>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut pos = reader.seek(SeekFrom::End(0))?;
    let mut lines: VecDeque<String> = VecDeque::new();
    // Bytes of the line currently being assembled, possibly still
    // continuing into the not-yet-read part of the stream.
    let mut carry: Vec<u8> = Vec::new();

    while pos > 0 && lines.len() < limit {
        let take = pos.min(CHUNK_SIZE);
        pos -= take;
        reader.seek(SeekFrom::Start(pos))?;

        let mut chunk = vec![0_u8; take as usize];
        reader.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&carry);
        carry = chunk;

        // Everything after the first newline in `carry` is complete;
        // split complete lines off the tail until none remain.
        while lines.len() < limit {
            let Some(newline) = carry.iter().rposition(|b| *b == b'\n') else {
                break;
            };
            let tail = carry.split_off(newline.saturating_add(1));
            carry.truncate(newline);
            push_line(&mut lines, &tail);
        }
    }

    if pos == 0 && lines.len() < limit {
        push_line(&mut lines, &carry);
    }

    Ok(lines.into_iter().collect())
}

/// Prepend one decoded line, skipping blanks.
fn push_line(lines: &mut VecDeque<String>, bytes: &[u8]) {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        lines.push_front(trimmed.to_owned());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn tail(content: &str, limit: usize) -> Vec<String> {
        read_last_lines_from(Cursor::new(content.as_bytes()), limit).unwrap()
    }

    #[test]
    fn returns_trailing_lines_in_order() {
        let lines = tail("one\ntwo\nthree\n", 2);
        assert_eq!(lines, vec!["two", "three"]);
    }

    #[test]
    fn handles_missing_trailing_newline() {
        let lines = tail("one\ntwo\nthree", 2);
        assert_eq!(lines, vec!["two", "three"]);
    }

    #[test]
    fn limit_larger_than_content() {
        let lines = tail("only\n", 50);
        assert_eq!(lines, vec!["only"]);
    }

    #[test]
    fn strips_carriage_returns_and_blanks() {
        let lines = tail("a\r\n\r\nb\r\n", 10);
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn empty_stream_yields_nothing() {
        assert!(tail("", 10).is_empty());
        assert!(tail("x\ny\n", 0).is_empty());
    }

    #[test]
    fn scans_across_chunk_boundaries() {
        // Content much larger than one chunk, one numbered line each.
        let content: String = (0..2000).map(|i| format!("line {i}\n")).collect();
        let lines = read_last_lines_from(Cursor::new(content.as_bytes()), 3).unwrap();
        assert_eq!(lines, vec!["line 1997", "line 1998", "line 1999"]);
    }

    #[test]
    fn missing_file_is_empty() {
        let lines = read_last_lines(Path::new("/nonexistent/ticksight.log"), 5).unwrap();
        assert!(lines.is_empty());
    }
}
