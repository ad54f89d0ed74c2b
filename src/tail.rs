use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use crate::error::TriggerError;

/// Where a line tail begins reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailStart {
    /// Skip everything currently in the file.
    End,
    /// Resume at a byte offset handed over by the backlog loader.
    Offset(u64),
}

/// Line-mode event source: single-attempt reads over a growing text file.
///
/// `try_next` never blocks; the session loop sleeps between unsuccessful
/// attempts so cancellation stays serviceable. A line is only yielded once
/// its terminator has been written; partial tails are carried over to the
/// next attempt.
pub struct LineTail {
    reader: BufReader<File>,
    pending: String,
}

impl LineTail {
    pub fn open(target: &Path, start: TailStart) -> Result<Self, TriggerError> {
        let file = File::open(target)?;
        let mut reader = BufReader::new(file);
        match start {
            TailStart::End => {
                reader.seek(SeekFrom::End(0))?;
            }
            TailStart::Offset(offset) => {
                reader.seek(SeekFrom::Start(offset))?;
            }
        }
        Ok(Self {
            reader,
            pending: String::new(),
        })
    }

    /// One read attempt. Returns the next complete line without its
    /// terminator, or None when no full line is available yet.
    pub fn try_next(&mut self) -> Result<Option<String>, TriggerError> {
        let mut chunk = String::new();
        let read = self.reader.read_line(&mut chunk)?;
        if read == 0 {
            return Ok(None);
        }

        self.pending.push_str(&chunk);
        if !self.pending.ends_with('\n') {
            // The writer has not finished this line yet.
            return Ok(None);
        }

        let mut line = std::mem::take(&mut self.pending);
        trim_terminator(&mut line);
        Ok(Some(line))
    }
}

fn trim_terminator(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
    }
    if line.ends_with('\r') {
        line.pop();
    }
}
