use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use ignore::WalkBuilder;

use crate::error::TriggerError;

/// Lines already present in a watched file, plus the byte offset directly
/// after the last consumed line. The live tail resumes at that offset, so
/// nothing is re-delivered and nothing is skipped.
#[derive(Debug)]
pub struct LineBacklog {
    pub lines: Vec<String>,
    pub offset: u64,
}

/// One-time listing of the files already under a watch target, used to
/// seed the aggregation buffer before live watching starts.
///
/// Sorted by path so seeding order is deterministic across runs.
pub fn existing_files(target: &Path, recursive: bool) -> Result<Vec<String>, TriggerError> {
    let mut files = Vec::new();

    if recursive {
        for result in WalkBuilder::new(target)
            .standard_filters(false)
            .hidden(false)
            .build()
        {
            match result {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() {
                        files.push(path.to_string_lossy().into_owned());
                    }
                }
                Err(err) => {
                    tracing::warn!("error walking directory: {}", err);
                }
            }
        }
    } else {
        for entry in fs::read_dir(target)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path().to_string_lossy().into_owned());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Read all lines currently in a watched file. A trailing line without a
/// terminator counts as consumed; the returned offset points past it.
pub fn existing_lines(target: &Path) -> Result<LineBacklog, TriggerError> {
    let file = fs::File::open(target)?;
    let mut reader = BufReader::new(file);

    let mut lines = Vec::new();
    let mut offset: u64 = 0;
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        offset += read as u64;
        if line.ends_with('\n') {
            line.pop();
        }
        if line.ends_with('\r') {
            line.pop();
        }
        lines.push(line);
    }

    Ok(LineBacklog { lines, offset })
}
