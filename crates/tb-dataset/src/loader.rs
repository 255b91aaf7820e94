use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use serde_json::Value;
use tb_core::core::{ChatRecord, DatasetError, RecordLocation, TuningExample};

use crate::transform::transform;
use crate::validate::validate;

/// Loads a chat JSONL file and converts every record into a tuning example.
///
/// Stops at the first bad line; a partial dataset is never returned.
pub fn load(path: &Path) -> Result<Vec<TuningExample>, DatasetError> {
    tracing::info!(path = %path.display(), "loading dataset");

    let file = File::open(path).map_err(|source| {
        let err = if source.kind() == ErrorKind::NotFound {
            DatasetError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            DatasetError::Io {
                path: path.to_path_buf(),
                source,
            }
        };
        tracing::error!(path = %path.display(), error = %err, "cannot open dataset");
        err
    })?;

    load_from_reader(BufReader::new(file), path)
}

/// Same as [`load`] over an already opened reader. `path` is only used to
/// label errors and log lines.
pub fn load_from_reader<R: BufRead>(
    mut reader: R,
    path: &Path,
) -> Result<Vec<TuningExample>, DatasetError> {
    let mut examples = Vec::new();
    let mut buf = Vec::new();
    let mut line_number = 0;

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).map_err(|source| {
            tracing::error!(path = %path.display(), line = line_number + 1, error = %source, "read failed");
            DatasetError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        if read == 0 {
            break;
        }
        line_number += 1;

        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                let err = DatasetError::MalformedRecord {
                    location: RecordLocation::new(path, line_number),
                    message: format!("invalid UTF-8: {e}"),
                };
                tracing::error!(path = %path.display(), line = line_number, error = %err, "rejected dataset record");
                return Err(err);
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let example = parse_line(line, RecordLocation::new(path, line_number)).map_err(|err| {
            tracing::error!(path = %path.display(), line = line_number, error = %err, "rejected dataset record");
            err
        })?;
        examples.push(example);
    }

    if examples.is_empty() {
        let err = DatasetError::EmptyDataset {
            path: path.to_path_buf(),
        };
        tracing::error!(path = %path.display(), "{err}");
        return Err(err);
    }

    tracing::info!(
        path = %path.display(),
        count = examples.len(),
        "loaded and validated dataset"
    );
    Ok(examples)
}

fn parse_line(line: &str, location: RecordLocation) -> Result<TuningExample, DatasetError> {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            return Err(DatasetError::MalformedRecord {
                location,
                message: e.to_string(),
            })
        }
    };

    if !validate(&value) {
        return Err(DatasetError::InvalidSchema { location });
    }

    let record: ChatRecord = match serde_json::from_value(value) {
        Ok(record) => record,
        Err(_) => return Err(DatasetError::InvalidSchema { location }),
    };

    transform(&record).map_err(|err| match err {
        DatasetError::MissingField { field, .. } => DatasetError::MissingField {
            field,
            location: Some(location),
        },
        other => other,
    })
}
