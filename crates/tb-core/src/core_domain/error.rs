use std::fmt;
use std::path::PathBuf;

use crate::core::{JobId, JobStatus};

// ---------------------------------------------------------------------------
// RecordLocation: where in a dataset file a record came from
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordLocation {
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
}

impl RecordLocation {
    pub fn new(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

fn at(location: &Option<RecordLocation>) -> String {
    location
        .as_ref()
        .map(|loc| format!(" at {loc}"))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Sub-error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("malformed JSON record at {location}: {message}")]
    MalformedRecord {
        location: RecordLocation,
        message: String,
    },
    #[error("record at {location} is not a valid chat record")]
    InvalidSchema { location: RecordLocation },
    #[error("record{} has no {field} message", at(.location))]
    MissingField {
        field: &'static str,
        location: Option<RecordLocation>,
    },
    #[error("no valid records found in {}", .path.display())]
    EmptyDataset { path: PathBuf },
    #[error("dataset file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write converted dataset: {0}")]
    Export(String),
}

impl DatasetError {
    /// Line the error points at, when it concerns a single record.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedRecord { location, .. } | Self::InvalidSchema { location } => {
                Some(location.line)
            }
            Self::MissingField { location, .. } => location.as_ref().map(|loc| loc.line),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("service connection failed: {0}")]
    Connection(String),
    #[error("failed to decode service response: {0}")]
    Decode(String),
    #[error("credential error: {0}")]
    Credential(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("tuning job {job} ended in state {status}")]
    JobFailed { job: JobId, status: JobStatus },
    #[error("tuning job {job} still not finished after {attempts} status checks")]
    PollLimitExceeded { job: JobId, attempts: u32 },
    #[error("no tunable base model available")]
    NoTunableModel,
    #[error("model {model} does not support tuning")]
    ModelNotTunable { model: String },
    #[error("invalid tuning request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Tuning(#[from] TuningError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
