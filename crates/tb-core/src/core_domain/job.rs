use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{JobId, ModelName, TuningError, TuningExample};

// ---------------------------------------------------------------------------
// JobStatus: observed state of a remote tuning job
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Active,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Maps a vendor `state` string. `CREATING` and `STATE_UNSPECIFIED` are
    /// both still in flight.
    pub fn from_wire(state: &str) -> Option<Self> {
        match state {
            "PENDING" | "CREATING" | "STATE_UNSPECIFIED" => Some(Self::Pending),
            "ACTIVE" => Some(Self::Active),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningJob {
    pub id: JobId,
    pub status: JobStatus,
}

impl TuningJob {
    pub fn submitted(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Hyperparameters
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub epoch_count: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            epoch_count: 3,
            batch_size: 32,
            learning_rate: 3e-4,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.epoch_count == 0 {
            return Err(TuningError::InvalidRequest(
                "epoch_count must be >= 1".to_owned(),
            ));
        }
        if self.batch_size == 0 {
            return Err(TuningError::InvalidRequest(
                "batch_size must be >= 1".to_owned(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TuningError::InvalidRequest(
                "learning_rate must be > 0".to_owned(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TuningRequest: everything the submission call needs
// ---------------------------------------------------------------------------

pub const MAX_TUNED_MODEL_ID_LEN: usize = 40;

/// Tuned model ids are lowercase letters, digits and dashes, starting with a
/// letter.
pub fn validate_tuned_model_id(id: &str) -> Result<(), TuningError> {
    if id.is_empty() || id.len() > MAX_TUNED_MODEL_ID_LEN {
        return Err(TuningError::InvalidRequest(format!(
            "tuned model id must be 1..={MAX_TUNED_MODEL_ID_LEN} characters, got {}",
            id.len()
        )));
    }
    if !id.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(TuningError::InvalidRequest(format!(
            "tuned model id {id:?} must start with a lowercase letter"
        )));
    }
    if let Some(bad) = id
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(TuningError::InvalidRequest(format!(
            "tuned model id {id:?} contains invalid character {bad:?}"
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct TuningRequest {
    pub source_model: ModelName,
    pub tuned_model_id: String,
    pub display_name: String,
    pub hyperparameters: Hyperparameters,
    pub examples: Vec<TuningExample>,
}

impl TuningRequest {
    pub fn validate(&self) -> Result<(), TuningError> {
        validate_tuned_model_id(&self.tuned_model_id)?;
        self.hyperparameters.validate()?;
        if self.examples.is_empty() {
            return Err(TuningError::InvalidRequest(
                "at least one training example required".to_owned(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
