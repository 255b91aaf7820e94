use serde::{Deserialize, Serialize};

use crate::core::{JobId, JobStatus, ModelName, TuningError};

pub const CREATE_TUNED_MODEL_METHOD: &str = "createTunedModel";

// ---------------------------------------------------------------------------
// BaseModel: an entry of the vendor model listing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseModel {
    pub name: ModelName,
    pub display_name: Option<String>,
    pub supported_generation_methods: Vec<String>,
}

impl BaseModel {
    pub fn is_tunable(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == CREATE_TUNED_MODEL_METHOD)
    }
}

// ---------------------------------------------------------------------------
// TunedModel: the resolved handle of a finished tuning job
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunedModel {
    pub name: JobId,
    pub display_name: Option<String>,
    pub base_model: Option<String>,
    pub state: JobStatus,
}

/// Picks the model to tune from. A preferred name must be listed and tunable;
/// without one the first tunable model wins.
pub fn select_base_model<'a>(
    models: &'a [BaseModel],
    preferred: Option<&str>,
) -> Result<&'a BaseModel, TuningError> {
    tracing::info!(
        available = ?models.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
        "available models"
    );

    if let Some(wanted) = preferred {
        let wanted_short = wanted.strip_prefix("models/").unwrap_or(wanted);
        let Some(model) = models.iter().find(|m| m.name.short_name() == wanted_short) else {
            return Err(TuningError::ModelNotTunable {
                model: wanted.to_owned(),
            });
        };
        if !model.is_tunable() {
            return Err(TuningError::ModelNotTunable {
                model: model.name.to_string(),
            });
        }
        return Ok(model);
    }

    models
        .iter()
        .find(|m| m.is_tunable())
        .ok_or(TuningError::NoTunableModel)
}
